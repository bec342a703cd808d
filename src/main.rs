//! Twilio Call Monitor CLI
//!
//! 监控 Twilio 通话记录，发现长时通话或进行中通话时发送邮件告警

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use call_monitor::cli::{handle_run, handle_state, RunArgs, StateArgs};
use call_monitor::config::REQUIRED_ENV_VARS;
use call_monitor::MonitorError;

#[derive(Parser)]
#[command(name = "callmon")]
#[command(about = "Twilio Call Monitor - 长时通话与进行中通话邮件告警")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 执行一次监控周期（供 cron 调用）
    Run(RunArgs),
    /// 查看上一次告警的去重状态
    State(StateArgs),
}

#[tokio::main]
async fn main() {
    // 初始化 tracing 日志系统
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug callmon run --dry-run
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("call_monitor=info,callmon=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            if let Err(e) = handle_run(args).await {
                error!(error = %e, "Call monitoring failed");
                eprintln!("Error: {}", e);
                if matches!(e, MonitorError::MissingConfig(_)) {
                    eprintln!("Please set {}.", REQUIRED_ENV_VARS.join(", "));
                }
                std::process::exit(e.exit_code());
            }
        }
        Commands::State(args) => {
            if let Err(e) = handle_state(args) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
