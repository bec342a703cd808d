// src/cli/run.rs
//! Run 命令 - 执行一次监控周期
//!
//! 由 cron 等外部调度器定期调用，每次调用只跑一个周期。

use chrono::Utc;
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::calls::ClassificationMode;
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::lock::RunLock;
use crate::monitor::{CallMonitor, CycleOutcome};
use crate::notification::{FileStateStore, SendGridMailer};
use crate::provider::TwilioClient;

/// Run 命令参数（覆盖环境变量配置）
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// 长时通话阈值（秒）
    #[arg(long)]
    pub threshold: Option<u64>,

    /// 回看窗口（分钟）
    #[arg(long)]
    pub lookback: Option<u64>,

    /// 单次拉取的通话条数
    #[arg(long)]
    pub limit: Option<usize>,

    /// 分类模式: windowed, legacy
    #[arg(long)]
    pub mode: Option<ClassificationMode>,

    /// 去重状态文件路径
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// 打印消息但不发送（调试用）
    #[arg(long)]
    pub dry_run: bool,

    /// 跳过去重（总是发送）
    #[arg(long)]
    pub no_dedup: bool,

    /// 邮件发送失败时以非零退出
    #[arg(long)]
    pub strict_send: bool,
}

impl RunArgs {
    /// 将命令行参数覆盖到配置上
    pub fn apply(&self, config: &mut MonitorConfig) -> Result<(), MonitorError> {
        if let Some(threshold) = self.threshold {
            config.long_call_threshold_secs = threshold;
        }
        if let Some(lookback) = self.lookback {
            config.lookback_minutes = lookback;
        }
        if let Some(limit) = self.limit {
            if limit == 0 {
                return Err(MonitorError::InvalidConfig {
                    key: "--limit".to_string(),
                    value: "0".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.fetch_limit = limit;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(path) = &self.state_file {
            config.state_file = path.clone();
        }
        if self.strict_send {
            config.fail_on_send_error = true;
        }
        Ok(())
    }
}

/// 处理 run 命令
pub async fn handle_run(args: RunArgs) -> Result<(), MonitorError> {
    // 1. 配置（缺失时在任何网络请求之前失败）
    let mut config = MonitorConfig::from_env()?;
    args.apply(&mut config)?;

    // 2. 运行锁
    let _lock = match RunLock::try_acquire(&config.lock_path()) {
        Ok(Some(lock)) => Some(lock),
        Ok(None) => {
            warn!(path = %config.lock_path().display(), "Another monitoring run is in progress, skipping");
            return Ok(());
        }
        Err(e) => {
            warn!(error = %e, "Failed to acquire run lock, continuing without it");
            None
        }
    };

    // 3. 组装依赖
    let provider = TwilioClient::new(config.twilio_config()).map_err(|e| MonitorError::Client {
        client: "twilio".to_string(),
        cause: e,
    })?;
    let mailer = SendGridMailer::new(config.sendgrid_config()).map_err(|e| MonitorError::Client {
        client: "sendgrid".to_string(),
        cause: e,
    })?;
    let store = FileStateStore::new(config.state_file.clone());

    let monitor = CallMonitor::new(&config, provider, mailer, store)
        .with_dry_run(args.dry_run)
        .with_dedup(!args.no_dedup);

    // 4. 执行
    let outcome = monitor.run_cycle(Utc::now()).await?;

    if let CycleOutcome::DryRun { message } = &outcome {
        println!("Subject: {}\n\n{}", message.subject, message.body);
    }

    info!(outcome = %outcome, "Monitoring completed");
    Ok(())
}
