//! State 命令 - 查看持久化的去重状态

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::state_file_from_env;
use crate::notification::{FileStateStore, NotificationState, StateStore};

#[derive(Args, Debug)]
pub struct StateArgs {
    /// 去重状态文件路径
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 格式化状态（纯函数，便于测试）
pub fn format_state(state: &NotificationState) -> String {
    format!(
        "Last alert: {}\n  Fingerprint: {} (v{})\n  Long calls: {}\n  In-progress calls: {}",
        state.time.format("%Y-%m-%d %H:%M:%S UTC"),
        state.hash,
        state.fingerprint_version,
        state.long_calls_count,
        state.in_progress_calls_count
    )
}

/// 处理 state 命令
pub fn handle_state(args: StateArgs) -> Result<()> {
    let path = args.state_file.unwrap_or_else(state_file_from_env);
    let store = FileStateStore::new(&path);

    match store.read()? {
        Some(state) if args.json => println!("{}", serde_json::to_string_pretty(&state)?),
        Some(state) => println!("{}", format_state(&state)),
        None => println!("No alert recorded yet ({})", path.display()),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_state() {
        let state = NotificationState::new(
            "abc123",
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            2,
            1,
        );
        let text = format_state(&state);
        assert!(text.contains("Last alert: 2025-06-01 12:00:00 UTC"));
        assert!(text.contains("Fingerprint: abc123 (v1)"));
        assert!(text.contains("Long calls: 2"));
        assert!(text.contains("In-progress calls: 1"));
    }
}
