//! 通知状态存储 - 本地 JSON 文件读写
//!
//! 只保存一条记录（最近一次告警的指纹），每次覆盖写入，不保留历史。
//! 写入先落临时文件再原子替换。

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::fingerprint::FINGERPRINT_VERSION;

/// 状态文件名
const STATE_FILE_NAME: &str = "notification_state.json";

/// 持久化的去重状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationState {
    /// 告警指纹
    pub hash: String,
    /// 记录时间
    pub time: DateTime<Utc>,
    /// 长时通话数量
    pub long_calls_count: usize,
    /// 进行中通话数量
    pub in_progress_calls_count: usize,
    /// 指纹算法版本（旧文件缺失时为 0，永远不会与当前版本相等）
    #[serde(default)]
    pub fingerprint_version: u32,
}

impl NotificationState {
    /// 使用当前指纹版本创建状态
    pub fn new(
        hash: impl Into<String>,
        time: DateTime<Utc>,
        long_calls_count: usize,
        in_progress_calls_count: usize,
    ) -> Self {
        Self {
            hash: hash.into(),
            time,
            long_calls_count,
            in_progress_calls_count,
            fingerprint_version: FINGERPRINT_VERSION,
        }
    }
}

/// 去重状态存储
pub trait StateStore {
    /// 读取上一次的状态，不存在时返回 `Ok(None)`
    fn read(&self) -> Result<Option<NotificationState>>;

    /// 覆盖写入状态
    fn write(&self, state: &NotificationState) -> Result<()>;
}

/// 基于本地文件的状态存储
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 默认状态文件路径
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("twilio-call-monitor")
            .join(STATE_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileStateStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl StateStore for FileStateStore {
    fn read(&self) -> Result<Option<NotificationState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let state = serde_json::from_str(&content)
            .with_context(|| format!("Invalid notification state in {}", self.path.display()))?;
        Ok(Some(state))
    }

    fn write(&self, state: &NotificationState) -> Result<()> {
        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // 原子替换
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, serde_json::to_string_pretty(state)?)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }
}
