//! 通话记录 - 从服务商拉取的单次通话快照

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DurationParseError;

/// 通话时间的显示格式
const TIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 通话状态
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallStatus {
    Queued,
    Ringing,
    InProgress,
    Completed,
    Busy,
    Failed,
    NoAnswer,
    Canceled,
    /// 未知状态，保留原始字符串
    Other(String),
}

impl CallStatus {
    /// 服务商使用的状态字符串
    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Queued => "queued",
            CallStatus::Ringing => "ringing",
            CallStatus::InProgress => "in-progress",
            CallStatus::Completed => "completed",
            CallStatus::Busy => "busy",
            CallStatus::Failed => "failed",
            CallStatus::NoAnswer => "no-answer",
            CallStatus::Canceled => "canceled",
            CallStatus::Other(s) => s,
        }
    }

    /// 通话是否仍在进行（排队、振铃、通话中）
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            CallStatus::Queued | CallStatus::Ringing | CallStatus::InProgress
        )
    }
}

impl From<&str> for CallStatus {
    fn from(s: &str) -> Self {
        match s {
            "queued" => CallStatus::Queued,
            "ringing" => CallStatus::Ringing,
            "in-progress" => CallStatus::InProgress,
            "completed" => CallStatus::Completed,
            "busy" => CallStatus::Busy,
            "failed" => CallStatus::Failed,
            "no-answer" => CallStatus::NoAnswer,
            "canceled" => CallStatus::Canceled,
            other => CallStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for CallStatus {
    fn from(s: String) -> Self {
        CallStatus::from(s.as_str())
    }
}

impl From<CallStatus> for String {
    fn from(status: CallStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次通话记录
///
/// `duration` 保留服务商返回的原始值，通话结束后才会出现，
/// 使用时通过 [`CallRecord::duration_secs`] 解析。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    /// 服务商分配的通话 ID（Twilio SID）
    pub id: String,
    /// 主叫号码（已格式化）
    pub from: String,
    /// 被叫号码（已格式化）
    pub to: String,
    pub status: CallStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// 原始时长字段（秒）
    pub duration: Option<String>,
}

impl CallRecord {
    /// 创建只有 ID 和状态的记录
    pub fn new(id: impl Into<String>, status: impl Into<CallStatus>) -> Self {
        Self {
            id: id.into(),
            from: String::new(),
            to: String::new(),
            status: status.into(),
            start_time: None,
            end_time: None,
            duration: None,
        }
    }

    /// 设置主叫/被叫号码
    pub fn with_numbers(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = from.into();
        self.to = to.into();
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// 设置原始时长字段
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// 解析时长（秒）
    ///
    /// 字段缺失或为空返回 `Ok(None)`，非整数返回 [`DurationParseError`]
    pub fn duration_secs(&self) -> Result<Option<u64>, DurationParseError> {
        match self.duration.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse::<u64>().map(Some).map_err(|_| DurationParseError {
                call_id: self.id.clone(),
                raw: raw.to_string(),
            }),
        }
    }
}

/// 格式化通话时间，缺失时显示 "Unknown"
pub(crate) fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format(TIME_DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
