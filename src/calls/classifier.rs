//! 通话分类器 - 找出需要告警的长时通话和进行中通话
//!
//! 两个类别互斥：先看状态，进行中的通话只会进入 in-progress 列表，
//! 不会再参与长时通话判断。
//!
//! ## 分类模式
//! - `windowed`（默认）：只报告回看窗口内开始的进行中通话、
//!   窗口内结束且时长达到阈值的已完成通话
//! - `legacy`：不限时间窗口，报告所有进行中通话和时长超过阈值的通话
//!   （严格大于，沿用旧版 cron 脚本的判断）

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

use super::duration::{format_duration, IN_PROGRESS_LABEL};
use super::record::{format_time, CallRecord, CallStatus};

/// 默认长时通话阈值（秒）
pub const DEFAULT_THRESHOLD_SECS: u64 = 10 * 60;

/// 默认回看窗口（分钟）
pub const DEFAULT_LOOKBACK_MINUTES: i64 = 10;

/// 分类模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMode {
    #[default]
    Windowed,
    /// 无窗口，时长阈值不含边界
    Legacy,
}

impl ClassificationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMode::Windowed => "windowed",
            ClassificationMode::Legacy => "legacy",
        }
    }
}

impl FromStr for ClassificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windowed" => Ok(ClassificationMode::Windowed),
            "legacy" => Ok(ClassificationMode::Legacy),
            other => Err(format!(
                "unknown classification mode '{}', expected 'windowed' or 'legacy'",
                other
            )),
        }
    }
}

/// 分类结果类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallCategory {
    /// 已完成且时长达到阈值
    LongCompleted,
    /// 窗口内仍在排队、振铃或通话中
    InProgressRecent,
}

/// 分类后的通话（只读投影）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedCall {
    pub id: String,
    pub from: String,
    pub to: String,
    pub status: CallStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// 长时通话的时长（秒），进行中通话为 None
    pub duration_secs: Option<u64>,
    pub display_duration: String,
    pub category: CallCategory,
}

impl ClassifiedCall {
    fn in_progress(record: &CallRecord) -> Self {
        Self {
            id: record.id.clone(),
            from: record.from.clone(),
            to: record.to.clone(),
            status: record.status.clone(),
            start_time: record.start_time,
            end_time: record.end_time,
            duration_secs: None,
            display_duration: IN_PROGRESS_LABEL.to_string(),
            category: CallCategory::InProgressRecent,
        }
    }

    fn long_completed(record: &CallRecord, duration_secs: u64) -> Self {
        Self {
            id: record.id.clone(),
            from: record.from.clone(),
            to: record.to.clone(),
            status: record.status.clone(),
            start_time: record.start_time,
            end_time: record.end_time,
            duration_secs: Some(duration_secs),
            display_duration: format_duration(Some(duration_secs)),
            category: CallCategory::LongCompleted,
        }
    }

    /// 指纹中用于区分同一通话不同状态的字段
    ///
    /// 长时通话取时长，进行中通话取状态
    pub fn distinguishing_field(&self) -> String {
        match self.category {
            CallCategory::LongCompleted => self.duration_secs.unwrap_or_default().to_string(),
            CallCategory::InProgressRecent => self.status.as_str().to_string(),
        }
    }

    /// 开始时间显示文本
    pub fn start_label(&self) -> String {
        format_time(self.start_time)
    }
}

/// 一个周期的分类结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub long_calls: Vec<ClassifiedCall>,
    pub in_progress_calls: Vec<ClassifiedCall>,
}

impl Classification {
    /// 是否没有任何需要报告的通话
    pub fn is_empty(&self) -> bool {
        self.long_calls.is_empty() && self.in_progress_calls.is_empty()
    }

    pub fn total(&self) -> usize {
        self.long_calls.len() + self.in_progress_calls.len()
    }
}

/// 通话分类器
#[derive(Debug, Clone)]
pub struct CallClassifier {
    /// 长时通话阈值（秒，含边界）
    threshold_secs: u64,
    /// 回看窗口
    lookback: Duration,
    mode: ClassificationMode,
}

impl CallClassifier {
    /// 使用默认阈值（600 秒）和窗口（10 分钟）
    pub fn new() -> Self {
        Self {
            threshold_secs: DEFAULT_THRESHOLD_SECS,
            lookback: Duration::minutes(DEFAULT_LOOKBACK_MINUTES),
            mode: ClassificationMode::Windowed,
        }
    }

    pub fn with_threshold_secs(mut self, threshold_secs: u64) -> Self {
        self.threshold_secs = threshold_secs;
        self
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_mode(mut self, mode: ClassificationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn threshold_secs(&self) -> u64 {
        self.threshold_secs
    }

    pub fn mode(&self) -> ClassificationMode {
        self.mode
    }

    /// 窗口起点，legacy 模式没有窗口
    fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.mode {
            ClassificationMode::Windowed => Some(now - self.lookback),
            ClassificationMode::Legacy => None,
        }
    }

    /// windowed 模式阈值含边界，legacy 模式不含
    fn is_long(&self, duration_secs: u64) -> bool {
        match self.mode {
            ClassificationMode::Windowed => duration_secs >= self.threshold_secs,
            ClassificationMode::Legacy => duration_secs > self.threshold_secs,
        }
    }

    /// 对一批通话记录分类（纯函数，不做 I/O）
    pub fn classify(&self, records: &[CallRecord], now: DateTime<Utc>) -> Classification {
        let window_start = self.window_start(now);
        let mut result = Classification::default();

        for record in records {
            if record.status.is_active() {
                if within_window(record.start_time, window_start) {
                    result.in_progress_calls.push(ClassifiedCall::in_progress(record));
                }
                continue;
            }

            if self.mode == ClassificationMode::Windowed
                && (record.status != CallStatus::Completed
                    || !within_window(record.end_time, window_start))
            {
                continue;
            }

            let duration_secs = match record.duration_secs() {
                Ok(Some(secs)) => secs,
                Ok(None) => {
                    if record.status == CallStatus::Completed {
                        warn!(call_id = %record.id, "Skipping completed call without duration");
                    }
                    continue;
                }
                Err(e) => {
                    warn!(call_id = %e.call_id, raw = %e.raw, "Skipping call with unparseable duration");
                    continue;
                }
            };

            if self.is_long(duration_secs) {
                result
                    .long_calls
                    .push(ClassifiedCall::long_completed(record, duration_secs));
            }
        }

        debug!(
            mode = self.mode.as_str(),
            records = records.len(),
            long = result.long_calls.len(),
            in_progress = result.in_progress_calls.len(),
            "Classified call records"
        );

        result
    }
}

impl Default for CallClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// 时间点是否落在窗口内（含起点）；没有窗口时总是成立
fn within_window(time: Option<DateTime<Utc>>, window_start: Option<DateTime<Utc>>) -> bool {
    match window_start {
        None => true,
        Some(start) => time.is_some_and(|t| t >= start),
    }
}

/// 按回看窗口和阈值分类（windowed 模式）
pub fn classify(
    records: &[CallRecord],
    now: DateTime<Utc>,
    lookback: Duration,
    threshold_secs: u64,
) -> Classification {
    CallClassifier::new()
        .with_lookback(lookback)
        .with_threshold_secs(threshold_secs)
        .classify(records, now)
}
