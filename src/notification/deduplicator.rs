//! 通知去重器 - 防止同一批通话反复告警
//!
//! cron 每次运行都会看到窗口内相同的通话，若结果集没有变化，
//! 不应重复发送邮件。
//!
//! ## 去重策略
//! 1. 对分类结果计算指纹（排序后哈希，与拉取顺序无关）
//! 2. 与上一次持久化的指纹比较，版本和哈希都相同才视为重复
//! 3. 无论结论如何都计算新状态，是否写入由调用方决定

use chrono::{DateTime, Utc};
use tracing::debug;

use super::fingerprint::{generate_fingerprint, FINGERPRINT_VERSION};
use super::store::NotificationState;
use crate::calls::{Classification, ClassifiedCall};

/// 去重判断结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupOutcome {
    /// 是否与上一次告警重复
    pub duplicate: bool,
    /// 本次指纹
    pub fingerprint: String,
    /// 本次应持久化的状态
    pub new_state: NotificationState,
}

/// 通知去重器
#[derive(Debug, Clone)]
pub struct NotificationDeduplicator {
    /// 关闭后永远不判定为重复（仍然计算新状态）
    enabled: bool,
}

impl NotificationDeduplicator {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    /// 设置是否启用去重
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 判断本次结果是否与上一次告警重复
    pub fn is_duplicate(
        &self,
        long_calls: &[ClassifiedCall],
        in_progress_calls: &[ClassifiedCall],
        prior: Option<&NotificationState>,
        now: DateTime<Utc>,
    ) -> DedupOutcome {
        let fingerprint = generate_fingerprint(long_calls, in_progress_calls);

        let duplicate = self.enabled
            && prior.is_some_and(|state| {
                state.fingerprint_version == FINGERPRINT_VERSION && state.hash == fingerprint
            });

        if duplicate {
            debug!(fingerprint = %fingerprint, "Notification deduplicated (same call set as last alert)");
        }

        let new_state = NotificationState::new(
            fingerprint.clone(),
            now,
            long_calls.len(),
            in_progress_calls.len(),
        );

        DedupOutcome {
            duplicate,
            fingerprint,
            new_state,
        }
    }

    /// [`Self::is_duplicate`] 的便捷版本
    pub fn check(
        &self,
        classification: &Classification,
        prior: Option<&NotificationState>,
        now: DateTime<Utc>,
    ) -> DedupOutcome {
        self.is_duplicate(
            &classification.long_calls,
            &classification.in_progress_calls,
            prior,
            now,
        )
    }
}

impl Default for NotificationDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::{classify, CallRecord};
    use crate::notification::fingerprint::hash_content;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn long_call(id: &str, duration: &str) -> Classification {
        let record = CallRecord::new(id, "completed")
            .with_end_time(now() - Duration::minutes(1))
            .with_duration(duration);
        classify(&[record], now(), Duration::minutes(10), 600)
    }

    #[test]
    fn test_first_cycle_is_not_duplicate() {
        let dedup = NotificationDeduplicator::new();
        let outcome = dedup.check(&long_call("A", "700"), None, now());

        assert!(!outcome.duplicate);
        assert_eq!(outcome.fingerprint, hash_content("A:700"));
        assert_eq!(outcome.new_state.hash, outcome.fingerprint);
        assert_eq!(outcome.new_state.long_calls_count, 1);
        assert_eq!(outcome.new_state.in_progress_calls_count, 0);
        assert_eq!(outcome.new_state.time, now());
    }

    #[test]
    fn test_second_identical_cycle_is_duplicate() {
        let dedup = NotificationDeduplicator::new();
        let calls = long_call("A", "700");

        let first = dedup.check(&calls, None, now());
        let second = dedup.check(&calls, Some(&first.new_state), now() + Duration::minutes(1));

        assert!(second.duplicate);
        assert_eq!(second.fingerprint, first.fingerprint);
    }

    #[test]
    fn test_changed_call_set_is_not_duplicate() {
        let dedup = NotificationDeduplicator::new();
        let first = dedup.check(&long_call("A", "700"), None, now());
        let second = dedup.check(&long_call("A", "760"), Some(&first.new_state), now());
        assert!(!second.duplicate);
    }

    #[test]
    fn test_older_fingerprint_version_is_not_duplicate() {
        let dedup = NotificationDeduplicator::new();
        let calls = long_call("A", "700");
        let mut prior = dedup.check(&calls, None, now()).new_state;
        prior.fingerprint_version = 0;

        assert!(!dedup.check(&calls, Some(&prior), now()).duplicate);
    }

    #[test]
    fn test_disabled_never_duplicate_but_still_builds_state() {
        let dedup = NotificationDeduplicator::new().with_enabled(false);
        let calls = long_call("A", "700");
        let first = dedup.check(&calls, None, now());
        let second = dedup.check(&calls, Some(&first.new_state), now());

        assert!(!second.duplicate);
        assert_eq!(second.new_state.hash, first.new_state.hash);
    }
}
