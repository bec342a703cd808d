//! 监控周期 - 拉取 → 分类 → 去重 → 组装 → 发送 → 记录状态
//!
//! 状态写入策略：只有非重复且邮件发送成功时才覆盖状态文件，
//! 保证持久化的指纹总是对应"真正发出去的那封告警"。
//! dry-run 和发送失败都不写状态，下一次运行会重新尝试。

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::calls::CallClassifier;
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::notification::{
    AlertComposer, AlertMessage, Mailer, NotificationDeduplicator, StateStore,
};
use crate::provider::CallProvider;

/// 一次监控周期的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 没有需要报告的通话
    NothingToReport,
    /// 与上一次告警相同，已跳过
    DuplicateSuppressed { fingerprint: String },
    /// dry-run：只生成消息，不发送、不写状态
    DryRun { message: AlertMessage },
    /// 已发送
    Sent { status_code: u16, fingerprint: String },
    /// 发送失败（未开启 fail_on_send_error 时不视为运行错误）
    SendFailed { error: String },
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::NothingToReport => write!(f, "nothing to report"),
            CycleOutcome::DuplicateSuppressed { .. } => write!(f, "duplicate suppressed"),
            CycleOutcome::DryRun { .. } => write!(f, "dry run"),
            CycleOutcome::Sent { status_code, .. } => write!(f, "sent ({})", status_code),
            CycleOutcome::SendFailed { .. } => write!(f, "send failed"),
        }
    }
}

/// 通话监控器
pub struct CallMonitor<P, M, S> {
    provider: P,
    mailer: M,
    store: S,
    classifier: CallClassifier,
    composer: AlertComposer,
    deduplicator: NotificationDeduplicator,
    fetch_limit: usize,
    fail_on_send_error: bool,
    dry_run: bool,
}

impl<P, M, S> CallMonitor<P, M, S>
where
    P: CallProvider,
    M: Mailer,
    S: StateStore,
{
    /// 按配置创建监控器
    pub fn new(config: &MonitorConfig, provider: P, mailer: M, store: S) -> Self {
        Self {
            provider,
            mailer,
            store,
            classifier: CallClassifier::new()
                .with_threshold_secs(config.long_call_threshold_secs)
                .with_lookback(config.lookback())
                .with_mode(config.mode),
            composer: AlertComposer::new(config.long_call_threshold_secs),
            deduplicator: NotificationDeduplicator::new(),
            fetch_limit: config.fetch_limit,
            fail_on_send_error: config.fail_on_send_error,
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 设置是否启用去重
    pub fn with_dedup(mut self, enabled: bool) -> Self {
        self.deduplicator = self.deduplicator.with_enabled(enabled);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 执行一次监控周期
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleOutcome, MonitorError> {
        info!(
            provider = self.provider.name(),
            mode = self.classifier.mode().as_str(),
            threshold_secs = self.classifier.threshold_secs(),
            dedup = self.deduplicator.is_enabled(),
            "Starting call monitoring cycle"
        );

        let records = self
            .provider
            .list_recent_calls(self.fetch_limit)
            .await
            .map_err(|e| {
                error!(provider = self.provider.name(), error = %e, "Failed to fetch calls");
                MonitorError::Fetch {
                    provider: self.provider.name().to_string(),
                    cause: e,
                }
            })?;

        let classification = self.classifier.classify(&records, now);
        info!(
            fetched = records.len(),
            long = classification.long_calls.len(),
            in_progress = classification.in_progress_calls.len(),
            reportable = classification.total(),
            "Classified calls"
        );

        if classification.is_empty() {
            info!("No calls to report");
            return Ok(CycleOutcome::NothingToReport);
        }

        let prior = match self.store.read() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Failed to read notification state, treating as first run");
                None
            }
        };

        let dedup = self.deduplicator.check(&classification, prior.as_ref(), now);
        if dedup.duplicate {
            info!(fingerprint = %dedup.fingerprint, "Same calls as last alert, skipping notification");
            return Ok(CycleOutcome::DuplicateSuppressed {
                fingerprint: dedup.fingerprint,
            });
        }

        let Some(message) = self
            .composer
            .compose(&classification.long_calls, &classification.in_progress_calls)
        else {
            return Ok(CycleOutcome::NothingToReport);
        };

        if self.dry_run {
            debug!(fingerprint = %dedup.fingerprint, "Dry run, not sending");
            return Ok(CycleOutcome::DryRun { message });
        }

        match self.mailer.send(&message).await {
            Ok(status_code) => {
                info!(channel = self.mailer.name(), status_code, "Alert sent");
                if let Err(e) = self.store.write(&dedup.new_state) {
                    warn!(error = %e, "Failed to persist notification state");
                }
                Ok(CycleOutcome::Sent {
                    status_code,
                    fingerprint: dedup.fingerprint,
                })
            }
            Err(e) => {
                error!(channel = self.mailer.name(), error = %e, "Failed to send alert");
                if self.fail_on_send_error {
                    Err(MonitorError::Send {
                        channel: self.mailer.name().to_string(),
                        cause: e,
                    })
                } else {
                    Ok(CycleOutcome::SendFailed {
                        error: format!("{:#}", e),
                    })
                }
            }
        }
    }
}
