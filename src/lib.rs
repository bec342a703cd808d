//! Twilio Call Monitor - 监控长时通话和进行中通话，发送去重后的邮件告警

pub mod calls;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod monitor;
pub mod notification;
pub mod provider;

pub use calls::{
    classify, CallCategory, CallClassifier, CallRecord, CallStatus, Classification,
    ClassificationMode, ClassifiedCall,
};
pub use config::MonitorConfig;
pub use error::{DurationParseError, MonitorError};
pub use lock::RunLock;
pub use monitor::{CallMonitor, CycleOutcome};
pub use notification::{
    AlertComposer, AlertMessage, FileStateStore, Mailer, NotificationDeduplicator,
    NotificationState, StateStore,
};
pub use provider::{CallProvider, TwilioClient};
