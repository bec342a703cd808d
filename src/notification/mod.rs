//! 通知层 - 指纹去重、状态存储、消息组装和发送渠道
//!
//! # 流程
//! 1. `NotificationDeduplicator` 计算分类结果的指纹并与 `StateStore` 中的上次状态比较
//! 2. 非重复时由 `AlertComposer` 组装纯文本消息
//! 3. 通过实现了 `Mailer` trait 的渠道发送（默认 SendGrid）
//!
//! # 使用示例
//! ```ignore
//! use call_monitor::notification::{AlertComposer, NotificationDeduplicator};
//!
//! let outcome = NotificationDeduplicator::new().check(&classification, prior.as_ref(), now);
//! if !outcome.duplicate {
//!     let message = AlertComposer::new(600).compose(&long, &in_progress);
//! }
//! ```

pub mod channel;
pub mod channels;
pub mod composer;
pub mod deduplicator;
pub mod fingerprint;
pub mod store;

pub use channel::{AlertMessage, Mailer};
pub use channels::{SendGridConfig, SendGridMailer};
pub use composer::{AlertComposer, ALERT_SUBJECT};
pub use deduplicator::{DedupOutcome, NotificationDeduplicator};
pub use fingerprint::{generate_fingerprint, FINGERPRINT_VERSION};
pub use store::{FileStateStore, NotificationState, StateStore};
