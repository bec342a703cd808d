//! 通话记录来源

pub mod twilio;

use anyhow::Result;

use crate::calls::CallRecord;

pub use twilio::{TwilioClient, TwilioConfig};

/// 通话记录提供方
#[allow(async_fn_in_trait)]
pub trait CallProvider {
    /// 提供方名称（用于日志）
    fn name(&self) -> &str;

    /// 拉取最近的通话记录（最多 `limit` 条，新的在前）
    async fn list_recent_calls(&self, limit: usize) -> Result<Vec<CallRecord>>;
}
