//! 告警渠道 trait 定义

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// 告警消息（纯文本邮件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// 告警发送渠道
#[allow(async_fn_in_trait)]
pub trait Mailer {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 发送消息，返回服务端状态码
    async fn send(&self, message: &AlertMessage) -> Result<u16>;
}
