//! 错误类型 - 决定进程退出码的运行级错误

use thiserror::Error;

/// 配置错误退出码
pub const EXIT_CONFIG_ERROR: i32 = 2;
/// 运行期错误退出码（拉取失败、严格模式下发送失败）
pub const EXIT_RUNTIME_ERROR: i32 = 1;

/// 一次监控周期中无法在本地恢复的错误
#[derive(Debug, Error)]
pub enum MonitorError {
    /// 缺少必需的环境变量
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    /// 可选配置项取值非法
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    /// HTTP 客户端无法创建
    #[error("failed to create HTTP client for {client}: {cause:#}")]
    Client { client: String, cause: anyhow::Error },

    /// 通话记录拉取失败（网络、认证、限流、超时）
    #[error("failed to fetch calls from {provider}: {cause:#}")]
    Fetch {
        provider: String,
        cause: anyhow::Error,
    },

    /// 邮件发送失败（仅在 fail_on_send_error 开启时上抛）
    #[error("failed to send alert via {channel}: {cause:#}")]
    Send { channel: String, cause: anyhow::Error },
}

impl MonitorError {
    /// 是否为配置类错误
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            MonitorError::MissingConfig(_) | MonitorError::InvalidConfig { .. }
        )
    }

    /// 对应的进程退出码
    pub fn exit_code(&self) -> i32 {
        if self.is_config() {
            EXIT_CONFIG_ERROR
        } else {
            EXIT_RUNTIME_ERROR
        }
    }
}

/// 单条通话记录的时长字段无法解析
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("call {call_id} has unparseable duration {raw:?}")]
pub struct DurationParseError {
    pub call_id: String,
    pub raw: String,
}
