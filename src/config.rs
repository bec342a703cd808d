//! 运行配置 - 进程启动时从环境变量构建一次，之后显式传递
//!
//! 必需变量：
//! - `TWILIO_ACCOUNT_SID` / `TWILIO_AUTH_TOKEN`
//! - `SENDGRID_API_KEY`
//! - `NOTIFICATION_EMAIL`（收件人）/ `FROM_EMAIL`（发件人）
//!
//! 可选变量（非法取值视为配置错误）：
//! - `CALL_MONITOR_THRESHOLD_SECS`（默认 600）
//! - `CALL_MONITOR_LOOKBACK_MINUTES`（默认 10）
//! - `CALL_MONITOR_FETCH_LIMIT`（默认 50）
//! - `CALL_MONITOR_MODE`（`windowed` | `legacy`）
//! - `CALL_MONITOR_STATE_FILE`
//! - `CALL_MONITOR_HTTP_TIMEOUT_SECS`（默认 30）
//! - `CALL_MONITOR_FAIL_ON_SEND_ERROR`（默认 false）

use std::path::PathBuf;
use std::str::FromStr;

use crate::calls::classifier::{DEFAULT_LOOKBACK_MINUTES, DEFAULT_THRESHOLD_SECS};
use crate::calls::ClassificationMode;
use crate::error::MonitorError;
use crate::notification::{FileStateStore, SendGridConfig};
use crate::provider::TwilioConfig;

pub const ENV_TWILIO_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const ENV_SENDGRID_API_KEY: &str = "SENDGRID_API_KEY";
pub const ENV_NOTIFICATION_EMAIL: &str = "NOTIFICATION_EMAIL";
pub const ENV_FROM_EMAIL: &str = "FROM_EMAIL";

pub const ENV_THRESHOLD_SECS: &str = "CALL_MONITOR_THRESHOLD_SECS";
pub const ENV_LOOKBACK_MINUTES: &str = "CALL_MONITOR_LOOKBACK_MINUTES";
pub const ENV_FETCH_LIMIT: &str = "CALL_MONITOR_FETCH_LIMIT";
pub const ENV_MODE: &str = "CALL_MONITOR_MODE";
pub const ENV_STATE_FILE: &str = "CALL_MONITOR_STATE_FILE";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "CALL_MONITOR_HTTP_TIMEOUT_SECS";
pub const ENV_FAIL_ON_SEND_ERROR: &str = "CALL_MONITOR_FAIL_ON_SEND_ERROR";

/// 必需的环境变量（按提示顺序）
pub const REQUIRED_ENV_VARS: [&str; 5] = [
    ENV_TWILIO_ACCOUNT_SID,
    ENV_TWILIO_AUTH_TOKEN,
    ENV_SENDGRID_API_KEY,
    ENV_NOTIFICATION_EMAIL,
    ENV_FROM_EMAIL,
];

/// 默认单次拉取条数
pub const DEFAULT_FETCH_LIMIT: usize = 50;

/// 回看窗口上限（一年）
const MAX_LOOKBACK_MINUTES: u64 = 60 * 24 * 365;

/// 默认 HTTP 超时（秒）
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// 凭据和收发件地址
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub sendgrid_api_key: String,
    pub notification_email: String,
    pub from_email: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("twilio_account_sid", &self.twilio_account_sid)
            .field("twilio_auth_token", &"***")
            .field("sendgrid_api_key", &"***")
            .field("notification_email", &self.notification_email)
            .field("from_email", &self.from_email)
            .finish()
    }
}

/// 监控运行配置
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub credentials: Credentials,
    /// 长时通话阈值（秒，含边界）
    pub long_call_threshold_secs: u64,
    /// 回看窗口（分钟）
    pub lookback_minutes: u64,
    /// 单次拉取的通话条数
    pub fetch_limit: usize,
    pub mode: ClassificationMode,
    /// 去重状态文件
    pub state_file: PathBuf,
    /// 拉取和发送的 HTTP 超时（秒）
    pub http_timeout_secs: u64,
    /// 邮件发送失败时是否以非零退出
    pub fail_on_send_error: bool,
}

impl MonitorConfig {
    /// 从进程环境变量加载
    pub fn from_env() -> Result<Self, MonitorError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载（便于测试）
    ///
    /// 所有缺失的必需变量一次性报告
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = REQUIRED_ENV_VARS
            .iter()
            .filter(|key| get(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MonitorError::MissingConfig(missing));
        }

        let required = |key: &str| get(key).unwrap_or_default();
        let credentials = Credentials {
            twilio_account_sid: required(ENV_TWILIO_ACCOUNT_SID),
            twilio_auth_token: required(ENV_TWILIO_AUTH_TOKEN),
            sendgrid_api_key: required(ENV_SENDGRID_API_KEY),
            notification_email: required(ENV_NOTIFICATION_EMAIL),
            from_email: required(ENV_FROM_EMAIL),
        };

        let long_call_threshold_secs =
            parse_optional(ENV_THRESHOLD_SECS, get(ENV_THRESHOLD_SECS))?
                .unwrap_or(DEFAULT_THRESHOLD_SECS);
        let lookback_minutes = parse_optional(ENV_LOOKBACK_MINUTES, get(ENV_LOOKBACK_MINUTES))?
            .unwrap_or(DEFAULT_LOOKBACK_MINUTES as u64);
        let fetch_limit: usize =
            parse_optional(ENV_FETCH_LIMIT, get(ENV_FETCH_LIMIT))?.unwrap_or(DEFAULT_FETCH_LIMIT);
        require_positive(ENV_FETCH_LIMIT, fetch_limit as u64)?;
        let mode = parse_optional(ENV_MODE, get(ENV_MODE))?.unwrap_or_default();
        let http_timeout_secs = parse_optional(ENV_HTTP_TIMEOUT_SECS, get(ENV_HTTP_TIMEOUT_SECS))?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        // 0 秒超时会让每个请求立即失败
        require_positive(ENV_HTTP_TIMEOUT_SECS, http_timeout_secs)?;
        let fail_on_send_error = match get(ENV_FAIL_ON_SEND_ERROR) {
            Some(value) => parse_bool(ENV_FAIL_ON_SEND_ERROR, &value)?,
            None => false,
        };
        let state_file = get(ENV_STATE_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(FileStateStore::default_path);

        Ok(Self {
            credentials,
            long_call_threshold_secs,
            lookback_minutes,
            fetch_limit,
            mode,
            state_file,
            http_timeout_secs,
            fail_on_send_error,
        })
    }

    /// 回看窗口
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lookback_minutes.min(MAX_LOOKBACK_MINUTES) as i64)
    }

    /// 运行锁文件（与状态文件同目录）
    pub fn lock_path(&self) -> PathBuf {
        self.state_file.with_extension("lock")
    }

    pub fn twilio_config(&self) -> TwilioConfig {
        TwilioConfig {
            account_sid: self.credentials.twilio_account_sid.clone(),
            auth_token: self.credentials.twilio_auth_token.clone(),
            timeout_secs: self.http_timeout_secs,
            ..Default::default()
        }
    }

    pub fn sendgrid_config(&self) -> SendGridConfig {
        SendGridConfig {
            api_key: self.credentials.sendgrid_api_key.clone(),
            from_email: self.credentials.from_email.clone(),
            to_email: self.credentials.notification_email.clone(),
            timeout_secs: self.http_timeout_secs,
            ..Default::default()
        }
    }
}

/// 状态文件路径：环境变量优先，否则默认路径（不要求凭据）
pub fn state_file_from_env() -> PathBuf {
    std::env::var(ENV_STATE_FILE)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(FileStateStore::default_path)
}

fn require_positive(key: &str, value: u64) -> Result<(), MonitorError> {
    if value == 0 {
        return Err(MonitorError::InvalidConfig {
            key: key.to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn parse_optional<T>(key: &str, value: Option<String>) -> Result<Option<T>, MonitorError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| MonitorError::InvalidConfig {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, MonitorError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MonitorError::InvalidConfig {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
