//! Twilio REST 客户端 - 拉取账户的最近通话
//!
//! `GET /2010-04-01/Accounts/{AccountSid}/Calls.json?PageSize=N`，HTTP Basic 认证。
//! 时间字段是 RFC 2822 格式，`duration` 在通话结束前为 null，结束后为字符串。

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, warn};

use super::CallProvider;
use crate::calls::CallRecord;

/// Twilio API 基础 URL
const TWILIO_API_URL: &str = "https://api.twilio.com";

/// Twilio 单页最大条数
const MAX_PAGE_SIZE: usize = 1000;

/// Twilio 客户端配置
#[derive(Clone)]
pub struct TwilioConfig {
    /// Account SID
    pub account_sid: String,
    /// Auth Token
    pub auth_token: String,
    /// API 基础 URL（支持代理）
    pub base_url: String,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            base_url: TWILIO_API_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Calls 列表响应
#[derive(Debug, Deserialize)]
struct CallsPage {
    #[serde(default)]
    calls: Vec<TwilioCall>,
}

/// Twilio 返回的单条通话
#[derive(Debug, Deserialize)]
struct TwilioCall {
    sid: String,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    from_formatted: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    to_formatted: Option<String>,
    status: String,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_duration")]
    duration: Option<String>,
}

impl TwilioCall {
    fn into_record(self) -> CallRecord {
        let start_time = parse_twilio_time(&self.sid, "start_time", self.start_time.as_deref());
        let end_time = parse_twilio_time(&self.sid, "end_time", self.end_time.as_deref());

        CallRecord {
            from: non_empty(self.from_formatted)
                .or_else(|| non_empty(self.from))
                .unwrap_or_default(),
            to: non_empty(self.to_formatted)
                .or_else(|| non_empty(self.to))
                .unwrap_or_default(),
            status: self.status.into(),
            start_time,
            end_time,
            duration: self.duration,
            id: self.sid,
        }
    }
}

/// API 错误响应
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
    #[serde(default)]
    code: Option<u32>,
}

/// `duration` 可能是字符串、数字或 null，统一保留为原始字符串
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// 解析 RFC 2822 时间，失败时记录告警并视为缺失
fn parse_twilio_time(sid: &str, field: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match DateTime::parse_from_rfc2822(raw) {
        Ok(time) => Some(time.with_timezone(&Utc)),
        Err(e) => {
            warn!(call_id = %sid, field, raw, error = %e, "Ignoring unparseable call timestamp");
            None
        }
    }
}

/// 解析 Calls 列表响应体
fn parse_calls_page(body: &str) -> Result<Vec<CallRecord>> {
    let page: CallsPage =
        serde_json::from_str(body).map_err(|e| anyhow!("Failed to parse calls response: {}", e))?;
    Ok(page.calls.into_iter().map(TwilioCall::into_record).collect())
}

/// Twilio 客户端
#[derive(Debug)]
pub struct TwilioClient {
    client: Client,
    config: TwilioConfig,
}

impl TwilioClient {
    /// 创建新的 Twilio 客户端
    pub fn new(config: TwilioConfig) -> Result<Self> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(anyhow!("Twilio account_sid and auth_token are required"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

impl CallProvider for TwilioClient {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn list_recent_calls(&self, limit: usize) -> Result<Vec<CallRecord>> {
        let page_size = limit.clamp(1, MAX_PAGE_SIZE);
        debug!(page_size, "Fetching recent calls from Twilio");

        let start = std::time::Instant::now();
        let response = self
            .client
            .get(self.calls_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .query(&[("PageSize", page_size)])
            .send()
            .await
            .map_err(|e| {
                anyhow!("Request failed after {}ms: {}", start.elapsed().as_millis(), e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response: {}", e))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(match error_resp.code {
                    Some(code) => anyhow!(
                        "Twilio error ({}, code {}): {}",
                        status,
                        code,
                        error_resp.message
                    ),
                    None => anyhow!("Twilio error ({}): {}", status, error_resp.message),
                });
            }
            return Err(anyhow!("Twilio error ({}): {}", status, body));
        }

        let mut records = parse_calls_page(&body)?;
        records.truncate(limit);
        debug!(count = records.len(), elapsed_ms = start.elapsed().as_millis(), "Fetched calls");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::CallStatus;
    use chrono::TimeZone;

    const SAMPLE_PAGE: &str = r#"{
        "calls": [
            {
                "sid": "CA0001",
                "from": "+15550100001",
                "from_formatted": "(555) 010-0001",
                "to": "+15550100002",
                "to_formatted": "(555) 010-0002",
                "status": "completed",
                "start_time": "Sun, 01 Jun 2025 11:47:00 +0000",
                "end_time": "Sun, 01 Jun 2025 11:58:40 +0000",
                "duration": "700"
            },
            {
                "sid": "CA0002",
                "from": "+15550100003",
                "from_formatted": "",
                "to": "+15550100004",
                "to_formatted": null,
                "status": "in-progress",
                "start_time": "Sun, 01 Jun 2025 11:58:00 +0000",
                "end_time": null,
                "duration": null
            },
            {
                "sid": "CA0003",
                "status": "queued",
                "start_time": null
            }
        ],
        "page_size": 50
    }"#;

    #[test]
    fn test_twilio_config_default() {
        let config = TwilioConfig::default();
        assert_eq!(config.base_url, "https://api.twilio.com");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_twilio_client_requires_credentials() {
        let result = TwilioClient::new(TwilioConfig {
            account_sid: "AC123".to_string(),
            ..Default::default()
        });
        assert!(result.unwrap_err().to_string().contains("auth_token"));
    }

    #[test]
    fn test_debug_hides_auth_token() {
        let config = TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "secret-token".to_string(),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("AC123"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn test_calls_url() {
        let client = TwilioClient::new(TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            base_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.calls_url(),
            "http://localhost:8080/2010-04-01/Accounts/AC123/Calls.json"
        );
    }

    #[test]
    fn test_parse_calls_page() {
        let records = parse_calls_page(SAMPLE_PAGE).unwrap();
        assert_eq!(records.len(), 3);

        let completed = &records[0];
        assert_eq!(completed.id, "CA0001");
        assert_eq!(completed.from, "(555) 010-0001");
        assert_eq!(completed.to, "(555) 010-0002");
        assert_eq!(completed.status, CallStatus::Completed);
        assert_eq!(
            completed.start_time,
            Some(Utc.with_ymd_and_hms(2025, 6, 1, 11, 47, 0).unwrap())
        );
        assert_eq!(completed.duration_secs(), Ok(Some(700)));

        // 格式化号码缺失时回退到原始号码
        let active = &records[1];
        assert_eq!(active.from, "+15550100003");
        assert_eq!(active.to, "+15550100004");
        assert_eq!(active.status, CallStatus::InProgress);
        assert_eq!(active.end_time, None);
        assert_eq!(active.duration, None);

        let queued = &records[2];
        assert_eq!(queued.from, "");
        assert_eq!(queued.start_time, None);
    }

    #[test]
    fn test_numeric_duration_kept_as_string() {
        let body = r#"{"calls":[{"sid":"CA9","status":"completed","duration":615}]}"#;
        let records = parse_calls_page(body).unwrap();
        assert_eq!(records[0].duration.as_deref(), Some("615"));
    }

    #[test]
    fn test_bad_timestamp_becomes_none() {
        let body = r#"{"calls":[{"sid":"CA9","status":"completed","end_time":"yesterday"}]}"#;
        let records = parse_calls_page(body).unwrap();
        assert_eq!(records[0].end_time, None);
    }

    #[test]
    fn test_invalid_body_is_error() {
        assert!(parse_calls_page("<html>").is_err());
    }

    mod http {
        use super::*;
        use wiremock::matchers::{basic_auth, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const CALLS_PATH: &str = "/2010-04-01/Accounts/AC123/Calls.json";

        fn client_for(server: &MockServer) -> TwilioClient {
            TwilioClient::new(TwilioConfig {
                account_sid: "AC123".to_string(),
                auth_token: "token".to_string(),
                base_url: server.uri(),
                timeout_secs: 5,
            })
            .unwrap()
        }

        #[tokio::test]
        async fn test_list_recent_calls_request_shape() {
            let server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path(CALLS_PATH))
                .and(basic_auth("AC123", "token"))
                .and(query_param("PageSize", "2"))
                .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_PAGE))
                .expect(1)
                .mount(&server)
                .await;

            let records = client_for(&server).list_recent_calls(2).await.unwrap();

            // 服务端多返回的记录被截断
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].id, "CA0001");
            assert_eq!(records[1].status, CallStatus::InProgress);
        }

        #[tokio::test]
        async fn test_page_size_clamped_to_twilio_maximum() {
            let server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path(CALLS_PATH))
                .and(query_param("PageSize", "1000"))
                .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"calls":[]}"#))
                .expect(1)
                .mount(&server)
                .await;

            let records = client_for(&server).list_recent_calls(5000).await.unwrap();
            assert!(records.is_empty());
        }

        #[tokio::test]
        async fn test_unauthorized_error_body() {
            let server = MockServer::start().await;

            let error_body = serde_json::json!({
                "code": 20003,
                "message": "Authenticate",
                "more_info": "https://www.twilio.com/docs/errors/20003",
                "status": 401
            });
            Mock::given(method("GET"))
                .and(path(CALLS_PATH))
                .respond_with(ResponseTemplate::new(401).set_body_json(&error_body))
                .mount(&server)
                .await;

            let err = client_for(&server).list_recent_calls(50).await.unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("401"), "got: {}", msg);
            assert!(msg.contains("code 20003"), "got: {}", msg);
            assert!(msg.contains("Authenticate"), "got: {}", msg);
        }

        #[tokio::test]
        async fn test_non_json_error_body_kept() {
            let server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path(CALLS_PATH))
                .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
                .mount(&server)
                .await;

            let err = client_for(&server).list_recent_calls(50).await.unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("503"), "got: {}", msg);
            assert!(msg.contains("upstream unavailable"), "got: {}", msg);
        }
    }
}
