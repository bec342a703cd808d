//! SendGrid 邮件渠道
//!
//! 通过 SendGrid v3 Mail Send API 发送纯文本告警邮件

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::notification::channel::{AlertMessage, Mailer};

/// SendGrid API 基础 URL
const SENDGRID_API_URL: &str = "https://api.sendgrid.com";

/// SendGrid 客户端配置
#[derive(Clone)]
pub struct SendGridConfig {
    /// API Key
    pub api_key: String,
    /// 发件人
    pub from_email: String,
    /// 收件人
    pub to_email: String,
    /// API 基础 URL（支持代理）
    pub base_url: String,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for SendGridConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from_email: String::new(),
            to_email: String::new(),
            base_url: SENDGRID_API_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for SendGridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridConfig")
            .field("api_key", &"***")
            .field("from_email", &self.from_email)
            .field("to_email", &self.to_email)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<EmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

/// Mail Send 请求载荷
#[derive(Debug, Serialize)]
struct MailSendPayload<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

/// API 错误响应
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    message: String,
}

/// SendGrid 客户端
#[derive(Debug)]
pub struct SendGridMailer {
    client: Client,
    config: SendGridConfig,
}

impl SendGridMailer {
    /// 创建新的 SendGrid 客户端
    pub fn new(config: SendGridConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!("SendGrid api_key is required"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    fn payload<'a>(&'a self, message: &'a AlertMessage) -> MailSendPayload<'a> {
        MailSendPayload {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: &self.config.to_email,
                }],
            }],
            from: EmailAddress {
                email: &self.config.from_email,
            },
            subject: &message.subject,
            content: vec![Content {
                content_type: "text/plain",
                value: &message.body,
            }],
        }
    }
}

impl Mailer for SendGridMailer {
    fn name(&self) -> &str {
        "sendgrid"
    }

    async fn send(&self, message: &AlertMessage) -> Result<u16> {
        let url = format!("{}/v3/mail/send", self.config.base_url.trim_end_matches('/'));

        debug!(to = %self.config.to_email, subject = %message.subject, "Sending alert email");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(status.as_u16());
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
            if !error_resp.errors.is_empty() {
                let messages: Vec<&str> =
                    error_resp.errors.iter().map(|e| e.message.as_str()).collect();
                return Err(anyhow!("SendGrid error ({}): {}", status, messages.join("; ")));
            }
        }
        Err(anyhow!("SendGrid error ({}): {}", status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SendGridConfig {
        SendGridConfig {
            api_key: "SG.test".to_string(),
            from_email: "monitor@example.com".to_string(),
            to_email: "oncall@example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sendgrid_config_default() {
        let config = SendGridConfig::default();
        assert_eq!(config.base_url, "https://api.sendgrid.com");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_sendgrid_requires_api_key() {
        let result = SendGridMailer::new(SendGridConfig::default());
        assert!(result.unwrap_err().to_string().contains("api_key"));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("SG.test"));
        assert!(rendered.contains("oncall@example.com"));
    }

    #[test]
    fn test_payload_shape() {
        let mailer = SendGridMailer::new(config()).unwrap();
        let message = AlertMessage::new("Twilio Call Monitor Alert", "body text");
        let json = serde_json::to_value(mailer.payload(&message)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "personalizations": [{"to": [{"email": "oncall@example.com"}]}],
                "from": {"email": "monitor@example.com"},
                "subject": "Twilio Call Monitor Alert",
                "content": [{"type": "text/plain", "value": "body text"}]
            })
        );
    }

    #[test]
    fn test_error_response_parsing() {
        let body = r#"{"errors":[{"message":"The from address does not match a verified Sender Identity","field":"from"}]}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].message.contains("Sender Identity"));
    }

    mod http {
        use super::*;
        use wiremock::matchers::{bearer_token, body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn mailer_for(server: &MockServer) -> SendGridMailer {
            SendGridMailer::new(SendGridConfig {
                base_url: server.uri(),
                timeout_secs: 5,
                ..config()
            })
            .unwrap()
        }

        fn message() -> AlertMessage {
            AlertMessage::new("Twilio Call Monitor Alert", "body text")
        }

        #[tokio::test]
        async fn test_send_request_shape() {
            let server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/v3/mail/send"))
                .and(bearer_token("SG.test"))
                .and(header("content-type", "application/json"))
                .and(body_partial_json(serde_json::json!({
                    "personalizations": [{"to": [{"email": "oncall@example.com"}]}],
                    "from": {"email": "monitor@example.com"},
                    "subject": "Twilio Call Monitor Alert"
                })))
                .respond_with(ResponseTemplate::new(202))
                .expect(1)
                .mount(&server)
                .await;

            let status = mailer_for(&server).send(&message()).await.unwrap();
            assert_eq!(status, 202);
        }

        #[tokio::test]
        async fn test_send_error_messages_joined() {
            let server = MockServer::start().await;

            let error_body = serde_json::json!({
                "errors": [
                    {"message": "The from address does not match a verified Sender Identity", "field": "from"},
                    {"message": "Invalid recipient", "field": "personalizations.0.to"}
                ]
            });
            Mock::given(method("POST"))
                .and(path("/v3/mail/send"))
                .respond_with(ResponseTemplate::new(400).set_body_json(&error_body))
                .mount(&server)
                .await;

            let err = mailer_for(&server).send(&message()).await.unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("400"), "got: {}", msg);
            assert!(
                msg.contains("verified Sender Identity; Invalid recipient"),
                "got: {}",
                msg
            );
        }

        #[tokio::test]
        async fn test_send_unstructured_error_body() {
            let server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/v3/mail/send"))
                .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
                .mount(&server)
                .await;

            let err = mailer_for(&server).send(&message()).await.unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("401"), "got: {}", msg);
            assert!(msg.contains("unauthorized"), "got: {}", msg);
        }
    }
}
