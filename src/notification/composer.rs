//! 告警消息组装 - 将分类结果渲染为纯文本邮件

use super::channel::AlertMessage;
use crate::calls::classifier::DEFAULT_THRESHOLD_SECS;
use crate::calls::ClassifiedCall;

/// 邮件标题
pub const ALERT_SUBJECT: &str = "Twilio Call Monitor Alert";

const HEADER: &str = "Twilio Call Monitor has detected the following calls:\n";
const FOOTER: &str = "This is an automated notification from Twilio Call Monitor.";

/// 告警消息组装器
#[derive(Debug, Clone)]
pub struct AlertComposer {
    /// 长时通话阈值（秒），用于段落标题
    threshold_secs: u64,
}

impl AlertComposer {
    pub fn new(threshold_secs: u64) -> Self {
        Self { threshold_secs }
    }

    /// 组装告警消息
    ///
    /// 两个列表都为空时返回 `None`，表示不需要发送
    pub fn compose(
        &self,
        long_calls: &[ClassifiedCall],
        in_progress_calls: &[ClassifiedCall],
    ) -> Option<AlertMessage> {
        if long_calls.is_empty() && in_progress_calls.is_empty() {
            return None;
        }

        let mut lines: Vec<String> = vec![HEADER.to_string()];

        if !long_calls.is_empty() {
            lines.push(format!(
                "🔴 Calls longer than {}:",
                threshold_label(self.threshold_secs)
            ));
            for call in long_calls {
                lines.push(format!("  • From: {}", call.from));
                lines.push(format!("    To: {}", call.to));
                lines.push(format!("    Duration: {}", call.display_duration));
                lines.push(format!("    Started: {}", call.start_label()));
                lines.push(String::new());
            }
        }

        if !in_progress_calls.is_empty() {
            lines.push("🟡 Calls currently in progress:".to_string());
            for call in in_progress_calls {
                lines.push(format!("  • From: {}", call.from));
                lines.push(format!("    To: {}", call.to));
                lines.push(format!("    Started: {}", call.start_label()));
                lines.push(format!("    Status: {}", call.status));
                lines.push(String::new());
            }
        }

        lines.push(FOOTER.to_string());

        Some(AlertMessage::new(ALERT_SUBJECT, lines.join("\n")))
    }
}

impl Default for AlertComposer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_SECS)
    }
}

/// 阈值的可读形式："10 minutes"、"1 minute"、"90 seconds"
fn threshold_label(secs: u64) -> String {
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        if minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{} minutes", minutes)
        }
    } else if secs == 1 {
        "1 second".to_string()
    } else {
        format!("{} seconds", secs)
    }
}
