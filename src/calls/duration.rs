//! 通话时长格式化

/// 尚未结束（没有时长）的通话显示文本
pub const IN_PROGRESS_LABEL: &str = "In progress";

/// 将秒数格式化为可读时长
///
/// - `None` → `"In progress"`
/// - 有小时: `"1h 2m 3s"`
/// - 有分钟: `"2m 3s"`
/// - 否则: `"3s"`
pub fn format_duration(seconds: Option<u64>) -> String {
    let Some(total) = seconds else {
        return IN_PROGRESS_LABEL.to_string();
    };

    let (minutes, secs) = (total / 60, total % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_is_in_progress() {
        assert_eq!(format_duration(None), "In progress");
    }

    #[test]
    fn test_seconds_only() {
        assert_eq!(format_duration(Some(0)), "0s");
        assert_eq!(format_duration(Some(59)), "59s");
    }

    #[test]
    fn test_minutes_and_seconds() {
        assert_eq!(format_duration(Some(60)), "1m 0s");
        assert_eq!(format_duration(Some(700)), "11m 40s");
    }

    #[test]
    fn test_hours_keep_zero_minutes() {
        assert_eq!(format_duration(Some(3600)), "1h 0m 0s");
        assert_eq!(format_duration(Some(3723)), "1h 2m 3s");
    }
}
