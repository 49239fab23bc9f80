use chrono::{TimeZone, Utc};

/// 当前毫秒时间戳
pub fn now_timestamp_mills() -> i64 {
    Utc::now().timestamp_millis()
}

/// 当日（UTC）零点毫秒时间戳，用于日内交易次数/亏损统计
pub fn day_start_mills(timestamp_ms: i64) -> i64 {
    let secs = timestamp_ms / 1000;
    let day_secs = secs - secs.rem_euclid(86_400);
    day_secs * 1000
}

/// 去重时间桶：同一窗口内的时间戳落在同一个桶
pub fn dedup_bucket(timestamp_ms: i64, window_secs: u64) -> i64 {
    let window = window_secs.max(1) as i64;
    (timestamp_ms / 1000) / window
}

pub fn mill_time_to_datetime(timestamp_ms: i64) -> Result<String, String> {
    // 将毫秒级时间戳转换为 DateTime<Utc>
    match Utc.timestamp_millis_opt(timestamp_ms) {
        chrono::LocalResult::Single(datetime) => {
            let formatted_datetime = datetime.format("%Y-%m-%d %H:%M:%S").to_string();
            Ok(formatted_datetime)
        }
        chrono::LocalResult::None => Err("Invalid timestamp: None".to_string()),
        chrono::LocalResult::Ambiguous(_, _) => Err("Invalid timestamp: Ambiguous".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_start_mills() {
        // 2024-06-14 13:29:40 UTC
        let ts = 1_718_371_780_000i64;
        let day_start = day_start_mills(ts);
        assert_eq!(day_start % 86_400_000, 0);
        assert!(ts - day_start < 86_400_000);
    }

    #[test]
    fn test_dedup_bucket_window() {
        let base = 1_718_371_780_000i64;
        assert_eq!(dedup_bucket(base, 60), dedup_bucket(base + 10_000, 60));
        assert_ne!(dedup_bucket(base, 60), dedup_bucket(base + 70_000, 60));
    }
}
