use chrono::{DateTime, TimeZone, Utc};
use tokio::time::Instant;

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn get_instant() -> Instant {
    Instant::now()
}

/// Millisecond timestamp as UTC date, `None` when out of chrono's range
pub fn ms_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
