/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Random UUID v4 in its simple (hyphen-less) form, used as document key
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Human-readable order number: `ORD-2026-000042`
pub fn format_order_number(year: i32, seq: u64) -> String {
    format!("ORD-{}-{:06}", year, seq)
}
