/// Project timelines are expressed in microseconds.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Converts timeline microseconds to seconds for display.
///
/// # Example
/// ```
/// use organizer::time::micros_to_seconds;
///
/// assert_eq!(micros_to_seconds(2_500_000), 2.5);
/// ```
pub fn micros_to_seconds(us: i64) -> f64 {
    us as f64 / MICROS_PER_SECOND as f64
}

/// Current wall-clock time as Unix microseconds.
pub fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}
