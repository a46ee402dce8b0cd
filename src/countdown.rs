use chrono::{DateTime, Utc};

/// Render the time left until `next_sync_at` as `HH:MM:SS`.
///
/// Returns `"Now"` once the deadline has passed. Every field is floored
/// from the millisecond delta; hours are not wrapped, so anything past
/// 99 hours prints the full hour count.
pub fn format_countdown(next_sync_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta_ms = (next_sync_at - now).num_milliseconds();
    if delta_ms <= 0 {
        return "Now".to_string();
    }

    let total_secs = delta_ms / 1_000;
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
