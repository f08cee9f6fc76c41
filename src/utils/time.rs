
use chrono::{DateTime, Duration, Local, TimeZone};


/// This is the standard way of showing time left until a reminder in taskbell. Anything that is
/// already due is shown as `Now!`.
pub fn format_remaining(v: Duration) -> String {
    if v <= Duration::zero() {
        "Now!".to_string()
    } else if v.num_hours() > 0 {
        format!(
            "{}h {}m {}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m {}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

/// Formats a reminder moment in the local timezone.
pub fn format_local<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    date.with_timezone(&Local).format("%x %H:%M:%S").to_string()
}
