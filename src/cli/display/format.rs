//! ID, time, and truncation formatters for CLI output.

use chrono::{DateTime, Utc};

/// Return first 8 chars of a UUID string for list display.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Format a DateTime relative to now ("5 minutes ago", "3 days ago").
pub fn relative_time(dt: &DateTime<Utc>) -> String {
    relative_time_from(dt, Utc::now())
}

fn relative_time_from(dt: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - *dt).num_seconds();
    if secs < 0 {
        return "just now".to_string();
    }
    let (n, unit) = match secs {
        0..=59 => return "just now".to_string(),
        60..=3_599 => (secs / 60, "minute"),
        3_600..=86_399 => (secs / 3_600, "hour"),
        86_400..=2_591_999 => (secs / 86_400, "day"),
        _ => return dt.format("%Y-%m-%d").to_string(),
    };
    format!("{} ago", count_label(n as usize, unit, &format!("{unit}s")))
}

/// Truncate a string with unicode ellipsis, counting characters.
pub fn truncate_ellipsis(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}\u{2026}")
    }
}

/// Format a count with label: "3 findings", "1 finding".
pub fn count_label(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// Hours with one decimal, dropping a trailing ".0".
pub fn format_hours(hours: f64) -> String {
    let rounded = (hours * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}h")
    } else {
        format!("{rounded:.1}h")
    }
}

pub fn format_elapsed(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1_000)
    }
}
