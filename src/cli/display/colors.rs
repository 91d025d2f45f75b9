//! Status, score and severity styling for CLI output.
//!
//! Styling goes through `console`, which drops ANSI codes when stdout is not
//! a terminal or `NO_COLOR` is set.

use console::{style, StyledObject};

/// Returns a styled string for analysis and persona status values.
///
/// Color scheme:
/// - Green:  completed
/// - Yellow: analyzing, preparing
/// - Blue:   waiting, idle
/// - Red:    error
/// - Dim:    cancelled, disabled
pub fn colorize_status(status: &str) -> StyledObject<&str> {
    match status.to_lowercase().as_str() {
        "completed" | "enabled" => style(status).green().bold(),
        "analyzing" | "preparing" => style(status).yellow(),
        "waiting" | "idle" => style(status).blue(),
        "error" => style(status).red().bold(),
        "cancelled" | "disabled" => style(status).dim(),
        _ => style(status).white(),
    }
}

/// Score colored by band: 80+ green, 60+ yellow, 40+ orange-ish, else red.
pub fn colorize_score(score: u8) -> StyledObject<String> {
    let text = score.to_string();
    match score {
        80..=u8::MAX => style(text).green().bold(),
        60..=79 => style(text).yellow(),
        40..=59 => style(text).color256(208),
        _ => style(text).red().bold(),
    }
}

pub fn colorize_severity(severity: &str) -> StyledObject<&str> {
    match severity {
        "high" => style(severity).red().bold(),
        "medium" => style(severity).yellow(),
        _ => style(severity).dim(),
    }
}

/// Signed score delta, green when improving.
pub fn colorize_delta(delta: i16) -> StyledObject<String> {
    match delta {
        d if d > 0 => style(format!("+{d}")).green(),
        d if d < 0 => style(d.to_string()).red(),
        _ => style("0".to_string()).dim(),
    }
}

/// Styled label for detail views (bold + dimmed colon).
pub fn label(name: &str) -> String {
    format!("{}{}", style(name).bold(), style(":").dim())
}

/// Section header with underline.
pub fn section_header(title: &str) -> String {
    format!("\n{}", style(title).bold().underlined())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styling_keeps_text() {
        console::set_colors_enabled(false);
        assert_eq!(colorize_status("completed").to_string(), "completed");
        assert_eq!(colorize_score(72).to_string(), "72");
        assert_eq!(colorize_delta(5).to_string(), "+5");
        assert_eq!(colorize_delta(-3).to_string(), "-3");
        assert_eq!(colorize_delta(0).to_string(), "0");
        assert_eq!(label("URL"), "URL:");
    }
}
