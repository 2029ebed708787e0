// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared human-readable duration formatting and parsing.

use std::time::Duration;

/// Format seconds as a short human-readable duration: `"5s"`, `"2m"`, `"1h30m"`, `"3d"`.
///
/// For the hours range, minutes are included when non-zero (e.g. `"1h"` vs `"1h5m"`).
pub fn format_elapsed(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        if m > 0 {
            format!("{}h{}m", h, m)
        } else {
            format!("{}h", h)
        }
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Format milliseconds as a short human-readable duration.
///
/// Convenience wrapper around [`format_elapsed`].
pub fn format_elapsed_ms(ms: u64) -> String {
    format_elapsed(ms / 1000)
}

/// Parse a duration string like `"30m"`, `"2h"`, `"90s"`, `"1d"`, or a bare
/// number of seconds. Returns `None` for empty, zero, negative, or otherwise
/// malformed input so callers can fall back to their default silently.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => s.split_at(pos),
        None => (s, "s"),
    };

    let value: u64 = digits.parse().ok()?;
    if value == 0 {
        return None;
    }

    let secs = match unit {
        "s" | "sec" | "secs" => value,
        "m" | "min" | "mins" => value.checked_mul(60)?,
        "h" | "hr" | "hrs" => value.checked_mul(3600)?,
        "d" | "day" | "days" => value.checked_mul(86400)?,
        "ms" => return Some(Duration::from_millis(value)),
        _ => return None,
    };

    Some(Duration::from_secs(secs))
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
