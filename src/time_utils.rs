// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Convert a chrono duration to a cookie max-age, clamping negatives to zero.
pub fn cookie_max_age(duration: chrono::Duration) -> time::Duration {
    time::Duration::seconds(duration.num_seconds().max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_utc_rfc3339() {
        let date = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2026-03-01T12:30:05Z");
    }

    #[test]
    fn test_cookie_max_age_clamps() {
        assert_eq!(
            cookie_max_age(chrono::Duration::minutes(15)),
            time::Duration::seconds(900)
        );
        assert_eq!(
            cookie_max_age(chrono::Duration::seconds(-5)),
            time::Duration::ZERO
        );
    }
}
