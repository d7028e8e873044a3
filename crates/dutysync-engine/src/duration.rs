//! Rotation length parsing.
//!
//! Durations are written as one or more `<number><unit>` components with an
//! optional leading `+`:
//! - `Nw` — weeks
//! - `Nd` — days (fixed 24h; rotation arithmetic is on absolute time)
//! - `Nh` — hours
//! - `Nm` — minutes
//! - `Ns` — seconds
//!
//! Components can be combined: `1d12h`, `2w`, `+90m`.

use chrono::Duration;

/// Parse a duration string into a [`chrono::Duration`].
///
/// Returns a human-readable reason on failure; callers attach the field name.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let rest = match s.strip_prefix('+') {
        Some(rest) => rest,
        None if s.starts_with('-') => {
            return Err(format!("duration must not be negative: '{s}'"));
        }
        None => s,
    };

    if rest.is_empty() {
        return Err(format!("duration has no components: '{s}'"));
    }

    let mut total_seconds: i64 = 0;
    let mut num_buf = String::new();

    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
            continue;
        }
        if num_buf.is_empty() {
            return Err(format!("expected number before '{ch}' in '{s}'"));
        }
        let n: i64 = num_buf
            .parse()
            .map_err(|_| format!("invalid number in '{s}'"))?;
        num_buf.clear();

        let unit_seconds = match ch {
            'w' | 'W' => 7 * 86_400,
            'd' | 'D' => 86_400,
            'h' | 'H' => 3_600,
            'm' | 'M' => 60,
            's' | 'S' => 1,
            _ => return Err(format!("unknown unit '{ch}' in '{s}'")),
        };
        total_seconds = n
            .checked_mul(unit_seconds)
            .and_then(|secs| total_seconds.checked_add(secs))
            .ok_or_else(|| format!("duration overflows: '{s}'"))?;
    }

    // Trailing number without unit
    if !num_buf.is_empty() {
        return Err(format!("trailing number without unit in '{s}'"));
    }

    Duration::try_seconds(total_seconds).ok_or_else(|| format!("duration out of range: '{s}'"))
}

/// Render a duration in the same compact notation [`parse_duration`] accepts.
pub fn format_duration(d: Duration) -> String {
    let mut secs = d.num_seconds();
    if secs == 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    if secs < 0 {
        out.push('-');
        secs = -secs;
    }
    for (unit, size) in [('w', 7 * 86_400), ('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)] {
        if secs >= size {
            out.push_str(&format!("{}{unit}", secs / size));
            secs %= size;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_days() {
        assert_eq!(parse_duration("7d").unwrap(), Duration::days(7));
    }

    #[test]
    fn test_parse_combined_components() {
        assert_eq!(
            parse_duration("1d12h30m").unwrap(),
            Duration::days(1) + Duration::hours(12) + Duration::minutes(30)
        );
    }

    #[test]
    fn test_parse_weeks_and_leading_plus() {
        assert_eq!(parse_duration("+2w").unwrap(), Duration::weeks(2));
    }

    #[test]
    fn test_parse_uppercase_units() {
        assert_eq!(parse_duration("12H").unwrap(), Duration::hours(12));
    }

    #[test]
    fn test_parse_zero_is_accepted_by_parser() {
        // Positivity is a model rule, not a syntax rule.
        assert_eq!(parse_duration("0d").unwrap(), Duration::zero());
    }

    #[test]
    fn test_parse_rejects_negative() {
        let err = parse_duration("-1d").unwrap_err();
        assert!(err.contains("negative"), "got: {err}");
    }

    #[test]
    fn test_parse_rejects_unknown_unit() {
        let err = parse_duration("3y").unwrap_err();
        assert!(err.contains("unknown unit"), "got: {err}");
    }

    #[test]
    fn test_parse_rejects_trailing_number() {
        let err = parse_duration("1d12").unwrap_err();
        assert!(err.contains("trailing number"), "got: {err}");
    }

    #[test]
    fn test_parse_rejects_empty_and_bare_sign() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("+").is_err());
        assert!(parse_duration("d").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::days(7)), "1w");
        assert_eq!(format_duration(Duration::hours(36)), "1d12h");
        assert_eq!(format_duration(Duration::seconds(90)), "1m30s");
        assert_eq!(format_duration(Duration::zero()), "0s");
    }
}
