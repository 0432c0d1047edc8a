use chrono::{DateTime, Duration, Utc};

pub struct TimeParser;

impl TimeParser {
    /// Parse an expiration time. Accepted forms:
    /// - RFC3339: `2030-10-01T12:00:00Z`
    /// - relative to now: `1d`, `2w`, `3mo`, `1y`, `1h30m`, `2d12h`
    pub fn parse_expire_time(input: &str) -> Result<DateTime<Utc>, String> {
        Self::parse_expire_time_from(input, Utc::now())
    }

    pub fn parse_expire_time_from(
        input: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, String> {
        let input = input.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        let duration = Self::parse_duration(input)?;
        now.checked_add_signed(duration)
            .ok_or_else(|| "expiration time is out of range".to_string())
    }

    /// Parse a compound duration such as `1d2h30m`.
    pub fn parse_duration(input: &str) -> Result<Duration, String> {
        let mut total = Duration::zero();
        let mut remaining = input.trim();

        if remaining.is_empty() {
            return Err("empty duration".to_string());
        }

        while !remaining.is_empty() {
            let digits = remaining
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(remaining.len());
            if digits == 0 {
                return Err(format!("invalid time format: '{}'", input));
            }
            let num: i64 = remaining[..digits]
                .parse()
                .map_err(|_| format!("invalid number: '{}'", &remaining[..digits]))?;
            remaining = &remaining[digits..];

            let unit_len = remaining
                .find(|c: char| !c.is_alphabetic())
                .unwrap_or(remaining.len());
            if unit_len == 0 {
                return Err(format!("missing time unit after '{}'", num));
            }
            let unit = &remaining[..unit_len];
            remaining = &remaining[unit_len..];

            // "M" 与 "m" 区分大小写：月 / 分钟
            let duration = match unit {
                "s" | "sec" | "second" | "seconds" => Duration::try_seconds(num),
                "m" | "min" | "minute" | "minutes" => Duration::try_minutes(num),
                "h" | "hour" | "hours" => Duration::try_hours(num),
                "d" | "day" | "days" => Duration::try_days(num),
                "w" | "week" | "weeks" => Duration::try_weeks(num),
                "M" | "mo" | "month" | "months" => num.checked_mul(30).and_then(Duration::try_days),
                "y" | "year" | "years" => num.checked_mul(365).and_then(Duration::try_days),
                _ => return Err(format!("unsupported time unit: '{}'", unit)),
            }
            .ok_or_else(|| format!("duration out of range: '{}'", input))?;

            total = total
                .checked_add(&duration)
                .ok_or_else(|| format!("duration out of range: '{}'", input))?;
        }

        if total == Duration::zero() {
            return Err("duration must not be zero".to_string());
        }
        Ok(total)
    }
}
