use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Parse `"YYYY-MM-DD HH:MM:SS[.ffffff]"` → microseconds since the epoch
/// (naive, no offset applied).
///
/// Also accepts `/` as the date separator, `T` between date and time, and a
/// bare `"YYYY-MM-DD"` (midnight). Optional surrounding quotes are stripped.
pub fn parse_timestamp_micros(s: &str) -> Option<i64> {
    parse_naive(s).map(|dt| dt.and_utc().timestamp_micros())
}

pub fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');
    if !s.is_ascii() {
        return None;
    }
    let b = s.as_bytes();
    // minimal length + separators check
    if b.len() < 10 || !matches!(b[4], b'-' | b'/') || b[7] != b[4] {
        return None;
    }
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[5..7].parse().ok()?;
    let day: u32 = s[8..10].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    if b.len() == 10 {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if b.len() < 19 || !matches!(b[10], b' ' | b'T') || b[13] != b':' || b[16] != b':' {
        return None;
    }
    let hour: u32 = s[11..13].parse().ok()?;
    let min: u32 = s[14..16].parse().ok()?;
    let sec: u32 = s[17..19].parse().ok()?;

    // up to 6 digits of fraction
    let mut micros = 0u32;
    if b.len() > 19 {
        if b[19] != b'.' {
            return None;
        }
        let frac = &b[20..];
        if frac.is_empty() || !frac.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let mut factor = 100_000;
        for d in frac.iter().take(6) {
            micros += (d - b'0') as u32 * factor;
            factor /= 10;
        }
    }

    let time = NaiveTime::from_hms_micro_opt(hour, min, sec, micros)?;
    Some(NaiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_taxi_style_timestamps() {
        let dt = parse_naive("2021-01-01 00:30:10").unwrap();
        assert_eq!(dt.to_string(), "2021-01-01 00:30:10");
        assert_eq!(parse_timestamp_micros("1970-01-01 00:00:01"), Some(1_000_000));
    }

    #[test]
    fn accepts_variants() {
        assert!(parse_naive("2021/01/01 00:30:10").is_some());
        assert!(parse_naive("2021-01-01T00:30:10").is_some());
        assert!(parse_naive("\"2021-01-01 00:30:10\"").is_some());
        assert_eq!(
            parse_timestamp_micros("1970-01-01 00:00:00.25"),
            Some(250_000)
        );
        assert_eq!(parse_timestamp_micros("1970-01-02"), Some(86_400_000_000));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_naive(""), None);
        assert_eq!(parse_naive("N/A"), None);
        assert_eq!(parse_naive("2021-13-01 00:00:00"), None);
        assert_eq!(parse_naive("2021-01-01 25:00:00"), None);
        assert_eq!(parse_naive("2021-01-01 00:00"), None);
        assert_eq!(parse_naive("2021-01/01 00:00:00"), None);
    }
}
