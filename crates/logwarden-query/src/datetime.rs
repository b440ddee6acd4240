use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Relative offsets before now: `-15m`, `-2h`, `-7d`, `-1w`.
static RELATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-(\d+)([mhdw])$").expect("relative pattern must compile"));

/// Permissive fallback formats, tried in order after the structured
/// parsers. Date-only formats resolve to midnight.
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%b %d %Y %H:%M:%S",
    "%B %d %Y %H:%M:%S",
];
const FALLBACK_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%d %b %Y", "%b %d %Y", "%B %d, %Y"];

/// Parse a timestamp comparand. Values without an explicit zone are
/// assumed UTC. Returns `None` when every stage fails, which drops the
/// enclosing token.
pub(crate) fn parse_instant(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    match s.to_lowercase().as_str() {
        "today" => return midnight(now.date_naive()),
        "yesterday" => return midnight(now.date_naive().pred_opt()?),
        _ => {}
    }

    if let Some(caps) = RELATIVE.captures(s) {
        let n: i64 = caps[1].parse().ok()?;
        let offset = match &caps[2] {
            "m" => Duration::try_minutes(n)?,
            "h" => Duration::try_hours(n)?,
            "d" => Duration::try_days(n)?,
            "w" => Duration::try_days(n.checked_mul(7)?)?,
            _ => unreachable!("pattern only captures mhdw"),
        };
        return now.checked_sub_signed(offset);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return midnight(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return midnight(date);
        }
    }

    None
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 12, 15, 30, 0).unwrap()
    }

    #[test]
    fn today_and_yesterday_are_utc_midnight() {
        let now = fixed_now();
        assert_eq!(
            parse_instant("today", now).unwrap(),
            Utc.with_ymd_and_hms(2025, 8, 12, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_instant("Yesterday", now).unwrap(),
            Utc.with_ymd_and_hms(2025, 8, 11, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn relative_offsets() {
        let now = fixed_now();
        assert_eq!(parse_instant("-15m", now).unwrap(), now - Duration::minutes(15));
        assert_eq!(parse_instant("-2h", now).unwrap(), now - Duration::hours(2));
        assert_eq!(parse_instant("-3d", now).unwrap(), now - Duration::days(3));
        assert_eq!(parse_instant("-1w", now).unwrap(), now - Duration::days(7));
    }

    #[test]
    fn iso_date_and_datetime() {
        let now = fixed_now();
        assert_eq!(
            parse_instant("2025-08-12", now).unwrap(),
            Utc.with_ymd_and_hms(2025, 8, 12, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_instant("2025-08-12T10:20:30Z", now).unwrap(),
            Utc.with_ymd_and_hms(2025, 8, 12, 10, 20, 30).unwrap()
        );
        // Offset-bearing datetimes normalize to UTC
        assert_eq!(
            parse_instant("2025-08-12T10:20:30+02:00", now).unwrap(),
            Utc.with_ymd_and_hms(2025, 8, 12, 8, 20, 30).unwrap()
        );
    }

    #[test]
    fn fallback_formats_assume_utc() {
        let now = fixed_now();
        assert_eq!(
            parse_instant("2025-08-12 10:20", now).unwrap(),
            Utc.with_ymd_and_hms(2025, 8, 12, 10, 20, 0).unwrap()
        );
        assert_eq!(
            parse_instant("2025/08/12", now).unwrap(),
            Utc.with_ymd_and_hms(2025, 8, 12, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn garbage_yields_none() {
        let now = fixed_now();
        assert!(parse_instant("not-a-date", now).is_none());
        assert!(parse_instant("-12x", now).is_none());
        assert!(parse_instant("", now).is_none());
        // Overflow-sized relative offsets drop rather than panic
        assert!(parse_instant("-99999999999999999999m", now).is_none());
    }
}
