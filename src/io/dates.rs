use chrono::{Datelike, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Trim whitespace + strip outer quotes if present.
fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Lenient date parse for transaction-month style values.
///
/// Accepts plain dates (`2015-03-01`, `2015/03/01`), datetimes with an optional
/// fractional second and `T` or space separator, and month-only values
/// (`2015-03`, `201503`), which map to the first of the month. Returns `None`
/// for anything else so callers can treat it as missing.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = clean_str(raw);
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    parse_year_month(s)
}

/// `YYYY-MM` or `YYYYMM`.
fn parse_year_month(s: &str) -> Option<NaiveDate> {
    if !s.is_ascii() {
        return None;
    }
    let (year, month) = match s.len() {
        7 if &s[4..5] == "-" => (&s[0..4], &s[5..7]),
        6 if s.chars().all(|c| c.is_ascii_digit()) => (&s[0..4], &s[4..6]),
        _ => return None,
    };
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Days since 1970-01-01, the physical representation of a polars `Date`.
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// First day of the month `date` falls in.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month after `date`'s month.
pub fn next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2015-03-01", 2015, 3, 1)]
    #[case("2015/03/01", 2015, 3, 1)]
    #[case("2015-03-01 00:00:00", 2015, 3, 1)]
    #[case("2015-03-17T12:30:00", 2015, 3, 17)]
    #[case("2014-12-01 00:00:00.000", 2014, 12, 1)]
    #[case("\"2015-08-01 00:00:00\"", 2015, 8, 1)]
    #[case("  2015-08-01  ", 2015, 8, 1)]
    #[case("2015-06", 2015, 6, 1)]
    #[case("201506", 2015, 6, 1)]
    fn parses_supported_formats(
        #[case] raw: &str,
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
    ) {
        assert_eq!(
            parse_date(raw),
            Some(NaiveDate::from_ymd_opt(year, month, day).unwrap())
        );
    }

    #[rstest]
    #[case("")]
    #[case("not a date")]
    #[case("2015-13-01")]
    #[case("2015-02-30")]
    #[case("201513")]
    #[case("12345")]
    fn rejects_garbage(#[case] raw: &str) {
        assert_eq!(parse_date(raw), None);
    }

    #[test]
    fn epoch_offset() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(days_since_epoch(epoch), 0);
        let d = NaiveDate::from_ymd_opt(2015, 3, 1).unwrap();
        assert_eq!(days_since_epoch(d), (d - epoch).num_days() as i32);
    }

    #[test]
    fn month_arithmetic() {
        let d = NaiveDate::from_ymd_opt(2014, 12, 17).unwrap();
        assert_eq!(month_start(d), NaiveDate::from_ymd_opt(2014, 12, 1).unwrap());
        assert_eq!(next_month(d), NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
    }
}
