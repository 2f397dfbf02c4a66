use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Integral values print without a fractional part: 201, not 201.0.
pub fn number_text(val: f64) -> String {
    if val.fract() == 0.0 && val.abs() < 1e15 {
        format!("{}", val as i64)
    } else {
        format!("{val}")
    }
}

pub fn date_text(val: &NaiveDateTime) -> String {
    val.format("%d.%m.%Y").to_string()
}

const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y.%m.%d"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Parse a calendar date the way 1C and its users write them. Bare numbers are not dates.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.contains(['.', '-', '/']) {
        return None;
    }
    let (date_part, time_part) = match raw.split_once(char::is_whitespace) {
        Some((d, t)) => (d, Some(t.trim())),
        None => (raw, None),
    };
    let date = parse_date_part(date_part)?;
    match time_part {
        None => date.and_hms_opt(0, 0, 0),
        Some(t) => TIME_FORMATS
            .iter()
            .find_map(|f| chrono::NaiveTime::parse_from_str(t, f).ok())
            .map(|time| date.and_time(time)),
    }
}

fn parse_date_part(raw: &str) -> Option<NaiveDate> {
    // dd.mm.yy, two-digit year
    if raw.len() == 8 && raw.as_bytes()[2] == b'.' && raw.as_bytes()[5] == b'.' {
        return NaiveDate::parse_from_str(raw, "%d.%m.%y").ok();
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .filter(|d| d.year_ce().1 >= 1000)
}

/// Excel serial day number (1900 date system) to a timestamp.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    base.checked_add_signed(chrono::Duration::milliseconds(millis))
}

pub fn datetime_to_excel_serial(val: &NaiveDateTime) -> f64 {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    (*val - base).num_milliseconds() as f64 / 86_400_000.0
}
