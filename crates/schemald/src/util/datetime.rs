//! ISO 8601 date/time recognition for the `Date`, `DateTime` and `Time`
//! scalar kinds.
//!
//! schema.org values use the extended ISO 8601 forms:
//! - Date: `YYYY-MM-DD`
//! - Time: `hh:mm[:ss[.fraction]][Z|±hh:mm]`
//! - DateTime: `<Date>T<Time>`
//!
//! Seconds and the zone designator are optional (local times are legal).
//! Calendar validity is checked, including leap years.

/// Error type for ISO 8601 parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeParseError {
    pub message: String,
}

impl std::fmt::Display for DateTimeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DateTimeParseError {}

fn invalid(what: &str, input: &str) -> DateTimeParseError {
    DateTimeParseError {
        message: format!("Invalid {}: {}", what, input),
    }
}

/// A calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// A time of day with optional zone offset (minutes east of UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub micros: u32,
    pub offset_min: Option<i16>,
}

/// A date and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoDateTime {
    pub date: IsoDate,
    pub time: IsoTime,
}

/// Parses a timezone designator (Z, +HH:MM, -HH:MM) into minutes.
fn parse_timezone_offset(offset: &str) -> Result<i16, DateTimeParseError> {
    if offset == "Z" || offset == "z" {
        return Ok(0);
    }

    if offset.len() != 6 || offset.as_bytes()[3] != b':' {
        return Err(invalid("timezone offset", offset));
    }

    let sign = match offset.as_bytes()[0] {
        b'+' => 1i16,
        b'-' => -1i16,
        _ => return Err(invalid("timezone offset", offset)),
    };

    let hours = parse_digits(&offset[1..3]).ok_or_else(|| invalid("timezone offset", offset))?;
    let minutes = parse_digits(&offset[4..6]).ok_or_else(|| invalid("timezone offset", offset))?;

    // ±24:00 is the widest legal offset.
    if hours > 24 || (hours == 24 && minutes != 0) || minutes > 59 {
        return Err(invalid("timezone offset", offset));
    }

    Ok(sign * (hours as i16 * 60 + minutes as i16))
}

/// Parses a fixed-width run of ASCII digits.
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parses fractional seconds into microseconds, truncating past six digits.
fn parse_fractional_seconds(frac: &str) -> Option<u32> {
    if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut padded = frac.to_string();
    while padded.len() < 6 {
        padded.push('0');
    }
    padded.truncate(6);
    padded.parse().ok()
}

/// Returns true if the given year is a leap year.
fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Returns the number of days in a given month (1-indexed).
fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

// =====================
// DATE
// =====================

/// Parses an ISO 8601 calendar date (`YYYY-MM-DD`).
pub fn parse_date(date_str: &str) -> Result<IsoDate, DateTimeParseError> {
    let bytes = date_str.as_bytes();
    if !date_str.is_ascii() || bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(invalid("ISO 8601 date", date_str));
    }

    let year = parse_digits(&date_str[..4]).ok_or_else(|| invalid("year in date", date_str))?;
    let month = parse_digits(&date_str[5..7]).ok_or_else(|| invalid("month in date", date_str))?;
    let day = parse_digits(&date_str[8..10]).ok_or_else(|| invalid("day in date", date_str))?;
    let year = year as i32;

    if !(1..=12).contains(&month) {
        return Err(invalid("month in date", date_str));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(invalid("day in date", date_str));
    }

    Ok(IsoDate { year, month, day })
}

// =====================
// TIME
// =====================

/// Parses an ISO 8601 time of day (`hh:mm[:ss[.f]][Z|±hh:mm]`).
pub fn parse_time(time_str: &str) -> Result<IsoTime, DateTimeParseError> {
    let bytes = time_str.as_bytes();
    if !time_str.is_ascii() || bytes.len() < 5 || bytes[2] != b':' {
        return Err(invalid("ISO 8601 time", time_str));
    }

    let hour = parse_digits(&time_str[..2]).ok_or_else(|| invalid("hours in time", time_str))?;
    let minute = parse_digits(&time_str[3..5]).ok_or_else(|| invalid("minutes in time", time_str))?;

    let mut rest = &time_str[5..];
    let mut second = 0;
    let mut has_seconds = false;
    if let Some(after) = rest.strip_prefix(':') {
        if after.len() < 2 {
            return Err(invalid("seconds in time", time_str));
        }
        second = parse_digits(&after[..2]).ok_or_else(|| invalid("seconds in time", time_str))?;
        rest = &after[2..];
        has_seconds = true;
    }

    let mut micros = 0;
    if let Some(after) = rest.strip_prefix('.') {
        // A fraction is only legal after explicit seconds.
        if !has_seconds {
            return Err(invalid("fractional seconds in time", time_str));
        }
        let frac_end = after
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after.len());
        micros = parse_fractional_seconds(&after[..frac_end])
            .ok_or_else(|| invalid("fractional seconds in time", time_str))?;
        rest = &after[frac_end..];
    }

    if hour > 23 {
        return Err(invalid("hours in time", time_str));
    }
    if minute > 59 {
        return Err(invalid("minutes in time", time_str));
    }
    if second > 59 {
        return Err(invalid("seconds in time", time_str));
    }

    let offset_min = if rest.is_empty() {
        None
    } else {
        Some(parse_timezone_offset(rest)?)
    };

    Ok(IsoTime {
        hour,
        minute,
        second,
        micros,
        offset_min,
    })
}

// =====================
// DATETIME
// =====================

/// Parses an ISO 8601 date and time (`YYYY-MM-DDThh:mm...`).
pub fn parse_datetime(datetime_str: &str) -> Result<IsoDateTime, DateTimeParseError> {
    // Minimum is YYYY-MM-DDThh:mm
    if !datetime_str.is_ascii() || datetime_str.len() < 16 {
        return Err(invalid("ISO 8601 datetime", datetime_str));
    }

    let sep = datetime_str.as_bytes()[10];
    if sep != b'T' && sep != b't' {
        return Err(invalid("ISO 8601 datetime", datetime_str));
    }

    let date = parse_date(&datetime_str[..10])?;
    let time = parse_time(&datetime_str[11..])?;
    Ok(IsoDateTime { date, time })
}

/// Returns true if `s` is a valid `Date`.
pub fn is_date(s: &str) -> bool {
    parse_date(s).is_ok()
}

/// Returns true if `s` is a valid `Time`.
pub fn is_time(s: &str) -> bool {
    parse_time(s).is_ok()
}

/// Returns true if `s` is a valid `DateTime`.
pub fn is_datetime(s: &str) -> bool {
    parse_datetime(s).is_ok()
}
