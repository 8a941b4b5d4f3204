//! Day-of-year timestamps and calendar arithmetic.
//!
//! All instants are UTC. Conversions go through `time::OffsetDateTime`, so
//! they follow real month and leap-year lengths; this is deliberately not
//! the fixed 365-day year used when a bare-number duration is normalized.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use ::time::{Date, Duration, Month, OffsetDateTime, UtcOffset};

use super::duration::{from_clock_captures, parse_duration_string, DurationUnit, ParsedDurationString};
use super::{ABSOLUTE_TIME, EPOCH_TIME};
use crate::error::SeqnError;

/// Digits of fractional seconds kept by [`parse_doy_or_ymd_time`] by default.
pub const DEFAULT_DECIMAL_PRECISION: usize = 6;

const MS_PER_DAY: i128 = 86_400_000;

// Clock fields may be wider than two digits here; they are carried.
static DOY_CALENDAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})-(?P<doy>\d{3,})(?:T(?P<time>(?P<hr>\d{2,})(?::(?P<mins>\d{2,})(?::(?P<secs>\d{2,})(?:\.(?P<frac>\d+))?)?)?))?$",
    )
    .unwrap()
});

static YMD_CALENDAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})(?:T(?P<time>(?P<hr>\d{2,})(?::(?P<mins>\d{2,})(?::(?P<secs>\d{2,})(?:\.(?P<frac>\d+))?)?)?))?$",
    )
    .unwrap()
});

/// A `YYYY-DDD[Thh[:mm[:ss[.sss]]]]` timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDoyString {
    pub year: i32,
    pub doy: u32,
    pub hour: u32,
    pub min: u32,
    pub sec: u32,
    pub ms: f64,
    /// The time-of-day text as written, `00:00:00` when absent.
    pub time: String,
}

/// A `YYYY-MM-DD[Thh[:mm[:ss[.sss]]]]` timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedYmdString {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub min: u32,
    pub sec: u32,
    pub ms: f64,
    pub time: String,
}

/// Result of [`parse_doy_or_ymd_time`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "form", rename_all = "lowercase")]
pub enum ParsedTime {
    Doy(ParsedDoyString),
    Ymd(ParsedYmdString),
    Duration(ParsedDurationString),
}

impl ParsedDoyString {
    /// The instant this timestamp names. Out-of-range clock fields carry.
    pub fn to_date_time(&self) -> Result<OffsetDateTime, SeqnError> {
        let start = year_start(self.year)?;
        offset_by(
            start,
            self.doy as i64 - 1,
            self.hour,
            self.min,
            self.sec,
            self.ms,
        )
        .ok_or_else(|| SeqnError::format(&self.time, "timestamp out of range"))
    }
}

impl ParsedYmdString {
    pub fn to_date_time(&self) -> Result<OffsetDateTime, SeqnError> {
        let month = u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .ok_or_else(|| SeqnError::format(&self.time, format!("invalid month {}", self.month)))?;
        let start = Date::from_calendar_date(self.year, month, 1)
            .map_err(|e| SeqnError::format(&self.time, e.to_string()))?
            .midnight()
            .assume_utc();
        offset_by(
            start,
            self.day as i64 - 1,
            self.hour,
            self.min,
            self.sec,
            self.ms,
        )
        .ok_or_else(|| SeqnError::format(&self.time, "timestamp out of range"))
    }
}

fn year_start(year: i32) -> Result<OffsetDateTime, SeqnError> {
    Date::from_calendar_date(year, Month::January, 1)
        .map(|d| d.midnight().assume_utc())
        .map_err(|e| SeqnError::format(&year.to_string(), e.to_string()))
}

fn offset_by(
    start: OffsetDateTime,
    days: i64,
    hour: u32,
    min: u32,
    sec: u32,
    ms: f64,
) -> Option<OffsetDateTime> {
    let span = Duration::days(days)
        + Duration::hours(hour as i64)
        + Duration::minutes(min as i64)
        + Duration::seconds(sec as i64)
        + Duration::microseconds((ms * 1000.0).round() as i64);
    start.checked_add(span)
}

/// Milliseconds from fractional-second digits, rounded to `precision` digits.
fn fraction_to_ms(digits: &str, precision: usize) -> f64 {
    let precision = precision.min(18);
    let (kept, round_up) = if digits.len() > precision {
        (&digits[..precision], digits.as_bytes()[precision] >= b'5')
    } else {
        (digits, false)
    };
    let mut n: u64 = if kept.is_empty() {
        0
    } else {
        kept.parse().unwrap_or(0)
    };
    if round_up {
        n += 1;
    }
    n as f64 * 10f64.powi(3 - kept.len() as i32)
}

fn capture_u32(caps: &Captures<'_>, name: &str) -> Option<u32> {
    match caps.name(name) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

struct ClockFields {
    hour: u32,
    min: u32,
    sec: u32,
    ms: f64,
    time: String,
}

fn clock_fields(caps: &Captures<'_>, decimal_precision: usize) -> Option<ClockFields> {
    Some(ClockFields {
        hour: capture_u32(caps, "hr")?,
        min: capture_u32(caps, "mins")?,
        sec: capture_u32(caps, "secs")?,
        ms: caps
            .name("frac")
            .map_or(0.0, |m| fraction_to_ms(m.as_str(), decimal_precision)),
        time: caps
            .name("time")
            .map_or_else(|| "00:00:00".to_string(), |m| m.as_str().to_string()),
    })
}

/// Parse a day-of-year or year-month-day timestamp, each with an optional
/// partial time of day. Falls back to a clock-form duration
/// (`[+-][DDDT]hh:mm[:ss[.sss]]`) before giving up.
pub fn parse_doy_or_ymd_time(text: &str, decimal_precision: usize) -> Option<ParsedTime> {
    if let Some(caps) = DOY_CALENDAR.captures(text) {
        let clock = clock_fields(&caps, decimal_precision)?;
        return Some(ParsedTime::Doy(ParsedDoyString {
            year: caps["year"].parse().ok()?,
            doy: caps["doy"].parse().ok()?,
            hour: clock.hour,
            min: clock.min,
            sec: clock.sec,
            ms: clock.ms,
            time: clock.time,
        }));
    }

    if let Some(caps) = YMD_CALENDAR.captures(text) {
        let clock = clock_fields(&caps, decimal_precision)?;
        return Some(ParsedTime::Ymd(ParsedYmdString {
            year: caps["year"].parse().ok()?,
            month: caps["month"].parse().ok()?,
            day: caps["day"].parse().ok()?,
            hour: clock.hour,
            min: clock.min,
            sec: clock.sec,
            ms: clock.ms,
            time: clock.time,
        }));
    }

    EPOCH_TIME
        .captures(text)
        .and_then(|caps| from_clock_captures(&caps, text).ok())
        .map(ParsedTime::Duration)
}

/// Day of year, 1-based, of `date` in UTC.
pub fn get_doy(date: OffsetDateTime) -> u32 {
    let utc = date.to_offset(UtcOffset::UTC);
    let start = Date::from_ordinal_date(utc.year(), 1)
        .unwrap_or(utc.date())
        .midnight()
        .assume_utc();
    ((utc - start).whole_milliseconds() / MS_PER_DAY) as u32 + 1
}

/// Format `date` as `YYYY-DDDThh:mm:ss`, adding `.mmm` only when
/// `include_milliseconds` is set and the milliseconds are nonzero.
pub fn get_doy_time(date: OffsetDateTime, include_milliseconds: bool) -> String {
    let utc = date.to_offset(UtcOffset::UTC);
    let mut out = format!(
        "{:04}-{:03}T{:02}:{:02}:{:02}",
        utc.year(),
        get_doy(utc),
        utc.hour(),
        utc.minute(),
        utc.second()
    );
    let ms = utc.millisecond();
    if include_milliseconds && ms != 0 {
        out.push_str(&format!(".{:03}", ms));
    }
    out
}

/// Milliseconds since the Unix epoch for an absolute `YYYY-DDDThh:mm:ss[.sss]`
/// timestamp. A missing fraction counts as zero.
pub fn get_unix_epoch_time(doy_string: &str) -> Result<i64, SeqnError> {
    let caps = ABSOLUTE_TIME
        .captures(doy_string)
        .ok_or_else(|| SeqnError::format(doy_string, "expected YYYY-DDDThh:mm:ss[.sss]"))?;

    let num = |name: &str| -> Result<u32, SeqnError> {
        caps[name]
            .parse()
            .map_err(|_| SeqnError::format(doy_string, format!("invalid {}", name)))
    };
    let ms = caps.name("frac").map_or(0.0, |m| {
        let padded = format!("{:0<3}", m.as_str());
        padded[..3].parse::<u32>().unwrap_or(0) as f64
    });

    let parsed = ParsedDoyString {
        year: num("year")? as i32,
        doy: num("doy")?,
        hour: num("hr")?,
        min: num("mins")?,
        sec: num("secs")?,
        ms,
        time: doy_string.to_string(),
    };
    let instant = parsed.to_date_time()?;
    Ok((instant.unix_timestamp_nanos() / 1_000_000) as i64)
}

/// Anchor a duration at 1970 as `1970-DDDThh:mm:ss.mmm`, day = max(1, days).
///
/// Years fold into days at 365 each, and sub-second fields carry into
/// whole seconds so the fraction stays three digits. Fails when the
/// folded fields do not fit in an `i64`.
pub fn convert_duration_to_doy(duration: &ParsedDurationString) -> Result<String, SeqnError> {
    let overflow = || SeqnError::format(&duration.to_string(), "duration is out of range");
    let days = total_days(duration).ok_or_else(overflow)?.max(1);
    let total_ms = duration
        .milliseconds
        .checked_add(duration.microseconds / 1000)
        .ok_or_else(overflow)?;
    let seconds = duration
        .seconds
        .checked_add(total_ms / 1000)
        .ok_or_else(overflow)?;
    Ok(format!(
        "1970-{:03}T{:02}:{:02}:{:02}.{:03}",
        days,
        duration.hours,
        duration.minutes,
        seconds,
        total_ms % 1000
    ))
}

/// Years folded into days at 365 each.
fn total_days(duration: &ParsedDurationString) -> Option<i64> {
    duration.years.checked_mul(365)?.checked_add(duration.days)
}

/// Re-express a relative time in balanced clock form, e.g.
/// `-002T00:60:00.010` becomes `-002T01:00:00.010`.
///
/// The day segment appears when the input had days or when the balanced
/// value reaches a whole day.
pub fn get_balanced_duration(text: &str) -> Result<String, SeqnError> {
    let duration = parse_duration_string(text, DurationUnit::Seconds)?;
    let anchored = convert_duration_to_doy(&duration)?;
    let instant = match parse_doy_or_ymd_time(&anchored, DEFAULT_DECIMAL_PRECISION) {
        Some(ParsedTime::Doy(doy)) => doy.to_date_time()?,
        _ => return Err(SeqnError::format(text, "cannot anchor duration in 1970")),
    };

    // Whole days since 1970-001, 1-based: the day of year while in 1970,
    // and still counting past it.
    let day_index =
        ((instant - OffsetDateTime::UNIX_EPOCH).whole_milliseconds() / MS_PER_DAY) as i64 + 1;
    let original_days = total_days(&duration)
        .ok_or_else(|| SeqnError::format(text, "duration is out of range"))?;
    // Zero-day durations were anchored at day 1, so day 1 means no days.
    let days = if original_days > 0 {
        day_index
    } else {
        day_index - 1
    };

    let mut out = String::new();
    if duration.is_negative {
        out.push('-');
    }
    if original_days > 0 || days > 0 {
        out.push_str(&format!("{:03}T", days));
    }
    out.push_str(&format!(
        "{:02}:{:02}:{:02}",
        instant.hour(),
        instant.minute(),
        instant.second()
    ));
    let ms = instant.millisecond();
    if ms != 0 {
        out.push_str(&format!(".{:03}", ms));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::time::macros::datetime;

    #[test]
    fn doy_of_new_year_and_leap_day() {
        assert_eq!(get_doy(datetime!(2024-01-01 00:00 UTC)), 1);
        assert_eq!(get_doy(datetime!(2024-02-29 23:59:59 UTC)), 60);
        assert_eq!(get_doy(datetime!(2024-12-31 12:00 UTC)), 366);
        assert_eq!(get_doy(datetime!(2023-12-31 12:00 UTC)), 365);
    }

    #[test]
    fn doy_time_omits_zero_milliseconds() {
        let t = datetime!(2022-01-12 12:34:56 UTC);
        assert_eq!(get_doy_time(t, true), "2022-012T12:34:56");
        let t = datetime!(2022-01-12 12:34:56.789 UTC);
        assert_eq!(get_doy_time(t, true), "2022-012T12:34:56.789");
        assert_eq!(get_doy_time(t, false), "2022-012T12:34:56");
    }

    #[test]
    fn doy_time_is_utc() {
        let t = datetime!(2022-01-01 01:00 +02:00);
        assert_eq!(get_doy_time(t, true), "2021-365T23:00:00");
    }

    #[test]
    fn unix_epoch_time_of_doy_string() {
        assert_eq!(get_unix_epoch_time("1970-001T00:00:00").unwrap(), 0);
        assert_eq!(get_unix_epoch_time("1970-002T00:00:01.5").unwrap(), 86_401_500);
        assert_eq!(
            get_unix_epoch_time("2022-012T12:34:56.789").unwrap(),
            1_641_990_896_789
        );
        assert!(get_unix_epoch_time("2022-01-12T12:34:56").is_err());
    }

    #[test]
    fn parse_doy_with_partial_time() {
        match parse_doy_or_ymd_time("2024-123T12", DEFAULT_DECIMAL_PRECISION) {
            Some(ParsedTime::Doy(d)) => {
                assert_eq!((d.year, d.doy, d.hour, d.min, d.sec), (2024, 123, 12, 0, 0));
                assert_eq!(d.time, "12");
            }
            other => panic!("expected Doy, got {:?}", other),
        }
        match parse_doy_or_ymd_time("2024-123", DEFAULT_DECIMAL_PRECISION) {
            Some(ParsedTime::Doy(d)) => {
                assert_eq!(d.time, "00:00:00");
                assert_eq!(d.hour, 0);
            }
            other => panic!("expected Doy, got {:?}", other),
        }
    }

    #[test]
    fn parse_ymd_with_fraction() {
        match parse_doy_or_ymd_time("2024-02-29T10:20:30.250", DEFAULT_DECIMAL_PRECISION) {
            Some(ParsedTime::Ymd(d)) => {
                assert_eq!((d.year, d.month, d.day), (2024, 2, 29));
                assert_eq!((d.hour, d.min, d.sec), (10, 20, 30));
                assert_eq!(d.ms, 250.0);
                assert_eq!(
                    d.to_date_time().unwrap(),
                    datetime!(2024-02-29 10:20:30.250 UTC)
                );
            }
            other => panic!("expected Ymd, got {:?}", other),
        }
    }

    #[test]
    fn decimal_precision_rounds_fraction() {
        match parse_doy_or_ymd_time("2024-001T00:00:00.1234567", 6) {
            Some(ParsedTime::Doy(d)) => assert!((d.ms - 123.457).abs() < 1e-9),
            other => panic!("expected Doy, got {:?}", other),
        }
        match parse_doy_or_ymd_time("2024-001T00:00:00.9", 0) {
            Some(ParsedTime::Doy(d)) => assert_eq!(d.ms, 1000.0),
            other => panic!("expected Doy, got {:?}", other),
        }
    }

    #[test]
    fn parse_falls_back_to_clock_duration() {
        match parse_doy_or_ymd_time("-001T02:00:00", DEFAULT_DECIMAL_PRECISION) {
            Some(ParsedTime::Duration(d)) => {
                assert!(d.is_negative);
                assert_eq!((d.days, d.hours), (1, 2));
            }
            other => panic!("expected Duration, got {:?}", other),
        }
        assert_eq!(parse_doy_or_ymd_time("tomorrow", 6), None);
    }

    #[test]
    fn doy_clock_fields_carry() {
        match parse_doy_or_ymd_time("1970-001T00:60:00", 6) {
            Some(ParsedTime::Doy(d)) => assert_eq!(
                d.to_date_time().unwrap(),
                datetime!(1970-01-01 01:00 UTC)
            ),
            other => panic!("expected Doy, got {:?}", other),
        }
    }

    #[test]
    fn convert_duration_anchors_at_1970() {
        let d = parse_duration_string("-002T00:45:00.010", DurationUnit::Seconds).unwrap();
        assert_eq!(convert_duration_to_doy(&d).unwrap(), "1970-002T00:45:00.010");
        let d = parse_duration_string("30m", DurationUnit::Seconds).unwrap();
        assert_eq!(convert_duration_to_doy(&d).unwrap(), "1970-001T00:30:00.000");
        let d = parse_duration_string("2500ms", DurationUnit::Seconds).unwrap();
        assert_eq!(convert_duration_to_doy(&d).unwrap(), "1970-001T00:00:02.500");
    }

    #[test]
    fn balanced_duration_carries_minutes() {
        assert_eq!(
            get_balanced_duration("-002T00:60:00.010").unwrap(),
            "-002T01:00:00.010"
        );
    }

    #[test]
    fn oversized_durations_are_format_errors() {
        let err = get_balanced_duration("9223372036854775807y").unwrap_err();
        assert_eq!(err.kind(), "format");
        let d = parse_duration_string("9223372036854775807y", DurationUnit::Seconds).unwrap();
        assert!(convert_duration_to_doy(&d).is_err());
        let d = parse_duration_string("9223372036854775807s 5000ms", DurationUnit::Seconds).unwrap();
        assert!(convert_duration_to_doy(&d).is_err());
        assert!(get_balanced_duration("99999999d").is_err());
    }

    #[test]
    fn balanced_duration_without_days() {
        assert_eq!(get_balanced_duration("00:90:00").unwrap(), "01:30:00");
        assert_eq!(get_balanced_duration("3600").unwrap(), "01:00:00");
    }

    #[test]
    fn balanced_duration_grows_a_day_segment() {
        assert_eq!(get_balanced_duration("25h").unwrap(), "001T01:00:00");
        assert_eq!(get_balanced_duration("001T24:00:00").unwrap(), "002T00:00:00");
        assert_eq!(get_balanced_duration("400d").unwrap(), "400T00:00:00");
    }

    #[test]
    fn balanced_duration_rejects_garbage() {
        assert!(matches!(
            get_balanced_duration("later"),
            Err(SeqnError::Format { .. })
        ));
    }
}
