//! Duration strings and their components.
//!
//! Durations come from three grammars and two construction paths:
//!
//! - unit-suffixed (`1y 2d 3h 4m 5s 6ms 7us`) and clock tags
//!   (`-002T00:45:00.010`) go through [`ParsedDurationString::literal`]
//!   and keep every field as written;
//! - bare numbers go through [`ParsedDurationString::normalized`], which
//!   carries overflow up through every coarser unit.
//!
//! Callers must not assume a parsed duration is range-normalized unless it
//! came from a bare number.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use super::EPOCH_TIME;
use crate::error::SeqnError;

/// Field order, coarsest first. Indexes into `[i64; 7]` field arrays.
const YEARS: usize = 0;
const DAYS: usize = 1;
const HOURS: usize = 2;
const MINUTES: usize = 3;
const SECONDS: usize = 4;
const MILLISECONDS: usize = 5;
const MICROSECONDS: usize = 6;

/// Microseconds in one of each unit. A year is a fixed 365 days.
const MICROS_PER: [i128; 7] = [
    365 * 86_400_000_000,
    86_400_000_000,
    3_600_000_000,
    60_000_000,
    1_000_000,
    1_000,
    1,
];

/// How many of unit `i + 1` make one of unit `i`.
const RATIO_TO_FINER: [i64; 6] = [365, 24, 60, 60, 1000, 1000];

const SUFFIXES: [&str; 7] = ["y", "d", "h", "m", "s", "ms", "us"];

pub(crate) const ACCEPTED_FORMS: &str = "expected a unit duration such as '1y 2d 3h 4m 5s 6ms 7us' \
     (any subset, in that order, optionally negated with a leading '-'), a clock duration \
     '[+-][DDDT]hh:mm[:ss[.sss]]', or a bare number";

static UNIT_DURATION: Lazy<Regex> = Lazy::new(|| {
    let value = r"[+-]?\d+(?:\.\d+)?";
    Regex::new(&format!(
        r"^\s*(?P<neg>-)?\s*(?:(?P<y>{v})y)?\s*(?:(?P<d>{v})d)?\s*(?:(?P<h>{v})h)?\s*(?:(?P<m>{v})m)?\s*(?:(?P<s>{v})s)?\s*(?:(?P<ms>{v})ms)?\s*(?:(?P<us>{v})us)?\s*$",
        v = value
    ))
    .unwrap()
});

static BARE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<sign>[+-])?(?P<int>\d+)(?:\.(?P<frac>\d+))?$").unwrap());

/// The unit a bare number is read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Years,
    Days,
    Hours,
    Minutes,
    #[default]
    Seconds,
    Milliseconds,
    Microseconds,
}

impl DurationUnit {
    fn index(self) -> usize {
        match self {
            DurationUnit::Years => YEARS,
            DurationUnit::Days => DAYS,
            DurationUnit::Hours => HOURS,
            DurationUnit::Minutes => MINUTES,
            DurationUnit::Seconds => SECONDS,
            DurationUnit::Milliseconds => MILLISECONDS,
            DurationUnit::Microseconds => MICROSECONDS,
        }
    }
}

impl FromStr for DurationUnit {
    type Err = SeqnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "y" | "year" | "years" => Ok(DurationUnit::Years),
            "d" | "day" | "days" => Ok(DurationUnit::Days),
            "h" | "hour" | "hours" => Ok(DurationUnit::Hours),
            "m" | "minute" | "minutes" => Ok(DurationUnit::Minutes),
            "s" | "second" | "seconds" => Ok(DurationUnit::Seconds),
            "ms" | "millisecond" | "milliseconds" => Ok(DurationUnit::Milliseconds),
            "us" | "microsecond" | "microseconds" => Ok(DurationUnit::Microseconds),
            _ => Err(SeqnError::format(s, "unknown duration unit")),
        }
    }
}

/// Components of a parsed duration. The sign is carried once in
/// `is_negative`; every field holds a non-negative magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ParsedDurationString {
    pub years: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub milliseconds: i64,
    pub microseconds: i64,
    pub is_negative: bool,
}

impl ParsedDurationString {
    /// Build from fields exactly as written, coarsest first. No carrying.
    pub fn literal(fields: [i64; 7], is_negative: bool) -> Self {
        ParsedDurationString {
            years: fields[YEARS],
            days: fields[DAYS],
            hours: fields[HOURS],
            minutes: fields[MINUTES],
            seconds: fields[SECONDS],
            milliseconds: fields[MILLISECONDS],
            microseconds: fields[MICROSECONDS],
            is_negative,
        }
    }

    /// Build from a number `whole.fraction` given in `unit`.
    ///
    /// The fraction becomes `floor(fraction * ratio)` of the next-finer
    /// unit (and is dropped for microseconds). Overflow is then carried
    /// upward from microseconds to years; days carry into years at 365.
    pub fn normalized(whole: i64, fraction_digits: &str, unit: DurationUnit, is_negative: bool) -> Self {
        let mut fields = [0i64; 7];
        let idx = unit.index();
        fields[idx] = whole;
        if idx < MICROSECONDS {
            let ratio = RATIO_TO_FINER[idx] as i128;
            fields[idx + 1] = scale_fraction(fraction_digits, ratio) as i64;
        }
        for i in (1..fields.len()).rev() {
            let ratio = RATIO_TO_FINER[i - 1];
            fields[i - 1] += fields[i] / ratio;
            fields[i] %= ratio;
        }
        Self::literal(fields, is_negative)
    }

    pub fn fields(&self) -> [i64; 7] {
        [
            self.years,
            self.days,
            self.hours,
            self.minutes,
            self.seconds,
            self.milliseconds,
            self.microseconds,
        ]
    }

    pub fn is_zero(&self) -> bool {
        self.fields().iter().all(|f| *f == 0)
    }

    /// Total length in microseconds, signed.
    pub fn total_microseconds(&self) -> i128 {
        let total: i128 = self
            .fields()
            .iter()
            .zip(MICROS_PER)
            .map(|(f, per)| *f as i128 * per)
            .sum();
        if self.is_negative {
            -total
        } else {
            total
        }
    }
}

impl fmt::Display for ParsedDurationString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0s");
        }
        if self.is_negative {
            write!(f, "-")?;
        }
        let parts: Vec<String> = self
            .fields()
            .iter()
            .zip(SUFFIXES)
            .filter(|(v, _)| **v != 0)
            .map(|(v, suffix)| format!("{}{}", v, suffix))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// `floor(0.<digits> * ratio)` without going through floating point.
fn scale_fraction(digits: &str, ratio: i128) -> i128 {
    let digits = &digits[..digits.len().min(18)];
    if digits.is_empty() {
        return 0;
    }
    let value: i128 = digits.parse().unwrap_or(0);
    value * ratio / 10i128.pow(digits.len() as u32)
}

fn parse_whole(text: &str, input: &str) -> Result<i64, SeqnError> {
    text.parse::<i64>()
        .map_err(|_| SeqnError::format(input, format!("'{}' is out of range", text)))
}

fn add_field(field: i64, amount: i64, input: &str) -> Result<i64, SeqnError> {
    field
        .checked_add(amount)
        .ok_or_else(|| SeqnError::format(input, "duration field is out of range"))
}

/// Parse a duration.
///
/// Tries, in order: the unit-suffixed grammar, the clock grammar shared
/// with epoch/relative tags, and a bare number read in `default_unit`.
pub fn parse_duration_string(
    text: &str,
    default_unit: DurationUnit,
) -> Result<ParsedDurationString, SeqnError> {
    if let Some(caps) = UNIT_DURATION.captures(text) {
        if SUFFIXES.iter().any(|g| caps.name(g).is_some()) {
            return from_unit_captures(&caps, text);
        }
    }

    if let Some(caps) = EPOCH_TIME.captures(text) {
        return from_clock_captures(&caps, text);
    }

    if let Some(caps) = BARE_NUMBER.captures(text) {
        let is_negative = caps.name("sign").map(|m| m.as_str()) == Some("-");
        let whole = parse_whole(&caps["int"], text)?;
        let frac = caps.name("frac").map_or("", |m| m.as_str());
        return Ok(ParsedDurationString::normalized(
            whole,
            frac,
            default_unit,
            is_negative,
        ));
    }

    Err(SeqnError::format(text, ACCEPTED_FORMS))
}

fn from_unit_captures(caps: &Captures<'_>, input: &str) -> Result<ParsedDurationString, SeqnError> {
    let mut fields = [0i64; 7];
    let mut is_negative = caps.name("neg").is_some();

    for (idx, group) in SUFFIXES.iter().enumerate() {
        let Some(m) = caps.name(group) else {
            continue;
        };
        let raw = m.as_str();
        let unsigned = match raw.strip_prefix('-') {
            Some(rest) => {
                is_negative = true;
                rest
            }
            None => raw.trim_start_matches('+'),
        };
        let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        fields[idx] = add_field(fields[idx], parse_whole(whole, input)?, input)?;

        // A fractional field spills downward into the finer fields.
        let mut rem = scale_fraction(frac, MICROS_PER[idx]);
        for finer in idx + 1..fields.len() {
            fields[finer] = add_field(fields[finer], (rem / MICROS_PER[finer]) as i64, input)?;
            rem %= MICROS_PER[finer];
        }
    }

    Ok(ParsedDurationString::literal(fields, is_negative))
}

/// Clock-form duration, e.g. `-002T00:45:00.010`. Fields are kept as written.
pub(crate) fn from_clock_captures(
    caps: &Captures<'_>,
    input: &str,
) -> Result<ParsedDurationString, SeqnError> {
    let field = |name: &str| -> Result<i64, SeqnError> {
        match caps.name(name) {
            Some(m) => parse_whole(m.as_str(), input),
            None => Ok(0),
        }
    };

    let mut fields = [0i64; 7];
    fields[DAYS] = field("doy")?;
    fields[HOURS] = field("hr")?;
    fields[MINUTES] = field("mins")?;
    fields[SECONDS] = field("secs")?;

    if let Some(frac) = caps.name("frac") {
        let padded = format!("{:0<6}", frac.as_str());
        fields[MILLISECONDS] = parse_whole(&padded[0..3], input)?;
        fields[MICROSECONDS] = parse_whole(&padded[3..6], input)?;
    }

    let is_negative = caps.name("sign").map(|m| m.as_str()) == Some("-");
    Ok(ParsedDurationString::literal(fields, is_negative))
}
