//! Time tags and durations.
//!
//! Spacecraft time is written as absolute day-of-year timestamps
//! (`2024-123T12:34:56.789`), clock offsets relative to the previous
//! command or to an epoch (`[+-][DDDT]hh:mm[:ss[.sss]]`), bare second
//! counts, and unit-suffixed durations (`1d 2h 30m`). This module
//! validates each form, parses durations into components, and converts
//! between day-of-year strings and instants.
//!
//! Both directions of the compiler depend on it: the extractor validates
//! every time tag it reads and the serializer validates every tag it writes.

pub mod calendar;
pub mod duration;

use once_cell::sync::Lazy;
use regex::Regex;

pub use calendar::{
    convert_duration_to_doy, get_balanced_duration, get_doy, get_doy_time, get_unix_epoch_time,
    parse_doy_or_ymd_time, ParsedDoyString, ParsedTime, ParsedYmdString,
    DEFAULT_DECIMAL_PRECISION,
};
pub use duration::{parse_duration_string, DurationUnit, ParsedDurationString};

pub(crate) static ABSOLUTE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})-(?P<doy>\d{3})T(?P<hr>\d{2}):(?P<mins>\d{2}):(?P<secs>\d{2})(?:\.(?P<frac>\d+))?$",
    )
    .unwrap()
});

pub(crate) static EPOCH_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<sign>[+-]?)(?:(?P<doy>\d{3})T)?(?P<hr>\d{2}):(?P<mins>\d{2})(?::(?P<secs>\d{2})(?:\.(?P<frac>\d+))?)?$",
    )
    .unwrap()
});

pub(crate) static RELATIVE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<sign>\+?)(?:(?P<doy>\d{3})T)?(?P<hr>\d{2}):(?P<mins>\d{2})(?::(?P<secs>\d{2})(?:\.(?P<frac>\d+))?)?$",
    )
    .unwrap()
});

static EPOCH_SIMPLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?$").unwrap());

static RELATIVE_SIMPLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d+(?:\.\d+)?$").unwrap());

/// The closed set of time-tag grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeKind {
    /// `YYYY-DDDThh:mm:ss[.sss]`
    Absolute,
    /// `[+-][DDDT]hh:mm[:ss[.sss]]`
    Epoch,
    /// `[+][DDDT]hh:mm[:ss[.sss]]`
    Relative,
    /// `[+-]seconds[.fraction]`
    EpochSimple,
    /// `[+]seconds[.fraction]`
    RelativeSimple,
}

impl TimeKind {
    pub const ALL: [TimeKind; 5] = [
        TimeKind::Absolute,
        TimeKind::Epoch,
        TimeKind::Relative,
        TimeKind::EpochSimple,
        TimeKind::RelativeSimple,
    ];

    fn pattern(self) -> &'static Regex {
        match self {
            TimeKind::Absolute => &ABSOLUTE_TIME,
            TimeKind::Epoch => &EPOCH_TIME,
            TimeKind::Relative => &RELATIVE_TIME,
            TimeKind::EpochSimple => &EPOCH_SIMPLE,
            TimeKind::RelativeSimple => &RELATIVE_SIMPLE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TimeKind::Absolute => "absolute",
            TimeKind::Epoch => "epoch",
            TimeKind::Relative => "relative",
            TimeKind::EpochSimple => "epoch-simple",
            TimeKind::RelativeSimple => "relative-simple",
        }
    }
}

impl std::str::FromStr for TimeKind {
    type Err = crate::SeqnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace('_', "-");
        TimeKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| {
                crate::SeqnError::format(
                    s,
                    "expected one of absolute, epoch, relative, epoch-simple, relative-simple",
                )
            })
    }
}

/// Tag forms accepted after `A`.
pub(crate) const ABSOLUTE_TAGS: &[TimeKind] = &[TimeKind::Absolute];
/// Tag forms accepted after `R`.
pub(crate) const RELATIVE_TAGS: &[TimeKind] = &[TimeKind::Relative, TimeKind::RelativeSimple];
/// Tag forms accepted after `E` and `G`.
pub(crate) const EPOCH_TAGS: &[TimeKind] = &[TimeKind::Epoch, TimeKind::EpochSimple];

pub(crate) fn matches_any(text: &str, kinds: &[TimeKind]) -> bool {
    kinds.iter().any(|k| validate_time(text, *k))
}

/// Check `text` against the grammar of `kind`. Field ranges are not
/// checked: `00:60:00` is a valid relative tag.
pub fn validate_time(text: &str, kind: TimeKind) -> bool {
    kind.pattern().is_match(text)
}
