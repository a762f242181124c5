use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::limits::MINUTES_PER_DAY;

/// Minutes since local midnight. The only intra-day time unit.
pub type Minutes = u16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MalformedTime(String),
    MalformedDate(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedTime(s) => write!(f, "malformed clock time: {s:?} (expected HH:MM)"),
            ParseError::MalformedDate(s) => write!(f, "malformed date: {s:?} (expected YYYY-MM-DD)"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a 24h `HH:MM` clock time into minutes since midnight.
///
/// Both fields must be exactly two ASCII digits; hour ≤ 23, minute ≤ 59.
pub fn to_minutes(clock: &str) -> Result<Minutes, ParseError> {
    let bad = || ParseError::MalformedTime(clock.to_string());
    let bytes = clock.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(bad());
    }
    let two_digits = |hi: u8, lo: u8| -> Option<u16> {
        if hi.is_ascii_digit() && lo.is_ascii_digit() {
            Some(u16::from(hi - b'0') * 10 + u16::from(lo - b'0'))
        } else {
            None
        }
    };
    let hours = two_digits(bytes[0], bytes[1]).ok_or_else(bad)?;
    let minutes = two_digits(bytes[3], bytes[4]).ok_or_else(bad)?;
    if hours > 23 || minutes > 59 {
        return Err(bad());
    }
    Ok(hours * 60 + minutes)
}

/// Render `HH:MM` as `H:MM AM/PM`.
pub fn format_clock_12h(clock: &str) -> Result<String, ParseError> {
    Ok(ClockTime::from_minutes(to_minutes(clock)?)?.format_12h())
}

/// Strict `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, ParseError> {
    if s.len() != 10 {
        return Err(ParseError::MalformedDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ParseError::MalformedDate(s.to_string()))
}

/// A wall-clock time of day, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(Minutes);

impl ClockTime {
    pub fn from_minutes(minutes: Minutes) -> Result<Self, ParseError> {
        if minutes >= MINUTES_PER_DAY {
            return Err(ParseError::MalformedTime(format!("{minutes} minutes")));
        }
        Ok(Self(minutes))
    }

    /// `from_minutes` for callers that already hold a value below 1440.
    pub(crate) const fn new_unchecked(minutes: Minutes) -> Self {
        Self(minutes)
    }

    pub fn minutes(self) -> Minutes {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    pub fn format_12h(self) -> String {
        let (hour, minute) = (self.hour(), self.minute());
        let suffix = if hour < 12 { "AM" } else { "PM" };
        let display_hour = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{display_hour}:{minute:02} {suffix}")
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        to_minutes(s).map(Self)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ClockTime> for String {
    fn from(t: ClockTime) -> Self {
        t.to_string()
    }
}
