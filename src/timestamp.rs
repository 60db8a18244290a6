use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};

/// Source of wall-clock time for the timestamp band.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local time at the moment of drawing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    #[default]
    TwelveHour,
    TwentyFourHour,
}

impl TimeFormat {
    fn pattern(&self) -> &'static str {
        match self {
            TimeFormat::TwelveHour => "%I:%M %p",
            TimeFormat::TwentyFourHour => "%H:%M",
        }
    }
}

impl FromStr for TimeFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "12" | "12h" => Ok(TimeFormat::TwelveHour),
            "24" | "24h" => Ok(TimeFormat::TwentyFourHour),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeFormat::TwelveHour => write!(f, "12h"),
            TimeFormat::TwentyFourHour => write!(f, "24h"),
        }
    }
}

pub fn format_date(now: &NaiveDateTime) -> String {
    now.format("%m/%d/%Y").to_string()
}

pub fn format_time(now: &NaiveDateTime, format: TimeFormat) -> String {
    now.format(format.pattern()).to_string()
}

/// Lines of the timestamp band, date above time.
pub fn timestamp_lines(
    now: &NaiveDateTime,
    add_date: bool,
    add_time: bool,
    format: TimeFormat,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(2);
    if add_date {
        lines.push(format_date(now));
    }
    if add_time {
        lines.push(format_time(now, format));
    }
    lines
}
