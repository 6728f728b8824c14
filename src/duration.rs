//! Human-readable duration parsing
//!
//! Turns free text such as `"1 month, 2 weeks and 3 days"` into a calendar-aware
//! delta plus the absolute elapsed time that delta spans when anchored at a
//! reference instant. Months and years therefore take their real calendar
//! length instead of a fixed average.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Months, TimeDelta, Utc};
use regex::Regex;
use thiserror::Error;

/// Errors that can occur when parsing a duration string
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    /// No `<integer> <unit>` token was found
    #[error("Invalid duration '{0}'. Expected something like '1 month and 2 weeks'")]
    InvalidFormat(String),

    /// A quantity does not fit the supported calendar range
    #[error("Duration '{0}' is out of range")]
    OutOfRange(String),
}

/// Matches `<integer> <unit>` tokens; units are case-insensitive with an optional plural `s`
///
/// Quantities are ASCII digits only.
fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"(?i)([0-9]+)\s*(second|minute|hour|day|week|month|year)s?")
            .expect("duration token pattern is valid")
    })
}

/// Calendar-relative delta where months and years have no fixed length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarDelta {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl CalendarDelta {
    /// Rolls small units into larger ones.
    ///
    /// Seconds carry into minutes, minutes into hours, hours into days and
    /// months into years. Days never carry into months since a month has no
    /// fixed number of days.
    pub fn normalized(self) -> Self {
        let Self {
            mut years,
            mut months,
            mut days,
            mut hours,
            mut minutes,
            mut seconds,
        } = self;

        minutes += seconds.div_euclid(60);
        seconds = seconds.rem_euclid(60);
        hours += minutes.div_euclid(60);
        minutes = minutes.rem_euclid(60);
        days += hours.div_euclid(24);
        hours = hours.rem_euclid(24);
        years += months.div_euclid(12);
        months = months.rem_euclid(12);

        Self {
            years,
            months,
            days,
            hours,
            minutes,
            seconds,
        }
    }

    /// Returns the instant reached by adding this delta to `anchor`
    ///
    /// Years and months are applied first (clamping the day to the end of a
    /// shorter month), then the fixed-length units.
    pub fn add_to(&self, anchor: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let total_months = self.years.checked_mul(12)?.checked_add(self.months)?;
        let shifted = anchor.checked_add_months(Months::new(u32::try_from(total_months).ok()?))?;

        let fixed = TimeDelta::try_days(self.days)?
            .checked_add(&TimeDelta::try_hours(self.hours)?)?
            .checked_add(&TimeDelta::try_minutes(self.minutes)?)?
            .checked_add(&TimeDelta::try_seconds(self.seconds)?)?;

        shifted.checked_add_signed(fixed)
    }
}

impl fmt::Display for CalendarDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            (self.years, "year"),
            (self.months, "month"),
            (self.days, "day"),
            (self.hours, "hour"),
            (self.minutes, "minute"),
            (self.seconds, "second"),
        ];
        let rendered: Vec<String> = parts
            .iter()
            .filter(|(value, _)| *value != 0)
            .map(|(value, unit)| {
                let plural = if *value == 1 { "" } else { "s" };
                format!("{} {}{}", value, unit, plural)
            })
            .collect();

        if rendered.is_empty() {
            write!(f, "0 seconds")
        } else {
            write!(f, "{}", rendered.join(", "))
        }
    }
}

/// A parsed duration: the calendar delta and the elapsed time it spans from its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    calendar: CalendarDelta,
    elapsed: TimeDelta,
}

impl Duration {
    /// The normalized calendar-relative delta
    pub fn calendar(&self) -> CalendarDelta {
        self.calendar
    }

    /// The absolute elapsed time, derived by anchoring the calendar delta
    pub fn elapsed(&self) -> TimeDelta {
        self.elapsed
    }

    /// A duration of a fixed number of seconds; may be zero or negative
    pub fn from_seconds(seconds: i64) -> Result<Self, DurationError> {
        let calendar = CalendarDelta {
            seconds,
            ..CalendarDelta::default()
        }
        .normalized();
        let elapsed = TimeDelta::try_seconds(seconds)
            .ok_or_else(|| DurationError::OutOfRange(format!("{} seconds", seconds)))?;

        Ok(Self { calendar, elapsed })
    }
}

/// Parses a duration string, anchoring the calendar delta at the current instant
pub fn parse_duration(text: &str) -> Result<Duration, DurationError> {
    parse_duration_at(text, Utc::now())
}

/// Parses a duration string, anchoring the calendar delta at `anchor`
///
/// Tokens may appear in any order among arbitrary words; repeated units are
/// summed, so `"1 day, 2 days"` is three days.
///
/// # Returns
/// * `Ok(Duration)` with a normalized calendar delta and its elapsed time from `anchor`
/// * `Err(DurationError::InvalidFormat)` if no unit token is present
/// * `Err(DurationError::OutOfRange)` if a quantity overflows
pub fn parse_duration_at(text: &str, anchor: DateTime<Utc>) -> Result<Duration, DurationError> {
    let out_of_range = || DurationError::OutOfRange(text.to_string());

    let mut delta = CalendarDelta::default();
    let mut matched = false;

    for caps in token_regex().captures_iter(text) {
        matched = true;
        let value: i64 = caps[1].parse().map_err(|_| out_of_range())?;
        let unit = caps[2].to_ascii_lowercase();

        let (slot, amount) = match unit.as_str() {
            "second" => (&mut delta.seconds, value),
            "minute" => (&mut delta.minutes, value),
            "hour" => (&mut delta.hours, value),
            "day" => (&mut delta.days, value),
            "week" => (&mut delta.days, value.checked_mul(7).ok_or_else(out_of_range)?),
            "month" => (&mut delta.months, value),
            "year" => (&mut delta.years, value),
            _ => unreachable!("token pattern only captures known units"),
        };
        *slot = slot.checked_add(amount).ok_or_else(out_of_range)?;
    }

    if !matched {
        return Err(DurationError::InvalidFormat(text.to_string()));
    }

    let calendar = delta.normalized();
    let future = calendar.add_to(anchor).ok_or_else(out_of_range)?;

    Ok(Duration {
        calendar,
        elapsed: future - anchor,
    })
}
