//! Calendar and clock handling
//!
//! Installment due dates are plain calendar dates in the business timezone,
//! while review and upload events are UTC instants. Reconciliation compares
//! due dates against "today", so "now" is always injected through a `Clock`
//! rather than read from the system inside domain code.

use chrono::{DateTime, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use std::sync::RwLock;
use thiserror::Error;

/// Errors related to calendar arithmetic
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Date out of range: {date} + {months} months")]
    OutOfRange { date: NaiveDate, months: u32 },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Adds calendar months to a date, clamping to the last day of shorter months
///
/// 2024-01-31 plus one month is 2024-02-29.
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, CalendarError> {
    date.checked_add_months(Months::new(months))
        .ok_or(CalendarError::OutOfRange { date, months })
}

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a settable instant, for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    instant: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: RwLock::new(instant),
        }
    }

    /// Creates a clock frozen at midday UTC on the given date
    pub fn on_date(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc())
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        match self.instant.write() {
            Ok(mut guard) => *guard = instant,
            Err(poisoned) => *poisoned.into_inner() = instant,
        }
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.set(date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc());
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.instant.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Timezone the business books its calendar dates in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessTimezone(pub Tz);

impl BusinessTimezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Returns the local calendar date for a UTC instant
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// Returns today's local calendar date according to `clock`
    pub fn today(&self, clock: &dyn Clock) -> NaiveDate {
        self.date_of(clock.now())
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Default for BusinessTimezone {
    fn default() -> Self {
        Self(chrono_tz::America::Mexico_City)
    }
}

impl FromStr for BusinessTimezone {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s)
            .map(BusinessTimezone)
            .map_err(|_| CalendarError::UnknownTimezone(s.to_string()))
    }
}

impl Serialize for BusinessTimezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for BusinessTimezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
