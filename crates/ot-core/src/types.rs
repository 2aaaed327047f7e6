//! Core key types with validation.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A day key string that is neither a calendar date nor the sentinel.
    #[error("invalid day key: {value}")]
    InvalidDayKey { value: String },

    /// A week key string that is not `YYYY-Www`.
    #[error("invalid week key: {value}")]
    InvalidWeekKey { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated user identifier.
    ///
    /// User IDs must be non-empty strings. They come from the host time-tracking
    /// API and are treated as opaque.
    UserId, "user ID"
);

define_string_id!(
    /// A validated entry identifier.
    ///
    /// Entry IDs must be non-empty strings. Uniqueness is the host API's
    /// responsibility.
    EntryId, "entry ID"
);

/// Sentinel string for the day key of entries with unparseable start timestamps.
const UNKNOWN_DAY: &str = "unknown";

/// The calendar day a time entry belongs to.
///
/// Entries whose start timestamp cannot be parsed are kept under the
/// [`DayKey::Unknown`] sentinel rather than dropped, so hour totals stay
/// conservative. The sentinel orders after every real date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayKey {
    /// A concrete calendar date in the report time zone.
    Date(NaiveDate),
    /// Start timestamp was missing or unparseable.
    Unknown,
}

impl DayKey {
    /// Returns the calendar date, if this is a real day.
    #[must_use]
    pub const fn date(self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(date),
            Self::Unknown => None,
        }
    }

    /// Returns the ISO week this day belongs to, if this is a real day.
    #[must_use]
    pub fn week(self) -> Option<WeekKey> {
        self.date().map(WeekKey::from_date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Unknown => f.write_str(UNKNOWN_DAY),
        }
    }
}

impl std::str::FromStr for DayKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == UNKNOWN_DAY {
            return Ok(Self::Unknown);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self::Date)
            .map_err(|_| ValidationError::InvalidDayKey {
                value: s.to_string(),
            })
    }
}

impl Serialize for DayKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An ISO week key (`YYYY-Www`), used as the accumulation unit in weekly
/// overtime basis and as the lookup key for weekly capacity overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekKey {
    /// ISO week-based year (may differ from the calendar year at boundaries).
    pub year: i32,
    /// ISO week number, 1..=53.
    pub week: u32,
}

impl WeekKey {
    /// Returns the ISO week containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl std::str::FromStr for WeekKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ValidationError::InvalidWeekKey {
            value: s.to_string(),
        };
        let (year, week) = s.split_once("-W").ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let week: u32 = week.parse().map_err(|_| err())?;
        if !(1..=53).contains(&week) {
            return Err(err());
        }
        Ok(Self { year, week })
    }
}

impl Serialize for WeekKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_rejects_empty() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("user-1").is_ok());
    }

    #[test]
    fn user_id_serde_roundtrip() {
        let id = UserId::new("u-123").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"u-123\"");
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn user_id_serde_rejects_empty() {
        let result: Result<UserId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn entry_id_rejects_empty() {
        assert!(EntryId::new("").is_err());
        assert!(EntryId::new("e-1").is_ok());
    }

    #[test]
    fn day_key_display_and_parse() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let key = DayKey::Date(date);
        assert_eq!(key.to_string(), "2025-03-14");
        assert_eq!("2025-03-14".parse::<DayKey>().unwrap(), key);

        assert_eq!(DayKey::Unknown.to_string(), "unknown");
        assert_eq!("unknown".parse::<DayKey>().unwrap(), DayKey::Unknown);

        assert!("not-a-date".parse::<DayKey>().is_err());
    }

    #[test]
    fn day_key_unknown_orders_last() {
        let date = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap();
        assert!(DayKey::Date(date) < DayKey::Unknown);
    }

    #[test]
    fn week_key_from_date_handles_year_boundary() {
        // Jan 1, 2027 is a Friday and belongs to ISO week 2026-W53.
        let date = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        let week = WeekKey::from_date(date);
        assert_eq!(week, WeekKey { year: 2026, week: 53 });
        assert_eq!(week.to_string(), "2026-W53");
    }

    #[test]
    fn week_key_parse_roundtrip() {
        let week: WeekKey = "2025-W07".parse().unwrap();
        assert_eq!(week, WeekKey { year: 2025, week: 7 });
        assert!("2025-W54".parse::<WeekKey>().is_err());
        assert!("2025W07".parse::<WeekKey>().is_err());
    }

    #[test]
    fn day_key_serde_as_string() {
        let key = DayKey::Date(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2025-06-02\"");
        let parsed: DayKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }
}
