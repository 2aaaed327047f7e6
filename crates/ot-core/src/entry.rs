//! Normalized time entries and their accounting classification.
//!
//! Entries arrive from the host API collaborator already normalized
//! (ISO-8601 timestamps, decimal-hour durations, numeric rate amounts).
//! Deserialization here is deliberately lenient: malformed values degrade
//! to absent instead of failing, because the engine must never reject an
//! entry outright.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EntryId, UserId};

/// Entry type string for breaks.
pub const TYPE_BREAK: &str = "BREAK";
/// Entry type string for holiday entries.
pub const TYPE_HOLIDAY: &str = "HOLIDAY";
/// Entry type string for time-off entries.
pub const TYPE_TIME_OFF: &str = "TIME_OFF";

/// Accounting category of an entry.
///
/// A tagged variant instead of string comparisons at every consumer: both
/// the overtime allocator and the aggregator branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    /// Regular work time, counts against capacity.
    Work,
    /// Break time, never counts against capacity.
    Break,
    /// Paid time off (holiday or time-off entry types).
    Pto,
}

impl EntryCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Break => "break",
            Self::Pto => "pto",
        }
    }
}

impl std::fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output: accounting category plus the billability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: EntryCategory,
    pub billable: bool,
}

/// Time interval of an entry, all fields optional and lenient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInterval {
    /// Start instant. `None` when missing or unparseable.
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub start: Option<DateTime<Utc>>,
    /// End instant. `None` when missing or unparseable.
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub end: Option<DateTime<Utc>>,
    /// Duration in decimal hours as reported by the host API.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration_hours: Option<f64>,
}

/// An hourly rate with currency, resolved to a numeric amount.
///
/// The host API sends either an object `{amount, currency}` or a bare
/// number; anything else degrades to a zero amount in USD.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyRate {
    pub amount: f64,
    pub currency: String,
}

impl Default for HourlyRate {
    fn default() -> Self {
        Self {
            amount: 0.0,
            currency: "USD".to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for HourlyRate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RateObject {
            #[serde(default)]
            amount: Option<f64>,
            #[serde(default)]
            currency: Option<String>,
        }

        let value = serde_json::Value::deserialize(deserializer)?;
        let rate = match value {
            serde_json::Value::Number(n) => Self {
                amount: n.as_f64().filter(|a| a.is_finite()).unwrap_or(0.0),
                ..Self::default()
            },
            serde_json::Value::Object(_) => {
                match serde_json::from_value::<RateObject>(value) {
                    Ok(obj) => Self {
                        amount: obj.amount.filter(|a| a.is_finite()).unwrap_or(0.0),
                        currency: obj
                            .currency
                            .filter(|c| !c.is_empty())
                            .unwrap_or_else(|| "USD".to_string()),
                    },
                    Err(_) => Self::default(),
                }
            }
            _ => Self::default(),
        };
        Ok(rate)
    }
}

/// Monetary rates for an entry, already resolved by the API collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateInfo {
    /// Hourly rate, object or bare number on the wire.
    #[serde(default)]
    pub hourly: HourlyRate,
    /// Earned rate amount; preferred over `hourly.amount` when finite and positive.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub earned_rate: Option<f64>,
    /// Cost rate amount; missing means 0.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cost_rate: Option<f64>,
}

impl RateInfo {
    /// The rate used for earned-amount proration: the explicit earned rate
    /// when finite and positive, otherwise the hourly rate amount.
    #[must_use]
    pub fn resolved_earned_rate(&self) -> f64 {
        match self.earned_rate {
            Some(rate) if rate.is_finite() && rate > 0.0 => rate,
            _ => sanitize_hours(self.hourly.amount),
        }
    }

    /// The rate used for cost-amount proration.
    #[must_use]
    pub fn resolved_cost_rate(&self) -> f64 {
        self.cost_rate
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .unwrap_or(0.0)
    }
}

/// An immutable, normalized time entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: EntryId,
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: String,
    /// Free-form entry type. Recognized: "REGULAR", "BREAK", "HOLIDAY",
    /// "TIME_OFF". Anything else (including absent) classifies as work.
    #[serde(default, rename = "type")]
    pub entry_type: Option<String>,
    /// Billability flag; only an explicit `false` makes the entry non-billable.
    #[serde(default)]
    pub billable: Option<bool>,
    #[serde(default)]
    pub time_interval: TimeInterval,
    #[serde(default)]
    pub rates: RateInfo,
    // Opaque pass-through dimensions for the rendering/export collaborators.
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_name: Option<String>,
}

impl TimeEntry {
    /// The entry's duration in hours for accounting purposes.
    ///
    /// Prefers the reported decimal-hour duration, falls back to the
    /// interval span. Negative and non-finite values degrade to 0 so no
    /// NaN ever reaches the totals.
    #[must_use]
    pub fn classified_hours(&self) -> f64 {
        if let Some(hours) = self.time_interval.duration_hours {
            if hours.is_finite() && hours > 0.0 {
                return hours;
            }
        }
        match (self.time_interval.start, self.time_interval.end) {
            (Some(start), Some(end)) if end > start => {
                let millis = (end - start).num_milliseconds();
                #[allow(clippy::cast_precision_loss)]
                let hours = millis as f64 / 3_600_000.0;
                sanitize_hours(hours)
            }
            _ => 0.0,
        }
    }

    /// Whether this entry carries the given recognized type string.
    #[must_use]
    pub fn has_type(&self, type_str: &str) -> bool {
        self.entry_type.as_deref() == Some(type_str)
    }
}

/// Maps an entry to its accounting category and billability flag.
///
/// Pure and total: unrecognized or absent type strings classify as
/// [`EntryCategory::Work`], never dropped. Matching is case-sensitive and
/// exact. Billable defaults to `true`; only an explicit `false` flips it.
#[must_use]
pub fn classify(entry: &TimeEntry) -> Classification {
    let category = match entry.entry_type.as_deref() {
        Some(TYPE_BREAK) => EntryCategory::Break,
        Some(TYPE_HOLIDAY | TYPE_TIME_OFF) => EntryCategory::Pto,
        _ => EntryCategory::Work,
    };
    Classification {
        category,
        billable: entry.billable != Some(false),
    }
}

/// Coerces non-finite or negative hour/amount values to 0.
#[must_use]
pub fn sanitize_hours(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(parse_timestamp(&raw))
}

/// Parses a strict ISO-8601 timestamp (`T` separator), with or without an
/// offset. Offset-less timestamps are taken as UTC. Returns `None` on
/// failure instead of erroring; the caller keeps the entry either way.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    tracing::trace!(raw, "unparseable timestamp");
    None
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(serde_json::Value::String(s)) => s.parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

/// Test fixture constructors shared by the engine's test modules.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::{EntryId, HourlyRate, RateInfo, TimeEntry, TimeInterval, UserId, parse_timestamp};
    use chrono::Duration;

    pub(crate) fn make_entry(id: &str, user: &str, entry_type: Option<&str>) -> TimeEntry {
        TimeEntry {
            id: EntryId::new(id).unwrap(),
            user_id: UserId::new(user).unwrap(),
            user_name: format!("User {user}"),
            entry_type: entry_type.map(String::from),
            billable: None,
            time_interval: TimeInterval::default(),
            rates: RateInfo::default(),
            project_id: None,
            project_name: None,
            client_id: None,
            client_name: None,
            task_id: None,
            task_name: None,
        }
    }

    /// An entry of the given type starting at `start` (ISO-8601) and
    /// lasting `hours`.
    pub(crate) fn timed_entry(
        id: &str,
        user: &str,
        entry_type: Option<&str>,
        start: &str,
        hours: f64,
    ) -> TimeEntry {
        let mut entry = make_entry(id, user, entry_type);
        let start = parse_timestamp(start).expect("valid fixture timestamp");
        #[allow(clippy::cast_possible_truncation)]
        let span = Duration::milliseconds((hours * 3_600_000.0) as i64);
        entry.time_interval = TimeInterval {
            start: Some(start),
            end: Some(start + span),
            duration_hours: Some(hours),
        };
        entry
    }

    pub(crate) fn work_entry(id: &str, user: &str, start: &str, hours: f64) -> TimeEntry {
        timed_entry(id, user, Some("REGULAR"), start, hours)
    }

    pub(crate) fn with_rates(
        mut entry: TimeEntry,
        hourly: f64,
        earned: Option<f64>,
        cost: Option<f64>,
    ) -> TimeEntry {
        entry.rates = RateInfo {
            hourly: HourlyRate {
                amount: hourly,
                currency: "USD".to_string(),
            },
            earned_rate: earned,
            cost_rate: cost,
        };
        entry
    }
}
