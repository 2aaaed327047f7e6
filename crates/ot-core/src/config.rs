//! Report configuration and manual capacity overrides.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{UserId, WeekKey};

/// Whether overtime accrues against a daily or a weekly threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OvertimeBasis {
    #[default]
    Daily,
    Weekly,
}

impl OvertimeBasis {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl std::fmt::Display for OvertimeBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OvertimeBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            _ => Err(format!("invalid overtime basis: {s}")),
        }
    }
}

/// Which monetary measure the report's amount columns show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AmountDisplay {
    #[default]
    Earned,
    Cost,
    Profit,
}

impl AmountDisplay {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Earned => "earned",
            Self::Cost => "cost",
            Self::Profit => "profit",
        }
    }
}

impl std::fmt::Display for AmountDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AmountDisplay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earned" => Ok(Self::Earned),
            "cost" => Ok(Self::Cost),
            "profit" => Ok(Self::Profit),
            _ => Err(format!("invalid amount display: {s}")),
        }
    }
}

/// Configuration for one analysis run.
///
/// Validation of nonsensical values (negative thresholds and the like) is
/// the caller's responsibility; the engine uses these as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfig {
    /// Use the user profile's work capacity as the daily base capacity.
    pub use_profile_capacity: bool,

    /// Zero out capacity on days outside the profile's working-days list.
    pub use_profile_working_days: bool,

    /// Enable the API holiday source. While enabled, entry-detected
    /// holidays are suppressed even when the API returned no data.
    pub apply_holidays: bool,

    /// Enable the API time-off source. Same suppression rule as holidays.
    pub apply_time_off: bool,

    /// Daily or weekly overtime accrual.
    pub overtime_basis: OvertimeBasis,

    /// Split overtime into two tiers with separate multipliers.
    #[serde(rename = "enableTieredOT")]
    pub enable_tiered_ot: bool,

    /// Regular hours per day before overtime accrues. Default: 8.
    pub daily_threshold: f64,

    /// Regular hours per ISO week before overtime accrues (weekly basis).
    /// Default: 40.
    pub weekly_threshold: f64,

    /// Overtime hours beyond the capacity boundary before tier 2 applies.
    /// Default: 4.
    pub tier2_threshold_hours: f64,

    /// Pay multiplier for tier-1 overtime. Default: 1.5.
    pub overtime_multiplier: f64,

    /// Pay multiplier for tier-2 overtime. Default: 2.0.
    pub tier2_multiplier: f64,

    /// Monetary measure for the amount columns.
    pub amount_display: AmountDisplay,

    /// Rendering hint: split worked/overtime columns by billability.
    /// The engine always computes the splits; this flag is passed through
    /// to the table/export collaborators.
    pub show_billable_breakdown: bool,

    /// Report time zone as a fixed offset from UTC, in minutes.
    /// `None` means UTC. Day keys are derived in this zone.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            use_profile_capacity: false,
            use_profile_working_days: false,
            apply_holidays: false,
            apply_time_off: false,
            overtime_basis: OvertimeBasis::Daily,
            enable_tiered_ot: false,
            daily_threshold: 8.0,
            weekly_threshold: 40.0,
            tier2_threshold_hours: 4.0,
            overtime_multiplier: 1.5,
            tier2_multiplier: 2.0,
            amount_display: AmountDisplay::Earned,
            show_billable_breakdown: false,
            utc_offset_minutes: None,
        }
    }
}

/// Manual capacity overrides for one user.
///
/// Per-day overrides win the capacity precedence chain outright. Weekly
/// overrides replace the weekly threshold for that ISO week when the
/// overtime basis is weekly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserOverride {
    /// Explicit capacity hours per calendar date.
    pub per_day: HashMap<NaiveDate, f64>,
    /// Explicit capacity hours per ISO week.
    pub weekly: HashMap<WeekKey, f64>,
}

/// Manual capacity overrides, keyed by user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacityOverrides {
    pub users: HashMap<UserId, UserOverride>,
}

impl CapacityOverrides {
    /// Per-day override for a user/date, if any.
    #[must_use]
    pub fn day_override(&self, user: &UserId, date: NaiveDate) -> Option<f64> {
        self.users.get(user)?.per_day.get(&date).copied()
    }

    /// Weekly override for a user/week, if any.
    #[must_use]
    pub fn week_override(&self, user: &UserId, week: WeekKey) -> Option<f64> {
        self.users.get(user)?.weekly.get(&week).copied()
    }
}
