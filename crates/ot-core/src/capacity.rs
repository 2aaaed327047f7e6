//! Per-day effective capacity resolution.
//!
//! For every (user, day) the engine needs a single effective regular-hours
//! capacity, picked from several mutually-overriding sources. The
//! precedence is implemented as an ordered chain of strategies, each
//! returning `Option<DayMeta>`, first match wins:
//!
//! 1. Manual per-day override
//! 2. API holiday (when `apply_holidays`)
//! 3. API time-off (when `apply_time_off`)
//! 4. Entry-detected holiday (only while the API holiday source is off)
//! 5. Entry-detected time-off (only while the API time-off source is off)
//! 6. Base capacity (profile working days / profile capacity / configured
//!    daily threshold)
//!
//! The entry-detected fallbacks are gated on the API *feature* being
//! disabled, not on the API having returned data for the day.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::{CapacityOverrides, ReportConfig};
use crate::entry::{EntryCategory, TYPE_HOLIDAY, TimeEntry, classify, sanitize_hours};
use crate::types::UserId;

/// Which source decided a day's effective capacity. Exactly one wins per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapacitySource {
    /// Profile `work_capacity_hours`.
    ProfileDefault,
    /// Day is outside the profile's working-days list.
    ProfileWorkingDaysOverride,
    /// Explicit per-day override.
    ManualOverride,
    /// Holiday record from the host API.
    ApiHoliday,
    /// Time-off record from the host API.
    ApiTimeOff,
    /// Full-coverage HOLIDAY entry, API holiday source disabled.
    EntryDetectedHoliday,
    /// PTO-typed entries, API time-off source disabled.
    EntryDetectedTimeOff,
    /// No source applied; configured daily threshold.
    NoData,
}

impl CapacitySource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProfileDefault => "profileDefault",
            Self::ProfileWorkingDaysOverride => "profileWorkingDaysOverride",
            Self::ManualOverride => "manualOverride",
            Self::ApiHoliday => "apiHoliday",
            Self::ApiTimeOff => "apiTimeOff",
            Self::EntryDetectedHoliday => "entryDetectedHoliday",
            Self::EntryDetectedTimeOff => "entryDetectedTimeOff",
            Self::NoData => "noData",
        }
    }
}

impl std::fmt::Display for CapacitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved capacity metadata for one (user, day).
///
/// Produced once per day and immutable thereafter; the day record caches it
/// for the remainder of the computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMeta {
    /// Regular-hours capacity remaining after holiday/time-off reductions.
    pub effective_capacity_hours: f64,
    pub is_holiday: bool,
    /// Holiday name; only the API source carries one.
    pub holiday_name: Option<String>,
    /// Day falls outside the profile's working days.
    pub is_non_working_day: bool,
    pub is_time_off: bool,
    /// Hours of time off applied against the base capacity.
    pub time_off_hours: f64,
    pub source: CapacitySource,
}

impl DayMeta {
    /// Meta for the sentinel day: entries there never interact with
    /// capacity, so the day carries no regular allowance.
    #[must_use]
    pub(crate) const fn unknown_day() -> Self {
        Self {
            effective_capacity_hours: 0.0,
            is_holiday: false,
            holiday_name: None,
            is_non_working_day: false,
            is_time_off: false,
            time_off_hours: 0.0,
            source: CapacitySource::NoData,
        }
    }
}

/// A user's work profile from the host API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkProfile {
    /// Daily capacity in hours.
    pub work_capacity_hours: f64,
    /// Weekday names ("MONDAY".."SUNDAY", case-insensitive). An empty list
    /// means no working-days data; every day counts as working.
    pub working_days: Vec<String>,
}

impl Default for WorkProfile {
    fn default() -> Self {
        Self {
            work_capacity_hours: 8.0,
            working_days: Vec::new(),
        }
    }
}

impl WorkProfile {
    /// Whether `date` is a working day per this profile.
    #[must_use]
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        if self.working_days.is_empty() {
            return true;
        }
        let weekday = weekday_name(date.weekday());
        self.working_days
            .iter()
            .any(|day| day.eq_ignore_ascii_case(weekday))
    }
}

const fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

/// An API-sourced holiday, pre-expanded to one record per covered date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HolidayRecord {
    pub name: String,
}

/// An API-sourced time-off record, pre-expanded per covered date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeOffRecord {
    /// Recorded hours for a partial day. Ignored when `full_day` is set.
    pub hours: f64,
    pub full_day: bool,
}

/// Everything the resolver needs besides the day itself.
#[derive(Debug, Clone, Copy)]
pub struct CapacityContext<'a> {
    pub config: &'a ReportConfig,
    pub overrides: &'a CapacityOverrides,
    pub profiles: &'a HashMap<UserId, WorkProfile>,
    pub holidays: &'a HashMap<UserId, HashMap<NaiveDate, HolidayRecord>>,
    pub time_off: &'a HashMap<UserId, HashMap<NaiveDate, TimeOffRecord>>,
}

/// Base capacity before holiday/time-off reductions.
struct BaseCapacity {
    hours: f64,
    is_non_working_day: bool,
    source: CapacitySource,
}

struct ResolveArgs<'a> {
    ctx: CapacityContext<'a>,
    user: &'a UserId,
    date: NaiveDate,
    entries: &'a [TimeEntry],
    base: BaseCapacity,
}

type Strategy = for<'a> fn(&ResolveArgs<'a>) -> Option<DayMeta>;

/// The precedence chain, top to bottom, first applicable wins.
const CHAIN: &[Strategy] = &[
    manual_override,
    api_holiday,
    api_time_off,
    entry_detected_holiday,
    entry_detected_time_off,
];

/// Resolves the effective capacity meta for one (user, date).
///
/// `entries` are the day's own entries; they only matter for the
/// entry-detected fallback sources. Deterministic and side-effect-free.
#[must_use]
pub fn resolve_day_meta(
    ctx: CapacityContext<'_>,
    user: &UserId,
    date: NaiveDate,
    entries: &[TimeEntry],
) -> DayMeta {
    let args = ResolveArgs {
        ctx,
        user,
        date,
        entries,
        base: base_capacity(ctx, user, date),
    };

    for strategy in CHAIN {
        if let Some(meta) = strategy(&args) {
            return meta;
        }
    }

    DayMeta {
        effective_capacity_hours: args.base.hours,
        is_holiday: false,
        holiday_name: None,
        is_non_working_day: args.base.is_non_working_day,
        is_time_off: false,
        time_off_hours: 0.0,
        source: args.base.source,
    }
}

fn base_capacity(ctx: CapacityContext<'_>, user: &UserId, date: NaiveDate) -> BaseCapacity {
    if let Some(hours) = ctx.overrides.day_override(user, date) {
        return BaseCapacity {
            hours: sanitize_hours(hours),
            is_non_working_day: false,
            source: CapacitySource::ManualOverride,
        };
    }

    let profile = ctx.profiles.get(user);

    if ctx.config.use_profile_working_days {
        if let Some(profile) = profile {
            if !profile.is_working_day(date) {
                return BaseCapacity {
                    hours: 0.0,
                    is_non_working_day: true,
                    source: CapacitySource::ProfileWorkingDaysOverride,
                };
            }
        }
    }

    if ctx.config.use_profile_capacity {
        if let Some(profile) = profile {
            return BaseCapacity {
                hours: sanitize_hours(profile.work_capacity_hours),
                is_non_working_day: false,
                source: CapacitySource::ProfileDefault,
            };
        }
    }

    BaseCapacity {
        hours: sanitize_hours(ctx.config.daily_threshold),
        is_non_working_day: false,
        source: CapacitySource::NoData,
    }
}

fn manual_override(args: &ResolveArgs<'_>) -> Option<DayMeta> {
    let hours = args.ctx.overrides.day_override(args.user, args.date)?;
    Some(DayMeta {
        effective_capacity_hours: sanitize_hours(hours),
        is_holiday: false,
        holiday_name: None,
        is_non_working_day: false,
        is_time_off: false,
        time_off_hours: 0.0,
        source: CapacitySource::ManualOverride,
    })
}

fn api_holiday(args: &ResolveArgs<'_>) -> Option<DayMeta> {
    if !args.ctx.config.apply_holidays {
        return None;
    }
    let record = args.ctx.holidays.get(args.user)?.get(&args.date)?;
    Some(DayMeta {
        effective_capacity_hours: 0.0,
        is_holiday: true,
        holiday_name: Some(record.name.clone()),
        is_non_working_day: args.base.is_non_working_day,
        is_time_off: false,
        time_off_hours: 0.0,
        source: CapacitySource::ApiHoliday,
    })
}

fn api_time_off(args: &ResolveArgs<'_>) -> Option<DayMeta> {
    if !args.ctx.config.apply_time_off {
        return None;
    }
    let record = args.ctx.time_off.get(args.user)?.get(&args.date)?;
    let base = args.base.hours;
    let hours = if record.full_day {
        base
    } else {
        sanitize_hours(record.hours)
    };
    Some(DayMeta {
        effective_capacity_hours: base - base.min(hours),
        is_holiday: false,
        holiday_name: None,
        is_non_working_day: args.base.is_non_working_day,
        is_time_off: true,
        time_off_hours: hours,
        source: CapacitySource::ApiTimeOff,
    })
}

/// Total hours of the day's PTO-classified entries, optionally restricted
/// to a specific type string.
fn pto_hours(entries: &[TimeEntry], type_filter: Option<&str>) -> f64 {
    entries
        .iter()
        .filter(|entry| classify(entry).category == EntryCategory::Pto)
        .filter(|entry| type_filter.is_none_or(|t| entry.has_type(t)))
        .map(TimeEntry::classified_hours)
        .sum()
}

fn entry_detected_holiday(args: &ResolveArgs<'_>) -> Option<DayMeta> {
    // Suppressed while the API holiday feature is enabled, even if the API
    // returned no data for this day.
    if args.ctx.config.apply_holidays {
        return None;
    }
    let holiday_hours = pto_hours(args.entries, Some(TYPE_HOLIDAY));
    // Full coverage: the HOLIDAY entry hours reach the day's base capacity.
    if holiday_hours <= 0.0 || holiday_hours < args.base.hours {
        return None;
    }
    Some(DayMeta {
        effective_capacity_hours: 0.0,
        is_holiday: true,
        holiday_name: None,
        is_non_working_day: args.base.is_non_working_day,
        is_time_off: false,
        time_off_hours: 0.0,
        source: CapacitySource::EntryDetectedHoliday,
    })
}

fn entry_detected_time_off(args: &ResolveArgs<'_>) -> Option<DayMeta> {
    if args.ctx.config.apply_time_off {
        return None;
    }
    let off_hours = pto_hours(args.entries, None);
    if off_hours <= 0.0 {
        return None;
    }
    Some(DayMeta {
        effective_capacity_hours: (args.base.hours - off_hours).max(0.0),
        is_holiday: false,
        holiday_name: None,
        is_non_working_day: args.base.is_non_working_day,
        is_time_off: true,
        time_off_hours: off_hours,
        source: CapacitySource::EntryDetectedTimeOff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserOverride;
    use crate::entry::fixtures::timed_entry;

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn date() -> NaiveDate {
        // A Monday.
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    struct Fixture {
        config: ReportConfig,
        overrides: CapacityOverrides,
        profiles: HashMap<UserId, WorkProfile>,
        holidays: HashMap<UserId, HashMap<NaiveDate, HolidayRecord>>,
        time_off: HashMap<UserId, HashMap<NaiveDate, TimeOffRecord>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: ReportConfig::default(),
                overrides: CapacityOverrides::default(),
                profiles: HashMap::new(),
                holidays: HashMap::new(),
                time_off: HashMap::new(),
            }
        }

        fn ctx(&self) -> CapacityContext<'_> {
            CapacityContext {
                config: &self.config,
                overrides: &self.overrides,
                profiles: &self.profiles,
                holidays: &self.holidays,
                time_off: &self.time_off,
            }
        }

        fn with_holiday(mut self, name: &str) -> Self {
            self.holidays.insert(
                user(),
                HashMap::from([(
                    date(),
                    HolidayRecord {
                        name: name.to_string(),
                    },
                )]),
            );
            self
        }

        fn with_time_off(mut self, hours: f64, full_day: bool) -> Self {
            self.time_off.insert(
                user(),
                HashMap::from([(date(), TimeOffRecord { hours, full_day })]),
            );
            self
        }

        fn with_day_override(mut self, hours: f64) -> Self {
            self.overrides.users.insert(
                user(),
                UserOverride {
                    per_day: HashMap::from([(date(), hours)]),
                    weekly: HashMap::new(),
                },
            );
            self
        }

        fn with_profile(mut self, capacity: f64, working_days: &[&str]) -> Self {
            self.profiles.insert(
                user(),
                WorkProfile {
                    work_capacity_hours: capacity,
                    working_days: working_days.iter().map(ToString::to_string).collect(),
                },
            );
            self
        }
    }

    fn holiday_entry(hours: f64) -> TimeEntry {
        timed_entry("h1", "u1", Some("HOLIDAY"), "2025-01-06T00:00:00Z", hours)
    }

    fn time_off_entry(hours: f64) -> TimeEntry {
        timed_entry("t1", "u1", Some("TIME_OFF"), "2025-01-06T09:00:00Z", hours)
    }

    #[test]
    fn default_threshold_when_no_sources() {
        let fixture = Fixture::new();
        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert!((meta.effective_capacity_hours - 8.0).abs() < 1e-9);
        assert_eq!(meta.source, CapacitySource::NoData);
        assert!(!meta.is_holiday);
        assert!(!meta.is_time_off);
    }

    #[test]
    fn manual_override_beats_everything() {
        let mut fixture = Fixture::new()
            .with_day_override(5.5)
            .with_holiday("New Year")
            .with_time_off(4.0, false);
        fixture.config.apply_holidays = true;
        fixture.config.apply_time_off = true;

        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert!((meta.effective_capacity_hours - 5.5).abs() < 1e-9);
        assert_eq!(meta.source, CapacitySource::ManualOverride);
    }

    #[test]
    fn api_holiday_zeroes_capacity_and_carries_name() {
        let mut fixture = Fixture::new().with_holiday("Labor Day");
        fixture.config.apply_holidays = true;

        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert!((meta.effective_capacity_hours).abs() < 1e-9);
        assert!(meta.is_holiday);
        assert_eq!(meta.holiday_name.as_deref(), Some("Labor Day"));
        assert_eq!(meta.source, CapacitySource::ApiHoliday);
    }

    #[test]
    fn api_holiday_name_beats_entry_detected_placeholder() {
        // Both an API holiday and a full-day HOLIDAY entry exist; the API
        // name must win.
        let mut fixture = Fixture::new().with_holiday("Official Name");
        fixture.config.apply_holidays = true;

        let entries = [holiday_entry(8.0)];
        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &entries);
        assert_eq!(meta.holiday_name.as_deref(), Some("Official Name"));
        assert_eq!(meta.source, CapacitySource::ApiHoliday);
    }

    #[test]
    fn api_time_off_partial_reduces_base() {
        let mut fixture = Fixture::new().with_time_off(3.0, false);
        fixture.config.apply_time_off = true;

        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert!((meta.effective_capacity_hours - 5.0).abs() < 1e-9);
        assert!(meta.is_time_off);
        assert!((meta.time_off_hours - 3.0).abs() < 1e-9);
        assert_eq!(meta.source, CapacitySource::ApiTimeOff);
    }

    #[test]
    fn api_time_off_full_day_consumes_base() {
        let mut fixture = Fixture::new().with_time_off(2.0, true);
        fixture.config.apply_time_off = true;

        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert!((meta.effective_capacity_hours).abs() < 1e-9);
        assert!((meta.time_off_hours - 8.0).abs() < 1e-9);
    }

    #[test]
    fn api_time_off_never_goes_negative() {
        let mut fixture = Fixture::new().with_time_off(12.0, false);
        fixture.config.apply_time_off = true;

        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert!((meta.effective_capacity_hours).abs() < 1e-9);
    }

    #[test]
    fn entry_detected_holiday_requires_full_coverage() {
        let fixture = Fixture::new();

        let full = [holiday_entry(8.0)];
        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &full);
        assert_eq!(meta.source, CapacitySource::EntryDetectedHoliday);
        assert!((meta.effective_capacity_hours).abs() < 1e-9);
        assert!(meta.is_holiday);
        assert!(meta.holiday_name.is_none());

        // Partial coverage falls through to entry-detected time off.
        let partial = [holiday_entry(4.0)];
        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &partial);
        assert_eq!(meta.source, CapacitySource::EntryDetectedTimeOff);
        assert!((meta.effective_capacity_hours - 4.0).abs() < 1e-9);
    }

    #[test]
    fn entry_detection_suppressed_by_api_presence_not_content() {
        // API features on, but no data for this day: the fallback must NOT
        // kick in.
        let mut fixture = Fixture::new();
        fixture.config.apply_holidays = true;
        fixture.config.apply_time_off = true;

        let entries = [holiday_entry(8.0), time_off_entry(4.0)];
        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &entries);
        assert_eq!(meta.source, CapacitySource::NoData);
        assert!((meta.effective_capacity_hours - 8.0).abs() < 1e-9);
    }

    #[test]
    fn entry_detected_time_off_reduces_base() {
        let fixture = Fixture::new();
        let entries = [time_off_entry(4.0)];

        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &entries);
        assert_eq!(meta.source, CapacitySource::EntryDetectedTimeOff);
        assert!((meta.effective_capacity_hours - 4.0).abs() < 1e-9);
        assert!((meta.time_off_hours - 4.0).abs() < 1e-9);

        // More PTO than base floors at 0.
        let entries = [time_off_entry(10.0)];
        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &entries);
        assert!((meta.effective_capacity_hours).abs() < 1e-9);
    }

    #[test]
    fn profile_capacity_used_when_enabled() {
        let mut fixture = Fixture::new().with_profile(6.0, &[]);
        fixture.config.use_profile_capacity = true;

        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert!((meta.effective_capacity_hours - 6.0).abs() < 1e-9);
        assert_eq!(meta.source, CapacitySource::ProfileDefault);

        // Flag off: profile ignored.
        fixture.config.use_profile_capacity = false;
        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert_eq!(meta.source, CapacitySource::NoData);
    }

    #[test]
    fn non_working_day_zeroes_capacity() {
        let mut fixture = Fixture::new().with_profile(8.0, &["TUESDAY", "WEDNESDAY"]);
        fixture.config.use_profile_capacity = true;
        fixture.config.use_profile_working_days = true;

        // 2025-01-06 is a Monday, outside the working days.
        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert!((meta.effective_capacity_hours).abs() < 1e-9);
        assert!(meta.is_non_working_day);
        assert_eq!(meta.source, CapacitySource::ProfileWorkingDaysOverride);
    }

    #[test]
    fn working_day_matching_is_case_insensitive() {
        let profile = WorkProfile {
            work_capacity_hours: 8.0,
            working_days: vec!["monday".to_string()],
        };
        assert!(profile.is_working_day(date()));

        let empty = WorkProfile {
            work_capacity_hours: 8.0,
            working_days: Vec::new(),
        };
        // No working-days data means every day is a working day.
        assert!(empty.is_working_day(date()));
    }

    #[test]
    fn time_off_reduction_uses_profile_base() {
        let mut fixture = Fixture::new()
            .with_profile(6.0, &[])
            .with_time_off(2.0, false);
        fixture.config.use_profile_capacity = true;
        fixture.config.apply_time_off = true;

        let meta = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert!((meta.effective_capacity_hours - 4.0).abs() < 1e-9);
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut fixture = Fixture::new().with_time_off(3.0, false);
        fixture.config.apply_time_off = true;

        let first = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        let second = resolve_day_meta(fixture.ctx(), &user(), date(), &[]);
        assert_eq!(first, second);
    }
}
