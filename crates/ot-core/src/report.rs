//! Aggregation into per-user period totals and the top-level entry point.
//!
//! `compute_analysis` is the engine's single operation: a pure function
//! from (entries, config, per-user external data) to a freshly allocated
//! result model. Given identical inputs it produces identical output; it
//! performs no I/O and holds no state between invocations.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::allocation::{AllocatedEntry, allocate_day, allocate_unknown_day, allocate_week};
use crate::capacity::{
    CapacityContext, DayMeta, HolidayRecord, TimeOffRecord, WorkProfile, resolve_day_meta,
};
use crate::config::{AmountDisplay, CapacityOverrides, OvertimeBasis, ReportConfig};
use crate::day::{DayRecord, group_entries};
use crate::entry::{EntryCategory, TimeEntry};
use crate::types::{DayKey, UserId, WeekKey};

/// Everything one analysis run consumes. Owned by the caller; the engine
/// reads it and allocates fresh output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisInput {
    pub entries: Vec<TimeEntry>,
    pub config: ReportConfig,
    pub profiles: HashMap<UserId, WorkProfile>,
    /// Pre-expanded: one record per covered date per user.
    pub holidays: HashMap<UserId, HashMap<NaiveDate, HolidayRecord>>,
    /// Pre-expanded: one record per covered date per user.
    pub time_off: HashMap<UserId, HashMap<NaiveDate, TimeOffRecord>>,
    pub overrides: CapacityOverrides,
}

/// Aggregated totals for one user over the report period.
///
/// All fields are plain sums over the user's allocated entries and day
/// metas; aggregation is associative and order-independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPeriodTotals {
    /// Hours in the regular bucket, all categories included.
    pub regular: f64,
    /// Overtime hours, both tiers combined.
    pub overtime: f64,
    /// Tier-2 overtime hours only.
    pub overtime_tier2: f64,
    /// Break entry hours.
    pub breaks: f64,
    /// PTO entry hours (holiday + time-off entry types).
    pub vacation_entry_hours: f64,
    /// Total worked hours on billable entries.
    pub billable_worked: f64,
    /// Total worked hours on non-billable entries.
    pub non_billable_worked: f64,
    /// Overtime hours on billable entries.
    #[serde(rename = "billableOT")]
    pub billable_ot: f64,
    /// Overtime hours on non-billable entries.
    #[serde(rename = "nonBillableOT")]
    pub non_billable_ot: f64,
    /// Days flagged as holidays.
    pub holiday_count: u32,
    /// Days flagged as time off.
    pub time_off_count: u32,
    /// Amount in the configured display measure, premiums included.
    pub amount: f64,
    /// Same measure at multiplier 1 (no premiums).
    pub amount_base: f64,
    /// Tier-1 overtime premium total.
    pub ot_premium: f64,
    /// Tier-2 overtime premium total.
    pub ot_premium_tier2: f64,
}

impl UserPeriodTotals {
    fn add_entry(&mut self, allocated: &AllocatedEntry, display: AmountDisplay) {
        let hours = &allocated.hours;
        self.regular += hours.regular;
        self.overtime += hours.overtime();
        self.overtime_tier2 += hours.tier2;

        match allocated.category {
            EntryCategory::Break => self.breaks += hours.total(),
            EntryCategory::Pto => self.vacation_entry_hours += hours.total(),
            EntryCategory::Work => {
                if allocated.billable {
                    self.billable_worked += hours.total();
                    self.billable_ot += hours.overtime();
                } else {
                    self.non_billable_worked += hours.total();
                    self.non_billable_ot += hours.overtime();
                }
            }
        }

        let premiums = allocated.ot_premium + allocated.ot_premium_tier2;
        let (base, amount) = match display {
            AmountDisplay::Earned => {
                let base = allocated.amounts.earned_total();
                (base, base + premiums)
            }
            AmountDisplay::Cost => {
                let base = allocated.amounts.cost_total();
                (base, base)
            }
            // Premiums attach to the earned side, so they flow into profit.
            AmountDisplay::Profit => {
                let base = allocated.amounts.profit_total();
                (base, base + premiums)
            }
        };
        self.amount_base += base;
        self.amount += amount;
        self.ot_premium += allocated.ot_premium;
        self.ot_premium_tier2 += allocated.ot_premium_tier2;
    }

    fn add_day_meta(&mut self, meta: &DayMeta) {
        if meta.is_holiday {
            self.holiday_count += 1;
        }
        if meta.is_time_off {
            self.time_off_count += 1;
        }
    }
}

/// The full result model consumed by the rendering/export collaborators.
///
/// Hours and amounts are raw numbers; display formatting and currency
/// rounding happen downstream.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub days: BTreeMap<UserId, BTreeMap<DayKey, DayRecord>>,
    pub totals: BTreeMap<UserId, UserPeriodTotals>,
}

/// Runs the full overtime/capacity analysis.
///
/// Users are independent, so they are processed in parallel; results
/// collect into ordered maps so the output is deterministic regardless of
/// scheduling.
#[must_use]
pub fn compute_analysis(input: &AnalysisInput) -> AnalysisReport {
    let grouped = group_entries(input.entries.clone(), input.config.utc_offset_minutes);

    let ctx = CapacityContext {
        config: &input.config,
        overrides: &input.overrides,
        profiles: &input.profiles,
        holidays: &input.holidays,
        time_off: &input.time_off,
    };

    let per_user: Vec<(UserId, BTreeMap<DayKey, Vec<TimeEntry>>)> = grouped.into_iter().collect();
    let results: Vec<(UserId, BTreeMap<DayKey, DayRecord>, UserPeriodTotals)> = per_user
        .into_par_iter()
        .map(|(user, days)| {
            let (records, totals) = analyze_user(&user, days, ctx);
            (user, records, totals)
        })
        .collect();

    let mut report = AnalysisReport::default();
    for (user, records, totals) in results {
        report.days.insert(user.clone(), records);
        report.totals.insert(user, totals);
    }
    report
}

/// Resolves metas, allocates entries per the configured basis, and folds
/// totals for one user.
fn analyze_user(
    user: &UserId,
    days: BTreeMap<DayKey, Vec<TimeEntry>>,
    ctx: CapacityContext<'_>,
) -> (BTreeMap<DayKey, DayRecord>, UserPeriodTotals) {
    let config = ctx.config;
    // Meta first: resolved once per day, immutable afterwards, and needed
    // before any weekly pass.
    let mut metas: BTreeMap<DayKey, DayMeta> = BTreeMap::new();
    for (key, entries) in &days {
        let meta = match key.date() {
            Some(date) => resolve_day_meta(ctx, user, date, entries),
            None => DayMeta::unknown_day(),
        };
        metas.insert(*key, meta);
    }

    let allocated: BTreeMap<DayKey, Vec<AllocatedEntry>> = match config.overtime_basis {
        OvertimeBasis::Daily => days
            .iter()
            .map(|(key, entries)| {
                let allocated = match key.date() {
                    Some(_) => allocate_day(entries, &metas[key], config),
                    None => allocate_unknown_day(entries, config),
                };
                (*key, allocated)
            })
            .collect(),
        OvertimeBasis::Weekly => allocate_weekly_basis(user, &days, ctx),
    };

    let mut totals = UserPeriodTotals::default();
    let mut records = BTreeMap::new();
    for (key, entries) in allocated {
        let meta = metas.remove(&key).unwrap_or_else(DayMeta::unknown_day);
        totals.add_day_meta(&meta);
        for entry in &entries {
            totals.add_entry(entry, config.amount_display);
        }
        records.insert(key, DayRecord { meta, entries });
    }

    (records, totals)
}

/// Weekly basis: group the user's days into ISO weeks, thread the consumed
/// counter across each whole week, and allocate sentinel-day entries
/// separately (they belong to no week).
fn allocate_weekly_basis(
    user: &UserId,
    days: &BTreeMap<DayKey, Vec<TimeEntry>>,
    ctx: CapacityContext<'_>,
) -> BTreeMap<DayKey, Vec<AllocatedEntry>> {
    let config = ctx.config;
    let mut weeks: BTreeMap<WeekKey, Vec<DayKey>> = BTreeMap::new();
    let mut allocated = BTreeMap::new();

    for key in days.keys() {
        match key.week() {
            Some(week) => weeks.entry(week).or_default().push(*key),
            None => {
                allocated.insert(*key, allocate_unknown_day(&days[key], config));
            }
        }
    }

    for (week, day_keys) in weeks {
        let weekly_capacity = ctx
            .overrides
            .week_override(user, week)
            .unwrap_or(config.weekly_threshold);

        // Day keys come out of the BTreeMap already in chronological order.
        let week_days: Vec<&[TimeEntry]> =
            day_keys.iter().map(|key| days[key].as_slice()).collect();
        let week_allocated = allocate_week(&week_days, weekly_capacity, config);

        for (key, day_allocated) in day_keys.into_iter().zip(week_allocated) {
            allocated.insert(key, day_allocated);
        }
    }

    allocated
}
