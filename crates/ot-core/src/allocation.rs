//! Overtime and amount allocation.
//!
//! Splits each work entry's hours across the {Regular, OvertimeTier1,
//! OvertimeTier2} buckets against a running consumed-hours counter, then
//! prorates the entry's monetary rates across the resulting buckets.
//!
//! The running counter is an explicit accumulator threaded through a pure
//! fold over the day's (or week's) entries in chronological order; there is
//! no shared mutable state, which keeps per-user processing independent.

use serde::Serialize;

use crate::capacity::DayMeta;
use crate::config::ReportConfig;
use crate::entry::{Classification, EntryCategory, TimeEntry, classify, sanitize_hours};

/// Hour bucket an allocated slice belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AllocationBucket {
    Regular,
    OvertimeTier1,
    OvertimeTier2,
}

/// Hours of one entry split across the allocation buckets.
///
/// Invariant: `regular + tier1 + tier2` equals the entry's classified
/// duration exactly (no hours created or lost).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketHours {
    pub regular: f64,
    pub tier1: f64,
    pub tier2: f64,
}

impl BucketHours {
    /// All hours in the regular bucket.
    #[must_use]
    pub const fn regular_only(hours: f64) -> Self {
        Self {
            regular: hours,
            tier1: 0.0,
            tier2: 0.0,
        }
    }

    /// Total hours across all buckets.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.regular + self.tier1 + self.tier2
    }

    /// Overtime hours (both tiers).
    #[must_use]
    pub fn overtime(&self) -> f64 {
        self.tier1 + self.tier2
    }
}

/// Earned/cost/profit amounts for one bucket, at multiplier 1.
///
/// Premiums are tracked separately on [`AllocatedEntry`]; bucket amounts
/// conserve the entry's rate-weighted total exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneySplit {
    pub earned: f64,
    pub cost: f64,
    pub profit: f64,
}

/// Monetary amounts of one entry split across the allocation buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketAmounts {
    pub regular: MoneySplit,
    pub tier1: MoneySplit,
    pub tier2: MoneySplit,
}

impl BucketAmounts {
    /// Total earned across buckets, before premiums.
    #[must_use]
    pub fn earned_total(&self) -> f64 {
        self.regular.earned + self.tier1.earned + self.tier2.earned
    }

    /// Total cost across buckets.
    #[must_use]
    pub fn cost_total(&self) -> f64 {
        self.regular.cost + self.tier1.cost + self.tier2.cost
    }

    /// Total profit across buckets, before premiums.
    #[must_use]
    pub fn profit_total(&self) -> f64 {
        self.regular.profit + self.tier1.profit + self.tier2.profit
    }
}

/// One entry after classification, overtime split and amount proration.
///
/// The flattened entry carries the `billable` key on the wire; its raw
/// tri-state flag is replaced with the classified value during allocation
/// so the serialized model has exactly one `billable` key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedEntry {
    #[serde(flatten)]
    pub entry: TimeEntry,
    pub category: EntryCategory,
    /// Classified billability; serialized via the flattened entry.
    #[serde(skip_serializing)]
    pub billable: bool,
    pub hours: BucketHours,
    pub amounts: BucketAmounts,
    /// Tier-1 overtime premium: `tier1.earned * (overtime_multiplier - 1)`.
    pub ot_premium: f64,
    /// Tier-2 overtime premium: `tier2.earned * (tier2_multiplier - 1)`.
    pub ot_premium_tier2: f64,
    /// Currency code of the resolved hourly rate.
    pub currency: String,
}

/// Splits a work entry's hours against a cumulative capacity boundary.
///
/// `consumed` is the running total of work hours already processed for the
/// day (or week); the return value carries the updated accumulator. The
/// full duration, overtime included, advances the counter so later entries
/// correctly see no remaining regular capacity.
///
/// `tier2_threshold` is the overtime band width before tier 2 starts;
/// `None` disables the tiered split (all overflow is tier 1).
#[must_use]
pub fn split_work_hours(
    consumed: f64,
    duration: f64,
    capacity: f64,
    tier2_threshold: Option<f64>,
) -> (BucketHours, f64) {
    let duration = sanitize_hours(duration);
    let remaining_capacity = (capacity - consumed).max(0.0);
    let regular = duration.min(remaining_capacity);
    let overflow = duration - regular;

    let (tier1, tier2) = match tier2_threshold {
        None => (overflow, 0.0),
        Some(threshold) => {
            // Overtime hours already consumed before this entry's overflow.
            let ot_position = (consumed + regular - capacity).max(0.0);
            let tier1_room = (threshold - ot_position).max(0.0);
            let tier1 = overflow.min(tier1_room);
            (tier1, overflow - tier1)
        }
    };

    (
        BucketHours {
            regular,
            tier1,
            tier2,
        },
        consumed + duration,
    )
}

/// Allocates one classified entry given the current accumulator, returning
/// the allocated entry and the updated accumulator.
///
/// Break and PTO entries land fully in the regular bucket and never
/// advance the counter; their hours do not count against capacity.
fn allocate_entry(
    consumed: f64,
    entry: &TimeEntry,
    capacity: f64,
    config: &ReportConfig,
) -> (AllocatedEntry, f64) {
    let classification = classify(entry);
    let duration = entry.classified_hours();

    let (hours, consumed) = match classification.category {
        EntryCategory::Work => {
            let tier2 = config
                .enable_tiered_ot
                .then_some(config.tier2_threshold_hours);
            split_work_hours(consumed, duration, capacity, tier2)
        }
        EntryCategory::Break | EntryCategory::Pto => (BucketHours::regular_only(duration), consumed),
    };

    (build_allocated(entry, classification, hours, config), consumed)
}

/// Allocates a day's entries (chronological order) against the day's
/// effective capacity. Daily overtime basis.
#[must_use]
pub fn allocate_day(
    entries: &[TimeEntry],
    meta: &DayMeta,
    config: &ReportConfig,
) -> Vec<AllocatedEntry> {
    let capacity = meta.effective_capacity_hours;
    let mut consumed = 0.0;
    entries
        .iter()
        .map(|entry| {
            let (allocated, next) = allocate_entry(consumed, entry, capacity, config);
            consumed = next;
            allocated
        })
        .collect()
}

/// Allocates one ISO week's days (chronological order) against a
/// cumulative weekly capacity. Weekly overtime basis.
///
/// The per-day effective capacities from the resolver are for display
/// only in this mode; the split decision uses `weekly_capacity`.
/// Returns one allocation vector per input day, in order.
#[must_use]
pub fn allocate_week(
    days: &[&[TimeEntry]],
    weekly_capacity: f64,
    config: &ReportConfig,
) -> Vec<Vec<AllocatedEntry>> {
    let mut consumed = 0.0;
    days.iter()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| {
                    let (allocated, next) =
                        allocate_entry(consumed, entry, weekly_capacity, config);
                    consumed = next;
                    allocated
                })
                .collect()
        })
        .collect()
}

/// Allocates sentinel-day entries: everything is regular, nothing consumes
/// capacity. Keeps the hour-conservation invariant for entries whose date
/// placement is unknown.
#[must_use]
pub fn allocate_unknown_day(entries: &[TimeEntry], config: &ReportConfig) -> Vec<AllocatedEntry> {
    entries
        .iter()
        .map(|entry| {
            let classification = classify(entry);
            let hours = BucketHours::regular_only(entry.classified_hours());
            build_allocated(entry, classification, hours, config)
        })
        .collect()
}

/// Prorates the entry's monetary rates across the hour buckets.
///
/// Non-billable entries get zero amounts regardless of rate fields; hours
/// are untouched. Amounts are never rounded here; rounding to currency
/// precision is the presentation layer's job.
fn build_allocated(
    entry: &TimeEntry,
    classification: Classification,
    hours: BucketHours,
    config: &ReportConfig,
) -> AllocatedEntry {
    let currency = entry.rates.hourly.currency.clone();

    let (amounts, ot_premium, ot_premium_tier2) = if classification.billable {
        let earned_rate = entry.rates.resolved_earned_rate();
        let cost_rate = entry.rates.resolved_cost_rate();

        let split = |bucket_hours: f64| {
            let earned = earned_rate * bucket_hours;
            let cost = cost_rate * bucket_hours;
            MoneySplit {
                earned,
                cost,
                profit: earned - cost,
            }
        };

        let amounts = BucketAmounts {
            regular: split(hours.regular),
            tier1: split(hours.tier1),
            tier2: split(hours.tier2),
        };
        // Multipliers apply to the premium only; the base amounts above
        // stay at multiplier 1 so both views can be rendered.
        let ot_premium = amounts.tier1.earned * (config.overtime_multiplier - 1.0);
        let ot_premium_tier2 = amounts.tier2.earned * (config.tier2_multiplier - 1.0);
        (amounts, ot_premium, ot_premium_tier2)
    } else {
        (BucketAmounts::default(), 0.0, 0.0)
    };

    let mut entry = entry.clone();
    entry.billable = Some(classification.billable);

    AllocatedEntry {
        entry,
        category: classification.category,
        billable: classification.billable,
        hours,
        amounts,
        ot_premium,
        ot_premium_tier2,
        currency,
    }
}
