//! Overtime and capacity allocation engine for time-tracking reports.
//!
//! This crate turns already-normalized time entries into an overtime/billing
//! result model:
//! - Classification: mapping entries to work/break/PTO categories
//! - Capacity: resolving each day's effective regular-hours capacity from a
//!   precedence chain of sources (overrides, API holidays/time-off,
//!   entry-detected fallbacks, profiles, defaults)
//! - Allocation: splitting work hours into regular and (tiered) overtime
//!   buckets against a running counter, and prorating monetary amounts
//! - Aggregation: folding everything into per-user period totals
//!
//! The engine is a pure function: no I/O, no persistence, no shared state.
//! Fetching, pagination, rendering and export formatting are collaborators
//! upstream and downstream of [`compute_analysis`].

pub mod allocation;
pub mod capacity;
pub mod config;
pub mod day;
pub mod entry;
pub mod report;
pub mod types;

pub use allocation::{
    AllocatedEntry, AllocationBucket, BucketAmounts, BucketHours, MoneySplit, allocate_day,
    allocate_week, split_work_hours,
};
pub use capacity::{
    CapacityContext, CapacitySource, DayMeta, HolidayRecord, TimeOffRecord, WorkProfile,
    resolve_day_meta,
};
pub use config::{AmountDisplay, CapacityOverrides, OvertimeBasis, ReportConfig, UserOverride};
pub use day::{DayRecord, GroupedEntries, day_key_for, group_entries};
pub use entry::{Classification, EntryCategory, TimeEntry, classify};
pub use report::{AnalysisInput, AnalysisReport, UserPeriodTotals, compute_analysis};
pub use types::{DayKey, EntryId, UserId, ValidationError, WeekKey};
