//! Grouping entries into per-user, per-day buckets.
//!
//! The day key comes from the entry's start timestamp's calendar date in
//! the report's fixed-offset time zone (UTC when unset). Entries whose
//! start cannot be resolved go to the sentinel day and are still counted,
//! so hour totals stay conservative.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::allocation::AllocatedEntry;
use crate::capacity::DayMeta;
use crate::entry::TimeEntry;
use crate::types::{DayKey, UserId};

/// Entries grouped per user, then per day, in chronological order.
pub type GroupedEntries = BTreeMap<UserId, BTreeMap<DayKey, Vec<TimeEntry>>>;

/// One user's day in the final report model: resolved capacity meta plus
/// the day's allocated entries in chronological order.
///
/// Meta is produced once by the capacity resolver and immutable thereafter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub meta: DayMeta,
    pub entries: Vec<AllocatedEntry>,
}

/// Derives the day key for a start instant in the report time zone.
#[must_use]
pub fn day_key_for(start: Option<DateTime<Utc>>, utc_offset_minutes: Option<i32>) -> DayKey {
    let Some(start) = start else {
        return DayKey::Unknown;
    };
    let offset = utc_offset_minutes
        .and_then(|minutes| minutes.checked_mul(60))
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    DayKey::Date(start.with_timezone(&offset).date_naive())
}

/// Groups entries by (user, day) and orders each day chronologically.
///
/// The sort is stable: entries with equal start timestamps keep their
/// original fetch order, as do the sentinel-day entries (which all lack a
/// timestamp). Nothing is ever dropped.
#[must_use]
pub fn group_entries(entries: Vec<TimeEntry>, utc_offset_minutes: Option<i32>) -> GroupedEntries {
    let mut grouped: GroupedEntries = BTreeMap::new();

    for entry in entries {
        let key = day_key_for(entry.time_interval.start, utc_offset_minutes);
        if key == DayKey::Unknown {
            tracing::warn!(
                entry_id = %entry.id,
                user_id = %entry.user_id,
                "entry has no usable start timestamp, keeping under sentinel day"
            );
        }
        grouped
            .entry(entry.user_id.clone())
            .or_default()
            .entry(key)
            .or_default()
            .push(entry);
    }

    for days in grouped.values_mut() {
        for day_entries in days.values_mut() {
            day_entries.sort_by_key(|entry| entry.time_interval.start);
        }
    }

    grouped
}
