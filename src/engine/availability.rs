use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;

/// Desired start times per weekday, as edited in the grid.
pub type DesiredByDay = BTreeMap<DayOfWeek, BTreeSet<ClockTime>>;

// ── Availability lookup ───────────────────────────────────────────

/// Is a lesson starting at `time` inside the declared starts for its day?
///
/// Declared starts are sorted; the candidate must fall in
/// `[starts[i], starts[i + 1])` for some consecutive pair, or equal the last
/// declared start. No declared starts means the instructor is off that day.
pub fn is_within_availability(time: ClockTime, starts: &BTreeSet<ClockTime>) -> bool {
    let Some(last) = starts.last() else {
        return false;
    };
    if time == *last {
        return true;
    }
    let sorted: Vec<u32> = starts.iter().map(ClockTime::minutes).collect();
    let t = time.minutes();
    sorted.windows(2).any(|pair| pair[0] <= t && t < pair[1])
}

/// Union of all declared starts for `day` across the given records.
pub fn declared_starts(records: &[AvailabilitySlot], day: DayOfWeek) -> BTreeSet<ClockTime> {
    records
        .iter()
        .filter(|r| r.day == day)
        .flat_map(|r| r.hours.iter().copied())
        .collect()
}

// ── Weekly grid ──────────────────────────────────────────────────

/// Day × start-time toggle matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyGrid {
    cells: DesiredByDay,
}

impl WeeklyGrid {
    pub const FIRST_ROW_HOUR: u32 = 8;
    pub const LAST_ROW_HOUR: u32 = 22;

    pub fn new() -> Self {
        Self::default()
    }

    /// The standard row set: every full hour from 08:00 to 22:00.
    pub fn standard_rows() -> Vec<ClockTime> {
        (Self::FIRST_ROW_HOUR..=Self::LAST_ROW_HOUR)
            .filter_map(|h| ClockTime::from_hm(h, 0))
            .collect()
    }

    pub fn from_records(records: &[AvailabilitySlot]) -> Self {
        let mut grid = Self::new();
        for r in records {
            for &h in &r.hours {
                grid.set(r.day, h, true);
            }
        }
        grid
    }

    pub fn is_set(&self, day: DayOfWeek, time: ClockTime) -> bool {
        self.cells.get(&day).is_some_and(|h| h.contains(&time))
    }

    pub fn set(&mut self, day: DayOfWeek, time: ClockTime, on: bool) {
        if on {
            self.cells.entry(day).or_default().insert(time);
        } else if let Some(hours) = self.cells.get_mut(&day) {
            hours.remove(&time);
            if hours.is_empty() {
                self.cells.remove(&day);
            }
        }
    }

    /// Flip one cell; returns the new state.
    pub fn toggle(&mut self, day: DayOfWeek, time: ClockTime) -> bool {
        let on = !self.is_set(day, time);
        self.set(day, time, on);
        on
    }

    pub fn hours(&self, day: DayOfWeek) -> BTreeSet<ClockTime> {
        self.cells.get(&day).cloned().unwrap_or_default()
    }

    pub fn desired(&self) -> DesiredByDay {
        self.cells.clone()
    }
}

// ── Reconciliation ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityAction {
    Create,
    Update,
    Delete,
}

impl AvailabilityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityAction::Create => "create",
            AvailabilityAction::Update => "update",
            AvailabilityAction::Delete => "delete",
        }
    }
}

/// One store write needed to reach the desired state for a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityOp {
    Create {
        day: DayOfWeek,
        hours: BTreeSet<ClockTime>,
    },
    Update {
        id: Ulid,
        day: DayOfWeek,
        hours: BTreeSet<ClockTime>,
    },
    Delete {
        id: Ulid,
        day: DayOfWeek,
    },
}

impl AvailabilityOp {
    pub fn day(&self) -> DayOfWeek {
        match self {
            AvailabilityOp::Create { day, .. }
            | AvailabilityOp::Update { day, .. }
            | AvailabilityOp::Delete { day, .. } => *day,
        }
    }

    pub fn action(&self) -> AvailabilityAction {
        match self {
            AvailabilityOp::Create { .. } => AvailabilityAction::Create,
            AvailabilityOp::Update { .. } => AvailabilityAction::Update,
            AvailabilityOp::Delete { .. } => AvailabilityAction::Delete,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub to_create: Vec<AvailabilityOp>,
    pub to_update: Vec<AvailabilityOp>,
    pub to_delete: Vec<AvailabilityOp>,
}

impl ReconcilePlan {
    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_ops(self) -> impl Iterator<Item = AvailabilityOp> {
        self.to_create
            .into_iter()
            .chain(self.to_update)
            .chain(self.to_delete)
    }
}

/// Index fetched records by day. If the store holds more than one record
/// for a day, the last one wins.
pub fn existing_by_day(records: &[AvailabilitySlot]) -> BTreeMap<DayOfWeek, AvailabilitySlot> {
    records.iter().map(|r| (r.day, r.clone())).collect()
}

/// Per-day writes turning `existing` into `desired`. Every non-empty desired
/// day is created or updated (even when its hours already match); every
/// existing day that is absent or emptied is deleted. A day lands in at most
/// one bucket.
pub fn reconcile(
    desired: &DesiredByDay,
    existing: &BTreeMap<DayOfWeek, AvailabilitySlot>,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for (&day, hours) in desired.iter().filter(|(_, h)| !h.is_empty()) {
        match existing.get(&day) {
            Some(rec) => plan.to_update.push(AvailabilityOp::Update {
                id: rec.id,
                day,
                hours: hours.clone(),
            }),
            None => plan.to_create.push(AvailabilityOp::Create {
                day,
                hours: hours.clone(),
            }),
        }
    }

    for (&day, rec) in existing {
        if desired.get(&day).is_none_or(|h| h.is_empty()) {
            plan.to_delete.push(AvailabilityOp::Delete { id: rec.id, day });
        }
    }

    plan
}
