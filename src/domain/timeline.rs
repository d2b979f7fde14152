use crate::domain::interval::{DayWindow, Interval};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Free,
    Single,
    Overlap,
}

/// A stretch of the day over which the set of occupying intervals is constant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub occupants: Vec<Interval>,
}

impl Slot {
    pub fn kind(&self) -> SlotKind {
        match self.occupants.len() {
            0 => SlotKind::Free,
            1 => SlotKind::Single,
            _ => SlotKind::Overlap,
        }
    }
}

/// Partitions a day into disjoint slots and records which intervals occupy each.
///
/// Slot edges are the window's `00:00` and `23:59` boundaries plus every
/// interval boundary, so no interval starts or ends strictly inside a slot.
/// Unscheduled and degenerate intervals take no part. Inputs are expected to
/// be clipped to `window` already.
pub fn partition(intervals: &[Interval], window: &DayWindow) -> Vec<Slot> {
    let spans = intervals
        .iter()
        .filter_map(|interval| interval.span().map(|span| (interval, span)))
        .collect::<Vec<_>>();

    let mut boundaries = BTreeSet::from([window.start, window.last_minute()]);
    for (_, (start, end)) in &spans {
        boundaries.insert(*start);
        boundaries.insert(*end);
    }

    let boundaries = boundaries.into_iter().collect::<Vec<_>>();
    let slots = boundaries
        .windows(2)
        .map(|pair| {
            let (slot_start, slot_end) = (pair[0], pair[1]);
            let occupants = spans
                .iter()
                .filter(|(_, (start, end))| *start < slot_end && *end > slot_start)
                .map(|(interval, _)| (*interval).clone())
                .collect();
            Slot {
                start: slot_start,
                end: slot_end,
                occupants,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "event=partition module=domain date={} intervals={} slots={} overlaps={}",
        window.date,
        spans.len(),
        slots.len(),
        slots
            .iter()
            .filter(|slot| slot.kind() == SlotKind::Overlap)
            .count()
    );
    slots
}

pub fn overlap_groups(slots: &[Slot]) -> impl Iterator<Item = &Slot> {
    slots
        .iter()
        .filter(|slot| slot.kind() == SlotKind::Overlap)
}
