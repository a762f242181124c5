use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{AvailabilityProjection, BookingInterval};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Occupied {
    id: Ulid,
    interval: BookingInterval,
}

/// Booked ranges for one date, rebuilt from a store query and never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityIndex {
    date: NaiveDate,
    /// Sorted by `interval.start`.
    occupied: Vec<Occupied>,
}

impl AvailabilityIndex {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            occupied: Vec::new(),
        }
    }

    /// Build from query results. Entries for other dates, entries that no longer hold
    /// their slot (rejected/cancelled) and malformed durations are skipped.
    pub fn build<'a>(date: NaiveDate, entries: impl IntoIterator<Item = &'a AvailabilityProjection>) -> Self {
        let mut occupied: Vec<Occupied> = entries
            .into_iter()
            .filter(|e| e.date == date && e.status.holds_slot())
            .filter_map(|e| {
                let interval = e.interval();
                if interval.is_none() {
                    tracing::warn!(id = %e.id, "skipping projection with unusable duration {}", e.duration_total);
                }
                interval.map(|interval| Occupied { id: e.id, interval })
            })
            .collect();
        occupied.sort_by_key(|o| o.interval.start);
        Self { date, occupied }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Id of the first indexed reservation intersecting `candidate`, if any.
    pub fn conflicting(&self, candidate: &BookingInterval) -> Option<Ulid> {
        if candidate.date != self.date {
            return None;
        }
        // Everything at index >= right_bound starts at or after candidate.end → can't overlap.
        let right_bound = self.occupied.partition_point(|o| o.interval.start < candidate.end);
        self.occupied[..right_bound]
            .iter()
            .find(|o| o.interval.overlaps(candidate))
            .map(|o| o.id)
    }

    pub fn overlaps(&self, candidate: &BookingInterval) -> bool {
        self.conflicting(candidate).is_some()
    }

    pub fn intervals(&self) -> impl Iterator<Item = &BookingInterval> {
        self.occupied.iter().map(|o| &o.interval)
    }
}
