use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::MINUTES_PER_DAY;
use crate::time::{ClockTime, Minutes};

/// A candidate start point on a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub time: ClockTime,
}

/// Half-open minute range `[start, end)` on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingInterval {
    pub date: NaiveDate,
    pub start: Minutes,
    pub end: Minutes,
}

impl BookingInterval {
    /// Build `[start, start + duration_total)`. `None` when the duration is zero
    /// or the session would run past midnight.
    pub fn new(date: NaiveDate, start: ClockTime, duration_total: Minutes) -> Option<Self> {
        let start = start.minutes();
        let end = start.checked_add(duration_total)?;
        if duration_total == 0 || end > MINUTES_PER_DAY {
            return None;
        }
        Some(Self { date, start, end })
    }

    pub fn duration(&self) -> Minutes {
        self.end - self.start
    }

    /// Touching intervals (`self.end == other.start`) do not overlap.
    pub fn overlaps(&self, other: &BookingInterval) -> bool {
        self.date == other.date && self.start < other.end && self.end > other.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

impl ReservationStatus {
    /// Whether an interval in this status occupies its time range.
    pub fn holds_slot(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }
}

/// Sanitized customer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// The full persisted booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    /// Storage key; the reference code is only a human-facing label.
    pub id: Ulid,
    pub reference: String,
    pub customer: CustomerContact,
    pub package_id: String,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub duration_total: Minutes,
    pub total_price: u64,
    pub downpayment: u64,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub payment_proof: Option<String>,
}

impl ReservationRecord {
    pub fn interval(&self) -> Option<BookingInterval> {
        BookingInterval::new(self.date, self.start_time, self.duration_total)
    }

    pub fn projection(&self) -> AvailabilityProjection {
        AvailabilityProjection {
            id: self.id,
            date: self.date,
            start_time: self.start_time,
            duration_total: self.duration_total,
            status: self.status,
        }
    }
}

/// Lightweight copy of a reservation kept for overlap queries, keyed by the record id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityProjection {
    pub id: Ulid,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub duration_total: Minutes,
    pub status: ReservationStatus,
}

impl AvailabilityProjection {
    pub fn interval(&self) -> Option<BookingInterval> {
        BookingInterval::new(self.date, self.start_time, self.duration_total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedDate {
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDefinition {
    pub id: String,
    pub name: String,
    pub price_minor_units: u64,
    pub duration_minutes: Minutes,
}

/// Store mutations. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreEvent {
    RecordCreated(ReservationRecord),
    ProjectionCreated(AvailabilityProjection),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 20).unwrap()
    }

    fn iv(start: Minutes, end: Minutes) -> BookingInterval {
        BookingInterval { date: date(), start, end }
    }

    fn at(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    #[test]
    fn interval_from_slot() {
        let i = BookingInterval::new(date(), at("10:00"), 45).unwrap();
        assert_eq!((i.start, i.end), (600, 645));
        assert_eq!(i.duration(), 45);
    }

    #[test]
    fn interval_rejects_zero_and_past_midnight() {
        assert!(BookingInterval::new(date(), at("10:00"), 0).is_none());
        assert!(BookingInterval::new(date(), at("23:30"), 60).is_none());
        // Ending exactly at midnight is fine.
        assert!(BookingInterval::new(date(), at("23:30"), 30).is_some());
    }

    #[test]
    fn overlap_touching_is_free() {
        let a = iv(600, 645);
        let b = iv(645, 700);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn overlap_partial() {
        let a = iv(600, 650);
        let b = iv(640, 700);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn overlap_symmetric_grid() {
        let spans: Vec<BookingInterval> = [(0, 30), (15, 45), (30, 60), (0, 90), (60, 61), (100, 200)]
            .iter()
            .map(|&(s, e)| iv(s, e))
            .collect();
        for a in &spans {
            for b in &spans {
                assert_eq!(a.overlaps(b), b.overlaps(a), "{a:?} vs {b:?}");
                if a.end <= b.start || b.end <= a.start {
                    assert!(!a.overlaps(b));
                }
            }
        }
    }

    #[test]
    fn overlap_requires_same_date() {
        let a = iv(600, 700);
        let mut b = a;
        b.date = date().succ_opt().unwrap();
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn status_holds_slot() {
        assert!(ReservationStatus::Pending.holds_slot());
        assert!(ReservationStatus::Confirmed.holds_slot());
        assert!(!ReservationStatus::Rejected.holds_slot());
        assert!(!ReservationStatus::Cancelled.holds_slot());
    }

    #[test]
    fn store_event_bincode_roundtrip() {
        let event = StoreEvent::ProjectionCreated(AvailabilityProjection {
            id: Ulid::new(),
            date: date(),
            start_time: at("13:00"),
            duration_total: 30,
            status: ReservationStatus::Pending,
        });
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: StoreEvent = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
