//! Collaborator seams. The engine only ever talks to these traits; adapters live in
//! `store`, `catalog` and `notify`.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use ulid::Ulid;

use crate::model::*;
use crate::time::ClockTime;

/// Failure of a remote collaborator call. No assumption is made about whether a
/// write that returned one of these went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Unavailable(String),
    PermissionDenied(String),
    QuotaExceeded,
    Io(String),
    AlreadyExists(Ulid),
    /// Exclusive writes only: the range is already held by this reservation.
    RangeTaken(Ulid),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            StoreError::PermissionDenied(msg) => write!(f, "permission denied: {msg}"),
            StoreError::QuotaExceeded => write!(f, "store quota exceeded"),
            StoreError::Io(msg) => write!(f, "store I/O error: {msg}"),
            StoreError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            StoreError::RangeTaken(id) => write!(f, "range already held by reservation {id}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Whether `create_record` must enforce range exclusivity itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Plain insert; the caller's earlier re-validation is the only check.
    Optimistic,
    /// Reject with `RangeTaken` if an active record on the same date overlaps,
    /// atomically with the insert.
    Exclusive,
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Every projection on `date`, in any status. Always a fresh read.
    async fn fetch_projections(&self, date: NaiveDate) -> Result<Vec<AvailabilityProjection>, StoreError>;

    async fn create_record(&self, record: &ReservationRecord, mode: WriteMode) -> Result<(), StoreError>;

    async fn create_projection(&self, projection: &AvailabilityProjection) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PackageCatalog: Send + Sync {
    async fn list_packages(&self) -> Result<Vec<PackageDefinition>, StoreError>;
}

/// Push feed of operator-blocked dates. Each value is a full snapshot; the receiver
/// always sees the latest one, so a slow follower skips straight to current state.
pub trait BlockFeed: Send + Sync {
    fn subscribe(&self) -> watch::Receiver<Vec<BlockedDate>>;
}

/// What the notification collaborator receives after a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingNotice {
    pub reference: String,
    pub customer: CustomerContact,
    pub package_name: String,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub duration_total: u16,
    pub total_price: u64,
    pub downpayment: u64,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn booking_committed(&self, notice: &BookingNotice) -> Result<(), StoreError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock for tests and replays.
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_is_settable() {
        let t0 = Utc.with_ymd_and_hms(2025, 12, 20, 6, 5, 0).unwrap();
        let clock = FixedClock::new(t0);
        assert_eq!(clock.now(), t0);
        let t1 = Utc.with_ymd_and_hms(2025, 12, 21, 0, 0, 0).unwrap();
        clock.set(t1);
        assert_eq!(clock.now(), t1);
    }

    #[test]
    fn store_error_display() {
        assert_eq!(StoreError::QuotaExceeded.to_string(), "store quota exceeded");
        assert!(StoreError::Unavailable("timeout".into()).to_string().contains("timeout"));
    }
}
