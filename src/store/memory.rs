use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;
use crate::ports::{ReservationStore, StoreError, WriteMode};

#[derive(Debug, Default)]
struct DayLedger {
    records: Vec<ReservationRecord>,
    projections: Vec<AvailabilityProjection>,
}

/// Date-partitioned reservation store held in memory.
///
/// Each date's ledger sits behind its own map shard lock, which is what makes an
/// exclusive write's check-and-insert atomic.
pub struct InMemoryReservationStore {
    days: DashMap<NaiveDate, DayLedger>,
    /// Reverse lookup: record id → date.
    record_dates: DashMap<Ulid, NaiveDate>,
}

impl Default for InMemoryReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self {
            days: DashMap::new(),
            record_dates: DashMap::new(),
        }
    }

    pub fn record(&self, id: &Ulid) -> Option<ReservationRecord> {
        let date = *self.record_dates.get(id)?.value();
        let day = self.days.get(&date)?;
        day.records.iter().find(|r| r.id == *id).cloned()
    }

    pub fn records_on(&self, date: NaiveDate) -> Vec<ReservationRecord> {
        self.days.get(&date).map(|d| d.records.clone()).unwrap_or_default()
    }

    pub fn record_count(&self) -> usize {
        self.record_dates.len()
    }

    pub fn projection_count(&self) -> usize {
        self.days.iter().map(|d| d.projections.len()).sum()
    }

    /// Validate an insert without applying it.
    pub(crate) fn check_record(&self, record: &ReservationRecord, mode: WriteMode) -> Result<(), StoreError> {
        if self.record_dates.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        if mode == WriteMode::Exclusive
            && let Some(day) = self.days.get(&record.date)
        {
            check_exclusive(&day, record)?;
        }
        Ok(())
    }

    pub(crate) fn check_projection(&self, projection: &AvailabilityProjection) -> Result<(), StoreError> {
        let exists = self
            .days
            .get(&projection.date)
            .is_some_and(|d| d.projections.iter().any(|p| p.id == projection.id));
        if exists {
            return Err(StoreError::AlreadyExists(projection.id));
        }
        Ok(())
    }

    /// Apply a logged mutation. Replay and live writes share this path.
    pub(crate) fn apply(&self, event: &StoreEvent) {
        match event {
            StoreEvent::RecordCreated(record) => {
                self.days.entry(record.date).or_default().records.push(record.clone());
                self.record_dates.insert(record.id, record.date);
            }
            StoreEvent::ProjectionCreated(projection) => {
                self.days
                    .entry(projection.date)
                    .or_default()
                    .projections
                    .push(projection.clone());
            }
        }
    }

    fn insert_record(&self, record: &ReservationRecord, mode: WriteMode) -> Result<(), StoreError> {
        if self.record_dates.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id));
        }
        // Hold the date's entry across check and insert.
        let mut day = self.days.entry(record.date).or_default();
        if mode == WriteMode::Exclusive {
            check_exclusive(&day, record)?;
        }
        day.records.push(record.clone());
        drop(day);
        self.record_dates.insert(record.id, record.date);
        Ok(())
    }
}

fn check_exclusive(day: &DayLedger, record: &ReservationRecord) -> Result<(), StoreError> {
    let Some(candidate) = record.interval() else {
        return Ok(());
    };
    let taken = day
        .records
        .iter()
        .filter(|r| r.status.holds_slot())
        .find(|r| r.interval().is_some_and(|i| i.overlaps(&candidate)));
    match taken {
        Some(existing) => Err(StoreError::RangeTaken(existing.id)),
        None => Ok(()),
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn fetch_projections(&self, date: NaiveDate) -> Result<Vec<AvailabilityProjection>, StoreError> {
        Ok(self.days.get(&date).map(|d| d.projections.clone()).unwrap_or_default())
    }

    async fn create_record(&self, record: &ReservationRecord, mode: WriteMode) -> Result<(), StoreError> {
        self.insert_record(record, mode)
    }

    async fn create_projection(&self, projection: &AvailabilityProjection) -> Result<(), StoreError> {
        let mut day = self.days.entry(projection.date).or_default();
        if day.projections.iter().any(|p| p.id == projection.id) {
            return Err(StoreError::AlreadyExists(projection.id));
        }
        day.projections.push(projection.clone());
        Ok(())
    }
}
