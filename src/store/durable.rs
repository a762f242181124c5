use std::io;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::info;

use crate::model::*;
use crate::ports::{ReservationStore, StoreError, WriteMode};
use crate::wal::Wal;

use super::InMemoryReservationStore;

struct AppendRequest {
    event: StoreEvent,
    response: oneshot::Sender<io::Result<()>>,
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available appends.
/// 4. Single `flush_sync` for the whole batch.
/// 5. Answer every sender with the batch result.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<AppendRequest>) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }
        let result = flush_batch(&mut wal, &batch);
        for req in batch {
            let r = match &result {
                Ok(()) => Ok(()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            };
            let _ = req.response.send(r);
        }
    }
    info!(path = %wal.path().display(), appends = wal.appends(), "WAL writer stopped");
}

fn flush_batch(wal: &mut Wal, batch: &[AppendRequest]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for req in batch {
        if let Err(e) = wal.append_buffered(&req.event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush, even on append error, so partially buffered bytes
    // don't leak into the next batch.
    let flush_err = wal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

/// In-memory store whose every mutation is made durable in a WAL before it is applied.
pub struct DurableReservationStore {
    state: InMemoryReservationStore,
    wal_tx: mpsc::Sender<AppendRequest>,
    /// Serializes check → append → apply so exclusive writes stay atomic across the fsync.
    write_lock: Mutex<()>,
}

impl DurableReservationStore {
    /// Replay `path` (if present) and start the writer task. Must run inside a tokio runtime.
    pub fn open(path: &Path) -> io::Result<Self> {
        let events = Wal::replay(path)?;
        let state = InMemoryReservationStore::new();
        for event in &events {
            state.apply(event);
        }
        info!(path = %path.display(), events = events.len(), "reservation log replayed");

        let wal = Wal::open(path)?;
        let (wal_tx, wal_rx) = mpsc::channel(1024);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        Ok(Self {
            state,
            wal_tx,
            write_lock: Mutex::new(()),
        })
    }

    pub fn state(&self) -> &InMemoryReservationStore {
        &self.state
    }

    async fn wal_append(&self, event: &StoreEvent) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(AppendRequest {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| StoreError::Io("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Io("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    async fn persist_and_apply(&self, event: StoreEvent) -> Result<(), StoreError> {
        self.wal_append(&event).await?;
        self.state.apply(&event);
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for DurableReservationStore {
    async fn fetch_projections(&self, date: NaiveDate) -> Result<Vec<AvailabilityProjection>, StoreError> {
        self.state.fetch_projections(date).await
    }

    async fn create_record(&self, record: &ReservationRecord, mode: WriteMode) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.state.check_record(record, mode)?;
        self.persist_and_apply(StoreEvent::RecordCreated(record.clone())).await
    }

    async fn create_projection(&self, projection: &AvailabilityProjection) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.state.check_projection(projection)?;
        self.persist_and_apply(StoreEvent::ProjectionCreated(projection.clone())).await
    }
}
