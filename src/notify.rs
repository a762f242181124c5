use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{broadcast, watch};

use crate::model::BlockedDate;
use crate::ports::{BlockFeed, BookingNotice, Notifier, StoreError};

const CHANNEL_CAPACITY: usize = 256;

/// In-process broadcast of committed bookings, per date and for all dates.
pub struct NotifyHub {
    all: broadcast::Sender<BookingNotice>,
    by_date: DashMap<NaiveDate, broadcast::Sender<BookingNotice>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            all: broadcast::channel(CHANNEL_CAPACITY).0,
            by_date: DashMap::new(),
        }
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<BookingNotice> {
        self.all.subscribe()
    }

    /// Subscribe to commits on one date. Creates the channel if needed.
    pub fn subscribe(&self, date: NaiveDate) -> broadcast::Receiver<BookingNotice> {
        let sender = self
            .by_date
            .entry(date)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening. A date channel whose
    /// subscribers have all gone is dropped here.
    pub fn send(&self, notice: &BookingNotice) {
        let _ = self.all.send(notice.clone());
        if let Some(sender) = self.by_date.get(&notice.date) {
            let _ = sender.send(notice.clone());
        }
        self.by_date.remove_if(&notice.date, |_, sender| sender.receiver_count() == 0);
    }
}

#[async_trait]
impl Notifier for NotifyHub {
    async fn booking_committed(&self, notice: &BookingNotice) -> Result<(), StoreError> {
        self.send(notice);
        Ok(())
    }
}

/// Operator side of the block feed: publishes whole snapshots.
pub struct BlockFeedHub {
    tx: watch::Sender<Vec<BlockedDate>>,
}

impl Default for BlockFeedHub {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl BlockFeedHub {
    pub fn new(initial: Vec<BlockedDate>) -> Self {
        Self {
            tx: watch::Sender::new(initial),
        }
    }

    pub fn publish(&self, snapshot: Vec<BlockedDate>) {
        self.tx.send_replace(snapshot);
    }

    pub fn block(&self, date: NaiveDate, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_modify(|blocks| {
            blocks.retain(|b| b.date != date);
            blocks.push(BlockedDate { date, reason });
        });
    }

    pub fn unblock(&self, date: NaiveDate) {
        self.tx.send_modify(|blocks| blocks.retain(|b| b.date != date));
    }
}

impl BlockFeed for BlockFeedHub {
    fn subscribe(&self) -> watch::Receiver<Vec<BlockedDate>> {
        self.tx.subscribe()
    }
}
