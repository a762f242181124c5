use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::model::BlockedDate;
use crate::ports::BlockFeed;

/// Dates an operator has disabled, mirrored from the block feed.
#[derive(Debug, Default)]
pub struct BlockRegistry {
    blocked: RwLock<HashMap<NaiveDate, String>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blocked(&self, date: NaiveDate) -> bool {
        self.read().contains_key(&date)
    }

    pub fn reason_for(&self, date: NaiveDate) -> Option<String> {
        self.read().get(&date).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Replace the whole set with `snapshot`. Later duplicates of a date win.
    pub fn replace(&self, snapshot: &[BlockedDate]) {
        let next: HashMap<NaiveDate, String> = snapshot.iter().map(|b| (b.date, b.reason.clone())).collect();
        debug!(blocked = next.len(), "applying block snapshot");
        *self.blocked.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    /// Apply the feed's current snapshot now, then keep following it in a background task.
    /// The task ends when the feed is dropped; the last snapshot stays in effect.
    pub fn follow(self: &Arc<Self>, feed: &dyn BlockFeed) -> JoinHandle<()> {
        let mut rx = feed.subscribe();
        self.replace(&rx.borrow_and_update());
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                registry.replace(&snapshot);
            }
            info!("block feed closed; keeping last snapshot");
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<NaiveDate, String>> {
        self.blocked.read().unwrap_or_else(|e| e.into_inner())
    }
}
