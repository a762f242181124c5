mod error;
mod session;
mod submission;

pub use error::BookingError;
pub use session::BookingSession;
pub use submission::{BookingReceipt, Draft, Submission, SubmissionState};

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::availability::AvailabilityIndex;
use crate::blocks::BlockRegistry;
use crate::catalog::resolve_packages;
use crate::config::BookingConfig;
use crate::eligibility::{DayGrid, Eligibility, SlotContext, build_grid, business_now};
use crate::model::PackageDefinition;
use crate::observability::*;
use crate::ports::{Clock, Notifier, PackageCatalog, ReservationStore};
use crate::reference::ReferenceGenerator;
use crate::time::{ClockTime, Minutes};
use crate::validate::ValidationError;

/// The four external collaborators plus the clock, injected at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ReservationStore>,
    pub catalog: Arc<dyn PackageCatalog>,
    pub notifier: Arc<dyn Notifier>,
    pub blocks: Arc<BlockRegistry>,
    pub clock: Arc<dyn Clock>,
}

pub struct BookingEngine {
    config: BookingConfig,
    references: ReferenceGenerator,
    store: Arc<dyn ReservationStore>,
    catalog: Arc<dyn PackageCatalog>,
    notifier: Arc<dyn Notifier>,
    blocks: Arc<BlockRegistry>,
    clock: Arc<dyn Clock>,
}

/// Why an index is being rebuilt; only used to label metrics.
#[derive(Debug, Clone, Copy)]
pub(super) enum QueryPurpose {
    Grid,
    Revalidate,
}

impl QueryPurpose {
    fn label(self) -> &'static str {
        match self {
            QueryPurpose::Grid => "grid",
            QueryPurpose::Revalidate => "revalidate",
        }
    }
}

impl BookingEngine {
    pub fn new(config: BookingConfig, ports: Collaborators) -> Result<Self, BookingError> {
        config.validate()?;
        let references = ReferenceGenerator::new(&config.reference_prefix)
            .map_err(|_| crate::config::ConfigError::InvalidPrefix(config.reference_prefix.clone()))?;
        Ok(Self {
            config,
            references,
            store: ports.store,
            catalog: ports.catalog,
            notifier: ports.notifier,
            blocks: ports.blocks,
            clock: ports.clock,
        })
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    pub fn blocks(&self) -> &Arc<BlockRegistry> {
        &self.blocks
    }

    pub fn references(&self) -> &ReferenceGenerator {
        &self.references
    }

    /// Wall-clock "now" in the business timezone.
    pub fn business_now(&self) -> NaiveDateTime {
        business_now(self.clock.now(), self.config.business_offset())
    }

    pub fn today(&self) -> NaiveDate {
        self.business_now().date()
    }

    pub async fn packages(&self) -> Result<Vec<PackageDefinition>, BookingError> {
        Ok(resolve_packages(self.catalog.as_ref()).await?)
    }

    pub async fn package(&self, id: &str) -> Result<PackageDefinition, BookingError> {
        self.packages()
            .await?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ValidationError::UnknownPackage(id.to_string()).into())
    }

    /// Query the store for `date` and build a fresh index. Never served from cache.
    pub async fn load_index(&self, date: NaiveDate) -> Result<AvailabilityIndex, BookingError> {
        self.query_index(date, QueryPurpose::Grid).await
    }

    pub(super) async fn query_index(
        &self,
        date: NaiveDate,
        purpose: QueryPurpose,
    ) -> Result<AvailabilityIndex, BookingError> {
        let started = Instant::now();
        let entries = self.store.fetch_projections(date).await;
        metrics::histogram!(STORE_QUERY_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        metrics::counter!(AVAILABILITY_QUERIES_TOTAL, "purpose" => purpose.label()).increment(1);
        let index = AvailabilityIndex::build(date, &entries?);
        debug!(%date, occupied = index.len(), purpose = purpose.label(), "availability index rebuilt");
        Ok(index)
    }

    pub(super) fn slot_context<'a>(
        &'a self,
        index: &'a AvailabilityIndex,
        blocked_reason: Option<&'a str>,
        duration_total: Minutes,
    ) -> SlotContext<'a> {
        SlotContext {
            hours: &self.config.hours,
            blocked_reason,
            index,
            now: self.business_now(),
            duration_total,
        }
    }

    /// Client-side hint for one slot against an already loaded index.
    pub fn eligibility(&self, index: &AvailabilityIndex, time: ClockTime, duration_total: Minutes) -> Eligibility {
        let reason = self.blocks.reason_for(index.date());
        self.slot_context(index, reason.as_deref(), duration_total)
            .evaluate(index.date(), time)
    }

    /// Grid for an already loaded index.
    pub fn grid_for(&self, index: &AvailabilityIndex, duration_total: Minutes, selected: Option<ClockTime>) -> DayGrid {
        let reason = self.blocks.reason_for(index.date());
        let ctx = self.slot_context(index, reason.as_deref(), duration_total);
        build_grid(index.date(), &ctx, selected)
    }

    /// Load and render `date`'s grid. Blocked dates are answered without a store query.
    pub async fn day_grid(
        &self,
        date: NaiveDate,
        duration_total: Minutes,
        selected: Option<ClockTime>,
    ) -> Result<DayGrid, BookingError> {
        if let Some(reason) = self.blocks.reason_for(date) {
            return Ok(DayGrid::Blocked { date, reason });
        }
        let index = self.load_index(date).await?;
        Ok(self.grid_for(&index, duration_total, selected))
    }
}
