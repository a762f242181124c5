use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::availability::AvailabilityIndex;
use crate::eligibility::{DayGrid, Eligibility};
use crate::model::PackageDefinition;
use crate::time::{ClockTime, Minutes};
use crate::validate::{ContactForm, ValidationError, check_extension};

use super::{BookingEngine, BookingError, BookingReceipt, Draft, Submission, SubmissionState};

/// One customer's pass through the booking form.
///
/// Holds the snapshot index for the selected date; it is rebuilt from a fresh query on
/// every date change and is only ever used for display hints. `submit` re-validates
/// against the store regardless.
pub struct BookingSession {
    engine: Arc<BookingEngine>,
    package: Option<PackageDefinition>,
    draft: Draft,
    index: Option<AvailabilityIndex>,
}

impl BookingSession {
    pub fn new(engine: Arc<BookingEngine>) -> Self {
        Self {
            engine,
            package: None,
            draft: Draft::default(),
            index: None,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn package(&self) -> Option<&PackageDefinition> {
        self.package.as_ref()
    }

    /// Package duration plus extension, once a package is chosen.
    pub fn duration_total(&self) -> Option<Minutes> {
        self.package
            .as_ref()
            .map(|p| p.duration_minutes.saturating_add(self.draft.extension_minutes))
    }

    pub async fn select_package(&mut self, id: &str) -> Result<(), BookingError> {
        let package = self.engine.package(id).await?;
        self.draft.package_id = package.id.clone();
        self.package = Some(package);
        self.clear_time_if_ineligible();
        Ok(())
    }

    /// Choose a date: clears the time and re-queries the store for that date.
    pub async fn select_date(&mut self, date: NaiveDate) -> Result<DayGrid, BookingError> {
        self.draft.date = Some(date);
        self.draft.start_time = None;
        self.index = None;
        if let Some(reason) = self.engine.blocks().reason_for(date) {
            debug!(%date, %reason, "selected date is blocked");
            return Ok(DayGrid::Blocked { date, reason });
        }
        self.index = Some(self.engine.load_index(date).await?);
        self.grid().ok_or(BookingError::InvalidState("no grid after loading index"))
    }

    /// Re-query the selected date without changing the selection.
    pub async fn refresh(&mut self) -> Result<Option<DayGrid>, BookingError> {
        let Some(date) = self.draft.date else { return Ok(None) };
        if self.engine.blocks().is_blocked(date) {
            self.index = None;
        } else {
            self.index = Some(self.engine.load_index(date).await?);
        }
        self.clear_time_if_ineligible();
        Ok(self.grid())
    }

    /// Current grid from the cached index. `None` until a package and date are chosen.
    pub fn grid(&self) -> Option<DayGrid> {
        let date = self.draft.date?;
        if let Some(reason) = self.engine.blocks().reason_for(date) {
            return Some(DayGrid::Blocked { date, reason });
        }
        let duration = self.duration_total()?;
        let index = self.index.as_ref()?;
        Some(self.engine.grid_for(index, duration, self.draft.start_time))
    }

    /// Pick a time on the selected date if the cached index says it is free.
    pub fn select_time(&mut self, time: ClockTime) -> Result<Eligibility, BookingError> {
        let eligibility = self.hint(time)?;
        if eligibility.is_eligible() {
            self.draft.start_time = Some(time);
        }
        Ok(eligibility)
    }

    pub fn set_extension(&mut self, minutes: Minutes) -> Result<(), ValidationError> {
        check_extension(minutes)?;
        self.draft.extension_minutes = minutes;
        self.clear_time_if_ineligible();
        Ok(())
    }

    pub fn set_contact(&mut self, contact: ContactForm) {
        self.draft.contact = contact;
    }

    pub fn set_payment_proof(&mut self, reference: Option<String>) {
        self.draft.payment_proof = reference;
    }

    /// Hand the draft to the submission protocol. On a conflict the time is cleared and
    /// the date re-queried so the grid shows the slot as booked.
    pub async fn submit(&mut self) -> Result<BookingReceipt, BookingError> {
        let mut submission = Submission::new(self.draft.clone());
        let result = self.engine.submit(&mut submission).await;
        let conflicted = matches!(submission.state(), SubmissionState::RejectedConflict { .. });
        if conflicted {
            self.draft = submission.into_draft();
            if let Err(e) = self.refresh().await {
                debug!(error = %e, "grid refresh after conflict failed");
            }
        }
        result
    }

    fn hint(&self, time: ClockTime) -> Result<Eligibility, BookingError> {
        let date = self.draft.date.ok_or(ValidationError::MissingField("date"))?;
        let duration = self.duration_total().ok_or(ValidationError::MissingField("package"))?;
        if self.engine.blocks().is_blocked(date) {
            return Ok(Eligibility::Blocked);
        }
        let index = self
            .index
            .as_ref()
            .ok_or(BookingError::InvalidState("date selected but availability not loaded"))?;
        Ok(self.engine.eligibility(index, time, duration))
    }

    fn clear_time_if_ineligible(&mut self) {
        if let Some(time) = self.draft.start_time
            && !self.hint(time).is_ok_and(|e| e.is_eligible())
        {
            self.draft.start_time = None;
        }
    }
}
