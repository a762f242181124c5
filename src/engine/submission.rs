use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use ulid::Ulid;

use crate::config::ConsistencyMode;
use crate::eligibility::Eligibility;
use crate::model::*;
use crate::observability::*;
use crate::ports::{BookingNotice, Notifier, StoreError, WriteMode};
use crate::pricing::{Quote, quote};
use crate::time::{ClockTime, Minutes, ParseError, parse_date};
use crate::validate::{ContactForm, ValidationError, check_extension, sanitize_payment_proof};

use super::{BookingEngine, BookingError, QueryPurpose};

/// Everything the customer has chosen so far. Selection lives here, not in shared state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub package_id: String,
    pub date: Option<NaiveDate>,
    pub start_time: Option<ClockTime>,
    pub extension_minutes: Minutes,
    pub contact: ContactForm,
    pub payment_proof: Option<String>,
}

impl Draft {
    pub fn new(package_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            ..Self::default()
        }
    }

    /// Select a slot from its `YYYY-MM-DD` / `HH:MM` strings.
    pub fn select_slot_str(&mut self, date: &str, time: &str) -> Result<(), ParseError> {
        let date = parse_date(date)?;
        let time: ClockTime = time.parse()?;
        self.date = Some(date);
        self.start_time = Some(time);
        Ok(())
    }
}

/// Proof of a committed booking, returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingReceipt {
    pub record_id: Ulid,
    pub reference: String,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub duration_total: Minutes,
    pub quote: Quote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Drafting,
    Validating,
    Committed(BookingReceipt),
    /// The chosen time was taken; it has been cleared from the draft.
    RejectedConflict { existing: Ulid },
    RejectedInvalid(ValidationError),
    /// A collaborator failed. Whether a write happened is unknown or partial.
    Failed,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionState::Drafting | SubmissionState::Validating)
    }
}

/// One pass through `Drafting → Validating → outcome`.
#[derive(Debug, Clone)]
pub struct Submission {
    draft: Draft,
    state: SubmissionState,
}

impl Submission {
    pub fn new(draft: Draft) -> Self {
        Self {
            draft,
            state: SubmissionState::Drafting,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Editable only while drafting.
    pub fn draft_mut(&mut self) -> Option<&mut Draft> {
        match self.state {
            SubmissionState::Drafting => Some(&mut self.draft),
            _ => None,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn into_draft(self) -> Draft {
        self.draft
    }

    /// Start a fresh drafting cycle after a rejection or failure, keeping the draft.
    /// A committed submission stays committed.
    ///
    /// A running `submit` holds the `&mut` borrow, so `Validating` seen here means that
    /// call was dropped before it finished. Whether it wrote anything is unknown, the same
    /// as after `Failed`.
    pub fn reopen(&mut self) -> Result<(), BookingError> {
        match self.state {
            SubmissionState::Committed(_) => Err(BookingError::InvalidState("submission already committed")),
            _ => {
                self.state = SubmissionState::Drafting;
                Ok(())
            }
        }
    }
}

/// Inputs that passed field validation.
struct Checked {
    contact: CustomerContact,
    package: PackageDefinition,
    interval: BookingInterval,
    start_time: ClockTime,
    payment_proof: Option<String>,
}

impl BookingEngine {
    /// Run the submission protocol. Re-queries the store for the chosen date after
    /// this call starts and before any write; nothing cached is trusted.
    pub async fn submit(&self, submission: &mut Submission) -> Result<BookingReceipt, BookingError> {
        if submission.state != SubmissionState::Drafting {
            return Err(BookingError::InvalidState("submit requires a drafting submission"));
        }
        submission.state = SubmissionState::Validating;
        debug!(package = %submission.draft.package_id, "submission validating");

        let result = self.validate_and_commit(&submission.draft).await;

        let outcome = match &result {
            Ok(receipt) => {
                submission.state = SubmissionState::Committed(receipt.clone());
                OUTCOME_COMMITTED
            }
            Err(BookingError::Conflict { existing }) => {
                submission.state = SubmissionState::RejectedConflict { existing: *existing };
                submission.draft.start_time = None;
                OUTCOME_CONFLICT
            }
            Err(BookingError::Validation(e)) => {
                submission.state = SubmissionState::RejectedInvalid(e.clone());
                OUTCOME_INVALID
            }
            Err(_) => {
                submission.state = SubmissionState::Failed;
                OUTCOME_FAILED
            }
        };
        metrics::counter!(SUBMISSIONS_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    async fn validate_and_commit(&self, draft: &Draft) -> Result<BookingReceipt, BookingError> {
        let checked = self.check_fields(draft).await?;
        let date = checked.interval.date;

        if let Some(reason) = self.blocks().reason_for(date) {
            return Err(ValidationError::DateBlocked { date, reason }.into());
        }

        // Final check: fresh query for the exact date, exact interval. The block set is
        // read again afterwards since the feed may have moved during the query.
        let index = self.query_index(date, QueryPurpose::Revalidate).await?;
        let blocked = self.blocks().reason_for(date);
        let time = checked.start_time;
        let ctx = self.slot_context(&index, blocked.as_deref(), checked.interval.duration());
        match ctx.evaluate(date, time) {
            Eligibility::Eligible => {}
            Eligibility::Overlapping(existing) => {
                warn!(%date, %time, %existing, "slot taken since it was shown");
                return Err(BookingError::Conflict { existing });
            }
            Eligibility::Blocked => {
                let reason = blocked.unwrap_or_default();
                return Err(ValidationError::DateBlocked { date, reason }.into());
            }
            Eligibility::Past => return Err(ValidationError::SlotInPast { date, time }.into()),
            Eligibility::OffGrid => return Err(ValidationError::NotASlot { date, time }.into()),
            Eligibility::OutOfDay => {
                return Err(ValidationError::DoesNotFit {
                    time,
                    duration: checked.interval.duration(),
                }
                .into());
            }
        }

        self.commit(checked).await
    }

    async fn check_fields(&self, draft: &Draft) -> Result<Checked, BookingError> {
        if draft.package_id.trim().is_empty() {
            return Err(ValidationError::MissingField("package").into());
        }
        let date = draft.date.ok_or(ValidationError::MissingField("date"))?;
        let start_time = draft.start_time.ok_or(ValidationError::MissingField("time"))?;
        let contact = draft.contact.sanitize()?;
        check_extension(draft.extension_minutes)?;
        let payment_proof = sanitize_payment_proof(draft.payment_proof.as_deref())?;

        let package = self.package(&draft.package_id).await?;
        let duration_total = package.duration_minutes.saturating_add(draft.extension_minutes);
        let interval = BookingInterval::new(date, start_time, duration_total).ok_or(ValidationError::DoesNotFit {
            time: start_time,
            duration: duration_total,
        })?;

        Ok(Checked {
            contact,
            package,
            interval,
            start_time,
            payment_proof,
        })
    }

    /// Record first, then projection. A projection failure is not rolled back.
    async fn commit(&self, checked: Checked) -> Result<BookingReceipt, BookingError> {
        let Checked {
            contact,
            package,
            interval,
            start_time,
            payment_proof,
        } = checked;
        let now = self.clock.now();
        let extension = interval.duration() - package.duration_minutes;
        let price = quote(&package, extension, self.config().extension_price_per_30_min);
        let record = ReservationRecord {
            id: Ulid::new(),
            reference: self.references().generate(self.today()),
            customer: contact,
            package_id: package.id.clone(),
            date: interval.date,
            start_time,
            duration_total: interval.duration(),
            total_price: price.total,
            downpayment: price.downpayment,
            status: ReservationStatus::Pending,
            created_at: now,
            payment_proof,
        };

        let mode = match self.config().consistency {
            ConsistencyMode::Optimistic => WriteMode::Optimistic,
            ConsistencyMode::ExclusiveRange => WriteMode::Exclusive,
        };
        match self.store.create_record(&record, mode).await {
            Ok(()) => {}
            Err(StoreError::RangeTaken(existing)) => {
                warn!(date = %record.date, time = %start_time, %existing, "store refused overlapping range");
                return Err(BookingError::Conflict { existing });
            }
            Err(e) => return Err(BookingError::Transport(e)),
        }

        if let Err(source) = self.store.create_projection(&record.projection()).await {
            error!(
                record_id = %record.id,
                reference = %record.reference,
                error = %source,
                "projection write failed after record write; reservation needs reconciliation"
            );
            metrics::counter!(PARTIAL_COMMITS_TOTAL).increment(1);
            return Err(BookingError::PartialCommit {
                record_id: record.id,
                reference: record.reference,
                source,
            });
        }

        info!(
            reference = %record.reference,
            date = %record.date,
            time = %start_time,
            duration = record.duration_total,
            "booking committed"
        );

        let notice = BookingNotice {
            reference: record.reference.clone(),
            customer: record.customer.clone(),
            package_name: package.name,
            date: record.date,
            start_time,
            duration_total: record.duration_total,
            total_price: record.total_price,
            downpayment: record.downpayment,
        };
        spawn_notification(Arc::clone(&self.notifier), notice);

        Ok(BookingReceipt {
            record_id: record.id,
            reference: record.reference,
            date: record.date,
            start_time,
            duration_total: record.duration_total,
            quote: price,
        })
    }
}

/// Fire-and-forget; a failure is logged and never reaches the booking result.
fn spawn_notification(notifier: Arc<dyn Notifier>, notice: BookingNotice) {
    tokio::spawn(async move {
        if let Err(e) = notifier.booking_committed(&notice).await {
            metrics::counter!(NOTIFY_FAILURES_TOTAL).increment(1);
            warn!(reference = %notice.reference, error = %e, "booking notification failed");
        }
    });
}
