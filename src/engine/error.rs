use ulid::Ulid;

use crate::config::ConfigError;
use crate::ports::StoreError;
use crate::time::ParseError;
use crate::validate::ValidationError;

#[derive(Debug)]
pub enum BookingError {
    /// Malformed time/date data from the catalog or caller code, not from the customer.
    Parse(ParseError),
    Validation(ValidationError),
    /// The final re-validation found this reservation on the chosen range.
    Conflict { existing: Ulid },
    Transport(StoreError),
    /// The record landed but its projection did not. Needs reconciliation, not a retry.
    PartialCommit {
        record_id: Ulid,
        reference: String,
        source: StoreError,
    },
    InvalidState(&'static str),
    Config(ConfigError),
}

impl BookingError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Transport(_))
    }

    /// Text for the booking form.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::Validation(e) => e.to_string(),
            BookingError::Conflict { .. } => {
                "That time was just booked by someone else. Please pick another slot.".into()
            }
            _ => "Something went wrong. Please try again.".into(),
        }
    }
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::Parse(e) => write!(f, "parse error: {e}"),
            BookingError::Validation(e) => write!(f, "validation error: {e}"),
            BookingError::Conflict { existing } => write!(f, "conflict with reservation: {existing}"),
            BookingError::Transport(e) => write!(f, "transport error: {e}"),
            BookingError::PartialCommit {
                record_id,
                reference,
                source,
            } => write!(
                f,
                "partial commit: record {record_id} ({reference}) written, projection failed: {source}"
            ),
            BookingError::InvalidState(msg) => write!(f, "invalid submission state: {msg}"),
            BookingError::Config(e) => write!(f, "config error: {e}"),
        }
    }
}

impl std::error::Error for BookingError {}

impl From<ParseError> for BookingError {
    fn from(e: ParseError) -> Self {
        BookingError::Parse(e)
    }
}

impl From<ValidationError> for BookingError {
    fn from(e: ValidationError) -> Self {
        BookingError::Validation(e)
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        BookingError::Transport(e)
    }
}

impl From<ConfigError> for BookingError {
    fn from(e: ConfigError) -> Self {
        BookingError::Config(e)
    }
}
