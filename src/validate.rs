use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::limits::*;
use crate::model::CustomerContact;
use crate::time::{ClockTime, Minutes};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@<>]+@[^\s@<>.]+(\.[^\s@<>.]+)+$").expect("static email pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField(&'static str),
    InvalidName,
    InvalidEmail,
    InvalidPhone,
    InvalidExtension(Minutes),
    PaymentProofTooLong,
    UnknownPackage(String),
    DateBlocked { date: NaiveDate, reason: String },
    SlotInPast { date: NaiveDate, time: ClockTime },
    /// Outside opening hours or off the slot step.
    NotASlot { date: NaiveDate, time: ClockTime },
    /// The session would run past midnight (or has no length at all).
    DoesNotFit { time: ClockTime, duration: Minutes },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField(field) => write!(f, "{field} is required"),
            ValidationError::InvalidName => {
                write!(f, "name must be {MIN_NAME_LEN}-{MAX_NAME_LEN} characters")
            }
            ValidationError::InvalidEmail => write!(f, "email address is not valid"),
            ValidationError::InvalidPhone => {
                write!(f, "phone number must have {MIN_PHONE_DIGITS}-{MAX_PHONE_DIGITS} digits")
            }
            ValidationError::InvalidExtension(m) => write!(
                f,
                "extension must be a multiple of {EXTENSION_UNIT_MINUTES} minutes up to {MAX_EXTENSION_MINUTES}, got {m}"
            ),
            ValidationError::PaymentProofTooLong => write!(f, "payment proof reference too long"),
            ValidationError::UnknownPackage(id) => write!(f, "unknown package: {id}"),
            ValidationError::DateBlocked { date, reason } => write!(f, "{date} is unavailable: {reason}"),
            ValidationError::SlotInPast { date, time } => write!(f, "{date} {time} has already passed"),
            ValidationError::NotASlot { date, time } => write!(f, "{time} is not a bookable start time on {date}"),
            ValidationError::DoesNotFit { time, duration } => {
                write!(f, "a {duration}-minute session cannot start at {time}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Contact details as typed by the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl ContactForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    pub fn sanitize(&self) -> Result<CustomerContact, ValidationError> {
        Ok(CustomerContact {
            name: sanitize_name(&self.name)?,
            email: sanitize_email(&self.email)?,
            phone: sanitize_phone(&self.phone)?,
        })
    }
}

/// Strip control characters and angle brackets, collapse whitespace.
pub fn sanitize_name(raw: &str) -> Result<String, ValidationError> {
    let cleaned: String = raw.chars().filter(|c| !c.is_control() && *c != '<' && *c != '>').collect();
    let name = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    let len = name.chars().count();
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
        return Err(ValidationError::InvalidName);
    }
    Ok(name)
}

pub fn sanitize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::MissingField("email"));
    }
    if email.len() > MAX_EMAIL_LEN || !EMAIL.is_match(&email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email)
}

/// Keep digits and an optional leading `+`; spaces, dashes, dots and parentheses are separators.
pub fn sanitize_phone(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("phone"));
    }
    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };
    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return Err(ValidationError::InvalidPhone),
        }
    }
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len()) {
        return Err(ValidationError::InvalidPhone);
    }
    Ok(format!("{plus}{digits}"))
}

pub fn check_extension(minutes: Minutes) -> Result<(), ValidationError> {
    if minutes > MAX_EXTENSION_MINUTES || minutes % EXTENSION_UNIT_MINUTES != 0 {
        return Err(ValidationError::InvalidExtension(minutes));
    }
    Ok(())
}

/// Trim; empty means none.
pub fn sanitize_payment_proof(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.len() > MAX_PAYMENT_PROOF_LEN => Err(ValidationError::PaymentProofTooLong),
        Some(s) => Ok(Some(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_cleaned() {
        assert_eq!(sanitize_name("  Ana   <b>Cruz</b>\t").unwrap(), "Ana bCruz/b");
        assert_eq!(sanitize_name("Jo").unwrap(), "Jo");
        assert_eq!(sanitize_name("   "), Err(ValidationError::MissingField("name")));
        assert_eq!(sanitize_name("J"), Err(ValidationError::InvalidName));
        assert_eq!(sanitize_name(&"x".repeat(MAX_NAME_LEN + 1)), Err(ValidationError::InvalidName));
    }

    #[test]
    fn email_rules() {
        assert_eq!(sanitize_email(" Ana@Example.COM ").unwrap(), "ana@example.com");
        assert_eq!(sanitize_email("a.b+tag@mail.example.ph").unwrap(), "a.b+tag@mail.example.ph");
        for bad in ["ana", "ana@", "@example.com", "ana@example", "a na@example.com", "ana@exa..com"] {
            assert_eq!(sanitize_email(bad), Err(ValidationError::InvalidEmail), "{bad}");
        }
        assert_eq!(sanitize_email(""), Err(ValidationError::MissingField("email")));
    }

    #[test]
    fn phone_rules() {
        assert_eq!(sanitize_phone("+63 917-123-4567").unwrap(), "+639171234567");
        assert_eq!(sanitize_phone("(02) 8123.4567").unwrap(), "0281234567");
        assert_eq!(sanitize_phone("12345"), Err(ValidationError::InvalidPhone));
        assert_eq!(sanitize_phone("0917abc4567"), Err(ValidationError::InvalidPhone));
        assert_eq!(sanitize_phone("++639171234567"), Err(ValidationError::InvalidPhone));
        assert_eq!(sanitize_phone(""), Err(ValidationError::MissingField("phone")));
    }

    #[test]
    fn contact_form_sanitizes_all_fields() {
        let contact = ContactForm::new(" Ana Cruz ", "ANA@example.com", "0917 123 4567")
            .sanitize()
            .unwrap();
        assert_eq!(contact.name, "Ana Cruz");
        assert_eq!(contact.email, "ana@example.com");
        assert_eq!(contact.phone, "09171234567");
    }

    #[test]
    fn extension_rules() {
        assert!(check_extension(0).is_ok());
        assert!(check_extension(45).is_ok());
        assert!(check_extension(MAX_EXTENSION_MINUTES).is_ok());
        assert_eq!(check_extension(20), Err(ValidationError::InvalidExtension(20)));
        assert!(check_extension(MAX_EXTENSION_MINUTES + 15).is_err());
    }

    #[test]
    fn payment_proof() {
        assert_eq!(sanitize_payment_proof(None), Ok(None));
        assert_eq!(sanitize_payment_proof(Some("  ")), Ok(None));
        assert_eq!(sanitize_payment_proof(Some(" gcash/123.png ")), Ok(Some("gcash/123.png".into())));
        let long = "x".repeat(MAX_PAYMENT_PROOF_LEN + 1);
        assert_eq!(sanitize_payment_proof(Some(&long)), Err(ValidationError::PaymentProofTooLong));
    }
}
