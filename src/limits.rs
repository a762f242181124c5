/// Minutes in a calendar day; every booking interval lives inside `[0, MINUTES_PER_DAY]`.
pub const MINUTES_PER_DAY: u16 = 1440;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MIN_PHONE_DIGITS: usize = 7;
pub const MAX_PHONE_DIGITS: usize = 15;
pub const MAX_PAYMENT_PROOF_LEN: usize = 512;

/// Extensions are sold in grid units and capped per booking.
pub const EXTENSION_UNIT_MINUTES: u16 = 15;
pub const MAX_EXTENSION_MINUTES: u16 = 240;

/// Codes remembered per business day for repeat avoidance.
pub const MAX_REMEMBERED_REFERENCES: usize = 100_000;
pub const MAX_REFERENCE_DRAWS: usize = 64;

/// Largest encoded WAL entry. A longer length prefix on replay is a corrupt tail.
pub const MAX_WAL_ENTRY_BYTES: usize = 64 * 1024;
