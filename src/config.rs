use std::fmt;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::time::Minutes;

/// Opening hours per day kind. Close hours are exclusive: the last slot starts one
/// step before closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessHours {
    pub weekday_open: u8,
    pub weekday_close: u8,
    pub weekend_open: u8,
    pub weekend_close: u8,
    pub step_minutes: Minutes,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            weekday_open: 10,
            weekday_close: 19,
            weekend_open: 9,
            weekend_close: 20,
            step_minutes: 30,
        }
    }
}

/// How the final re-validation relates to the commit write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    /// Re-query then write with no lock in between. Two racing submissions can both commit.
    #[default]
    Optimistic,
    /// The store rejects a record whose range overlaps an active one, atomically with the write.
    ExclusiveRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Business-local offset from UTC. "Today" and "now" are evaluated here, never in
    /// the client's zone.
    pub utc_offset_minutes: i32,
    pub hours: BusinessHours,
    pub reference_prefix: String,
    pub consistency: ConsistencyMode,
    /// Charged per started 30-minute block of extension time.
    pub extension_price_per_30_min: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 8 * 60,
            hours: BusinessHours::default(),
            reference_prefix: "IOS".into(),
            consistency: ConsistencyMode::Optimistic,
            extension_price_per_30_min: 100,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidOffset(i32),
    InvalidStep(Minutes),
    InvalidHours { open: u8, close: u8 },
    InvalidPrefix(String),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidOffset(m) => write!(f, "utc offset out of range: {m} minutes"),
            ConfigError::InvalidStep(s) => write!(f, "slot step must be 15 or 30 minutes, got {s}"),
            ConfigError::InvalidHours { open, close } => {
                write!(f, "business hours must satisfy open < close <= 24, got {open}..{close}")
            }
            ConfigError::InvalidPrefix(p) => {
                write!(f, "reference prefix must be 1-8 uppercase ASCII letters, got {p:?}")
            }
            ConfigError::Json(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl BookingConfig {
    /// Defaults overridden by `SLOTBOOK_*` environment variables. Unparseable values
    /// fall back to the default; the result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = env_parse("SLOTBOOK_UTC_OFFSET_MINUTES") {
            config.utc_offset_minutes = v;
        }
        if let Some(v) = env_parse("SLOTBOOK_SLOT_STEP_MINUTES") {
            config.hours.step_minutes = v;
        }
        if let Some(v) = env_parse("SLOTBOOK_WEEKDAY_OPEN") {
            config.hours.weekday_open = v;
        }
        if let Some(v) = env_parse("SLOTBOOK_WEEKDAY_CLOSE") {
            config.hours.weekday_close = v;
        }
        if let Some(v) = env_parse("SLOTBOOK_WEEKEND_OPEN") {
            config.hours.weekend_open = v;
        }
        if let Some(v) = env_parse("SLOTBOOK_WEEKEND_CLOSE") {
            config.hours.weekend_close = v;
        }
        if let Some(v) = env_parse("SLOTBOOK_EXTENSION_PRICE_PER_30_MIN") {
            config.extension_price_per_30_min = v;
        }
        if let Ok(prefix) = std::env::var("SLOTBOOK_REFERENCE_PREFIX") {
            config.reference_prefix = prefix;
        }
        config.consistency = match std::env::var("SLOTBOOK_CONSISTENCY").as_deref() {
            Ok("exclusive_range") => ConsistencyMode::ExclusiveRange,
            _ => ConsistencyMode::Optimistic,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).is_none() {
            return Err(ConfigError::InvalidOffset(self.utc_offset_minutes));
        }
        let step = self.hours.step_minutes;
        if step != 15 && step != 30 {
            return Err(ConfigError::InvalidStep(step));
        }
        for (open, close) in [
            (self.hours.weekday_open, self.hours.weekday_close),
            (self.hours.weekend_open, self.hours.weekend_close),
        ] {
            if open >= close || close > 24 {
                return Err(ConfigError::InvalidHours { open, close });
            }
        }
        let p = &self.reference_prefix;
        if p.is_empty() || p.len() > 8 || !p.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ConfigError::InvalidPrefix(p.clone()));
        }
        Ok(())
    }

    /// The business timezone. Falls back to UTC for an offset `validate` would reject.
    pub fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}
