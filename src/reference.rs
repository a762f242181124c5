use std::collections::HashSet;
use std::sync::Mutex;

use chrono::NaiveDate;
use regex::Regex;
use ulid::Ulid;

use crate::limits::{MAX_REFERENCE_DRAWS, MAX_REMEMBERED_REFERENCES};

/// `A-Z` and `0-9` without `0`, `O`, `1`, `I`.
pub const SUFFIX_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const SUFFIX_LEN: usize = 4;

/// Human-facing booking labels of the form `PREFIX-YYMMDD-XXXX`.
///
/// Not a unique key: the record's `Ulid` is. Codes issued during the current business
/// day are remembered so the same process never hands out an exact repeat.
pub struct ReferenceGenerator {
    prefix: String,
    pattern: Regex,
    issued: Mutex<(Option<NaiveDate>, HashSet<String>)>,
}

impl ReferenceGenerator {
    pub fn new(prefix: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"^{}-\d{{6}}-[A-Z0-9]{{{SUFFIX_LEN}}}$", regex::escape(prefix)))?;
        Ok(Self {
            prefix: prefix.to_string(),
            pattern,
            issued: Mutex::new((None, HashSet::new())),
        })
    }

    /// A fresh code stamped with `today` (the business-local date).
    pub fn generate(&self, today: NaiveDate) -> String {
        let stamp = today.format("%y%m%d");
        let mut guard = self.issued.lock().unwrap_or_else(|e| e.into_inner());
        let (day, seen) = &mut *guard;
        if *day != Some(today) || seen.len() >= MAX_REMEMBERED_REFERENCES {
            *day = Some(today);
            seen.clear();
        }
        let mut code = String::new();
        for _ in 0..MAX_REFERENCE_DRAWS {
            code = format!("{}-{stamp}-{}", self.prefix, random_suffix());
            if seen.insert(code.clone()) {
                return code;
            }
        }
        tracing::warn!(%code, "reference draws exhausted; issuing a repeat");
        code
    }

    pub fn is_valid(&self, code: &str) -> bool {
        self.pattern.is_match(code)
    }
}

fn random_suffix() -> String {
    // 80 random bits; the modulo bias over 32^4 draws is negligible.
    let mut bits = Ulid::new().random();
    let n = SUFFIX_ALPHABET.len() as u128;
    (0..SUFFIX_LEN)
        .map(|_| {
            let c = SUFFIX_ALPHABET[(bits % n) as usize] as char;
            bits /= n;
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 20).unwrap()
    }

    #[test]
    fn format_matches() {
        let generator = ReferenceGenerator::new("IOS").unwrap();
        let format = Regex::new(r"^IOS-\d{6}-[A-Z0-9]{4}$").unwrap();
        for _ in 0..200 {
            let code = generator.generate(today());
            assert!(format.is_match(&code), "{code}");
            assert!(code.starts_with("IOS-251220-"));
            assert!(generator.is_valid(&code));
        }
    }

    #[test]
    fn suffix_avoids_ambiguous_characters() {
        let generator = ReferenceGenerator::new("IOS").unwrap();
        for _ in 0..500 {
            let code = generator.generate(today());
            let suffix = &code[code.len() - SUFFIX_LEN..];
            assert!(!suffix.contains(['0', 'O', '1', 'I']), "{code}");
        }
    }

    #[test]
    fn thousand_calls_no_duplicates() {
        let generator = ReferenceGenerator::new("IOS").unwrap();
        let codes: HashSet<String> = (0..1000).map(|_| generator.generate(today())).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn rejects_malformed() {
        let generator = ReferenceGenerator::new("IOS").unwrap();
        assert!(generator.is_valid("IOS-251220-ABCD"));
        assert!(!generator.is_valid("IOS-251220-abcde"));
        assert!(!generator.is_valid("IOS-251220-abcd"));
        assert!(!generator.is_valid("IOS-25122-ABCD"));
        assert!(!generator.is_valid("ABC-251220-ABCD"));
        assert!(!generator.is_valid("INVALID"));
        assert!(!generator.is_valid("IOS-251220-ABCD\n"));
    }

    #[test]
    fn custom_prefix() {
        let generator = ReferenceGenerator::new("STU").unwrap();
        let code = generator.generate(today());
        assert!(code.starts_with("STU-251220-"));
        assert!(generator.is_valid(&code));
        assert!(!generator.is_valid("IOS-251220-ABCD"));
    }

    #[test]
    fn new_day_stamps_new_date() {
        let generator = ReferenceGenerator::new("IOS").unwrap();
        generator.generate(today());
        let code = generator.generate(today().succ_opt().unwrap());
        assert!(code.starts_with("IOS-251221-"));
    }
}
