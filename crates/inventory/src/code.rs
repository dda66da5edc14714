//! Internal item codes: `YYYY-NNNN`, sequential within a calendar year.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult};

/// Human-readable, per-year sequential item code.
///
/// Ordering is by year, then sequence. Sequences are zero-padded to four digits;
/// a year with more than 9999 items keeps counting with wider numbers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InternalCode {
    year: i32,
    sequence: u32,
}

impl InternalCode {
    pub fn new(year: i32, sequence: u32) -> DomainResult<Self> {
        if !(1000..=9999).contains(&year) {
            return Err(DomainError::validation(format!(
                "internal code year must have four digits (got {year})"
            )));
        }
        if sequence == 0 {
            return Err(DomainError::validation("internal code sequence starts at 1"));
        }
        Ok(Self { year, sequence })
    }

    /// The first code of a year (`YYYY-0001`).
    pub fn first(year: i32) -> DomainResult<Self> {
        Self::new(year, 1)
    }

    /// The code following this one within the same year.
    pub fn next(&self) -> DomainResult<Self> {
        let sequence = self
            .sequence
            .checked_add(1)
            .ok_or_else(|| DomainError::invariant("internal code sequence exhausted"))?;
        Self::new(self.year, sequence)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl core::fmt::Display for InternalCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:04}", self.year, self.sequence)
    }
}

impl FromStr for InternalCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::invalid_id(format!("InternalCode: '{s}' is not YYYY-NNNN"));

        let (year, sequence) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || sequence.len() < 4 {
            return Err(invalid());
        }
        if !year.bytes().chain(sequence.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let sequence: u32 = sequence.parse().map_err(|_| invalid())?;
        Self::new(year, sequence).map_err(|_| invalid())
    }
}

impl TryFrom<String> for InternalCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InternalCode> for String {
    fn from(value: InternalCode) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_four_digit_padding() {
        assert_eq!(InternalCode::first(2026).unwrap().to_string(), "2026-0001");
        assert_eq!(InternalCode::new(2026, 42).unwrap().to_string(), "2026-0042");
        assert_eq!(InternalCode::new(2026, 12345).unwrap().to_string(), "2026-12345");
    }

    #[test]
    fn next_increments_within_year() {
        let code = InternalCode::new(2025, 9).unwrap().next().unwrap();
        assert_eq!(code.year(), 2025);
        assert_eq!(code.sequence(), 10);
    }

    #[test]
    fn parses_its_own_display() {
        let code: InternalCode = "2024-0107".parse().unwrap();
        assert_eq!(code, InternalCode::new(2024, 107).unwrap());
        assert_eq!(code.to_string().parse::<InternalCode>().unwrap(), code);
    }

    #[test]
    fn rejects_malformed_codes() {
        for raw in ["", "2024", "24-0001", "2024-001", "2024-00a1", "abcd-0001", "2024-0000"] {
            assert!(raw.parse::<InternalCode>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn orders_by_year_then_sequence() {
        let a = InternalCode::new(2024, 9999).unwrap();
        let b = InternalCode::new(2025, 1).unwrap();
        let c = InternalCode::new(2025, 2).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn serde_uses_string_form() {
        let code = InternalCode::new(2026, 3).unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"2026-0003\"");
        let back: InternalCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }
}
