use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tourdesk_core::DomainError;

/// Human-readable invoice number: `INV-<year>-<sequence>`.
///
/// The sequence is zero-padded to at least three digits (`INV-2026-007`) and
/// grows past three digits when needed (`INV-2026-1204`). Sequences are
/// reserved from a per-year counter by the caller; this type only formats and
/// parses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvoiceNumber {
    year: i32,
    sequence: u32,
}

impl InvoiceNumber {
    pub const PREFIX: &'static str = "INV";

    pub fn new(year: i32, sequence: u32) -> Result<Self, DomainError> {
        if !(0..=9999).contains(&year) {
            return Err(DomainError::invalid_id(format!(
                "invoice number year out of range: {year}"
            )));
        }
        if sequence == 0 {
            return Err(DomainError::invalid_id(
                "invoice number sequence starts at 1",
            ));
        }
        Ok(Self { year, sequence })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl core::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{:04}-{:03}", Self::PREFIX, self.year, self.sequence)
    }
}

impl FromStr for InvoiceNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::invalid_id(format!("malformed invoice number: {s}"));

        let mut parts = s.trim().splitn(3, '-');
        let (prefix, year, sequence) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(y), Some(n)) => (p, y, n),
            _ => return Err(invalid()),
        };
        if prefix != Self::PREFIX || year.len() != 4 || sequence.len() < 3 {
            return Err(invalid());
        }
        if !year.bytes().chain(sequence.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let sequence: u32 = sequence.parse().map_err(|_| invalid())?;
        Self::new(year, sequence)
    }
}

impl TryFrom<String> for InvoiceNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InvoiceNumber> for String {
    fn from(value: InvoiceNumber) -> Self {
        value.to_string()
    }
}
