//! Currency codes

use crate::error::{FxError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// ISO 4217 style currency code: three ASCII letters, always uppercase.
///
/// The feed publishes new currencies over time, so codes are open-ended
/// rather than a closed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub const EUR: CurrencyCode = CurrencyCode(*b"EUR");
    pub const PLN: CurrencyCode = CurrencyCode(*b"PLN");
    pub const USD: CurrencyCode = CurrencyCode(*b"USD");
    pub const GBP: CurrencyCode = CurrencyCode(*b"GBP");
    pub const CHF: CurrencyCode = CurrencyCode(*b"CHF");

    /// Parse from code, normalizing case
    pub fn from_code(code: &str) -> Result<Self> {
        let code = code.trim();
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(FxError::Parse(format!("Invalid currency code: '{}'", code)));
        }
        Ok(Self([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }

    /// Get code as string
    pub fn as_str(&self) -> &str {
        // Always three ASCII letters
        std::str::from_utf8(&self.0).unwrap_or("???")
    }

    /// Name of the derived column quoting this currency in `domestic`
    pub fn cross_column(&self, domestic: CurrencyCode) -> String {
        format!("{}_{}", self, domestic)
    }
}

impl FromStr for CurrencyCode {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_code(s)
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CurrencyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CurrencyCode::from_code(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse a list of codes, e.g. from `--targets EUR,USD`
pub fn parse_codes(list: &str) -> Result<Vec<CurrencyCode>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(CurrencyCode::from_code)
        .collect()
}
