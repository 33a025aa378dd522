//! Normalized ticker symbol

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ValuationError};

const MAX_TICKER_LEN: usize = 15;

/// Uppercase, trimmed ticker symbol
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Parse and normalize a ticker to uppercase
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = input.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(ValuationError::InvalidTicker(input.to_string()));
        }
        if normalized.len() > MAX_TICKER_LEN {
            return Err(ValuationError::InvalidTicker(input.to_string()));
        }
        let valid = normalized
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '-');
        if !valid {
            return Err(ValuationError::InvalidTicker(input.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Ticker {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Ticker {
    type Error = ValuationError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}
