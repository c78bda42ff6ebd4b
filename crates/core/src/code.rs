//! Product codes: unique, human-entered business identifiers.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Business identifier of a product.
///
/// Codes are entered by hand at the counter, so construction normalizes
/// surrounding whitespace and rejects empty input. Equality is exact after
/// trimming; no case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(String);

impl ProductCode {
    pub fn new(code: impl Into<String>) -> Result<Self, LedgerError> {
        let code = code.into();
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::validation("product code cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for ProductCode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let code = ProductCode::new("  BOX-20 ").unwrap();
        assert_eq!(code.as_str(), "BOX-20");
    }

    #[test]
    fn rejects_blank_codes() {
        assert!(ProductCode::new("   ").is_err());
        assert!(ProductCode::new("").is_err());
    }
}
