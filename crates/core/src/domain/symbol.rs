use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_SYMBOL_LEN: usize = 5;

// Tickers the mock backend maps onto specific error responses. They skip the
// length/alphabet rule so those paths can be forced by hand.
pub const DIAGNOSTIC_BYPASS: [&str; 5] = ["NONEWS", "NORED", "TOOFEW", "ZEROSENT", "LIMIT"];

pub fn is_bypass(value: &str) -> bool {
    DIAGNOSTIC_BYPASS.contains(&value)
}

/// Canonical ticker: `^[A-Z]{1,5}$` or a diagnostic bypass ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Final admission check before a value may reach the network.
    pub fn admit(value: &str) -> Result<Self, ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::Empty);
        }
        if is_bypass(value) {
            return Ok(Self(value.to_string()));
        }

        let well_formed =
            value.len() <= MAX_SYMBOL_LEN && value.bytes().all(|b| b.is_ascii_uppercase());
        if !well_formed {
            return Err(ValidationError::Invalid {
                value: value.to_string(),
            });
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_diagnostic(&self) -> bool {
        is_bypass(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::admit(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    Empty,
    /// Input was clamped to [`MAX_SYMBOL_LEN`]; the clamped value is kept so the
    /// field can show it, but it is not submitted until the user confirms it.
    TooLong { truncated: String },
    Invalid { value: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Please enter a ticker symbol."),
            Self::TooLong { truncated } => write!(
                f,
                "Tickers are at most {MAX_SYMBOL_LEN} letters; input was shortened to {truncated}."
            ),
            Self::Invalid { value } => write!(f, "'{value}' is not a valid ticker symbol."),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Field value after cleaning, before admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTicker {
    pub value: String,
    pub too_long: bool,
}

pub struct TickerValidator;

impl TickerValidator {
    /// Trim, uppercase, drop anything outside A-Z and clamp to five letters.
    pub fn normalize(raw: &str) -> NormalizedTicker {
        let upper = raw.trim().to_ascii_uppercase();
        let cleaned: String = upper.chars().filter(|c| c.is_ascii_uppercase()).collect();

        if cleaned.len() > MAX_SYMBOL_LEN && !is_bypass(&cleaned) {
            return NormalizedTicker {
                value: cleaned[..MAX_SYMBOL_LEN].to_string(),
                too_long: true,
            };
        }

        NormalizedTicker {
            value: cleaned,
            too_long: false,
        }
    }

    /// Normalize and admit. A clamped value blocks submission.
    pub fn validate(raw: &str) -> Result<Symbol, ValidationError> {
        let normalized = Self::normalize(raw);
        if normalized.too_long {
            return Err(ValidationError::TooLong {
                truncated: normalized.value,
            });
        }
        Symbol::admit(&normalized.value)
    }
}
