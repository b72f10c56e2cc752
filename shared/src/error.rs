//! Domain error taxonomy shared by the stock and petty-cash ledgers

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type used by the ledger rules
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Business failures raised by the ledgers.
///
/// Every variant carries enough context to build a human-readable response;
/// infrastructure failures (database, transport) are not represented here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or missing input
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Another inventory item already uses this name
    #[error("An inventory item named '{0}' already exists")]
    DuplicateName(String),

    /// Operation would break a state precondition
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },
}

impl LedgerError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
