use thiserror::Error;

use crate::persistence::PersistenceError;

/// Errors raised by the account state store and its report builders
#[derive(Debug, Error)]
pub enum StoreError {
    /// Keyed metadata update before the symbol's metadata was set wholesale
    #[error("No metadata initialised for symbol {symbol}, set it with set_symbol_metadata first")]
    MetadataNotInitialized { symbol: String },

    #[error("Invalid metadata value for {symbol}.{key}: {reason}")]
    InvalidMetadataValue {
        symbol: String,
        key: String,
        reason: String,
    },

    #[error("Division by zero while calculating {context}")]
    DivideByZero { context: String },

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl StoreError {
    pub fn divide_by_zero(context: impl Into<String>) -> Self {
        StoreError::DivideByZero {
            context: context.into(),
        }
    }
}
