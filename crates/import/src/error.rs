use thiserror::Error;

use tripsplit_core::DomainError;

use crate::source::SourceError;

/// Import failure. Local state is untouched whenever one is returned.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The source returned no usable records.
    #[error("nothing to import ({skipped} record(s) skipped)")]
    NothingToImport { skipped: usize },

    /// The payload could not be read as bill records.
    #[error("unreadable payload: {0}")]
    Payload(String),

    /// The source could not be reached or read.
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Why a single record was left out of an import.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not a JSON object: {0}")]
    Malformed(String),

    #[error("record has no id")]
    MissingId,

    #[error("record id is not a string or number")]
    InvalidId,

    #[error("unrecognized timestamp: {0:?}")]
    InvalidDate(String),

    #[error("amount is outside the accepted range")]
    AmountOutOfRange,
}
