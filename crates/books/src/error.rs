use thiserror::Error;

use crate::entity::CounterpartyRole;

/// Caller-facing workflow errors.
///
/// These mark misuse (unknown entity, wrong kind of entity, unreadable input).
/// Records that simply fail to match are reported through discrepancies, never
/// through this type.
#[derive(Debug, Error)]
pub enum BooksError {
    #[error("entity not found: {id}")]
    EntityNotFound { id: String },

    #[error("wrong entity type: '{id}' is a {actual}, expected a {expected}")]
    WrongEntityType {
        id: String,
        expected: CounterpartyRole,
        actual: CounterpartyRole,
    },

    #[error("missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("no valid records")]
    NoValidRecords,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("stored record '{id}' is corrupt: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Recon(#[from] tally_recon::ReconError),
}

pub type Result<T> = std::result::Result<T, BooksError>;
