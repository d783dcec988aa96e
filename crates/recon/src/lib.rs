//! `tally-recon`: Generic bank/ledger matching engine.
//!
//! Pure engine crate: receives pre-loaded records, returns matches and
//! discrepancies. No file, database or CLI dependencies.

pub mod classify;
pub mod config;
pub mod error;
pub mod matcher;
pub mod model;
pub mod similarity;
pub mod summary;

pub use classify::identify_discrepancies;
pub use config::MatchConfig;
pub use error::ReconError;
pub use matcher::match_records;
pub use model::{
    BankRecord, DateRange, Discrepancy, DiscrepancyKind, DiscrepancyType, LedgerKind,
    LedgerRecord, Match, MatchDetails, MatchResult, MatchType, TransactionType,
};
pub use summary::ReconSummary;
