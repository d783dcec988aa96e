//! `tally-books`: Reconciliation workflows for small-business books.
//!
//! Wires counterparties, ledger storage and bank statements onto the
//! `tally-recon` matcher: bank-statement reconciliation, customer statements
//! and supplier order/payment reconciliation.

pub mod entity;
pub mod error;
pub mod ledger;
pub mod sqlite;
pub mod statement;
pub mod workflow;

pub use entity::{Counterparty, CounterpartyDirectory, CounterpartyRole, InMemoryDirectory};
pub use error::{BooksError, Result};
pub use ledger::{InMemoryLedger, LedgerStore};
pub use sqlite::SqliteLedger;
pub use statement::{load_bank_statement, load_bank_statement_file};
pub use workflow::{
    customer_statement, reconcile_bank_statement, reconcile_supplier, BankReconciliation,
    CustomerStatement, StatementLine, SupplierReconciliation,
};
