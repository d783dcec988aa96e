// Ledger storage in SQLite

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row, Statement};
use rust_decimal::Decimal;
use tracing::debug;

use tally_recon::{LedgerKind, LedgerRecord};

use crate::error::{BooksError, Result};
use crate::ledger::LedgerStore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS ledger_records (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,             -- YYYY-MM-DD
    kind TEXT NOT NULL,             -- INCOME | EXPENSE | ORDER
    amount TEXT NOT NULL,           -- exact decimal text
    counterparty_id TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,       -- RFC 3339
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ledger_date ON ledger_records (date);
CREATE INDEX IF NOT EXISTS idx_ledger_counterparty ON ledger_records (counterparty_id);
"#;

const SELECT_COLUMNS: &str = "SELECT id, date, kind, amount, counterparty_id, description, \
     category, status, created_at, updated_at FROM ledger_records";

const DATE_FORMAT: &str = "%Y-%m-%d";

const INSERT_SQL: &str = "INSERT OR REPLACE INTO ledger_records \
     (id, date, kind, amount, counterparty_id, description, category, status, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert or replace a record by id.
    pub fn insert(&self, record: &LedgerRecord) -> Result<()> {
        let mut stmt = self.conn.prepare(INSERT_SQL)?;
        write_record(&mut stmt, record)
    }

    /// Insert or replace many records in one transaction.
    pub fn insert_all(&mut self, records: &[LedgerRecord]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(INSERT_SQL)?;
            for record in records {
                write_record(&mut stmt, record)?;
            }
        }
        tx.commit()?;
        debug!(count = records.len(), "ledger records stored");
        Ok(())
    }

    fn query(&self, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<LedgerRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE {filter} ORDER BY date, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args, raw_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }
}

impl LedgerStore for SqliteLedger {
    fn get_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<LedgerRecord>> {
        // ISO dates compare correctly as text
        self.query(
            "date >= ?1 AND date <= ?2",
            &[
                &start.format(DATE_FORMAT).to_string(),
                &end.format(DATE_FORMAT).to_string(),
            ],
        )
    }

    fn get_by_counterparty(&self, counterparty_id: &str) -> Result<Vec<LedgerRecord>> {
        self.query("counterparty_id = ?1", &[&counterparty_id])
    }
}

fn write_record(stmt: &mut Statement<'_>, record: &LedgerRecord) -> Result<()> {
    stmt.execute(params![
        record.id,
        record.date.format(DATE_FORMAT).to_string(),
        record.kind.as_str(),
        record.amount.to_string(),
        record.counterparty_id,
        record.description,
        record.category,
        record.status,
        record.created_at.to_rfc3339(),
        record.updated_at.to_rfc3339(),
    ])?;
    Ok(())
}

/// Row as stored, before text columns are parsed.
struct RawRecord {
    id: String,
    date: String,
    kind: String,
    amount: String,
    counterparty_id: String,
    description: String,
    category: String,
    status: String,
    created_at: String,
    updated_at: String,
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        date: row.get(1)?,
        kind: row.get(2)?,
        amount: row.get(3)?,
        counterparty_id: row.get(4)?,
        description: row.get(5)?,
        category: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl RawRecord {
    fn into_record(self) -> Result<LedgerRecord> {
        let corrupt = |reason: String| BooksError::CorruptRecord {
            id: self.id.clone(),
            reason,
        };

        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .map_err(|e| corrupt(format!("date '{}': {e}", self.date)))?;
        let kind = match self.kind.as_str() {
            "INCOME" => LedgerKind::Income,
            "EXPENSE" => LedgerKind::Expense,
            "ORDER" => LedgerKind::Order,
            other => return Err(corrupt(format!("unknown kind '{other}'"))),
        };
        let amount = Decimal::from_str(&self.amount)
            .map_err(|e| corrupt(format!("amount '{}': {e}", self.amount)))?;
        let created_at = parse_timestamp(&self.created_at).map_err(&corrupt)?;
        let updated_at = parse_timestamp(&self.updated_at).map_err(&corrupt)?;

        Ok(LedgerRecord {
            id: self.id,
            date,
            kind,
            amount,
            counterparty_id: self.counterparty_id,
            description: self.description,
            category: self.category,
            status: self.status,
            created_at,
            updated_at,
        })
    }
}

fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("timestamp '{s}': {e}"))
}
