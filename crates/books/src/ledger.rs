use chrono::NaiveDate;

use tally_recon::LedgerRecord;

use crate::error::Result;

/// Read access to stored ledger records.
///
/// Both lookups are inclusive and return records ordered by (date, id).
pub trait LedgerStore {
    fn get_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<LedgerRecord>>;

    fn get_by_counterparty(&self, counterparty_id: &str) -> Result<Vec<LedgerRecord>>;
}

/// Vec-backed store, mostly for tests and small imports.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    records: Vec<LedgerRecord>,
}

impl InMemoryLedger {
    pub fn new(records: Vec<LedgerRecord>) -> Self {
        Self { records }
    }

    pub fn insert(&mut self, record: LedgerRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn select<F>(&self, keep: F) -> Vec<LedgerRecord>
    where
        F: Fn(&LedgerRecord) -> bool,
    {
        let mut out: Vec<LedgerRecord> = self.records.iter().filter(|r| keep(r)).cloned().collect();
        out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        out
    }
}

impl LedgerStore for InMemoryLedger {
    fn get_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<LedgerRecord>> {
        Ok(self.select(|r| start <= r.date && r.date <= end))
    }

    fn get_by_counterparty(&self, counterparty_id: &str) -> Result<Vec<LedgerRecord>> {
        Ok(self.select(|r| r.counterparty_id == counterparty_id))
    }
}
