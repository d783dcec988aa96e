use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Debit,
    Credit,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debit => write!(f, "DEBIT"),
            Self::Credit => write!(f, "CREDIT"),
        }
    }
}

/// A normalized line from an externally supplied statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRecord {
    pub id: String,
    pub transaction_date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub balance: Decimal,
    pub transaction_type: TransactionType,
    pub counterparty: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerKind {
    Income,
    Expense,
    Order,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::Order => "ORDER",
        }
    }
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An internally recorded bookkeeping transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: LedgerKind,
    pub amount: Decimal,
    pub counterparty_id: String,
    pub description: String,
    pub category: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerRecord {
    /// Label compared against a bank record's `counterparty`.
    pub fn counterparty_label(&self) -> &str {
        &self.description
    }
}

/// Inclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Smallest range spanning every date, or `None` for an empty set.
    pub fn covering<I>(dates: I) -> Option<Self>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        dates.into_iter().fold(None, |acc, d| match acc {
            None => Some(Self::new(d, d)),
            Some(r) => Some(Self::new(r.start.min(d), r.end.max(d))),
        })
    }

    /// Extend both ends by `days`, saturating at the calendar limits.
    pub fn widened(&self, days: u32) -> Self {
        let days = Days::new(u64::from(days));
        Self::new(
            self.start.checked_sub_days(days).unwrap_or(NaiveDate::MIN),
            self.end.checked_add_days(days).unwrap_or(NaiveDate::MAX),
        )
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Fuzzy,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

/// Per-field sub-scores behind a match's confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchDetails {
    pub amount_score: f64,
    pub date_score: f64,
    pub counterparty_score: f64,
    pub amount_match: bool,
    pub date_match: bool,
    pub counterparty_match: bool,
    pub amount_difference: Decimal,
    pub days_apart: i64,
}

impl MatchDetails {
    pub(crate) fn exact() -> Self {
        Self {
            amount_score: 1.0,
            date_score: 1.0,
            counterparty_score: 1.0,
            amount_match: true,
            date_match: true,
            counterparty_match: true,
            amount_difference: Decimal::ZERO,
            days_apart: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub bank_record: BankRecord,
    pub ledger_record: LedgerRecord,
    pub confidence: f64,
    pub match_type: MatchType,
    pub match_details: MatchDetails,
}

impl Match {
    /// Absolute amount drift between the two sides.
    pub fn amount_difference(&self) -> Decimal {
        (self.bank_record.amount - self.ledger_record.amount).abs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub matches: Vec<Match>,
    pub unmatched_bank_records: Vec<BankRecord>,
    pub unmatched_ledger_records: Vec<LedgerRecord>,
    pub total_bank_records: usize,
    pub total_ledger_records: usize,
    pub matched_count: usize,
}

impl MatchResult {
    /// `matched_count / total_bank_records`, or 0.0 with no bank records.
    pub fn match_rate(&self) -> f64 {
        if self.total_bank_records == 0 {
            0.0
        } else {
            self.matched_count as f64 / self.total_bank_records as f64
        }
    }

    pub fn matches_of_type(&self, match_type: MatchType) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(move |m| m.match_type == match_type)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Discrepancies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscrepancyType {
    AmountDiff,
    MissingSystem,
    MissingBank,
}

impl std::fmt::Display for DiscrepancyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AmountDiff => write!(f, "AMOUNT_DIFF"),
            Self::MissingSystem => write!(f, "MISSING_SYSTEM"),
            Self::MissingBank => write!(f, "MISSING_BANK"),
        }
    }
}

/// Which records a discrepancy refers to. The variant fixes which sides exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscrepancyKind {
    /// An accepted fuzzy match whose amounts drift apart.
    AmountDiff {
        bank_record: BankRecord,
        ledger_record: LedgerRecord,
    },
    /// On the statement, absent from the books.
    MissingSystem { bank_record: BankRecord },
    /// In the books, absent from the statement.
    MissingBank { ledger_record: LedgerRecord },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub id: usize,
    #[serde(flatten)]
    pub kind: DiscrepancyKind,
    pub difference_amount: Decimal,
    pub description: String,
}

impl Discrepancy {
    pub fn discrepancy_type(&self) -> DiscrepancyType {
        match self.kind {
            DiscrepancyKind::AmountDiff { .. } => DiscrepancyType::AmountDiff,
            DiscrepancyKind::MissingSystem { .. } => DiscrepancyType::MissingSystem,
            DiscrepancyKind::MissingBank { .. } => DiscrepancyType::MissingBank,
        }
    }

    pub fn bank_record(&self) -> Option<&BankRecord> {
        match &self.kind {
            DiscrepancyKind::AmountDiff { bank_record, .. }
            | DiscrepancyKind::MissingSystem { bank_record } => Some(bank_record),
            DiscrepancyKind::MissingBank { .. } => None,
        }
    }

    pub fn ledger_record(&self) -> Option<&LedgerRecord> {
        match &self.kind {
            DiscrepancyKind::AmountDiff { ledger_record, .. }
            | DiscrepancyKind::MissingBank { ledger_record } => Some(ledger_record),
            DiscrepancyKind::MissingSystem { .. } => None,
        }
    }
}
