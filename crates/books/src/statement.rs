//! Bank-statement ingestion.
//!
//! Statements arrive as delimited text with whatever headers the bank chose.
//! Each canonical field resolves to a header through a synonym list: an exact
//! (case-insensitive) hit wins, otherwise the header containing the longest
//! synonym. A header serves at most one field.

use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::{info, warn};

use tally_recon::{BankRecord, TransactionType};

use crate::error::{BooksError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Date,
    TransactionType,
    Debit,
    Credit,
    Amount,
    Counterparty,
    Description,
    Balance,
    Id,
}

// Resolution order: type before debit/credit so a "Debit/Credit" indicator
// column is not taken as an amount column; debit/credit before amount so
// "借方金额" does not satisfy `amount`.
const RESOLUTION_ORDER: &[Field] = &[
    Field::Date,
    Field::TransactionType,
    Field::Debit,
    Field::Credit,
    Field::Amount,
    Field::Counterparty,
    Field::Description,
    Field::Balance,
    Field::Id,
];

// Too short to trust inside a longer header ("Summary", "Paid By").
const EXACT_ONLY: &[&str] = &["sum", "id"];

impl Field {
    fn name(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::TransactionType => "transaction_type",
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::Amount => "amount",
            Self::Counterparty => "counterparty",
            Self::Description => "description",
            Self::Balance => "balance",
            Self::Id => "id",
        }
    }

    fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Self::Date => &[
                "date", "transaction date", "posting date", "booking date", "日期", "交易日期",
                "记账日期", "交易时间",
            ],
            Self::TransactionType => &[
                "type", "dr/cr", "debit/credit", "direction", "类型", "借贷", "收支",
            ],
            Self::Debit => &["debit", "withdrawal", "paid out", "支出", "借方", "付款"],
            Self::Credit => &["credit", "deposit", "paid in", "收入", "贷方", "收款"],
            Self::Amount => &["amount", "sum", "金额", "发生额", "交易额"],
            Self::Counterparty => &[
                "counterparty", "payee", "payer", "beneficiary", "merchant", "name", "对方",
                "户名", "客户", "供应商", "收款人", "付款人",
            ],
            Self::Description => &[
                "description", "summary", "memo", "narrative", "details", "摘要", "备注",
                "用途", "说明",
            ],
            Self::Balance => &["balance", "余额"],
            Self::Id => &[
                "id", "transaction id", "reference", "流水号", "交易号", "凭证号", "序号",
            ],
        }
    }
}

/// Column index for each canonical field that resolved.
#[derive(Debug, Default)]
pub struct ColumnMap {
    date: Option<usize>,
    transaction_type: Option<usize>,
    debit: Option<usize>,
    credit: Option<usize>,
    amount: Option<usize>,
    counterparty: Option<usize>,
    description: Option<usize>,
    balance: Option<usize>,
    id: Option<usize>,
}

impl ColumnMap {
    /// Resolve headers; fails with the canonical names of unresolved required fields.
    pub fn resolve(headers: &[String]) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut claimed = vec![false; headers.len()];
        let mut map = ColumnMap::default();

        for field in RESOLUTION_ORDER {
            let synonyms = field.synonyms();
            let exact = normalized
                .iter()
                .enumerate()
                .find(|(i, h)| !claimed[*i] && synonyms.contains(&h.as_str()))
                .map(|(i, _)| i);
            let found = exact.or_else(|| longest_contained(&normalized, &claimed, synonyms));

            if let Some(i) = found {
                claimed[i] = true;
                *map.slot(*field) = Some(i);
            }
        }

        let mut missing = Vec::new();
        if map.date.is_none() {
            missing.push(Field::Date.name().to_string());
        }
        if map.amount.is_none() && map.debit.is_none() && map.credit.is_none() {
            missing.push(Field::Amount.name().to_string());
        }
        if map.counterparty.is_none() {
            missing.push(Field::Counterparty.name().to_string());
        }
        if !missing.is_empty() {
            return Err(BooksError::MissingColumns { missing });
        }

        Ok(map)
    }

    fn slot(&mut self, field: Field) -> &mut Option<usize> {
        match field {
            Field::Date => &mut self.date,
            Field::TransactionType => &mut self.transaction_type,
            Field::Debit => &mut self.debit,
            Field::Credit => &mut self.credit,
            Field::Amount => &mut self.amount,
            Field::Counterparty => &mut self.counterparty,
            Field::Description => &mut self.description,
            Field::Balance => &mut self.balance,
            Field::Id => &mut self.id,
        }
    }
}

/// Unclaimed header holding the longest substring synonym; earlier headers win ties.
fn longest_contained(headers: &[String], claimed: &[bool], synonyms: &[&str]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, h) in headers.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        let hit = synonyms
            .iter()
            .copied()
            .filter(|s| !EXACT_ONLY.contains(s) && h.contains(*s))
            .map(|s| s.chars().count())
            .max();
        if let Some(len) = hit {
            if best.map_or(true, |(_, b)| len > b) {
                best = Some((i, len));
            }
        }
    }
    best.map(|(i, _)| i)
}

/// Read a statement file. See [`load_bank_statement`].
pub fn load_bank_statement_file(path: &Path) -> Result<Vec<BankRecord>> {
    let content = std::fs::read_to_string(path)?;
    load_bank_statement(&content)
}

/// Parse delimited statement text into bank records.
///
/// Rows with an unreadable date or amount are skipped with a warning. The
/// batch fails only if required columns cannot be resolved or no row survives.
pub fn load_bank_statement(content: &str) -> Result<Vec<BankRecord>> {
    let content = content.trim_start_matches('\u{feff}');
    let delimiter = sniff_delimiter(content);
    let mut reader = reader_builder(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let columns = ColumnMap::resolve(&headers)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let row_number = idx + 1;
        let row = result?;
        if row.iter().all(|f| f.is_empty()) {
            continue;
        }

        match parse_row(&row, &columns, row_number) {
            Ok(record) => records.push(record),
            Err(reason) => {
                skipped += 1;
                warn!(row = row_number, %reason, "skipping statement row");
            }
        }
    }

    if records.is_empty() {
        return Err(BooksError::NoValidRecords);
    }

    info!(records = records.len(), skipped, "statement loaded");
    Ok(records)
}

fn parse_row(
    row: &csv::StringRecord,
    columns: &ColumnMap,
    row_number: usize,
) -> std::result::Result<BankRecord, String> {
    let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("");

    let date_str = cell(columns.date);
    let transaction_date =
        parse_date(date_str).ok_or_else(|| format!("cannot parse date '{date_str}'"))?;

    let (signed, split_type) = match columns.amount {
        Some(i) => {
            let raw = row.get(i).unwrap_or("");
            let amount =
                parse_amount(raw).ok_or_else(|| format!("cannot parse amount '{raw}'"))?;
            (amount, None)
        }
        None => split_amount(cell(columns.debit), cell(columns.credit))?,
    };

    let transaction_type = parse_type(cell(columns.transaction_type))
        .or(split_type)
        .unwrap_or(if signed.is_sign_negative() && !signed.is_zero() {
            TransactionType::Debit
        } else {
            TransactionType::Credit
        });

    let id = match cell(columns.id) {
        "" => format!("B{row_number}"),
        v => v.to_string(),
    };

    Ok(BankRecord {
        id,
        transaction_date,
        amount: signed.abs(),
        description: cell(columns.description).to_string(),
        balance: parse_amount(cell(columns.balance)).unwrap_or(Decimal::ZERO),
        transaction_type,
        counterparty: cell(columns.counterparty).to_string(),
    })
}

/// Amount from separate debit/credit columns; a filled debit wins.
fn split_amount(
    debit: &str,
    credit: &str,
) -> std::result::Result<(Decimal, Option<TransactionType>), String> {
    if let Some(d) = parse_amount(debit).filter(|d| !d.is_zero()) {
        return Ok((-d.abs(), Some(TransactionType::Debit)));
    }
    if let Some(c) = parse_amount(credit).filter(|c| !c.is_zero()) {
        return Ok((c.abs(), Some(TransactionType::Credit)));
    }
    Err(format!("cannot parse amount from debit '{debit}' / credit '{credit}'"))
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d.%m.%Y",
    "%Y年%m月%d日",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a money cell: thousands separators, currency marks and `(x)` negatives.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let mut s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        negative = true;
        s = inner;
    }

    let cleaned: String = s
        .replace("RMB", "")
        .replace("CNY", "")
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '¥' | '￥' | '$' | '€' | '£' | '\u{a0}'))
        .collect();

    let value = Decimal::from_str(&cleaned).ok()?;
    Some(if negative { -value } else { value })
}

fn parse_type(s: &str) -> Option<TransactionType> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "debit" | "dr" | "d" | "out" | "withdrawal" | "支出" | "借" | "借方" | "付" => {
            Some(TransactionType::Debit)
        }
        "credit" | "cr" | "c" | "in" | "deposit" | "收入" | "贷" | "贷方" | "收" => {
            Some(TransactionType::Credit)
        }
        _ => None,
    }
}

const DELIMITERS: &[u8] = &[b',', b';', b'\t', b'|'];
const SNIFF_LINES: usize = 10;

fn reader_builder(delimiter: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.delimiter(delimiter).flexible(true);
    builder
}

fn field_count(line: &str, delimiter: u8) -> usize {
    reader_builder(delimiter)
        .has_headers(false)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(|r| r.ok())
        .map_or(1, |r| r.len())
}

/// Pick the delimiter that splits the header widest and keeps that width
/// across the sample rows. Falls back to comma.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best = (b',', 0usize);
    for &delimiter in DELIMITERS {
        let counts: Vec<usize> = sample.iter().map(|l| field_count(l, delimiter)).collect();
        let Some(&width) = counts.first() else {
            break;
        };
        if width <= 1 {
            continue;
        }
        let score = width * counts.iter().filter(|&&c| c == width).count();
        if score > best.1 {
            best = (delimiter, score);
        }
    }
    best.0
}
