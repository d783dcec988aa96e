//! Reconciliation workflows.
//!
//! Each workflow turns its domain objects into bank-shaped and ledger-shaped
//! records and hands them to the same matcher and classifier. Nothing here
//! changes how matching works.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use tally_recon::{
    identify_discrepancies, match_records, BankRecord, DateRange, Discrepancy, LedgerKind,
    LedgerRecord, MatchConfig, MatchResult, ReconSummary, TransactionType,
};

use crate::entity::{require_role, Counterparty, CounterpartyDirectory, CounterpartyRole};
use crate::error::{BooksError, Result};
use crate::ledger::LedgerStore;

// ---------------------------------------------------------------------------
// Bank statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BankReconciliation {
    pub window: DateRange,
    pub result: MatchResult,
    pub discrepancies: Vec<Discrepancy>,
    pub summary: ReconSummary,
    pub reconciled_at: DateTime<Utc>,
}

/// Reconcile statement lines against the books for the statement's period.
///
/// Ledger records are fetched for `window`. Without one, the span of the
/// statement's dates is used, widened by the date tolerance on both ends so
/// fuzzy candidates just outside the statement period are still considered.
pub fn reconcile_bank_statement<L>(
    records: &[BankRecord],
    ledger: &L,
    window: Option<DateRange>,
    config: &MatchConfig,
) -> Result<BankReconciliation>
where
    L: LedgerStore + ?Sized,
{
    if records.is_empty() {
        return Err(BooksError::NoValidRecords);
    }
    let window = match window {
        Some(w) => w,
        None => DateRange::covering(records.iter().map(|r| r.transaction_date))
            .ok_or(BooksError::NoValidRecords)?
            .widened(config.date_tolerance_days),
    };

    let ledger_records = ledger.get_by_date_range(window.start, window.end)?;
    let result = match_records(records, &ledger_records, config);
    let discrepancies = identify_discrepancies(&result);
    let summary = ReconSummary::from_result(&result, &discrepancies);

    info!(
        start = %window.start,
        end = %window.end,
        matched = result.matched_count,
        discrepancies = discrepancies.len(),
        "bank statement reconciled"
    );

    Ok(BankReconciliation {
        window,
        result,
        discrepancies,
        summary,
        reconciled_at: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// Customer statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementLine {
    pub date: NaiveDate,
    pub record_id: String,
    #[serde(rename = "type")]
    pub kind: LedgerKind,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerStatement {
    pub customer: Counterparty,
    pub period: DateRange,
    pub opening_balance: Decimal,
    pub lines: Vec<StatementLine>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub closing_balance: Decimal,
    pub generated_at: DateTime<Utc>,
}

/// Running account of what a customer owes over `period`.
///
/// Orders and expenses (refunds paid out) raise the balance; income received
/// lowers it.
pub fn customer_statement<D, L>(
    directory: &D,
    ledger: &L,
    customer_id: &str,
    period: DateRange,
    opening_balance: Decimal,
) -> Result<CustomerStatement>
where
    D: CounterpartyDirectory + ?Sized,
    L: LedgerStore + ?Sized,
{
    let customer = require_role(directory, customer_id, CounterpartyRole::Customer)?;

    let mut records: Vec<LedgerRecord> = ledger
        .get_by_counterparty(customer_id)?
        .into_iter()
        .filter(|r| period.contains(r.date))
        .collect();
    records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    let mut balance = opening_balance;
    let mut total_debit = Decimal::ZERO;
    let mut total_credit = Decimal::ZERO;

    let lines: Vec<StatementLine> = records
        .into_iter()
        .map(|r| {
            let (debit, credit) = match r.kind {
                LedgerKind::Order | LedgerKind::Expense => (r.amount, Decimal::ZERO),
                LedgerKind::Income => (Decimal::ZERO, r.amount),
            };
            balance += debit - credit;
            total_debit += debit;
            total_credit += credit;
            StatementLine {
                date: r.date,
                record_id: r.id,
                kind: r.kind,
                description: r.description,
                debit,
                credit,
                balance,
            }
        })
        .collect();

    info!(customer = %customer.id, lines = lines.len(), %balance, "customer statement built");

    Ok(CustomerStatement {
        customer,
        period,
        opening_balance,
        lines,
        total_debit,
        total_credit,
        closing_balance: balance,
        generated_at: Utc::now(),
    })
}

// ---------------------------------------------------------------------------
// Supplier reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SupplierReconciliation {
    pub supplier: Counterparty,
    pub period: Option<DateRange>,
    pub result: MatchResult,
    pub discrepancies: Vec<Discrepancy>,
    pub summary: ReconSummary,
    pub reconciled_at: DateTime<Utc>,
}

/// Match a supplier's orders (expected payments) against recorded expenses.
pub fn reconcile_supplier<D, L>(
    directory: &D,
    ledger: &L,
    supplier_id: &str,
    period: Option<DateRange>,
    config: &MatchConfig,
) -> Result<SupplierReconciliation>
where
    D: CounterpartyDirectory + ?Sized,
    L: LedgerStore + ?Sized,
{
    let supplier = require_role(directory, supplier_id, CounterpartyRole::Supplier)?;

    let records: Vec<LedgerRecord> = ledger
        .get_by_counterparty(supplier_id)?
        .into_iter()
        .filter(|r| period.map_or(true, |p| p.contains(r.date)))
        .collect();

    let expected: Vec<BankRecord> = records
        .iter()
        .filter(|r| r.kind == LedgerKind::Order)
        .map(|r| expected_payment(r, &supplier))
        .collect();
    let paid: Vec<LedgerRecord> = records
        .into_iter()
        .filter(|r| r.kind == LedgerKind::Expense)
        .collect();
    let labeled: Vec<LedgerRecord> = paid
        .iter()
        .cloned()
        .map(|r| labeled_for(r, &supplier))
        .collect();

    let mut result = match_records(&expected, &labeled, config);
    restore_descriptions(&mut result, &paid);
    let discrepancies = identify_discrepancies(&result);
    let summary = ReconSummary::from_result(&result, &discrepancies);

    info!(
        supplier = %supplier.id,
        orders = expected.len(),
        payments = paid.len(),
        matched = result.matched_count,
        "supplier reconciled"
    );

    Ok(SupplierReconciliation {
        supplier,
        period,
        result,
        discrepancies,
        summary,
        reconciled_at: Utc::now(),
    })
}

/// An order re-expressed as the payment the supplier should receive.
pub fn expected_payment(order: &LedgerRecord, supplier: &Counterparty) -> BankRecord {
    BankRecord {
        id: order.id.clone(),
        transaction_date: order.date,
        amount: order.amount,
        description: order.description.clone(),
        balance: Decimal::ZERO,
        transaction_type: TransactionType::Debit,
        counterparty: supplier.name.clone(),
    }
}

/// Put the stored descriptions back on expenses that were relabeled for matching.
fn restore_descriptions(result: &mut MatchResult, paid: &[LedgerRecord]) {
    let stored: HashMap<&str, &str> = paid
        .iter()
        .map(|r| (r.id.as_str(), r.description.as_str()))
        .collect();
    let ledger_side = result
        .matches
        .iter_mut()
        .map(|m| &mut m.ledger_record)
        .chain(result.unmatched_ledger_records.iter_mut());
    for record in ledger_side {
        if let Some(description) = stored.get(record.id.as_str()) {
            record.description = (*description).to_string();
        }
    }
}

/// Make sure an expense carries the supplier's name in its matching label.
fn labeled_for(mut expense: LedgerRecord, supplier: &Counterparty) -> LedgerRecord {
    let label = expense.counterparty_label().to_lowercase();
    if !label.contains(&supplier.name.to_lowercase()) {
        expense.description = if expense.description.is_empty() {
            supplier.name.clone()
        } else {
            format!("{} {}", supplier.name, expense.description)
        };
    }
    expense
}
