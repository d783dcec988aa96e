use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{Discrepancy, DiscrepancyKind, MatchResult, MatchType};

/// Headline numbers for a reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconSummary {
    pub total_bank_records: usize,
    pub total_ledger_records: usize,
    pub matched: usize,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    pub match_rate: f64,
    pub mean_confidence: f64,
    pub unmatched_bank: usize,
    pub unmatched_ledger: usize,
    pub discrepancy_counts: BTreeMap<String, usize>,
    pub total_amount_drift: Decimal,
    pub unmatched_bank_amount: Decimal,
    pub unmatched_ledger_amount: Decimal,
}

impl ReconSummary {
    pub fn from_result(result: &MatchResult, discrepancies: &[Discrepancy]) -> Self {
        let mut discrepancy_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_amount_drift = Decimal::ZERO;

        for d in discrepancies {
            *discrepancy_counts
                .entry(d.discrepancy_type().to_string())
                .or_insert(0) += 1;
            if let DiscrepancyKind::AmountDiff { .. } = d.kind {
                total_amount_drift += d.difference_amount;
            }
        }

        let mean_confidence = if result.matches.is_empty() {
            0.0
        } else {
            result.matches.iter().map(|m| m.confidence).sum::<f64>() / result.matches.len() as f64
        };

        Self {
            total_bank_records: result.total_bank_records,
            total_ledger_records: result.total_ledger_records,
            matched: result.matched_count,
            exact_matches: result.matches_of_type(MatchType::Exact).count(),
            fuzzy_matches: result.matches_of_type(MatchType::Fuzzy).count(),
            match_rate: result.match_rate(),
            mean_confidence,
            unmatched_bank: result.unmatched_bank_records.len(),
            unmatched_ledger: result.unmatched_ledger_records.len(),
            discrepancy_counts,
            total_amount_drift,
            unmatched_bank_amount: result.unmatched_bank_records.iter().map(|r| r.amount).sum(),
            unmatched_ledger_amount: result
                .unmatched_ledger_records
                .iter()
                .map(|r| r.amount)
                .sum(),
        }
    }

    /// Count for one discrepancy type label (`AMOUNT_DIFF`, ...), zero if absent.
    pub fn discrepancies_of(&self, label: &str) -> usize {
        self.discrepancy_counts.get(label).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::identify_discrepancies;
    use crate::config::MatchConfig;
    use crate::matcher::match_records;
    use crate::model::{BankRecord, LedgerKind, LedgerRecord, TransactionType};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bank(id: &str, amount: Decimal, d: &str) -> BankRecord {
        BankRecord {
            id: id.into(),
            transaction_date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
            amount,
            description: String::new(),
            balance: Decimal::ZERO,
            transaction_type: TransactionType::Credit,
            counterparty: "Globex".into(),
        }
    }

    fn ledger(id: &str, amount: Decimal, d: &str) -> LedgerRecord {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        LedgerRecord {
            id: id.into(),
            date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
            kind: LedgerKind::Income,
            amount,
            counterparty_id: "C9".into(),
            description: "Globex Corp".into(),
            category: String::new(),
            status: "posted".into(),
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn summary_counts() {
        let config = MatchConfig {
            amount_tolerance_percent: 0.01,
            date_tolerance_days: 3,
            ..MatchConfig::default()
        };
        let result = match_records(
            &[
                bank("b1", dec!(250.00), "2024-05-02"),
                bank("b2", dec!(1000.00), "2024-05-10"),
                bank("b3", dec!(40.00), "2024-05-20"),
            ],
            &[
                ledger("l1", dec!(250.00), "2024-05-02"),
                ledger("l2", dec!(1004.00), "2024-05-11"),
                ledger("l3", dec!(15.50), "2024-06-01"),
            ],
            &config,
        );
        let discrepancies = identify_discrepancies(&result);
        let summary = ReconSummary::from_result(&result, &discrepancies);

        assert_eq!(summary.matched, 2);
        assert_eq!(summary.exact_matches, 1);
        assert_eq!(summary.fuzzy_matches, 1);
        assert!((summary.match_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.discrepancies_of("AMOUNT_DIFF"), 1);
        assert_eq!(summary.discrepancies_of("MISSING_SYSTEM"), 1);
        assert_eq!(summary.discrepancies_of("MISSING_BANK"), 1);
        assert_eq!(summary.total_amount_drift, dec!(4.00));
        assert_eq!(summary.unmatched_bank_amount, dec!(40.00));
        assert_eq!(summary.unmatched_ledger_amount, dec!(15.50));
        assert!(summary.mean_confidence > 0.85 && summary.mean_confidence <= 1.0);
    }

    #[test]
    fn empty_run() {
        let result = match_records(&[], &[], &MatchConfig::default());
        let summary = ReconSummary::from_result(&result, &[]);
        assert_eq!(summary.matched, 0);
        assert_eq!(summary.mean_confidence, 0.0);
        assert_eq!(summary.match_rate, 0.0);
        assert!(summary.discrepancy_counts.is_empty());
    }
}
