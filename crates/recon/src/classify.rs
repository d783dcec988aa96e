use rust_decimal::Decimal;

use crate::model::{Discrepancy, DiscrepancyKind, MatchResult, MatchType};

/// Amount drift a fuzzy match may carry before it is reported.
pub const AMOUNT_DIFF_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Turn a match result into discrepancies for review.
///
/// Order is fixed: fuzzy amount drifts, then statement lines missing from the
/// books, then book entries missing from the statement. Ids count up from 1
/// in that order.
pub fn identify_discrepancies(result: &MatchResult) -> Vec<Discrepancy> {
    let mut kinds = Vec::new();

    for m in result.matches_of_type(MatchType::Fuzzy) {
        let difference = m.amount_difference();
        if difference <= AMOUNT_DIFF_THRESHOLD {
            continue;
        }
        let description = format!(
            "amount differs: bank {} vs ledger {} (difference {})",
            m.bank_record.amount, m.ledger_record.amount, difference
        );
        kinds.push((
            DiscrepancyKind::AmountDiff {
                bank_record: m.bank_record.clone(),
                ledger_record: m.ledger_record.clone(),
            },
            difference,
            description,
        ));
    }

    for rec in &result.unmatched_bank_records {
        let description = format!(
            "bank record {} ({} {} on {}) has no ledger entry",
            rec.id, rec.transaction_type, rec.amount, rec.transaction_date
        );
        kinds.push((
            DiscrepancyKind::MissingSystem {
                bank_record: rec.clone(),
            },
            rec.amount,
            description,
        ));
    }

    for rec in &result.unmatched_ledger_records {
        let description = format!(
            "ledger record {} ({} {} on {}) has no bank record",
            rec.id, rec.kind, rec.amount, rec.date
        );
        kinds.push((
            DiscrepancyKind::MissingBank {
                ledger_record: rec.clone(),
            },
            rec.amount,
            description,
        ));
    }

    kinds
        .into_iter()
        .enumerate()
        .map(|(i, (kind, difference_amount, description))| Discrepancy {
            id: i + 1,
            kind,
            difference_amount,
            description,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::matcher::match_records;
    use crate::model::{
        BankRecord, DiscrepancyType, LedgerKind, LedgerRecord, TransactionType,
    };
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bank(id: &str, amount: Decimal, d: &str) -> BankRecord {
        BankRecord {
            id: id.into(),
            transaction_date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
            amount,
            description: String::new(),
            balance: Decimal::ZERO,
            transaction_type: TransactionType::Debit,
            counterparty: "Acme".into(),
        }
    }

    fn ledger(id: &str, amount: Decimal, d: &str) -> LedgerRecord {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        LedgerRecord {
            id: id.into(),
            date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
            kind: LedgerKind::Expense,
            amount,
            counterparty_id: "S1".into(),
            description: "Acme".into(),
            category: "supplies".into(),
            status: "posted".into(),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn tolerant() -> MatchConfig {
        MatchConfig {
            amount_tolerance_percent: 0.01,
            date_tolerance_days: 3,
            ..MatchConfig::default()
        }
    }

    #[test]
    fn threshold_is_one_cent() {
        assert_eq!(AMOUNT_DIFF_THRESHOLD, dec!(0.01));
    }

    #[test]
    fn fuzzy_drift_reported() {
        let result = match_records(
            &[bank("b1", dec!(1000.00), "2024-01-15")],
            &[ledger("l1", dec!(1005.00), "2024-01-17")],
            &tolerant(),
        );
        let found = identify_discrepancies(&result);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
        assert_eq!(found[0].discrepancy_type(), DiscrepancyType::AmountDiff);
        assert_eq!(found[0].difference_amount, dec!(5.00));
        assert!(found[0].description.contains("1000.00"));
        assert!(found[0].description.contains("1005.00"));
        assert!(found[0].bank_record().is_some());
        assert!(found[0].ledger_record().is_some());
    }

    #[test]
    fn one_cent_drift_not_reported() {
        let config = MatchConfig {
            amount_tolerance_absolute: dec!(0.05),
            ..MatchConfig::default()
        };
        let result = match_records(
            &[bank("b1", dec!(10.00), "2024-01-15")],
            &[ledger("l1", dec!(10.01), "2024-01-15")],
            &config,
        );
        assert_eq!(result.matched_count, 1);
        assert!(identify_discrepancies(&result).is_empty());
    }

    #[test]
    fn ordering_and_ids() {
        let config = tolerant();
        let result = match_records(
            &[
                bank("b_drift", dec!(1000.00), "2024-01-15"),
                bank("b_orphan", dec!(77.00), "2024-02-20"),
            ],
            &[
                ledger("l_orphan", dec!(12.00), "2024-03-01"),
                ledger("l_drift", dec!(1005.00), "2024-01-16"),
            ],
            &config,
        );
        let found = identify_discrepancies(&result);
        let types: Vec<_> = found.iter().map(|d| d.discrepancy_type()).collect();
        assert_eq!(
            types,
            vec![
                DiscrepancyType::AmountDiff,
                DiscrepancyType::MissingSystem,
                DiscrepancyType::MissingBank,
            ]
        );
        let ids: Vec<_> = found.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert_eq!(found[1].bank_record().unwrap().id, "b_orphan");
        assert!(found[1].ledger_record().is_none());
        assert_eq!(found[1].difference_amount, dec!(77.00));

        assert_eq!(found[2].ledger_record().unwrap().id, "l_orphan");
        assert!(found[2].bank_record().is_none());
        assert_eq!(found[2].difference_amount, dec!(12.00));
    }

    #[test]
    fn serializes_with_type_tag() {
        let result = match_records(
            &[bank("b1", dec!(5.00), "2024-01-15")],
            &[],
            &MatchConfig::default(),
        );
        let found = identify_discrepancies(&result);
        let json = serde_json::to_value(&found[0]).unwrap();
        assert_eq!(json["type"], "MISSING_SYSTEM");
        assert_eq!(json["bank_record"]["id"], "b1");
        assert!(json.get("ledger_record").is_none());
        assert_eq!(json["difference_amount"], "5.00");
    }
}
