// Property-based tests for the matcher and discrepancy classifier.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use tally_recon::{
    identify_discrepancies, match_records, BankRecord, DiscrepancyType, LedgerKind, LedgerRecord,
    MatchConfig, MatchType, TransactionType,
};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

const LABELS: &[&str] = &["Acme", "ACME Ltd", "Globex", "Initech", "Umbrella Co", "Acne"];

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// (amount in cents, day offset, label index). Small pools force collisions.
fn arb_event() -> impl Strategy<Value = (i64, i64, usize)> {
    (
        prop_oneof![Just(10_000i64), Just(10_050), Just(20_000), 1i64..50_000],
        0i64..10,
        0..LABELS.len(),
    )
}

fn arb_bank(max: usize) -> impl Strategy<Value = Vec<BankRecord>> {
    proptest::collection::vec(arb_event(), 0..=max).prop_map(|events| {
        events
            .into_iter()
            .enumerate()
            .map(|(i, (cents, day, label))| BankRecord {
                id: format!("B{i}"),
                transaction_date: base_date() + Duration::days(day),
                amount: Decimal::new(cents, 2),
                description: String::new(),
                balance: Decimal::ZERO,
                transaction_type: TransactionType::Credit,
                counterparty: LABELS[label].to_string(),
            })
            .collect()
    })
}

fn arb_ledger(max: usize) -> impl Strategy<Value = Vec<LedgerRecord>> {
    proptest::collection::vec(arb_event(), 0..=max).prop_map(|events| {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        events
            .into_iter()
            .enumerate()
            .map(|(i, (cents, day, label))| LedgerRecord {
                id: format!("L{i}"),
                date: base_date() + Duration::days(day),
                kind: LedgerKind::Income,
                amount: Decimal::new(cents, 2),
                counterparty_id: format!("C{label}"),
                description: LABELS[label].to_string(),
                category: String::new(),
                status: "posted".into(),
                created_at: ts,
                updated_at: ts,
            })
            .collect()
    })
}

fn arb_config() -> impl Strategy<Value = MatchConfig> {
    (0u32..=2, 0u32..=5, 0i64..=100, 0.5f64..=1.0, any::<bool>()).prop_map(
        |(pct_steps, days, abs_cents, threshold, fuzzy)| MatchConfig {
            amount_tolerance_percent: f64::from(pct_steps) * 0.01,
            amount_tolerance_absolute: Decimal::new(abs_cents, 2),
            date_tolerance_days: days,
            counterparty_similarity_threshold: threshold,
            enable_fuzzy_matching: fuzzy,
            ..MatchConfig::default()
        },
    )
}

// ===========================================================================
// Partition invariants
// ===========================================================================

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn every_record_lands_exactly_once(
        bank in arb_bank(12),
        ledger in arb_ledger(12),
        config in arb_config(),
    ) {
        let result = match_records(&bank, &ledger, &config);

        prop_assert_eq!(result.matched_count, result.matches.len());
        prop_assert_eq!(result.matched_count + result.unmatched_bank_records.len(), bank.len());
        prop_assert_eq!(result.matched_count + result.unmatched_ledger_records.len(), ledger.len());
        prop_assert_eq!(result.total_bank_records, bank.len());
        prop_assert_eq!(result.total_ledger_records, ledger.len());

        let matched_bank: HashSet<_> = result.matches.iter().map(|m| m.bank_record.id.clone()).collect();
        let matched_ledger: HashSet<_> = result.matches.iter().map(|m| m.ledger_record.id.clone()).collect();
        prop_assert_eq!(matched_bank.len(), result.matches.len(), "bank id matched twice");
        prop_assert_eq!(matched_ledger.len(), result.matches.len(), "ledger id matched twice");

        for r in &result.unmatched_bank_records {
            prop_assert!(!matched_bank.contains(&r.id), "{} both matched and unmatched", r.id);
        }
        for r in &result.unmatched_ledger_records {
            prop_assert!(!matched_ledger.contains(&r.id), "{} both matched and unmatched", r.id);
        }
    }

    #[test]
    fn match_rate_is_derived(
        bank in arb_bank(10),
        ledger in arb_ledger(10),
        config in arb_config(),
    ) {
        let result = match_records(&bank, &ledger, &config);
        let expected = if bank.is_empty() {
            0.0
        } else {
            result.matched_count as f64 / bank.len() as f64
        };
        prop_assert_eq!(result.match_rate(), expected);
    }
}

// ===========================================================================
// Scoring invariants
// ===========================================================================

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn fuzzy_matches_need_every_field(
        bank in arb_bank(10),
        ledger in arb_ledger(10),
        config in arb_config(),
    ) {
        let result = match_records(&bank, &ledger, &config);
        for m in result.matches_of_type(MatchType::Fuzzy) {
            prop_assert!(m.confidence > 0.7 && m.confidence <= 1.0);
            prop_assert!(m.match_details.amount_score > 0.0);
            prop_assert!(m.match_details.date_score > 0.0);
            prop_assert!(m.match_details.counterparty_score > 0.0);
        }
        for m in result.matches_of_type(MatchType::Exact) {
            prop_assert_eq!(m.confidence, 1.0);
            prop_assert_eq!(m.bank_record.amount, m.ledger_record.amount);
            prop_assert_eq!(m.bank_record.transaction_date, m.ledger_record.date);
        }
    }

    #[test]
    fn disabled_fuzzy_never_fuzzy(
        bank in arb_bank(10),
        ledger in arb_ledger(10),
        config in arb_config(),
    ) {
        let config = MatchConfig { enable_fuzzy_matching: false, ..config };
        let result = match_records(&bank, &ledger, &config);
        prop_assert_eq!(result.matches_of_type(MatchType::Fuzzy).count(), 0);
    }
}

// ===========================================================================
// Classifier invariants
// ===========================================================================

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn discrepancy_counts_follow_result(
        bank in arb_bank(12),
        ledger in arb_ledger(12),
        config in arb_config(),
    ) {
        let result = match_records(&bank, &ledger, &config);
        let found = identify_discrepancies(&result);

        let count = |t: DiscrepancyType| found.iter().filter(|d| d.discrepancy_type() == t).count();
        let drifting = result
            .matches_of_type(MatchType::Fuzzy)
            .filter(|m| m.amount_difference() > Decimal::new(1, 2))
            .count();

        prop_assert_eq!(count(DiscrepancyType::MissingSystem), result.unmatched_bank_records.len());
        prop_assert_eq!(count(DiscrepancyType::MissingBank), result.unmatched_ledger_records.len());
        prop_assert_eq!(count(DiscrepancyType::AmountDiff), drifting);

        let ids: Vec<_> = found.iter().map(|d| d.id).collect();
        let expected: Vec<_> = (1..=found.len()).collect();
        prop_assert_eq!(ids, expected);

        for d in &found {
            match d.discrepancy_type() {
                DiscrepancyType::AmountDiff => {
                    prop_assert!(d.bank_record().is_some() && d.ledger_record().is_some());
                }
                DiscrepancyType::MissingSystem => {
                    prop_assert!(d.bank_record().is_some() && d.ledger_record().is_none());
                }
                DiscrepancyType::MissingBank => {
                    prop_assert!(d.bank_record().is_none() && d.ledger_record().is_some());
                }
            }
        }
    }
}
