use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::MatchConfig;
use crate::model::{BankRecord, LedgerRecord, Match, MatchDetails, MatchResult, MatchType};
use crate::similarity;

// Weights in tenths: 4 + 3 lands exactly on the 7/10 floor, so a pair with any
// zero-scored field can never clear it.
const AMOUNT_WEIGHT: f64 = 4.0;
const DATE_WEIGHT: f64 = 3.0;
const COUNTERPARTY_WEIGHT: f64 = 3.0;
const WEIGHT_TOTAL: f64 = 10.0;

/// Fuzzy candidates must score strictly above this.
pub const MIN_FUZZY_CONFIDENCE: f64 = 0.7;

/// Score at the edge of a tolerance band; scores fall linearly from 1.0 to it.
const TOLERANCE_FLOOR: f64 = 0.7;

const SUBSTRING_SCORE: f64 = 0.9;

/// Pair bank records with ledger records.
///
/// Pass 1 takes, for each bank record, the first ledger record with equal
/// amount, equal date and a related counterparty label. Pass 2 (if enabled)
/// takes the highest-confidence ledger record among those still free.
/// Inputs are never modified; each record ends up in exactly one of
/// `matches` or the unmatched lists.
pub fn match_records(
    bank: &[BankRecord],
    ledger: &[LedgerRecord],
    config: &MatchConfig,
) -> MatchResult {
    let mut bank_used = vec![false; bank.len()];
    let mut ledger_used = vec![false; ledger.len()];
    let mut matches = Vec::new();

    // Pass 1: exact, first fit
    for (bi, bank_rec) in bank.iter().enumerate() {
        let hit = ledger
            .iter()
            .enumerate()
            .find(|(li, ledger_rec)| !ledger_used[*li] && is_exact(bank_rec, ledger_rec));

        if let Some((li, ledger_rec)) = hit {
            bank_used[bi] = true;
            ledger_used[li] = true;
            matches.push(Match {
                bank_record: bank_rec.clone(),
                ledger_record: ledger_rec.clone(),
                confidence: 1.0,
                match_type: MatchType::Exact,
                match_details: MatchDetails::exact(),
            });
        }
    }
    let exact_count = matches.len();
    debug!(exact = exact_count, bank = bank.len(), ledger = ledger.len(), "exact pass done");

    // Pass 2: fuzzy, best fit
    if config.enable_fuzzy_matching {
        for (bi, bank_rec) in bank.iter().enumerate() {
            if bank_used[bi] {
                continue;
            }

            let mut best: Option<(usize, f64, MatchDetails)> = None;
            for (li, ledger_rec) in ledger.iter().enumerate() {
                if ledger_used[li] {
                    continue;
                }
                let (confidence, details) = score_pair(bank_rec, ledger_rec, config);
                if confidence <= MIN_FUZZY_CONFIDENCE {
                    continue;
                }
                if best.as_ref().map_or(true, |(_, c, _)| confidence > *c) {
                    best = Some((li, confidence, details));
                }
            }

            if let Some((li, confidence, match_details)) = best {
                bank_used[bi] = true;
                ledger_used[li] = true;
                matches.push(Match {
                    bank_record: bank_rec.clone(),
                    ledger_record: ledger[li].clone(),
                    confidence,
                    match_type: MatchType::Fuzzy,
                    match_details,
                });
            }
        }
        debug!(fuzzy = matches.len() - exact_count, "fuzzy pass done");
    }

    let unmatched_bank_records = bank
        .iter()
        .zip(&bank_used)
        .filter(|(_, used)| !**used)
        .map(|(r, _)| r.clone())
        .collect();
    let unmatched_ledger_records = ledger
        .iter()
        .zip(&ledger_used)
        .filter(|(_, used)| !**used)
        .map(|(r, _)| r.clone())
        .collect();

    MatchResult {
        matched_count: matches.len(),
        matches,
        unmatched_bank_records,
        unmatched_ledger_records,
        total_bank_records: bank.len(),
        total_ledger_records: ledger.len(),
    }
}

fn is_exact(bank: &BankRecord, ledger: &LedgerRecord) -> bool {
    bank.amount == ledger.amount
        && bank.transaction_date == ledger.date
        && labels_related(&bank.counterparty, ledger.counterparty_label())
}

/// Equal ignoring case, or one contains the other.
fn labels_related(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a == b || a.contains(&b) || b.contains(&a)
}

/// Weighted confidence of a candidate pair plus its per-field breakdown.
pub fn score_pair(
    bank: &BankRecord,
    ledger: &LedgerRecord,
    config: &MatchConfig,
) -> (f64, MatchDetails) {
    let amount_difference = (bank.amount - ledger.amount).abs();
    let days_apart = (bank.transaction_date - ledger.date).num_days().abs();

    let amount_score = amount_score(bank.amount, amount_difference, config);
    let date_score = date_score(days_apart, config.date_tolerance_days);
    let counterparty_score = counterparty_score(
        &bank.counterparty,
        ledger.counterparty_label(),
        config.counterparty_similarity_threshold,
    );

    let confidence = (AMOUNT_WEIGHT * amount_score
        + DATE_WEIGHT * date_score
        + COUNTERPARTY_WEIGHT * counterparty_score)
        / WEIGHT_TOTAL;

    let details = MatchDetails {
        amount_score,
        date_score,
        counterparty_score,
        amount_match: amount_score > 0.0,
        date_match: date_score > 0.0,
        counterparty_match: counterparty_score > 0.0,
        amount_difference,
        days_apart,
    };

    (confidence, details)
}

fn amount_score(bank_amount: Decimal, difference: Decimal, config: &MatchConfig) -> f64 {
    if difference <= config.amount_tolerance_absolute {
        return 1.0;
    }

    let tolerance = config.amount_tolerance_percent;
    if tolerance <= 0.0 || bank_amount.is_zero() {
        return 0.0;
    }

    let percent = (difference / bank_amount.abs()).to_f64().unwrap_or(f64::INFINITY);
    if percent <= tolerance {
        interpolate(percent, tolerance)
    } else {
        0.0
    }
}

fn date_score(days_apart: i64, tolerance_days: u32) -> f64 {
    if days_apart == 0 {
        1.0
    } else if days_apart <= i64::from(tolerance_days) {
        interpolate(days_apart as f64, f64::from(tolerance_days))
    } else {
        0.0
    }
}

fn counterparty_score(bank_label: &str, ledger_label: &str, threshold: f64) -> f64 {
    let a = bank_label.to_lowercase();
    let b = ledger_label.to_lowercase();

    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return SUBSTRING_SCORE;
    }

    let r = similarity::ratio(&a, &b);
    if r >= threshold {
        r
    } else {
        0.0
    }
}

/// 1.0 at zero drift down to the floor at the tolerance edge.
fn interpolate(drift: f64, tolerance: f64) -> f64 {
    1.0 - (1.0 - TOLERANCE_FLOOR) * (drift / tolerance)
}
