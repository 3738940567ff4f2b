//! Recurring-transaction detection.
//!
//! Batch heuristic over a user's transaction history: group by exact
//! merchant name, sort each group by date, and flag adjacent pairs whose
//! day gap matches an allowed billing interval and whose amounts agree
//! within tolerance.

use crate::models::Transaction;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Day gaps that count as a billing interval. The gap must match one of
/// these exactly; only the amount has tolerance.
pub const ALLOWED_FREQUENCIES: [i64; 4] = [7, 14, 21, 28];

/// A transaction flagged as recurring, with the inferred interval and
/// the date of the most recent occurrence in the matching pair.
#[derive(Debug, Clone)]
pub struct RecurringMatch {
    pub transaction: Transaction,
    /// Inferred interval in days (one of `ALLOWED_FREQUENCIES`).
    pub frequency: i64,
    pub last_transaction_date: NaiveDate,
}

/// Detect recurring charges in a transaction history.
///
/// Grouping is by exact, case-sensitive name; no fuzzy matching. Amounts
/// are rounded to 2 decimal places before comparison and must agree
/// within 1.00 absolute currency units. A transaction that participates
/// in several qualifying adjacent pairs is emitted once per pair.
pub fn detect_recurring(transactions: &[Transaction]) -> Vec<RecurringMatch> {
    let mut groups: HashMap<&str, Vec<&Transaction>> = HashMap::new();
    for transaction in transactions {
        groups
            .entry(transaction.name.as_str())
            .or_default()
            .push(transaction);
    }

    let mut matches = Vec::new();

    for group in groups.values_mut() {
        if group.len() < 2 {
            continue;
        }
        group.sort_by_key(|t| t.date);

        for pair in group.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);

            let gap = (later.date - earlier.date).num_days();
            if !ALLOWED_FREQUENCIES.contains(&gap) {
                continue;
            }

            let difference = (earlier.amount.round_dp(2) - later.amount.round_dp(2)).abs();
            if difference > Decimal::ONE {
                continue;
            }

            matches.push(RecurringMatch {
                transaction: earlier.clone(),
                frequency: gap,
                last_transaction_date: later.date,
            });
        }
    }

    // HashMap iteration order is arbitrary; give callers a stable order.
    matches.sort_by(|a, b| {
        (a.transaction.name.as_str(), a.transaction.date)
            .cmp(&(b.transaction.name.as_str(), b.transaction.date))
    });

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn transaction(name: &str, amount: &str, date: &str) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            external_transaction_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            amount: amount.parse().unwrap(),
            category: String::new(),
            subcategory: String::new(),
            transaction_type: String::new(),
            iso_currency_code: "USD".to_string(),
            date: date.parse().unwrap(),
            pending: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn biweekly_identical_amounts_match() {
        let transactions = vec![
            transaction("Netflix", "-15.99", "2024-01-01"),
            transaction("Netflix", "-15.99", "2024-01-15"),
        ];

        let matches = detect_recurring(&transactions);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].frequency, 14);
        assert_eq!(matches[0].transaction.date, "2024-01-01".parse().unwrap());
        assert_eq!(
            matches[0].last_transaction_date,
            "2024-01-15".parse::<NaiveDate>().unwrap()
        );
    }

    #[test]
    fn amount_drift_beyond_tolerance_is_rejected() {
        let transactions = vec![
            transaction("Gym", "-40.00", "2024-03-01"),
            transaction("Gym", "-42.00", "2024-03-08"),
        ];

        assert!(detect_recurring(&transactions).is_empty());
    }

    #[test]
    fn amount_drift_within_tolerance_matches() {
        let transactions = vec![
            transaction("Gym", "-40.00", "2024-03-01"),
            transaction("Gym", "-40.75", "2024-03-08"),
        ];

        let matches = detect_recurring(&transactions);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].frequency, 7);
    }

    #[test]
    fn wrong_interval_is_rejected() {
        let transactions = vec![
            transaction("Spotify", "-9.99", "2024-02-01"),
            transaction("Spotify", "-9.99", "2024-02-11"),
        ];

        assert!(detect_recurring(&transactions).is_empty());
    }

    #[test]
    fn grouping_is_case_sensitive() {
        let transactions = vec![
            transaction("netflix", "-15.99", "2024-01-01"),
            transaction("Netflix", "-15.99", "2024-01-15"),
        ];

        assert!(detect_recurring(&transactions).is_empty());
    }

    #[test]
    fn singleton_group_yields_nothing() {
        let transactions = vec![transaction("Rent", "-1200.00", "2024-01-01")];
        assert!(detect_recurring(&transactions).is_empty());
    }

    #[test]
    fn overlapping_pairs_emit_multiple_matches() {
        // Three weekly charges: both adjacent pairs qualify, so the
        // middle dates appear across two emitted matches.
        let transactions = vec![
            transaction("Cleaner", "-50.00", "2024-04-01"),
            transaction("Cleaner", "-50.00", "2024-04-08"),
            transaction("Cleaner", "-50.00", "2024-04-15"),
        ];

        let matches = detect_recurring(&transactions);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].transaction.date, "2024-04-01".parse().unwrap());
        assert_eq!(matches[1].transaction.date, "2024-04-08".parse().unwrap());
        assert!(matches.iter().all(|m| m.frequency == 7));
    }

    #[test]
    fn amounts_are_rounded_before_comparison() {
        // Unrounded the difference is 1.004 and would fail the tolerance;
        // rounding to cents brings it to exactly 1.00.
        let transactions = vec![
            transaction("Cloud", "-10.00", "2024-05-01"),
            transaction("Cloud", "-11.004", "2024-05-08"),
        ];

        let matches = detect_recurring(&transactions);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn unsorted_input_is_sorted_by_date_within_group() {
        let transactions = vec![
            transaction("Netflix", "-15.99", "2024-01-15"),
            transaction("Netflix", "-15.99", "2024-01-01"),
        ];

        let matches = detect_recurring(&transactions);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].transaction.date, "2024-01-01".parse().unwrap());
    }
}
