//! Domain models for member budget entries and the communal guest fund.
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Deposit,
    Withdrawal,
}

/// A dated monetary entry on one member's ledger. Positive amounts are
/// deposits, negative amounts withdrawals. Entries linked to a dinner day
/// carry the day's date so reconciliation can update them in place instead
/// of inserting duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub id: String,
    pub member_id: String,
    pub amount: f64,
    pub entry_type: EntryType,
    pub description: String,
    pub dinner_date: Option<NaiveDate>,
    pub created_at: DateTime<FixedOffset>,
}

impl BudgetEntry {
    /// Generate a unique entry ID from the amount sign and a timestamp.
    /// Format: <type>-<timestamp_ms>-<random_suffix>, e.g. dep-1625846400123-af3c
    pub fn generate_id(amount: f64, timestamp_ms: u64) -> String {
        let kind = if amount >= 0.0 { "dep" } else { "wd" };
        format!("{}-{}-{}", kind, timestamp_ms, random_suffix(4))
    }

    /// Deterministic description for a dinner-linked withdrawal. Regenerable
    /// from the day's date and the member's portion count, which is what makes
    /// reconciliation idempotent.
    pub fn dinner_description(date: NaiveDate, portions: f64) -> String {
        format!(
            "Dinner {} ({} portions)",
            date.format("%Y-%m-%d"),
            format_portions(portions)
        )
    }
}

/// Same shape as a budget entry but scoped to the shared guest fund. The fund
/// balance is the sum of all entry amounts and may go negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestFundEntry {
    pub id: String,
    pub amount: f64,
    pub description: String,
    pub dinner_date: Option<NaiveDate>,
    pub created_at: DateTime<FixedOffset>,
}

impl GuestFundEntry {
    pub fn generate_id(timestamp_ms: u64) -> String {
        format!("gf-{}-{}", timestamp_ms, random_suffix(4))
    }

    /// Deterministic description for the guest share of a dinner.
    pub fn dinner_description(date: NaiveDate, guest_count: usize) -> String {
        format!(
            "Dinner {} ({} guest{})",
            date.format("%Y-%m-%d"),
            guest_count,
            if guest_count == 1 { "" } else { "s" }
        )
    }
}

/// Current time in milliseconds since the epoch, for ID generation.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Whole portion counts render without a decimal, fractional ones with one.
pub fn format_portions(portions: f64) -> String {
    if (portions - portions.round()).abs() < f64::EPSILON {
        format!("{}", portions as i64)
    } else {
        format!("{:.1}", portions)
    }
}

fn random_suffix(len: usize) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{:x}", now % (16_u128.pow(len as u32)))
        .chars()
        .take(len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_encodes_entry_kind() {
        let id = BudgetEntry::generate_id(-20.0, 1234567890);
        assert!(id.starts_with("wd-1234567890-"));
        let id = BudgetEntry::generate_id(50.0, 1234567890);
        assert!(id.starts_with("dep-1234567890-"));
    }

    #[test]
    fn test_dinner_description_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(
            BudgetEntry::dinner_description(date, 2.0),
            "Dinner 2024-06-10 (2 portions)"
        );
        assert_eq!(
            BudgetEntry::dinner_description(date, 1.5),
            "Dinner 2024-06-10 (1.5 portions)"
        );
        // Same inputs, same string: the upsert key depends on it.
        assert_eq!(
            BudgetEntry::dinner_description(date, 2.0),
            BudgetEntry::dinner_description(date, 2.0)
        );
    }

    #[test]
    fn test_guest_fund_description_pluralizes() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(
            GuestFundEntry::dinner_description(date, 1),
            "Dinner 2024-06-10 (1 guest)"
        );
        assert_eq!(
            GuestFundEntry::dinner_description(date, 3),
            "Dinner 2024-06-10 (3 guests)"
        );
    }
}
