//! CSV-backed budget ledger repository.
//!
//! Member entries live in `budget_entries.csv`, guest-fund entries in
//! `guest_entries.csv`. Dinner-linked entries are keyed by (member, date)
//! so reconciliation can update them in place instead of inserting
//! duplicates.
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use csv::{Reader, Writer};
use log::info;
use std::fs::File;
use std::io::BufReader;

use super::connection::CsvConnection;
use crate::domain::models::budget_entry::{now_millis, BudgetEntry, EntryType, GuestFundEntry};
use crate::storage::traits::BudgetStorage;

const BUDGET_ENTRIES_FILE: &str = "budget_entries.csv";
const GUEST_ENTRIES_FILE: &str = "guest_entries.csv";

#[derive(Clone)]
pub struct BudgetRepository {
    connection: CsvConnection,
}

impl BudgetRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_member_entries(&self) -> Result<Vec<BudgetEntry>> {
        let file_path = self.connection.file_path(BUDGET_ENTRIES_FILE);
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut entries = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let entry_type = match record.get(3).unwrap_or("") {
                "deposit" => EntryType::Deposit,
                "withdrawal" => EntryType::Withdrawal,
                other => anyhow::bail!("Unknown budget entry type: {}", other),
            };
            entries.push(BudgetEntry {
                id: record.get(0).unwrap_or("").to_string(),
                member_id: record.get(1).unwrap_or("").to_string(),
                amount: parse_amount(record.get(2))?,
                entry_type,
                description: record.get(4).unwrap_or("").to_string(),
                dinner_date: parse_optional_date(record.get(5))?,
                created_at: parse_timestamp(record.get(6))?,
            });
        }
        Ok(entries)
    }

    fn write_member_entries(&self, entries: &[BudgetEntry]) -> Result<()> {
        let mut csv_writer = Writer::from_writer(Vec::new());
        csv_writer.write_record([
            "id",
            "member_id",
            "amount",
            "type",
            "description",
            "dinner_date",
            "created_at",
        ])?;
        for entry in entries {
            let type_str = match entry.entry_type {
                EntryType::Deposit => "deposit",
                EntryType::Withdrawal => "withdrawal",
            };
            csv_writer.write_record(&[
                entry.id.clone(),
                entry.member_id.clone(),
                entry.amount.to_string(),
                type_str.to_string(),
                entry.description.clone(),
                entry
                    .dinner_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                entry.created_at.to_rfc3339(),
            ])?;
        }
        let contents = csv_writer.into_inner()?;
        self.connection.write_atomic(BUDGET_ENTRIES_FILE, &contents)
    }

    fn read_guest_entries(&self) -> Result<Vec<GuestFundEntry>> {
        let file_path = self.connection.file_path(GUEST_ENTRIES_FILE);
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut entries = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            entries.push(GuestFundEntry {
                id: record.get(0).unwrap_or("").to_string(),
                amount: parse_amount(record.get(1))?,
                description: record.get(2).unwrap_or("").to_string(),
                dinner_date: parse_optional_date(record.get(3))?,
                created_at: parse_timestamp(record.get(4))?,
            });
        }
        Ok(entries)
    }

    fn write_guest_entries(&self, entries: &[GuestFundEntry]) -> Result<()> {
        let mut csv_writer = Writer::from_writer(Vec::new());
        csv_writer.write_record(["id", "amount", "description", "dinner_date", "created_at"])?;
        for entry in entries {
            csv_writer.write_record(&[
                entry.id.clone(),
                entry.amount.to_string(),
                entry.description.clone(),
                entry
                    .dinner_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                entry.created_at.to_rfc3339(),
            ])?;
        }
        let contents = csv_writer.into_inner()?;
        self.connection.write_atomic(GUEST_ENTRIES_FILE, &contents)
    }
}

fn parse_amount(raw: Option<&str>) -> Result<f64> {
    let raw = raw.unwrap_or("0");
    raw.parse::<f64>()
        .with_context(|| format!("Bad ledger amount: {}", raw))
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.unwrap_or("") {
        "" => Ok(None),
        s => Ok(Some(
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("Bad dinner date: {}", s))?,
        )),
    }
}

fn parse_timestamp(raw: Option<&str>) -> Result<DateTime<FixedOffset>> {
    let raw = raw.unwrap_or("");
    DateTime::parse_from_rfc3339(raw).with_context(|| format!("Bad entry timestamp: {}", raw))
}

/// Dinner-linked entries are timestamped at 18:00 on the meal date so the
/// ledger groups them under the day the meal happened, not the day the spend
/// was reported.
fn dinner_timestamp(date: NaiveDate) -> DateTime<FixedOffset> {
    let naive = date.and_hms_opt(18, 0, 0).expect("valid wall-clock time");
    naive
        .and_local_timezone(FixedOffset::east_opt(0).expect("zero offset"))
        .single()
        .expect("unambiguous at fixed offset")
}

impl BudgetStorage for BudgetRepository {
    fn store_member_entry(&self, entry: &BudgetEntry) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut entries = self.read_member_entries()?;
        if let Some(pos) = entries.iter().position(|e| e.id == entry.id) {
            entries[pos] = entry.clone();
        } else {
            entries.push(entry.clone());
        }
        self.write_member_entries(&entries)
    }

    fn list_member_entries(&self, member_id: &str) -> Result<Vec<BudgetEntry>> {
        let mut entries = self.read_member_entries()?;
        entries.retain(|e| e.member_id == member_id);
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    fn list_dinner_entries_for_date(&self, date: NaiveDate) -> Result<Vec<BudgetEntry>> {
        let mut entries = self.read_member_entries()?;
        entries.retain(|e| e.dinner_date == Some(date));
        Ok(entries)
    }

    fn upsert_dinner_entry(
        &self,
        member_id: &str,
        date: NaiveDate,
        amount: f64,
        description: &str,
    ) -> Result<BudgetEntry> {
        let _guard = self.connection.write_guard();
        let mut entries = self.read_member_entries()?;

        let existing = entries
            .iter_mut()
            .find(|e| e.member_id == member_id && e.dinner_date == Some(date));

        let stored = match existing {
            Some(entry) => {
                entry.amount = amount;
                entry.description = description.to_string();
                entry.clone()
            }
            None => {
                let entry = BudgetEntry {
                    id: BudgetEntry::generate_id(amount, now_millis()),
                    member_id: member_id.to_string(),
                    amount,
                    entry_type: if amount >= 0.0 {
                        EntryType::Deposit
                    } else {
                        EntryType::Withdrawal
                    },
                    description: description.to_string(),
                    dinner_date: Some(date),
                    created_at: dinner_timestamp(date),
                };
                entries.push(entry.clone());
                entry
            }
        };

        self.write_member_entries(&entries)?;
        info!(
            "Upserted dinner ledger entry for {} on {}: {:.2}",
            member_id, date, amount
        );
        Ok(stored)
    }

    fn delete_member_entries_for_date(&self, date: NaiveDate) -> Result<u32> {
        let _guard = self.connection.write_guard();
        let mut entries = self.read_member_entries()?;
        let before = entries.len();
        entries.retain(|e| e.dinner_date != Some(date));
        let removed = (before - entries.len()) as u32;
        if removed > 0 {
            self.write_member_entries(&entries)?;
        }
        Ok(removed)
    }

    fn delete_member_entries_not_in(&self, date: NaiveDate, keep: &[String]) -> Result<u32> {
        let _guard = self.connection.write_guard();
        let mut entries = self.read_member_entries()?;
        let before = entries.len();
        entries.retain(|e| e.dinner_date != Some(date) || keep.contains(&e.member_id));
        let removed = (before - entries.len()) as u32;
        if removed > 0 {
            self.write_member_entries(&entries)?;
        }
        Ok(removed)
    }

    fn store_guest_fund_entry(&self, entry: &GuestFundEntry) -> Result<()> {
        let _guard = self.connection.write_guard();
        let mut entries = self.read_guest_entries()?;
        if let Some(pos) = entries.iter().position(|e| e.id == entry.id) {
            entries[pos] = entry.clone();
        } else {
            entries.push(entry.clone());
        }
        self.write_guest_entries(&entries)
    }

    fn list_guest_fund_entries(&self) -> Result<Vec<GuestFundEntry>> {
        let mut entries = self.read_guest_entries()?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    fn upsert_guest_fund_dinner_entry(
        &self,
        date: NaiveDate,
        amount: f64,
        description: &str,
    ) -> Result<GuestFundEntry> {
        let _guard = self.connection.write_guard();
        let mut entries = self.read_guest_entries()?;

        let existing = entries.iter_mut().find(|e| e.dinner_date == Some(date));
        let stored = match existing {
            Some(entry) => {
                entry.amount = amount;
                entry.description = description.to_string();
                entry.clone()
            }
            None => {
                let entry = GuestFundEntry {
                    id: GuestFundEntry::generate_id(now_millis()),
                    amount,
                    description: description.to_string(),
                    dinner_date: Some(date),
                    created_at: dinner_timestamp(date),
                };
                entries.push(entry.clone());
                entry
            }
        };

        self.write_guest_entries(&entries)?;
        info!(
            "Upserted guest fund entry for {}: {:.2}",
            date, amount
        );
        Ok(stored)
    }

    fn delete_guest_fund_entries_for_date(&self, date: NaiveDate) -> Result<u32> {
        let _guard = self.connection.write_guard();
        let mut entries = self.read_guest_entries()?;
        let before = entries.len();
        entries.retain(|e| e.dinner_date != Some(date));
        let removed = (before - entries.len()) as u32;
        if removed > 0 {
            self.write_guest_entries(&entries)?;
        }
        Ok(removed)
    }

    fn guest_fund_balance(&self) -> Result<f64> {
        Ok(self.read_guest_entries()?.iter().map(|e| e.amount).sum())
    }
}
