//! Budget reconciliation: turn a reported meal spend into per-member ledger
//! withdrawals plus a guest-fund withdrawal, proportional to portions.
//!
//! The whole pass is re-runnable. Dinner-linked entries are keyed by
//! (member, date), so reporting a corrected amount updates the existing
//! withdrawals in place, and clearing the amount removes them all.
use log::{info, warn};
use std::sync::Arc;

use crate::domain::commands::reconciliation::{
    ReconciliationFailure, SetUsedBudgetCommand, SetUsedBudgetResult,
};
use crate::domain::errors::{DomainError, DomainResult};
use chrono::Utc;

use crate::domain::models::budget_entry::{now_millis, BudgetEntry, EntryType, GuestFundEntry};
use crate::storage::traits::{BudgetStorage, DinnerDayStorage};

const GUEST_FUND_ACCOUNT: &str = "guest-fund";

#[derive(Clone)]
pub struct ReconciliationService {
    day_storage: Arc<dyn DinnerDayStorage>,
    budget_storage: Arc<dyn BudgetStorage>,
}

impl ReconciliationService {
    pub fn new(
        day_storage: Arc<dyn DinnerDayStorage>,
        budget_storage: Arc<dyn BudgetStorage>,
    ) -> Self {
        Self {
            day_storage,
            budget_storage,
        }
    }

    /// Record (or clear) the amount spent on a day's meal and bring every
    /// linked ledger entry in line with it.
    ///
    /// Ledger writes are best-effort: a failed write for one account is
    /// reported in the result and the pass continues, so a re-run after the
    /// failure converges on the same final state.
    pub fn set_used_budget(
        &self,
        command: SetUsedBudgetCommand,
    ) -> DomainResult<SetUsedBudgetResult> {
        // None and zero both mean "no spend": the stored field is cleared and
        // every dinner-linked entry for the date is deleted.
        let amount = command.amount.filter(|a| *a != 0.0);

        if let Some(amount) = amount {
            if amount < 0.0 {
                return Err(DomainError::Validation(format!(
                    "used budget cannot be negative, got {}",
                    amount
                )));
            }
            // Reject before recording anything: a spend on a day nobody
            // attended has no portions to split it over.
            let portions = self
                .day_storage
                .get_day(command.date)?
                .map_or(0.0, |day| day.total_portions());
            if portions <= 0.0 {
                return Err(DomainError::Validation(format!(
                    "cannot split {} over a day with no attendants",
                    amount
                )));
            }
        }

        let day = self.day_storage.update_day(command.date, &mut |day| {
            day.used_budget = amount;
        })?;

        let amount = match amount {
            Some(amount) => amount,
            None => {
                let removed = self.clear_entries(command.date)?;
                info!(
                    "Cleared used budget for {}: removed {} ledger entries",
                    command.date, removed
                );
                return Ok(SetUsedBudgetResult {
                    total_portions: day.total_portions(),
                    entries_removed: removed,
                    ..Default::default()
                });
            }
        };

        let total_portions = day.total_portions();
        let cost_per_portion = amount / total_portions;

        let mut result = SetUsedBudgetResult {
            total_portions,
            ..Default::default()
        };

        // One withdrawal per attending member, proportional to portions.
        let mut attending = Vec::new();
        for attendant in day.attendants.iter().filter(|a| !a.is_guest()) {
            let share = cost_per_portion * attendant.portions;
            let description = BudgetEntry::dinner_description(command.date, attendant.portions);
            match self.budget_storage.upsert_dinner_entry(
                &attendant.id,
                command.date,
                -share,
                &description,
            ) {
                Ok(_) => {
                    attending.push(attendant.id.clone());
                    result.entries_written += 1;
                }
                Err(err) => {
                    warn!("Ledger write failed for {}: {:#}", attendant.id, err);
                    result.failures.push(ReconciliationFailure {
                        account: attendant.id.clone(),
                        message: format!("{:#}", err),
                    });
                }
            }
        }

        // The guest share comes out of the communal fund as one entry.
        let guest_count = day.guest_count();
        if guest_count > 0 {
            let share = cost_per_portion * guest_count as f64;
            let description = GuestFundEntry::dinner_description(command.date, guest_count);
            match self
                .budget_storage
                .upsert_guest_fund_dinner_entry(command.date, -share, &description)
            {
                Ok(_) => result.entries_written += 1,
                Err(err) => {
                    warn!("Guest fund write failed: {:#}", err);
                    result.failures.push(ReconciliationFailure {
                        account: GUEST_FUND_ACCOUNT.to_string(),
                        message: format!("{:#}", err),
                    });
                }
            }
        } else {
            result.entries_removed +=
                self.budget_storage.delete_guest_fund_entries_for_date(command.date)? as usize;
        }

        // Members who dropped off the day since the last pass lose their
        // linked withdrawal. Members whose write just failed are excluded
        // from the kept set only if they left the day, never because of the
        // failure itself.
        let keep: Vec<String> = day
            .attendants
            .iter()
            .filter(|a| !a.is_guest())
            .map(|a| a.id.clone())
            .collect();
        result.entries_removed += self
            .budget_storage
            .delete_member_entries_not_in(command.date, &keep)? as usize;

        info!(
            "Reconciled {} over {} portions on {}: {} written, {} removed, {} failed",
            amount,
            total_portions,
            command.date,
            result.entries_written,
            result.entries_removed,
            result.failures.len()
        );
        Ok(result)
    }

    /// Record money a member put into their own budget.
    pub fn add_member_deposit(
        &self,
        member_id: &str,
        amount: f64,
        description: &str,
    ) -> DomainResult<BudgetEntry> {
        if amount <= 0.0 {
            return Err(DomainError::Validation(format!(
                "deposit must be positive, got {}",
                amount
            )));
        }
        let entry = BudgetEntry {
            id: BudgetEntry::generate_id(amount, now_millis()),
            member_id: member_id.to_string(),
            amount,
            entry_type: EntryType::Deposit,
            description: description.to_string(),
            dinner_date: None,
            created_at: Utc::now().fixed_offset(),
        };
        self.budget_storage.store_member_entry(&entry)?;
        info!("Deposit of {} for {}", amount, member_id);
        Ok(entry)
    }

    /// Record a contribution to the communal guest fund.
    pub fn add_to_guest_fund(&self, amount: f64) -> DomainResult<GuestFundEntry> {
        if amount <= 0.0 {
            return Err(DomainError::Validation(format!(
                "contribution must be positive, got {}",
                amount
            )));
        }
        let entry = GuestFundEntry {
            id: GuestFundEntry::generate_id(now_millis()),
            amount,
            description: "Added to Guest Hospitality Fund".to_string(),
            dinner_date: None,
            created_at: Utc::now().fixed_offset(),
        };
        self.budget_storage.store_guest_fund_entry(&entry)?;
        info!("Guest fund contribution of {}", amount);
        Ok(entry)
    }

    /// Net balance of one member's ledger.
    pub fn member_balance(&self, member_id: &str) -> DomainResult<f64> {
        Ok(self
            .budget_storage
            .list_member_entries(member_id)?
            .iter()
            .map(|e| e.amount)
            .sum())
    }

    pub fn guest_fund_balance(&self) -> DomainResult<f64> {
        Ok(self.budget_storage.guest_fund_balance()?)
    }

    fn clear_entries(&self, date: chrono::NaiveDate) -> DomainResult<usize> {
        let members = self.budget_storage.delete_member_entries_for_date(date)?;
        let guests = self.budget_storage.delete_guest_fund_entries_for_date(date)?;
        Ok((members + guests) as usize)
    }
}
