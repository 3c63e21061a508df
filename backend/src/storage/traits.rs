//! Storage abstraction traits.
//!
//! The domain layer works against these traits so a different backing store
//! can be substituted without touching the services. All operations are
//! synchronous.

use anyhow::Result;
use chrono::NaiveDate;

use crate::domain::models::admin_settings::AdminSettings;
use crate::domain::models::budget_entry::{BudgetEntry, GuestFundEntry};
use crate::domain::models::dinner_day::DinnerDay;
use crate::domain::models::preference::MemberPreference;

/// Interface for dinner-day record storage.
///
/// The record for a given date is the unit of shared mutable state. Mutations
/// go through `update_day`, which applies a delta closure to the stored
/// record inside one critical section (get-or-create, mutate, persist), so
/// two concurrent mutators cannot overwrite each other's whole attendant
/// collection.
pub trait DinnerDayStorage: Send + Sync {
    /// Fetch the record for a date; `None` if nothing has been stored yet.
    fn get_day(&self, date: NaiveDate) -> Result<Option<DinnerDay>>;

    /// Atomically apply a mutation to the record for a date, implicitly
    /// creating the empty record first. Returns the post-mutation state.
    fn update_day(
        &self,
        date: NaiveDate,
        mutate: &mut dyn FnMut(&mut DinnerDay),
    ) -> Result<DinnerDay>;

    /// List stored records in a date range (inclusive), ordered by date.
    fn list_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DinnerDay>>;
}

/// Interface for standing-preference storage. Preferences are partitioned
/// per member and need no cross-member locking.
pub trait PreferenceStorage: Send + Sync {
    fn get_preference(&self, member_id: &str) -> Result<Option<MemberPreference>>;

    fn store_preference(&self, preference: &MemberPreference) -> Result<()>;

    fn list_preferences(&self) -> Result<Vec<MemberPreference>>;
}

/// Interface for the member budget ledger and the communal guest fund.
pub trait BudgetStorage: Send + Sync {
    fn store_member_entry(&self, entry: &BudgetEntry) -> Result<()>;

    /// All entries for one member, newest first.
    fn list_member_entries(&self, member_id: &str) -> Result<Vec<BudgetEntry>>;

    /// All dinner-linked member entries for one date, across members.
    fn list_dinner_entries_for_date(&self, date: NaiveDate) -> Result<Vec<BudgetEntry>>;

    /// Insert-if-absent / update-in-place of the single dinner-linked
    /// withdrawal for (member, date). Returns the stored entry.
    fn upsert_dinner_entry(
        &self,
        member_id: &str,
        date: NaiveDate,
        amount: f64,
        description: &str,
    ) -> Result<BudgetEntry>;

    /// Delete every dinner-linked member entry for a date. Returns the count.
    fn delete_member_entries_for_date(&self, date: NaiveDate) -> Result<u32>;

    /// Delete the dinner-linked entries for a date belonging to members not
    /// in `keep`. Returns the count removed.
    fn delete_member_entries_not_in(&self, date: NaiveDate, keep: &[String]) -> Result<u32>;

    fn store_guest_fund_entry(&self, entry: &GuestFundEntry) -> Result<()>;

    fn list_guest_fund_entries(&self) -> Result<Vec<GuestFundEntry>>;

    /// Upsert the single dinner-linked guest-fund withdrawal for a date.
    fn upsert_guest_fund_dinner_entry(
        &self,
        date: NaiveDate,
        amount: f64,
        description: &str,
    ) -> Result<GuestFundEntry>;

    fn delete_guest_fund_entries_for_date(&self, date: NaiveDate) -> Result<u32>;

    /// Sum of all guest-fund entry amounts; may be negative.
    fn guest_fund_balance(&self) -> Result<f64>;
}

/// Interface for the shared administrative settings record.
pub trait SettingsStorage: Send + Sync {
    /// Load the settings, creating the default record if none exists.
    fn get_settings(&self) -> Result<AdminSettings>;

    fn store_settings(&self, settings: &AdminSettings) -> Result<()>;
}
