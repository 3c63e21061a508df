//! File-based storage implementations.
//!
//! CSV files for the append-heavy collections (dinner days, ledgers) and
//! YAML for the settings and per-member preference documents, all rooted in
//! one data directory managed by [`CsvConnection`].

pub mod budget_repository;
pub mod connection;
pub mod dinner_day_repository;
pub mod preference_repository;
pub mod settings_repository;

#[cfg(test)]
pub mod test_utils;

pub use budget_repository::BudgetRepository;
pub use connection::CsvConnection;
pub use dinner_day_repository::DinnerDayRepository;
pub use preference_repository::PreferenceRepository;
pub use settings_repository::SettingsRepository;
