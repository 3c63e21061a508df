//! Storage layer: traits the domain services depend on, plus the file-based
//! implementations.

pub mod csv;
pub mod traits;

pub use csv::CsvConnection;
pub use traits::{BudgetStorage, DinnerDayStorage, PreferenceStorage, SettingsStorage};
