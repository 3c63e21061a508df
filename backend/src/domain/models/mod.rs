pub mod admin_settings;
pub mod budget_entry;
pub mod dinner_day;
pub mod preference;
