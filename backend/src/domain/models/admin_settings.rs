//! Shared administrative settings: the opted-in dinner roster, suspended
//! weekdays, and display defaults for the budget screens.
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSettings {
    /// Weekdays (0-6, Sunday-Saturday) on which no meal is normally held.
    pub suspended_weekdays: Vec<u8>,
    /// Members who have opted in to the dinner program.
    pub dinner_members: Vec<String>,
    pub budget_per_meal: f64,
    pub currency_type: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            suspended_weekdays: Vec::new(),
            dinner_members: Vec::new(),
            budget_per_meal: 0.0,
            currency_type: ":-".to_string(),
        }
    }
}

impl AdminSettings {
    pub fn is_suspended(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_sunday() as u8;
        self.suspended_weekdays.contains(&weekday)
    }

    pub fn is_opted_in(&self, member_id: &str) -> bool {
        self.dinner_members.iter().any(|m| m == member_id)
    }

    pub fn is_valid_weekday(weekday: u8) -> bool {
        weekday <= 6
    }
}

/// Human weekday name for a date, used in confirmation messages.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
