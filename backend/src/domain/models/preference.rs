//! Standing weekly dinner preference owned by each member.
//!
//! The projection job reads these to pre-populate future days; the core never
//! mutates another member's preference.
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// What a member wants on a given weekday when they have opted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Always,
    Never,
    Takeaway,
}

/// Per-weekday entry: status plus how many portions to book automatically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekdayPreference {
    pub status: DayStatus,
    pub portions: f64,
}

impl Default for WeekdayPreference {
    fn default() -> Self {
        Self {
            status: DayStatus::Never,
            portions: 1.0,
        }
    }
}

/// A member's standing weekly preference. Weekday slots are indexed
/// 0-6 Sunday-Saturday, matching `Weekday::num_days_from_sunday`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPreference {
    pub member_id: String,
    pub join_dinners: bool,
    /// Fallback portion count used when a member attends without giving one.
    pub default_portions: f64,
    pub weekdays: [WeekdayPreference; 7],
}

impl MemberPreference {
    /// Opted-out preference with every weekday set to `never`.
    pub fn new(member_id: &str) -> Self {
        Self {
            member_id: member_id.to_string(),
            join_dinners: false,
            default_portions: 1.0,
            weekdays: [WeekdayPreference::default(); 7],
        }
    }

    /// The weekday slot governing a given calendar date.
    pub fn weekday(&self, date: NaiveDate) -> &WeekdayPreference {
        &self.weekdays[date.weekday().num_days_from_sunday() as usize]
    }

    pub fn set_weekday(&mut self, weekday: u8, status: DayStatus, portions: f64) {
        let slot = &mut self.weekdays[weekday as usize % 7];
        slot.status = status;
        slot.portions = portions;
    }
}
