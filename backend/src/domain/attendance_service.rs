//! Dinner-day attendance service: cook and attendant toggles, guest counts,
//! and the ingredient checklist.
//!
//! Every mutation passes through the same two guards before touching storage:
//! the roster guard (only opted-in members may edit, except guest counts,
//! which any logged-in user may set) and the suspended-weekday guard (editing
//! a still-empty day on a suspended weekday needs an explicit confirmation).
use log::info;
use std::sync::Arc;

use crate::domain::commands::attendance::{
    IngredientsResult, SetIngredientsCommand, ToggleAttendanceCommand, ToggleAttendanceResult,
    ToggleCookCommand, ToggleCookResult, UpdateGuestAttendanceCommand, UpdateGuestAttendanceResult,
    UpdateIngredientCommand,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::admin_settings::weekday_name;
use crate::domain::models::dinner_day::{Attendant, DinnerDay};
use crate::storage::traits::{DinnerDayStorage, PreferenceStorage, SettingsStorage};

#[derive(Clone)]
pub struct AttendanceService {
    day_storage: Arc<dyn DinnerDayStorage>,
    preference_storage: Arc<dyn PreferenceStorage>,
    settings_storage: Arc<dyn SettingsStorage>,
}

impl AttendanceService {
    pub fn new(
        day_storage: Arc<dyn DinnerDayStorage>,
        preference_storage: Arc<dyn PreferenceStorage>,
        settings_storage: Arc<dyn SettingsStorage>,
    ) -> Self {
        Self {
            day_storage,
            preference_storage,
            settings_storage,
        }
    }

    /// Roster guard: only members on the dinner roster may mutate a day.
    fn require_roster_member(&self, member_id: &str) -> DomainResult<()> {
        let settings = self.settings_storage.get_settings()?;
        if !settings.is_opted_in(member_id) {
            return Err(DomainError::NotAuthorized(format!(
                "{} is not on the dinner roster",
                member_id
            )));
        }
        Ok(())
    }

    /// Suspended-weekday guard: mutating an empty day on a suspended weekday
    /// needs explicit confirmation. Once the day has any content, further
    /// edits go through without prompting again.
    fn require_confirmation_if_suspended(
        &self,
        date: chrono::NaiveDate,
        confirmed: bool,
    ) -> DomainResult<()> {
        if confirmed {
            return Ok(());
        }
        let settings = self.settings_storage.get_settings()?;
        if !settings.is_suspended(date) {
            return Ok(());
        }
        let day_is_empty = self
            .day_storage
            .get_day(date)?
            .map_or(true, |day| day.is_cleared());
        if day_is_empty {
            return Err(DomainError::ConfirmationRequired {
                weekday: weekday_name(date).to_string(),
            });
        }
        Ok(())
    }

    /// Portion count a member gets when they attend without naming one.
    fn preferred_portions(&self, member_id: &str) -> DomainResult<f64> {
        Ok(self
            .preference_storage
            .get_preference(member_id)?
            .map(|p| p.default_portions)
            .unwrap_or(1.0))
    }

    /// Add a member to the cook list, and book them as an attendant with
    /// their preferred portions if they are not already eating.
    fn add_cook(&self, day: &mut DinnerDay, member_id: &str, portions: f64) {
        day.cooks.push(member_id.to_string());
        if day.attendant(member_id).is_none() {
            day.attendants.push(Attendant::member(member_id, portions, false));
        }
    }

    pub fn toggle_cook(&self, command: ToggleCookCommand) -> DomainResult<ToggleCookResult> {
        self.require_roster_member(&command.member_id)?;
        self.require_confirmation_if_suspended(command.date, command.confirmed)?;

        let portions = self.preferred_portions(&command.member_id)?;
        let member_id = command.member_id.clone();
        let mut is_cook = false;

        let day = self.day_storage.update_day(command.date, &mut |day| {
            if day.has_cook(&member_id) {
                day.cooks.retain(|c| c != &member_id);
                // Nobody left to cook: the planned meal is off.
                if day.cooks.is_empty() {
                    day.ingredients.clear();
                }
                is_cook = false;
            } else {
                self.add_cook(day, &member_id, portions);
                is_cook = true;
            }
        })?;

        info!(
            "{} is {} a cook on {}",
            command.member_id,
            if is_cook { "now" } else { "no longer" },
            command.date
        );
        Ok(ToggleCookResult { day, is_cook })
    }

    /// Pure toggle: an attending member is removed no matter what portion or
    /// take-away arguments accompany the call. Changing portions means
    /// toggling off and back on.
    pub fn toggle_attendance(
        &self,
        command: ToggleAttendanceCommand,
    ) -> DomainResult<ToggleAttendanceResult> {
        self.require_roster_member(&command.member_id)?;
        self.require_confirmation_if_suspended(command.date, command.confirmed)?;

        let portions = match command.portions {
            Some(p) if p > 0.0 => p,
            Some(p) => {
                return Err(DomainError::Validation(format!(
                    "portions must be positive, got {}",
                    p
                )))
            }
            None => self.preferred_portions(&command.member_id)?,
        };

        let member_id = command.member_id.clone();
        let take_away = command.take_away;
        let mut is_attending = false;

        let day = self.day_storage.update_day(command.date, &mut |day| {
            if day.attendant(&member_id).is_some() {
                day.attendants.retain(|a| a.id != member_id);
                is_attending = false;
            } else {
                day.attendants
                    .push(Attendant::member(&member_id, portions, take_away));
                is_attending = true;
            }
        })?;

        info!(
            "{} is {} attending on {}",
            command.member_id,
            if is_attending { "now" } else { "no longer" },
            command.date
        );
        Ok(ToggleAttendanceResult { day, is_attending })
    }

    /// Set the number of guest placeholders for a day. Existing guest entries
    /// are replaced wholesale with `guest-1` through `guest-N`; member
    /// entries are untouched. Guests are not roster members, so any user may
    /// report them.
    pub fn update_guest_attendance(
        &self,
        command: UpdateGuestAttendanceCommand,
    ) -> DomainResult<UpdateGuestAttendanceResult> {
        self.require_confirmation_if_suspended(command.date, command.confirmed)?;

        let guest_count = command.guest_count;
        let day = self.day_storage.update_day(command.date, &mut |day| {
            day.attendants.retain(|a| !a.is_guest());
            for n in 1..=guest_count {
                day.attendants.push(Attendant::guest(n));
            }
        })?;

        info!("Set {} guests on {}", guest_count, command.date);
        Ok(UpdateGuestAttendanceResult { day })
    }

    /// Replace the day's ingredient checklist. Writing a non-empty list
    /// implies the actor is cooking, so they join the cook list (and the
    /// attendants) if not already on it.
    pub fn set_ingredients(&self, command: SetIngredientsCommand) -> DomainResult<IngredientsResult> {
        self.require_roster_member(&command.member_id)?;
        self.require_confirmation_if_suspended(command.date, command.confirmed)?;

        let portions = self.preferred_portions(&command.member_id)?;
        let member_id = command.member_id.clone();
        let ingredients = command.ingredients.clone();

        let day = self.day_storage.update_day(command.date, &mut |day| {
            day.ingredients = ingredients.clone();
            if !day.ingredients.is_empty() && !day.has_cook(&member_id) {
                self.add_cook(day, &member_id, portions);
            }
        })?;

        Ok(IngredientsResult { day })
    }

    /// Check or uncheck a single ingredient. Checking the first ingredient
    /// on a day makes the actor a cook, same as `set_ingredients`.
    pub fn update_ingredient(
        &self,
        command: UpdateIngredientCommand,
    ) -> DomainResult<IngredientsResult> {
        self.require_roster_member(&command.member_id)?;
        self.require_confirmation_if_suspended(command.date, command.confirmed)?;

        let portions = self.preferred_portions(&command.member_id)?;
        let member_id = command.member_id.clone();
        let ingredient = command.ingredient;
        let checked = command.checked;

        let day = self.day_storage.update_day(command.date, &mut |day| {
            if checked {
                if !day.ingredients.contains(&ingredient) {
                    day.ingredients.push(ingredient);
                }
                if !day.has_cook(&member_id) {
                    self.add_cook(day, &member_id, portions);
                }
            } else {
                day.ingredients.retain(|i| *i != ingredient);
            }
        })?;

        Ok(IngredientsResult { day })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::admin_settings::AdminSettings;
    use crate::domain::models::dinner_day::Ingredient;
    use crate::domain::models::preference::MemberPreference;
    use crate::storage::csv::test_utils::TestEnvironment;
    use crate::storage::csv::{DinnerDayRepository, PreferenceRepository, SettingsRepository};
    use anyhow::Result;
    use chrono::NaiveDate;

    struct TestHelper {
        service: AttendanceService,
        day_storage: Arc<dyn DinnerDayStorage>,
        preference_storage: Arc<dyn PreferenceStorage>,
        settings_storage: Arc<dyn SettingsStorage>,
        _env: TestEnvironment,
    }

    impl TestHelper {
        fn new() -> Result<Self> {
            let env = TestEnvironment::new()?;
            let day_storage: Arc<dyn DinnerDayStorage> =
                Arc::new(DinnerDayRepository::new(env.connection.clone()));
            let preference_storage: Arc<dyn PreferenceStorage> =
                Arc::new(PreferenceRepository::new(env.connection.clone()));
            let settings_storage: Arc<dyn SettingsStorage> =
                Arc::new(SettingsRepository::new(env.connection.clone()));
            let service = AttendanceService::new(
                day_storage.clone(),
                preference_storage.clone(),
                settings_storage.clone(),
            );
            Ok(Self {
                service,
                day_storage,
                preference_storage,
                settings_storage,
                _env: env,
            })
        }

        fn with_members(members: &[&str]) -> Result<Self> {
            let helper = Self::new()?;
            let mut settings = helper.settings_storage.get_settings()?;
            settings.dinner_members = members.iter().map(|m| m.to_string()).collect();
            helper.settings_storage.store_settings(&settings)?;
            Ok(helper)
        }

        fn suspend_weekday(&self, weekday: u8) -> Result<()> {
            let mut settings = self.settings_storage.get_settings()?;
            settings.suspended_weekdays.push(weekday);
            self.settings_storage.store_settings(&settings)?;
            Ok(())
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    #[test]
    fn test_toggle_cook_on_and_off() -> Result<()> {
        let helper = TestHelper::with_members(&["alice"])?;

        let result = helper.service.toggle_cook(ToggleCookCommand {
            date: monday(),
            member_id: "alice".to_string(),
            confirmed: false,
        })?;
        assert!(result.is_cook);
        assert!(result.day.has_cook("alice"));
        // Cooking implies eating.
        assert!(result.day.attendant("alice").is_some());

        let result = helper.service.toggle_cook(ToggleCookCommand {
            date: monday(),
            member_id: "alice".to_string(),
            confirmed: false,
        })?;
        assert!(!result.is_cook);
        assert!(!result.day.has_cook("alice"));
        // Toggling off the cook role does not remove attendance.
        assert!(result.day.attendant("alice").is_some());
        Ok(())
    }

    #[test]
    fn test_removing_last_cook_clears_ingredients() -> Result<()> {
        let helper = TestHelper::with_members(&["alice", "bob"])?;

        for member in ["alice", "bob"] {
            helper.service.toggle_cook(ToggleCookCommand {
                date: monday(),
                member_id: member.to_string(),
                confirmed: false,
            })?;
        }
        helper.service.set_ingredients(SetIngredientsCommand {
            date: monday(),
            member_id: "alice".to_string(),
            ingredients: vec![Ingredient::Pasta, Ingredient::Cheese],
            confirmed: false,
        })?;

        let result = helper.service.toggle_cook(ToggleCookCommand {
            date: monday(),
            member_id: "alice".to_string(),
            confirmed: false,
        })?;
        // Bob still cooks: ingredients stay.
        assert_eq!(result.day.ingredients.len(), 2);

        let result = helper.service.toggle_cook(ToggleCookCommand {
            date: monday(),
            member_id: "bob".to_string(),
            confirmed: false,
        })?;
        assert!(result.day.cooks.is_empty());
        assert!(result.day.ingredients.is_empty());
        Ok(())
    }

    #[test]
    fn test_toggle_attendance_uses_preferred_portions() -> Result<()> {
        let helper = TestHelper::with_members(&["alice"])?;
        let mut pref = MemberPreference::new("alice");
        pref.default_portions = 2.5;
        helper.preference_storage.store_preference(&pref)?;

        let result = helper.service.toggle_attendance(ToggleAttendanceCommand {
            date: monday(),
            member_id: "alice".to_string(),
            take_away: false,
            portions: None,
            confirmed: false,
        })?;
        assert!(result.is_attending);
        assert_eq!(result.day.attendant("alice").unwrap().portions, 2.5);
        Ok(())
    }

    #[test]
    fn test_toggle_attendance_is_a_pure_toggle() -> Result<()> {
        let helper = TestHelper::with_members(&["alice"])?;

        helper.service.toggle_attendance(ToggleAttendanceCommand {
            date: monday(),
            member_id: "alice".to_string(),
            take_away: false,
            portions: Some(1.0),
            confirmed: false,
        })?;
        // Second call with different arguments still removes.
        let result = helper.service.toggle_attendance(ToggleAttendanceCommand {
            date: monday(),
            member_id: "alice".to_string(),
            take_away: true,
            portions: Some(3.0),
            confirmed: false,
        })?;
        assert!(!result.is_attending);
        assert!(result.day.attendants.is_empty());
        Ok(())
    }

    #[test]
    fn test_non_roster_member_is_rejected() -> Result<()> {
        let helper = TestHelper::with_members(&["alice"])?;

        let err = helper
            .service
            .toggle_attendance(ToggleAttendanceCommand {
                date: monday(),
                member_id: "mallory".to_string(),
                take_away: false,
                portions: None,
                confirmed: false,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::NotAuthorized(_)));
        Ok(())
    }

    #[test]
    fn test_suspended_weekday_requires_confirmation_once() -> Result<()> {
        let helper = TestHelper::with_members(&["alice", "bob"])?;
        helper.suspend_weekday(1)?; // Monday

        let err = helper
            .service
            .toggle_attendance(ToggleAttendanceCommand {
                date: monday(),
                member_id: "alice".to_string(),
                take_away: false,
                portions: None,
                confirmed: false,
            })
            .unwrap_err();
        match err {
            DomainError::ConfirmationRequired { weekday } => assert_eq!(weekday, "Monday"),
            other => panic!("expected confirmation prompt, got {:?}", other),
        }
        // Declining left no record behind.
        assert!(helper.day_storage.get_day(monday())?.is_none());

        helper.service.toggle_attendance(ToggleAttendanceCommand {
            date: monday(),
            member_id: "alice".to_string(),
            take_away: false,
            portions: None,
            confirmed: true,
        })?;

        // The day has content now, so no further prompting.
        let result = helper.service.toggle_attendance(ToggleAttendanceCommand {
            date: monday(),
            member_id: "bob".to_string(),
            take_away: false,
            portions: None,
            confirmed: false,
        })?;
        assert!(result.is_attending);
        Ok(())
    }

    #[test]
    fn test_guest_updates_skip_roster_guard() -> Result<()> {
        let helper = TestHelper::with_members(&["alice"])?;

        let result = helper
            .service
            .update_guest_attendance(UpdateGuestAttendanceCommand {
                date: monday(),
                guest_count: 3,
                confirmed: false,
            })?;
        assert_eq!(result.day.guest_count(), 3);
        assert_eq!(result.day.total_portions(), 3.0);

        let result = helper
            .service
            .update_guest_attendance(UpdateGuestAttendanceCommand {
                date: monday(),
                guest_count: 1,
                confirmed: false,
            })?;
        assert_eq!(result.day.guest_count(), 1);
        assert_eq!(result.day.attendants[0].id, "guest-1");

        // Member attendants survive clearing the guests.
        helper.service.toggle_attendance(ToggleAttendanceCommand {
            date: monday(),
            member_id: "alice".to_string(),
            take_away: false,
            portions: None,
            confirmed: false,
        })?;
        let result = helper
            .service
            .update_guest_attendance(UpdateGuestAttendanceCommand {
                date: monday(),
                guest_count: 0,
                confirmed: false,
            })?;
        assert_eq!(result.day.guest_count(), 0);
        assert!(result.day.attendant("alice").is_some());
        Ok(())
    }

    #[test]
    fn test_checking_ingredient_makes_actor_a_cook() -> Result<()> {
        let helper = TestHelper::with_members(&["alice"])?;

        let result = helper.service.update_ingredient(UpdateIngredientCommand {
            date: monday(),
            member_id: "alice".to_string(),
            ingredient: Ingredient::Fish,
            checked: true,
            confirmed: false,
        })?;
        assert!(result.day.has_cook("alice"));
        assert!(result.day.attendant("alice").is_some());
        assert_eq!(result.day.ingredients, vec![Ingredient::Fish]);

        // Unchecking removes the tag but leaves the cook in place.
        let result = helper.service.update_ingredient(UpdateIngredientCommand {
            date: monday(),
            member_id: "alice".to_string(),
            ingredient: Ingredient::Fish,
            checked: false,
            confirmed: false,
        })?;
        assert!(result.day.has_cook("alice"));
        assert!(result.day.ingredients.is_empty());
        Ok(())
    }
}
