//! Member preference service.
//!
//! Stores a member's standing weekly preference, keeps the dinner roster in
//! the admin settings in sync with their opt-in flag, and immediately
//! re-projects (or retracts) their automatic attendance across the coming
//! window so the calendar reflects the change without waiting for the nightly
//! job.
use chrono::NaiveDate;
use log::info;
use std::sync::Arc;

use crate::domain::commands::preference::{UpdatePreferenceCommand, UpdatePreferenceResult};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::preference::MemberPreference;
use crate::domain::projection_service::ProjectionService;
use crate::storage::traits::{PreferenceStorage, SettingsStorage};

#[derive(Clone)]
pub struct PreferenceService {
    preference_storage: Arc<dyn PreferenceStorage>,
    settings_storage: Arc<dyn SettingsStorage>,
    projection_service: ProjectionService,
}

impl PreferenceService {
    pub fn new(
        preference_storage: Arc<dyn PreferenceStorage>,
        settings_storage: Arc<dyn SettingsStorage>,
        projection_service: ProjectionService,
    ) -> Self {
        Self {
            preference_storage,
            settings_storage,
            projection_service,
        }
    }

    /// A member's stored preference, or the opted-out default if they have
    /// never saved one.
    pub fn get_preference(&self, member_id: &str) -> DomainResult<MemberPreference> {
        Ok(self
            .preference_storage
            .get_preference(member_id)?
            .unwrap_or_else(|| MemberPreference::new(member_id)))
    }

    pub fn update_preference(
        &self,
        command: UpdatePreferenceCommand,
        today: NaiveDate,
    ) -> DomainResult<UpdatePreferenceResult> {
        let preference = command.preference;
        validate(&preference)?;

        self.preference_storage.store_preference(&preference)?;
        self.sync_roster(&preference)?;

        let projection = if preference.join_dinners {
            self.projection_service
                .recompute_for_member(&preference.member_id, today)?
        } else {
            self.projection_service
                .retract_for_member(&preference.member_id, today)?
        };

        info!(
            "Updated preference for {} (join_dinners: {}): {} upserted, {} retracted",
            preference.member_id,
            preference.join_dinners,
            projection.entries_upserted,
            projection.entries_retracted
        );
        Ok(UpdatePreferenceResult {
            preference,
            projection,
            success_message: "Dinner preferences saved".to_string(),
        })
    }

    /// Members currently on the dinner roster.
    pub fn list_opted_in_members(&self) -> DomainResult<Vec<String>> {
        Ok(self.settings_storage.get_settings()?.dinner_members)
    }

    /// The roster in the admin settings mirrors each member's opt-in flag.
    fn sync_roster(&self, preference: &MemberPreference) -> DomainResult<()> {
        let mut settings = self.settings_storage.get_settings()?;
        let on_roster = settings.is_opted_in(&preference.member_id);

        if preference.join_dinners && !on_roster {
            settings.dinner_members.push(preference.member_id.clone());
            self.settings_storage.store_settings(&settings)?;
        } else if !preference.join_dinners && on_roster {
            settings.dinner_members.retain(|m| m != &preference.member_id);
            self.settings_storage.store_settings(&settings)?;
        }
        Ok(())
    }
}

fn validate(preference: &MemberPreference) -> DomainResult<()> {
    if preference.member_id.is_empty() {
        return Err(DomainError::Validation("member id is required".to_string()));
    }
    if preference.default_portions <= 0.0 {
        return Err(DomainError::Validation(format!(
            "default portions must be positive, got {}",
            preference.default_portions
        )));
    }
    for (weekday, slot) in preference.weekdays.iter().enumerate() {
        if slot.portions <= 0.0 {
            return Err(DomainError::Validation(format!(
                "portions for weekday {} must be positive, got {}",
                weekday, slot.portions
            )));
        }
    }
    Ok(())
}
