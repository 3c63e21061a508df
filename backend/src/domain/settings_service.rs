//! Administrative settings service.
use log::info;
use std::sync::Arc;

use crate::domain::commands::settings::{UpdateSettingsCommand, UpdateSettingsResult};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::admin_settings::AdminSettings;
use crate::storage::traits::SettingsStorage;

#[derive(Clone)]
pub struct SettingsService {
    settings_storage: Arc<dyn SettingsStorage>,
}

impl SettingsService {
    pub fn new(settings_storage: Arc<dyn SettingsStorage>) -> Self {
        Self { settings_storage }
    }

    pub fn get_settings(&self) -> DomainResult<AdminSettings> {
        Ok(self.settings_storage.get_settings()?)
    }

    pub fn update_settings(
        &self,
        command: UpdateSettingsCommand,
    ) -> DomainResult<UpdateSettingsResult> {
        let mut settings = command.settings;

        for weekday in &settings.suspended_weekdays {
            if !AdminSettings::is_valid_weekday(*weekday) {
                return Err(DomainError::Validation(format!(
                    "invalid weekday: {}. Must be 0-6 (Sunday-Saturday)",
                    weekday
                )));
            }
        }
        if settings.budget_per_meal < 0.0 {
            return Err(DomainError::Validation(
                "budget per meal cannot be negative".to_string(),
            ));
        }
        if settings.currency_type.is_empty() {
            return Err(DomainError::Validation(
                "currency type is required".to_string(),
            ));
        }

        settings.suspended_weekdays.sort_unstable();
        settings.suspended_weekdays.dedup();

        self.settings_storage.store_settings(&settings)?;
        info!(
            "Updated admin settings: {} members, {} suspended weekdays",
            settings.dinner_members.len(),
            settings.suspended_weekdays.len()
        );
        Ok(UpdateSettingsResult {
            settings,
            success_message: "Settings updated successfully".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::TestEnvironment;
    use crate::storage::csv::SettingsRepository;
    use anyhow::Result;

    fn setup() -> Result<(SettingsService, TestEnvironment)> {
        let env = TestEnvironment::new()?;
        let storage: Arc<dyn SettingsStorage> =
            Arc::new(SettingsRepository::new(env.connection.clone()));
        Ok((SettingsService::new(storage), env))
    }

    #[test]
    fn test_update_normalizes_suspended_weekdays() -> Result<()> {
        let (service, _env) = setup()?;

        let result = service.update_settings(UpdateSettingsCommand {
            settings: AdminSettings {
                suspended_weekdays: vec![6, 0, 6],
                dinner_members: vec!["alice".to_string()],
                budget_per_meal: 25.0,
                currency_type: ":-".to_string(),
            },
        })?;
        assert_eq!(result.settings.suspended_weekdays, vec![0, 6]);

        let stored = service.get_settings()?;
        assert_eq!(stored, result.settings);
        Ok(())
    }

    #[test]
    fn test_out_of_range_weekday_is_rejected() -> Result<()> {
        let (service, _env) = setup()?;

        let err = service
            .update_settings(UpdateSettingsCommand {
                settings: AdminSettings {
                    suspended_weekdays: vec![7],
                    ..Default::default()
                },
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        Ok(())
    }

    #[test]
    fn test_negative_budget_is_rejected() -> Result<()> {
        let (service, _env) = setup()?;

        let err = service
            .update_settings(UpdateSettingsCommand {
                settings: AdminSettings {
                    budget_per_meal: -1.0,
                    ..Default::default()
                },
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        Ok(())
    }
}
