//! Administrative settings repository.
//!
//! A single `admin_settings.yaml` file holding the shared program settings:
//! suspended weekdays, the dinner roster, budget per meal, and the currency
//! label. Loading creates the default record on first access so callers never
//! see a missing-settings state.
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

use super::connection::CsvConnection;
use crate::domain::models::admin_settings::AdminSettings;
use crate::storage::traits::SettingsStorage;

const SETTINGS_FILE: &str = "admin_settings.yaml";

#[derive(Clone)]
pub struct SettingsRepository {
    connection: CsvConnection,
}

impl SettingsRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn settings_path(&self) -> PathBuf {
        self.connection.file_path(SETTINGS_FILE)
    }
}

impl SettingsStorage for SettingsRepository {
    fn get_settings(&self) -> Result<AdminSettings> {
        let path = self.settings_path();
        if !path.exists() {
            let defaults = AdminSettings::default();
            self.store_settings(&defaults)?;
            info!("Created default admin settings at {}", path.display());
            return Ok(defaults);
        }

        let yaml = fs::read_to_string(&path)?;
        let settings: AdminSettings = serde_yaml::from_str(&yaml)
            .with_context(|| format!("Bad settings file: {}", path.display()))?;
        Ok(settings)
    }

    fn store_settings(&self, settings: &AdminSettings) -> Result<()> {
        let yaml = serde_yaml::to_string(settings)?;
        self.connection.write_atomic(SETTINGS_FILE, yaml.as_bytes())
    }
}
