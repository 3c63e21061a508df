//! YAML-backed member preference repository.
//!
//! One `{member_id}.yaml` per member under `preferences/`, mirroring the
//! single-document-per-owner layout of the admin settings file.
//!
//! ```text
//! data/
//! ├── admin_settings.yaml
//! ├── dinner_days.csv
//! ├── budget_entries.csv
//! ├── guest_entries.csv
//! └── preferences/
//!     └── {member_id}.yaml
//! ```
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::PathBuf;

use super::connection::CsvConnection;
use crate::domain::models::preference::MemberPreference;
use crate::storage::traits::PreferenceStorage;

const PREFERENCES_DIR: &str = "preferences";

#[derive(Clone)]
pub struct PreferenceRepository {
    connection: CsvConnection,
}

impl PreferenceRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn preferences_dir(&self) -> PathBuf {
        self.connection.base_directory().join(PREFERENCES_DIR)
    }

    fn preference_path(&self, member_id: &str) -> PathBuf {
        // Member ids are opaque tokens; keep only filename-safe characters.
        let safe: String = member_id
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        self.preferences_dir().join(format!("{}.yaml", safe))
    }
}

impl PreferenceStorage for PreferenceRepository {
    fn get_preference(&self, member_id: &str) -> Result<Option<MemberPreference>> {
        let path = self.preference_path(member_id);
        if !path.exists() {
            return Ok(None);
        }
        let yaml = fs::read_to_string(&path)?;
        let preference: MemberPreference = serde_yaml::from_str(&yaml)
            .with_context(|| format!("Bad preference file: {}", path.display()))?;
        debug!("Loaded preference for {}", member_id);
        Ok(Some(preference))
    }

    fn store_preference(&self, preference: &MemberPreference) -> Result<()> {
        let dir = self.preferences_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let path = self.preference_path(&preference.member_id);
        let yaml = serde_yaml::to_string(preference)?;

        let temp = path.with_extension("tmp");
        fs::write(&temp, yaml)?;
        fs::rename(&temp, &path)?;
        debug!("Stored preference for {}", preference.member_id);
        Ok(())
    }

    fn list_preferences(&self) -> Result<Vec<MemberPreference>> {
        let dir = self.preferences_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut preferences = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let yaml = fs::read_to_string(&path)?;
            let preference: MemberPreference = serde_yaml::from_str(&yaml)
                .with_context(|| format!("Bad preference file: {}", path.display()))?;
            preferences.push(preference);
        }
        preferences.sort_by(|a, b| a.member_id.cmp(&b.member_id));
        Ok(preferences)
    }
}
