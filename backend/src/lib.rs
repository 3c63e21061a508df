//! # Dinner Planner Backend
//!
//! Attendance and budget engine for a shared dinner program. Members toggle
//! themselves (and their guests) on and off future dinner days, standing
//! weekly preferences are projected into automatic attendance by a nightly
//! job, and the reported cost of each meal is reconciled into proportional
//! withdrawals on the attendees' ledgers and the communal guest fund.
//!
//! The crate is UI-agnostic: [`AppState`] bundles the domain services and is
//! what an API or desktop frontend would hold on to.
//!
//! ## Architecture
//!
//! ```text
//! Frontend / API layer
//!     ↓
//! Domain layer (services, commands, typed errors)
//!     ↓
//! Storage layer (CSV/YAML repositories behind traits)
//! ```

pub mod domain;
pub mod storage;

use anyhow::Result;
use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::domain::{
    AttendanceService, PreferenceService, ProjectionScheduler, ProjectionService,
    ReconciliationService, SettingsService,
};
use crate::storage::csv::{
    BudgetRepository, CsvConnection, DinnerDayRepository, PreferenceRepository, SettingsRepository,
};
use crate::storage::traits::{BudgetStorage, DinnerDayStorage, PreferenceStorage, SettingsStorage};

/// Main application state holding all domain services.
#[derive(Clone)]
pub struct AppState {
    pub attendance_service: AttendanceService,
    pub projection_service: ProjectionService,
    pub reconciliation_service: ReconciliationService,
    pub preference_service: PreferenceService,
    pub settings_service: SettingsService,
}

/// Initialize the backend against a data directory.
pub fn initialize_backend<P: AsRef<Path>>(data_directory: P) -> Result<AppState> {
    info!("Setting up storage");
    let connection = CsvConnection::new(data_directory)?;

    let day_storage: Arc<dyn DinnerDayStorage> =
        Arc::new(DinnerDayRepository::new(connection.clone()));
    let preference_storage: Arc<dyn PreferenceStorage> =
        Arc::new(PreferenceRepository::new(connection.clone()));
    let budget_storage: Arc<dyn BudgetStorage> =
        Arc::new(BudgetRepository::new(connection.clone()));
    let settings_storage: Arc<dyn SettingsStorage> =
        Arc::new(SettingsRepository::new(connection));

    info!("Setting up domain services");
    let projection_service = ProjectionService::new(
        day_storage.clone(),
        preference_storage.clone(),
        settings_storage.clone(),
    );
    let attendance_service = AttendanceService::new(
        day_storage.clone(),
        preference_storage.clone(),
        settings_storage.clone(),
    );
    let reconciliation_service = ReconciliationService::new(day_storage, budget_storage);
    let preference_service = PreferenceService::new(
        preference_storage,
        settings_storage.clone(),
        projection_service.clone(),
    );
    let settings_service = SettingsService::new(settings_storage);

    Ok(AppState {
        attendance_service,
        projection_service,
        reconciliation_service,
        preference_service,
        settings_service,
    })
}

impl AppState {
    /// Start the nightly projection job. The returned scheduler stops the
    /// job when dropped.
    pub fn start_scheduler(&self) -> ProjectionScheduler {
        ProjectionScheduler::start(self.projection_service.clone())
    }
}
