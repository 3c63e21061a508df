//! Domain layer: business rules for attendance, projection, reconciliation,
//! preferences and settings. Everything here works against the storage
//! traits, never against a concrete repository.

pub mod attendance_service;
pub mod commands;
pub mod errors;
pub mod models;
pub mod preference_service;
pub mod projection_service;
pub mod reconciliation_service;
pub mod scheduler;
pub mod settings_service;

pub use attendance_service::AttendanceService;
pub use errors::{DomainError, DomainResult};
pub use preference_service::PreferenceService;
pub use projection_service::{ProjectionService, DEFAULT_WINDOW_DAYS};
pub use reconciliation_service::ReconciliationService;
pub use scheduler::ProjectionScheduler;
pub use settings_service::SettingsService;
