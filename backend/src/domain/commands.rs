//! Domain-level command and result types.
//! These structs are used by services inside the domain layer; the surrounding
//! application (UI or API layer) is responsible for mapping its own payloads
//! onto them.

pub mod attendance {
    use crate::domain::models::dinner_day::{DinnerDay, Ingredient};
    use chrono::NaiveDate;

    /// Toggle the acting member on/off the cook list for a date.
    #[derive(Debug, Clone)]
    pub struct ToggleCookCommand {
        pub date: NaiveDate,
        pub member_id: String,
        /// Set after the user has answered the suspended-weekday prompt.
        pub confirmed: bool,
    }

    #[derive(Debug, Clone)]
    pub struct ToggleCookResult {
        pub day: DinnerDay,
        pub is_cook: bool,
    }

    /// Toggle the acting member's attendance for a date. A member who is
    /// already attending is removed regardless of the other parameters; this
    /// is a pure toggle, not an update-in-place.
    #[derive(Debug, Clone)]
    pub struct ToggleAttendanceCommand {
        pub date: NaiveDate,
        pub member_id: String,
        pub take_away: bool,
        /// Defaults to the member's preferred portion count when omitted.
        pub portions: Option<f64>,
        pub confirmed: bool,
    }

    #[derive(Debug, Clone)]
    pub struct ToggleAttendanceResult {
        pub day: DinnerDay,
        pub is_attending: bool,
    }

    /// Replace all guest placeholders for a date with exactly `guest_count`
    /// single-portion entries.
    #[derive(Debug, Clone)]
    pub struct UpdateGuestAttendanceCommand {
        pub date: NaiveDate,
        pub guest_count: usize,
        pub confirmed: bool,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateGuestAttendanceResult {
        pub day: DinnerDay,
    }

    /// Replace the day's ingredient list wholesale.
    #[derive(Debug, Clone)]
    pub struct SetIngredientsCommand {
        pub date: NaiveDate,
        pub member_id: String,
        pub ingredients: Vec<Ingredient>,
        pub confirmed: bool,
    }

    /// Add or remove a single ingredient tag.
    #[derive(Debug, Clone)]
    pub struct UpdateIngredientCommand {
        pub date: NaiveDate,
        pub member_id: String,
        pub ingredient: Ingredient,
        pub checked: bool,
        pub confirmed: bool,
    }

    #[derive(Debug, Clone)]
    pub struct IngredientsResult {
        pub day: DinnerDay,
    }
}

pub mod projection {
    use chrono::NaiveDate;

    /// Run the projection job over `window_days` dates starting at
    /// `window_start`, for every opted-in member.
    #[derive(Debug, Clone)]
    pub struct RunProjectionJobCommand {
        pub window_start: NaiveDate,
        pub window_days: u32,
    }

    /// Outcome of a projection pass. The job is best-effort across dates:
    /// `days_failed` counts dates whose write failed and were skipped.
    #[derive(Debug, Clone, Default)]
    pub struct ProjectionRunResult {
        pub days_processed: usize,
        pub days_failed: usize,
        pub entries_upserted: usize,
        pub entries_retracted: usize,
    }
}

pub mod reconciliation {
    use chrono::NaiveDate;

    /// Report (or clear, with `None`/`0`) the amount spent on a day's meal.
    #[derive(Debug, Clone)]
    pub struct SetUsedBudgetCommand {
        pub date: NaiveDate,
        pub amount: Option<f64>,
    }

    /// One ledger write that failed during a best-effort reconciliation.
    #[derive(Debug, Clone)]
    pub struct ReconciliationFailure {
        /// Member id, or "guest-fund" for the communal share.
        pub account: String,
        pub message: String,
    }

    #[derive(Debug, Clone, Default)]
    pub struct SetUsedBudgetResult {
        pub total_portions: f64,
        pub entries_written: usize,
        pub entries_removed: usize,
        pub failures: Vec<ReconciliationFailure>,
    }
}

pub mod preference {
    use crate::domain::commands::projection::ProjectionRunResult;
    use crate::domain::models::preference::MemberPreference;

    /// Store a member's standing weekly preference and re-project their
    /// automatic attendance across the current window.
    #[derive(Debug, Clone)]
    pub struct UpdatePreferenceCommand {
        pub preference: MemberPreference,
    }

    #[derive(Debug, Clone)]
    pub struct UpdatePreferenceResult {
        pub preference: MemberPreference,
        pub projection: ProjectionRunResult,
        pub success_message: String,
    }
}

pub mod settings {
    use crate::domain::models::admin_settings::AdminSettings;

    #[derive(Debug, Clone)]
    pub struct UpdateSettingsCommand {
        pub settings: AdminSettings,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateSettingsResult {
        pub settings: AdminSettings,
        pub success_message: String,
    }
}
