//! Standing-preference projection.
//!
//! Walks a window of future dates and books automatic attendance entries for
//! every opted-in member whose weekly preference covers that weekday. Only
//! entries the job wrote (`is_automatically_set`) are ever retracted or
//! adjusted; anything a member asserted by hand takes precedence and is left
//! alone.
use log::{error, info};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::domain::commands::projection::{ProjectionRunResult, RunProjectionJobCommand};
use crate::domain::errors::DomainResult;
use crate::domain::models::admin_settings::AdminSettings;
use crate::domain::models::dinner_day::{Attendant, DinnerDay};
use crate::domain::models::preference::{DayStatus, MemberPreference};
use crate::storage::traits::{DinnerDayStorage, PreferenceStorage, SettingsStorage};

/// Four weeks: every weekday slot appears at least four times, which is far
/// enough ahead for cooks to plan shopping.
pub const DEFAULT_WINDOW_DAYS: u32 = 28;

/// What the preference says a member should look like on one date, if they
/// should be booked at all.
struct DesiredAttendance {
    member_id: String,
    portions: f64,
    take_away: bool,
}

fn desired_for(preference: &MemberPreference, date: NaiveDate) -> Option<DesiredAttendance> {
    if !preference.join_dinners {
        return None;
    }
    let slot = preference.weekday(date);
    let take_away = match slot.status {
        DayStatus::Never => return None,
        DayStatus::Always => false,
        DayStatus::Takeaway => true,
    };
    Some(DesiredAttendance {
        member_id: preference.member_id.clone(),
        portions: slot.portions,
        take_away,
    })
}

/// Bring one day's automatic entries in line with the desired set. Returns
/// (entries written or adjusted, entries retracted).
fn apply_projection(day: &mut DinnerDay, desired: &[DesiredAttendance]) -> (usize, usize) {
    let mut upserted = 0;
    let mut retracted = 0;

    // Retract automatic entries whose member no longer projects onto this
    // weekday. Manual entries survive even after an opt-out.
    let before = day.attendants.len();
    day.attendants.retain(|a| {
        !a.is_automatically_set || desired.iter().any(|d| d.member_id == a.id)
    });
    retracted += before - day.attendants.len();

    for want in desired {
        match day.attendants.iter_mut().find(|a| a.id == want.member_id) {
            Some(existing) if existing.is_automatically_set => {
                if existing.portions != want.portions || existing.is_take_away != want.take_away {
                    existing.portions = want.portions;
                    existing.is_take_away = want.take_away;
                    upserted += 1;
                }
            }
            // Member asserted this day themselves; leave their entry alone.
            Some(_) => {}
            None => {
                day.attendants.push(Attendant::automatic(
                    &want.member_id,
                    want.portions,
                    want.take_away,
                ));
                upserted += 1;
            }
        }
    }

    (upserted, retracted)
}

#[derive(Clone)]
pub struct ProjectionService {
    day_storage: Arc<dyn DinnerDayStorage>,
    preference_storage: Arc<dyn PreferenceStorage>,
    settings_storage: Arc<dyn SettingsStorage>,
}

impl ProjectionService {
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

    /// Project every opted-in member's preference across the window.
    ///
    /// Best-effort per date: a failed write is counted and logged, then the
    /// job moves on to the next date, so one bad day cannot starve the rest
    /// of the window.
    pub fn run_projection_job(
        &self,
        command: RunProjectionJobCommand,
    ) -> DomainResult<ProjectionRunResult> {
        let settings = self.settings_storage.get_settings()?;
        let preferences = self.preference_storage.list_preferences()?;

        let mut result = ProjectionRunResult::default();
        for offset in 0..command.window_days {
            let date = command.window_start + Duration::days(offset as i64);
            match self.project_date(date, &settings, &preferences) {
                Ok((upserted, retracted)) => {
                    result.days_processed += 1;
                    result.entries_upserted += upserted;
                    result.entries_retracted += retracted;
                }
                Err(err) => {
                    error!("Projection failed for {}: {:#}", date, err);
                    result.days_failed += 1;
                }
            }
        }

        info!(
            "Projection over {} days from {}: {} upserted, {} retracted, {} failed",
            command.window_days,
            command.window_start,
            result.entries_upserted,
            result.entries_retracted,
            result.days_failed
        );
        Ok(result)
    }

    /// Re-project a single member over the default window starting at
    /// `window_start`. Used right after their preference changes.
    pub fn recompute_for_member(
        &self,
        member_id: &str,
        window_start: NaiveDate,
    ) -> DomainResult<ProjectionRunResult> {
        let settings = self.settings_storage.get_settings()?;
        let preferences: Vec<MemberPreference> = self
            .preference_storage
            .get_preference(member_id)?
            .into_iter()
            .collect();

        let mut result = ProjectionRunResult::default();
        for offset in 0..DEFAULT_WINDOW_DAYS {
            let date = window_start + Duration::days(offset as i64);
            match self.project_member_date(date, member_id, &settings, &preferences) {
                Ok((upserted, retracted)) => {
                    result.days_processed += 1;
                    result.entries_upserted += upserted;
                    result.entries_retracted += retracted;
                }
                Err(err) => {
                    error!("Projection failed for {} on {}: {:#}", member_id, date, err);
                    result.days_failed += 1;
                }
            }
        }
        Ok(result)
    }

    /// Remove a member's automatic entries over the default window, used when
    /// they opt out entirely. Manual entries stay.
    pub fn retract_for_member(
        &self,
        member_id: &str,
        window_start: NaiveDate,
    ) -> DomainResult<ProjectionRunResult> {
        let settings = self.settings_storage.get_settings()?;
        let mut result = ProjectionRunResult::default();
        for offset in 0..DEFAULT_WINDOW_DAYS {
            let date = window_start + Duration::days(offset as i64);
            match self.project_member_date(date, member_id, &settings, &[]) {
                Ok((_, retracted)) => {
                    result.days_processed += 1;
                    result.entries_retracted += retracted;
                }
                Err(err) => {
                    error!("Retraction failed for {} on {}: {:#}", member_id, date, err);
                    result.days_failed += 1;
                }
            }
        }
        Ok(result)
    }

    fn project_date(
        &self,
        date: NaiveDate,
        settings: &AdminSettings,
        preferences: &[MemberPreference],
    ) -> DomainResult<(usize, usize)> {
        let desired: Vec<DesiredAttendance> = if settings.is_suspended(date) {
            // No meal is held on suspended weekdays; automatic entries there
            // get retracted rather than refreshed.
            Vec::new()
        } else {
            preferences
                .iter()
                .filter(|p| settings.is_opted_in(&p.member_id))
                .filter_map(|p| desired_for(p, date))
                .collect()
        };

        // A day that was never touched and projects nothing should stay
        // unstored rather than materialize as an empty record.
        if desired.is_empty() && self.day_storage.get_day(date)?.is_none() {
            return Ok((0, 0));
        }

        let mut counts = (0, 0);
        self.day_storage.update_day(date, &mut |day| {
            counts = apply_projection(day, &desired);
        })?;
        Ok(counts)
    }

    /// Like `project_date` but scoped to one member: other members' entries,
    /// automatic or not, are never touched.
    fn project_member_date(
        &self,
        date: NaiveDate,
        member_id: &str,
        settings: &AdminSettings,
        preferences: &[MemberPreference],
    ) -> DomainResult<(usize, usize)> {
        let desired: Vec<DesiredAttendance> = if settings.is_suspended(date) {
            Vec::new()
        } else {
            preferences
                .iter()
                .filter(|p| p.member_id == member_id)
                .filter(|p| settings.is_opted_in(&p.member_id))
                .filter_map(|p| desired_for(p, date))
                .collect()
        };

        if desired.is_empty() {
            // Only touch storage if there is an automatic entry to retract.
            let existing = self.day_storage.get_day(date)?;
            let has_auto = existing
                .as_ref()
                .and_then(|d| d.attendant(member_id))
                .map_or(false, |a| a.is_automatically_set);
            if !has_auto {
                return Ok((0, 0));
            }
        }

        let mut counts = (0, 0);
        self.day_storage.update_day(date, &mut |day| {
            let mut upserted = 0;
            let mut retracted = 0;

            let keep_ids: Vec<&str> = desired.iter().map(|d| d.member_id.as_str()).collect();
            let before = day.attendants.len();
            day.attendants.retain(|a| {
                a.id != member_id || !a.is_automatically_set || keep_ids.contains(&a.id.as_str())
            });
            retracted += before - day.attendants.len();

            for want in &desired {
                match day.attendants.iter_mut().find(|a| a.id == want.member_id) {
                    Some(existing) if existing.is_automatically_set => {
                        if existing.portions != want.portions
                            || existing.is_take_away != want.take_away
                        {
                            existing.portions = want.portions;
                            existing.is_take_away = want.take_away;
                            upserted += 1;
                        }
                    }
                    Some(_) => {}
                    None => {
                        day.attendants.push(Attendant::automatic(
                            &want.member_id,
                            want.portions,
                            want.take_away,
                        ));
                        upserted += 1;
                    }
                }
            }
            counts = (upserted, retracted);
        })?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::TestEnvironment;
    use crate::storage::csv::{DinnerDayRepository, PreferenceRepository, SettingsRepository};
    use anyhow::Result;

    struct TestHelper {
        service: ProjectionService,
        day_storage: Arc<dyn DinnerDayStorage>,
        preference_storage: Arc<dyn PreferenceStorage>,
        settings_storage: Arc<dyn SettingsStorage>,
        _env: TestEnvironment,
    }

    impl TestHelper {
        fn new(members: &[&str]) -> Result<Self> {
            let env = TestEnvironment::new()?;
            let day_storage: Arc<dyn DinnerDayStorage> =
                Arc::new(DinnerDayRepository::new(env.connection.clone()));
            let preference_storage: Arc<dyn PreferenceStorage> =
                Arc::new(PreferenceRepository::new(env.connection.clone()));
            let settings_storage: Arc<dyn SettingsStorage> =
                Arc::new(SettingsRepository::new(env.connection.clone()));

            let mut settings = settings_storage.get_settings()?;
            settings.dinner_members = members.iter().map(|m| m.to_string()).collect();
            settings_storage.store_settings(&settings)?;

            let service = ProjectionService::new(
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

        fn store_always_on_mondays(&self, member_id: &str, portions: f64) -> Result<()> {
            let mut pref = MemberPreference::new(member_id);
            pref.join_dinners = true;
            pref.set_weekday(1, DayStatus::Always, portions);
            self.preference_storage.store_preference(&pref)?;
            Ok(())
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn run_window(helper: &TestHelper, start: NaiveDate, days: u32) -> DomainResult<ProjectionRunResult> {
        helper.service.run_projection_job(RunProjectionJobCommand {
            window_start: start,
            window_days: days,
        })
    }

    #[test]
    fn test_projection_books_automatic_entries() -> Result<()> {
        let helper = TestHelper::new(&["alice"])?;
        helper.store_always_on_mondays("alice", 2.0)?;

        let result = run_window(&helper, monday(), 7).unwrap();
        assert_eq!(result.days_processed, 7);
        assert_eq!(result.entries_upserted, 1);

        let day = helper.day_storage.get_day(monday())?.unwrap();
        let entry = day.attendant("alice").unwrap();
        assert!(entry.is_automatically_set);
        assert_eq!(entry.portions, 2.0);
        assert!(!entry.is_take_away);

        // Tuesday projects nothing and was never touched, so no record.
        let tuesday = monday() + Duration::days(1);
        assert!(helper.day_storage.get_day(tuesday)?.is_none());
        Ok(())
    }

    #[test]
    fn test_projection_is_idempotent() -> Result<()> {
        let helper = TestHelper::new(&["alice"])?;
        helper.store_always_on_mondays("alice", 2.0)?;

        run_window(&helper, monday(), 7).unwrap();
        let second = run_window(&helper, monday(), 7).unwrap();
        assert_eq!(second.entries_upserted, 0);
        assert_eq!(second.entries_retracted, 0);

        let day = helper.day_storage.get_day(monday())?.unwrap();
        assert_eq!(day.attendants.len(), 1);
        Ok(())
    }

    #[test]
    fn test_manual_entry_takes_precedence() -> Result<()> {
        let helper = TestHelper::new(&["alice"])?;
        helper.store_always_on_mondays("alice", 2.0)?;

        // Alice already booked herself with different parameters.
        helper.day_storage.update_day(monday(), &mut |day| {
            day.attendants.push(Attendant::member("alice", 4.0, true));
        })?;

        run_window(&helper, monday(), 1).unwrap();
        let day = helper.day_storage.get_day(monday())?.unwrap();
        let entry = day.attendant("alice").unwrap();
        assert!(!entry.is_automatically_set);
        assert_eq!(entry.portions, 4.0);
        Ok(())
    }

    #[test]
    fn test_takeaway_status_projects_takeaway_entry() -> Result<()> {
        let helper = TestHelper::new(&["alice"])?;
        let mut pref = MemberPreference::new("alice");
        pref.join_dinners = true;
        pref.set_weekday(1, DayStatus::Takeaway, 1.0);
        helper.preference_storage.store_preference(&pref)?;

        run_window(&helper, monday(), 1).unwrap();
        let day = helper.day_storage.get_day(monday())?.unwrap();
        assert!(day.attendant("alice").unwrap().is_take_away);
        Ok(())
    }

    #[test]
    fn test_preference_change_retracts_automatic_entries() -> Result<()> {
        let helper = TestHelper::new(&["alice"])?;
        helper.store_always_on_mondays("alice", 2.0)?;
        run_window(&helper, monday(), 7).unwrap();

        // Alice flips Mondays to never.
        let mut pref = helper.preference_storage.get_preference("alice")?.unwrap();
        pref.set_weekday(1, DayStatus::Never, 1.0);
        helper.preference_storage.store_preference(&pref)?;

        let result = run_window(&helper, monday(), 7).unwrap();
        assert_eq!(result.entries_retracted, 1);
        let day = helper.day_storage.get_day(monday())?.unwrap();
        assert!(day.attendant("alice").is_none());
        Ok(())
    }

    #[test]
    fn test_suspended_weekdays_are_skipped_and_cleaned() -> Result<()> {
        let helper = TestHelper::new(&["alice"])?;
        helper.store_always_on_mondays("alice", 2.0)?;
        run_window(&helper, monday(), 1).unwrap();

        let mut settings = helper.settings_storage.get_settings()?;
        settings.suspended_weekdays = vec![1];
        helper.settings_storage.store_settings(&settings)?;

        let result = run_window(&helper, monday(), 1).unwrap();
        assert_eq!(result.entries_retracted, 1);
        let day = helper.day_storage.get_day(monday())?.unwrap();
        assert!(day.attendants.is_empty());
        Ok(())
    }

    #[test]
    fn test_recompute_for_member_leaves_others_alone() -> Result<()> {
        let helper = TestHelper::new(&["alice", "bob"])?;
        helper.store_always_on_mondays("alice", 2.0)?;
        helper.store_always_on_mondays("bob", 1.0)?;
        run_window(&helper, monday(), DEFAULT_WINDOW_DAYS).unwrap();

        let mut pref = helper.preference_storage.get_preference("alice")?.unwrap();
        pref.set_weekday(1, DayStatus::Always, 3.0);
        helper.preference_storage.store_preference(&pref)?;

        helper.service.recompute_for_member("alice", monday()).unwrap();
        let day = helper.day_storage.get_day(monday())?.unwrap();
        assert_eq!(day.attendant("alice").unwrap().portions, 3.0);
        assert_eq!(day.attendant("bob").unwrap().portions, 1.0);
        Ok(())
    }

    #[test]
    fn test_retract_for_member_spares_manual_entries() -> Result<()> {
        let helper = TestHelper::new(&["alice"])?;
        helper.store_always_on_mondays("alice", 2.0)?;
        run_window(&helper, monday(), DEFAULT_WINDOW_DAYS).unwrap();

        // One Monday she asserted by hand.
        let manual_monday = monday() + Duration::days(7);
        helper.day_storage.update_day(manual_monday, &mut |day| {
            day.attendants.retain(|a| a.id != "alice");
            day.attendants.push(Attendant::member("alice", 2.0, false));
        })?;

        let result = helper.service.retract_for_member("alice", monday()).unwrap();
        assert!(result.entries_retracted >= 3);

        assert!(helper
            .day_storage
            .get_day(monday())?
            .unwrap()
            .attendant("alice")
            .is_none());
        assert!(helper
            .day_storage
            .get_day(manual_monday)?
            .unwrap()
            .attendant("alice")
            .is_some());
        Ok(())
    }
}
