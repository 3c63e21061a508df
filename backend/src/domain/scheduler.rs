//! Nightly projection scheduler.
//!
//! Runs the projection job once at startup, then again just after every local
//! midnight, so the rolling window always extends a full four weeks past
//! "today" and suspended-weekday changes get cleaned up within a day.
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use log::{error, info};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::domain::commands::projection::RunProjectionJobCommand;
use crate::domain::projection_service::{ProjectionService, DEFAULT_WINDOW_DAYS};

/// Time until the next local midnight, measured from `now`.
pub fn duration_until_next_midnight(now: NaiveDateTime) -> Duration {
    let next_midnight = (now.date() + ChronoDuration::days(1))
        .and_hms_opt(0, 0, 0)
        .unwrap_or(now);
    (next_midnight - now).to_std().unwrap_or(Duration::ZERO)
}

/// Owns the background thread. Dropping the scheduler stops it.
pub struct ProjectionScheduler {
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl ProjectionScheduler {
    pub fn start(service: ProjectionService) -> Self {
        let shutdown = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_shutdown = shutdown.clone();

        let handle = std::thread::Builder::new()
            .name("projection-scheduler".to_string())
            .spawn(move || {
                run_loop(service, thread_shutdown);
            })
            .ok();

        Self {
            shutdown,
            handle,
        }
    }

    pub fn stop(&mut self) {
        let (lock, condvar) = &*self.shutdown;
        if let Ok(mut stopped) = lock.lock() {
            *stopped = true;
        }
        condvar.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProjectionScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(service: ProjectionService, shutdown: Arc<(Mutex<bool>, Condvar)>) {
    info!("Projection scheduler started");
    loop {
        run_once(&service);

        let sleep = duration_until_next_midnight(Local::now().naive_local());
        let (lock, condvar) = &*shutdown;
        let mut stopped = match lock.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        // Wait out the night, waking early only on shutdown.
        let deadline = std::time::Instant::now() + sleep;
        while !*stopped {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            stopped = match condvar.wait_timeout(stopped, remaining) {
                Ok((guard, _)) => guard,
                Err(_) => return,
            };
        }
        if *stopped {
            info!("Projection scheduler stopping");
            return;
        }
    }
}

fn run_once(service: &ProjectionService) {
    let today = Local::now().date_naive();
    match service.run_projection_job(RunProjectionJobCommand {
        window_start: today,
        window_days: DEFAULT_WINDOW_DAYS,
    }) {
        Ok(result) => {
            if result.days_failed > 0 {
                error!(
                    "Nightly projection finished with {} failed days",
                    result.days_failed
                );
            }
        }
        Err(err) => error!("Nightly projection failed outright: {:#}", err),
    }
}
