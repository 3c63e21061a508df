//! File-based storage connection.
use anyhow::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// CsvConnection manages the data directory and serializes read-modify-write
/// cycles against the shared files.
///
/// Repositories that mutate shared records (dinner days, ledger upserts) take
/// the write guard for the whole cycle, so a delta applied by one caller can
/// never be clobbered by a concurrent whole-file rewrite from another.
#[derive(Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CsvConnection {
    /// Create a new connection rooted at `base_directory`, creating the
    /// directory if needed.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: base_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Path of a data file directly under the base directory.
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.base_directory.join(file_name)
    }

    /// Acquire the write guard for a read-modify-write cycle.
    pub fn write_guard(&self) -> MutexGuard<'_, ()> {
        // A poisoned lock means another writer panicked mid-cycle; the data
        // on disk is still the last fully written state, so continue.
        match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Atomic write pattern: write to a temp file, then rename into place.
    pub fn write_atomic(&self, file_name: &str, contents: &[u8]) -> Result<()> {
        let target = self.file_path(file_name);
        let temp = target.with_extension("tmp");
        fs::write(&temp, contents)?;
        fs::rename(&temp, &target)?;
        Ok(())
    }
}
