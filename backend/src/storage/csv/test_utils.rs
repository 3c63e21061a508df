//! Shared test scaffolding for the storage layer.
#![cfg(test)]

use anyhow::Result;
use tempfile::TempDir;

use super::connection::CsvConnection;

/// A temporary data directory plus a connection into it. The directory is
/// removed when the environment is dropped, so tests must keep it alive for
/// the duration of the test body.
pub struct TestEnvironment {
    pub connection: CsvConnection,
    _temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let connection = CsvConnection::new(temp_dir.path())?;
        Ok(Self {
            connection,
            _temp_dir: temp_dir,
        })
    }
}
