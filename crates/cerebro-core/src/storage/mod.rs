mod backend;
mod sqlite;

pub use backend::{RecordCounts, StorageBackend};
pub use sqlite::SqliteStorage;

use crate::config::CerebroConfig;
use crate::error::Result;

/// Open the configured document store.
pub fn create_backend(config: &CerebroConfig) -> Result<SqliteStorage> {
    let path = config.database_path()?;
    tracing::info!(path = %path.display(), "opening SQLite store");
    SqliteStorage::open(&path)
}
