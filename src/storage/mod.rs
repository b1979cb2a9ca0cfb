pub mod blocking;
pub mod collections;
pub mod sqlite;

pub use blocking::BlockingCollection;
pub use collections::{MessageCollection, ParticipantCollection};
pub use sqlite::{SqliteMessages, SqliteParticipants};

use std::fs;
use std::path::Path;

use rusqlite::Result as SqlResult;

/// Ensure the directory holding the database file exists
pub fn ensure_data_dir(db_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Open both collections, on disk when `path` is given and in memory otherwise.
pub fn open_collections(path: Option<&Path>) -> SqlResult<(SqliteParticipants, SqliteMessages)> {
    match path {
        Some(path) => {
            log::info!("Opening chat database at {}", path.display());
            Ok((
                SqliteParticipants::with_path(path)?,
                SqliteMessages::with_path(path)?,
            ))
        }
        None => {
            log::info!("No database path configured; using in-memory storage");
            Ok((SqliteParticipants::in_memory()?, SqliteMessages::in_memory()?))
        }
    }
}
