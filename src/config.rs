//! Store location and opening

use crate::database::SqliteStore;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Returns the default database path: ~/.local/share/deck_versions/decks.db
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deck_versions")
        .join("decks.db")
}

/// Open the store at `path`, creating the parent directory if needed
pub fn open_store(path: &Path) -> Result<SqliteStore> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            log::info!("Created directory: {}", parent.display());
        }
    }
    SqliteStore::open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VersionStore;
    use tempfile::tempdir;

    #[test]
    fn default_path_ends_with_app_dir() {
        let path = default_db_path();
        assert!(path.ends_with("deck_versions/decks.db"));
    }

    #[test]
    fn open_store_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("decks.db");
        let store = open_store(&path).unwrap();
        assert!(path.exists());
        assert!(store.list_decks().unwrap().is_empty());
        assert!(store.list_branches("missing").is_err());
    }
}
