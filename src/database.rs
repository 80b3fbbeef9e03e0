//! SQLite-backed deck version store
//!
//! Uses parameterized queries exclusively (no SQL string concatenation).
//! Multi-row writes are transactional; saved snapshots are never rewritten.

use crate::error::{DeckError, Result};
use crate::models::{Bump, Deck, Version, MAIN_BRANCH};
use crate::store::{sanitize_branch_name, BranchSource, VersionStore};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use std::path::Path;

/// A saved version and when it was saved (UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub saved_at: String,
}

/// Initialize the database schema
///
/// Creates tables if they don't exist:
/// - `decks`: one row per deck with its working state and current position
/// - `branches`: named lines of history per deck
/// - `versions`: immutable JSON snapshots per branch
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS decks (
            name TEXT PRIMARY KEY,
            working_snapshot TEXT NOT NULL,
            current_branch TEXT NOT NULL,
            current_version TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- id doubles as creation order
        CREATE TABLE IF NOT EXISTS branches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            deck_name TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (deck_name, name),
            FOREIGN KEY (deck_name) REFERENCES decks(name)
        );

        CREATE TABLE IF NOT EXISTS versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            branch_id INTEGER NOT NULL,
            version TEXT NOT NULL,
            snapshot TEXT NOT NULL,
            saved_at TEXT NOT NULL,
            UNIQUE (branch_id, version),
            FOREIGN KEY (branch_id) REFERENCES branches(id)
        );

        CREATE INDEX IF NOT EXISTS idx_branches_deck ON branches(deck_name);
        CREATE INDEX IF NOT EXISTS idx_versions_branch ON versions(branch_id);
        ",
    )?;

    log::debug!("Database schema initialized");
    Ok(())
}

/// Deck store over a single SQLite connection
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and initialize the schema
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        log::info!("Opened database: {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Create a deck with a `main` branch holding version 1.0.0
    pub fn create_deck(&mut self, deck: &Deck) -> Result<()> {
        deck.validate()?;
        if deck_exists(&self.conn, &deck.name)? {
            return Err(DeckError::validation(format!(
                "Deck '{}' already exists",
                deck.name
            )));
        }

        let version = Version::INITIAL.to_string();
        let mut snapshot = deck.clone();
        snapshot.current_branch = MAIN_BRANCH.to_string();
        snapshot.current_version = version.clone();
        let json = serde_json::to_string(&snapshot)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO decks (name, working_snapshot, current_branch, current_version)
             VALUES (?1, ?2, ?3, ?4)",
            params![&deck.name, &json, MAIN_BRANCH, &version],
        )?;
        let branch_id = insert_branch(&tx, &deck.name, MAIN_BRANCH)?;
        insert_version(&tx, branch_id, &version, &json)?;
        tx.commit()?;

        log::info!("Created deck '{}' at {}@{}", deck.name, version, MAIN_BRANCH);
        Ok(())
    }

    /// All deck names, alphabetical
    pub fn list_decks(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM decks ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Remove a deck together with all its branches and versions
    pub fn delete_deck(&mut self, deck: &str) -> Result<()> {
        require_deck(&self.conn, deck)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM versions WHERE branch_id IN
             (SELECT id FROM branches WHERE deck_name = ?1)",
            params![deck],
        )?;
        tx.execute("DELETE FROM branches WHERE deck_name = ?1", params![deck])?;
        tx.execute("DELETE FROM decks WHERE name = ?1", params![deck])?;
        tx.commit()?;
        log::info!("Deleted deck '{}'", deck);
        Ok(())
    }

    /// The live, unsaved state of a deck
    pub fn load_working(&self, deck: &str) -> Result<Deck> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT working_snapshot, current_branch, current_version
                 FROM decks WHERE name = ?1",
                params![deck],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| DeckError::load(format!("working state of '{}'", deck), e))?;

        let (json, branch, version) =
            row.ok_or_else(|| DeckError::not_found(format!("deck '{}'", deck)))?;
        let mut working: Deck = serde_json::from_str(&json)
            .map_err(|e| DeckError::load(format!("working state of '{}'", deck), e))?;
        working.current_branch = branch;
        working.current_version = version;
        Ok(working)
    }

    /// Replace the working state. Branch and version stay where they are.
    pub fn save_working(&mut self, deck: &Deck) -> Result<()> {
        let (branch, version) = current_position(&self.conn, &deck.name)?;
        let mut working = deck.clone();
        working.current_branch = branch;
        working.current_version = version;
        let json = serde_json::to_string(&working)?;

        self.conn.execute(
            "UPDATE decks SET working_snapshot = ?1, updated_at = datetime('now')
             WHERE name = ?2",
            params![&json, &deck.name],
        )?;
        log::debug!("Saved working state of '{}'", deck.name);
        Ok(())
    }

    /// Make a saved version the working state; `None` picks the latest
    pub fn checkout(&mut self, deck: &str, branch: &str, version: Option<&str>) -> Result<Deck> {
        let version = match version {
            Some(v) => v.to_string(),
            None => latest_version(&self.conn, deck, branch)?.to_string(),
        };
        let snapshot = self.load_version_snapshot(deck, &version, branch)?;
        let json = serde_json::to_string(&snapshot)?;

        self.conn.execute(
            "UPDATE decks SET working_snapshot = ?1, current_branch = ?2, current_version = ?3,
                              updated_at = datetime('now')
             WHERE name = ?4",
            params![&json, branch, &version, deck],
        )?;
        log::info!("Checked out '{}' at {}@{}", deck, version, branch);
        Ok(snapshot)
    }

    /// Versions of a branch with their save times, in creation order
    pub fn version_history(&self, deck: &str, branch: &str) -> Result<Vec<VersionInfo>> {
        let branch_id = require_branch(&self.conn, deck, branch)?;
        let mut stmt = self.conn.prepare_cached(
            "SELECT version, saved_at FROM versions WHERE branch_id = ?1 ORDER BY id",
        )?;
        let history = stmt
            .query_map(params![branch_id], |row| {
                Ok(VersionInfo {
                    version: row.get(0)?,
                    saved_at: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(history)
    }
}

impl VersionStore for SqliteStore {
    fn list_branches(&self, deck: &str) -> Result<Vec<String>> {
        require_deck(&self.conn, deck)?;
        let mut stmt = self.conn.prepare_cached(
            "SELECT name FROM branches WHERE deck_name = ?1
             ORDER BY CASE WHEN name = ?2 THEN 0 ELSE 1 END, id",
        )?;
        let names = stmt
            .query_map(params![deck, MAIN_BRANCH], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn list_versions(&self, deck: &str, branch: &str) -> Result<Vec<String>> {
        let branch_id = require_branch(&self.conn, deck, branch)?;
        let mut stmt = self
            .conn
            .prepare_cached("SELECT version FROM versions WHERE branch_id = ?1 ORDER BY id")?;
        let versions = stmt
            .query_map(params![branch_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(versions)
    }

    fn load_version_snapshot(&self, deck: &str, version: &str, branch: &str) -> Result<Deck> {
        let target = format!("{}@{} of '{}'", version, branch, deck);
        log::debug!("Loading snapshot {}", target);

        let branch_id = require_branch(&self.conn, deck, branch).map_err(|e| match e {
            DeckError::Database(e) => DeckError::load(target.as_str(), e),
            other => other,
        })?;
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT snapshot FROM versions WHERE branch_id = ?1 AND version = ?2",
                params![branch_id, version],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DeckError::load(target.as_str(), e))?;

        let json = json.ok_or_else(|| DeckError::not_found(format!("version {}", target)))?;
        let mut snapshot: Deck =
            serde_json::from_str(&json).map_err(|e| DeckError::load(target.as_str(), e))?;
        snapshot.current_branch = branch.to_string();
        snapshot.current_version = version.to_string();
        Ok(snapshot)
    }

    fn create_branch(&mut self, deck: &str, name: &str, source: BranchSource) -> Result<String> {
        require_deck(&self.conn, deck)?;
        let name = sanitize_branch_name(name)?;
        if branch_id(&self.conn, deck, &name)?.is_some() {
            return Err(DeckError::validation(format!(
                "Branch '{}' already exists",
                name
            )));
        }

        let mut snapshot = match &source {
            BranchSource::Current => self.load_working(deck)?,
            BranchSource::Version { branch, version } => {
                self.load_version_snapshot(deck, version, branch)?
            }
        };
        let version = Version::INITIAL.to_string();
        snapshot.current_branch = name.clone();
        snapshot.current_version = version.clone();
        let json = serde_json::to_string(&snapshot)?;

        let tx = self.conn.transaction()?;
        let id = insert_branch(&tx, deck, &name)?;
        insert_version(&tx, id, &version, &json)?;
        tx.commit()?;

        log::info!("Created branch '{}' of '{}' from {:?}", name, deck, source);
        Ok(name)
    }

    fn delete_branch(&mut self, deck: &str, name: &str) -> Result<()> {
        if name == MAIN_BRANCH {
            return Err(DeckError::validation("The main branch cannot be deleted"));
        }
        let id = require_branch(&self.conn, deck, name)?;
        let (current_branch, _) = current_position(&self.conn, deck)?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM versions WHERE branch_id = ?1", params![id])?;
        tx.execute("DELETE FROM branches WHERE id = ?1", params![id])?;
        if current_branch == name {
            let main_latest = latest_version(&tx, deck, MAIN_BRANCH)?.to_string();
            tx.execute(
                "UPDATE decks SET current_branch = ?1, current_version = ?2,
                                  updated_at = datetime('now')
                 WHERE name = ?3",
                params![MAIN_BRANCH, &main_latest, deck],
            )?;
            log::info!(
                "Current branch '{}' deleted, '{}' moved to {}@{}",
                name,
                deck,
                main_latest,
                MAIN_BRANCH
            );
        }
        tx.commit()?;

        log::info!("Deleted branch '{}' of '{}'", name, deck);
        Ok(())
    }

    fn save_version(&mut self, deck: &str, bump: Bump) -> Result<String> {
        let working = self.load_working(deck)?;
        working.validate()?;
        let branch = working.current_branch.clone();

        let tx = self.conn.transaction()?;
        let id = require_branch(&tx, deck, &branch)?;
        let version = latest_version(&tx, deck, &branch)?.bump(bump).to_string();

        let mut snapshot = working;
        snapshot.current_version = version.clone();
        let json = serde_json::to_string(&snapshot)?;

        insert_version(&tx, id, &version, &json)?;
        tx.execute(
            "UPDATE decks SET working_snapshot = ?1, current_version = ?2,
                              updated_at = datetime('now')
             WHERE name = ?3",
            params![&json, &version, deck],
        )?;
        tx.commit()?;

        log::info!("Saved '{}' as {}@{}", deck, version, branch);
        Ok(version)
    }
}

fn deck_exists(conn: &Connection, deck: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM decks WHERE name = ?1",
        params![deck],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn require_deck(conn: &Connection, deck: &str) -> Result<()> {
    if deck_exists(conn, deck)? {
        Ok(())
    } else {
        Err(DeckError::not_found(format!("deck '{}'", deck)))
    }
}

fn branch_id(conn: &Connection, deck: &str, branch: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM branches WHERE deck_name = ?1 AND name = ?2",
            params![deck, branch],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn require_branch(conn: &Connection, deck: &str, branch: &str) -> Result<i64> {
    require_deck(conn, deck)?;
    branch_id(conn, deck, branch)?
        .ok_or_else(|| DeckError::not_found(format!("branch '{}' of deck '{}'", branch, deck)))
}

fn current_position(conn: &Connection, deck: &str) -> Result<(String, String)> {
    conn.query_row(
        "SELECT current_branch, current_version FROM decks WHERE name = ?1",
        params![deck],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()?
    .ok_or_else(|| DeckError::not_found(format!("deck '{}'", deck)))
}

/// Highest version on a branch
fn latest_version(conn: &Connection, deck: &str, branch: &str) -> Result<Version> {
    let id = require_branch(conn, deck, branch)?;
    let mut stmt = conn.prepare_cached("SELECT version FROM versions WHERE branch_id = ?1")?;
    let raw = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    let mut latest: Option<Version> = None;
    for v in raw {
        let parsed: Version = v
            .parse()
            .map_err(|e| DeckError::load(format!("versions of {}@'{}'", branch, deck), e))?;
        latest = latest.max(Some(parsed));
    }
    latest.ok_or_else(|| DeckError::not_found(format!("versions on branch '{}'", branch)))
}

fn insert_branch(tx: &Transaction<'_>, deck: &str, name: &str) -> Result<i64> {
    tx.execute(
        "INSERT INTO branches (deck_name, name) VALUES (?1, ?2)",
        params![deck, name],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Current time as "YYYY-MM-DD HH:MM:SS" in UTC
pub fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn insert_version(tx: &Transaction<'_>, branch_id: i64, version: &str, json: &str) -> Result<()> {
    tx.execute(
        "INSERT INTO versions (branch_id, version, snapshot, saved_at) VALUES (?1, ?2, ?3, ?4)",
        params![branch_id, version, json, now_timestamp()],
    )?;
    Ok(())
}
