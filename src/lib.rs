//! Deck Versions - MTG Commander deck history
//!
//! Keeps named branches of immutable deck snapshots in SQLite, diffs any two
//! snapshots, turns diffs into buylists and reads/writes plaintext decklists.

pub mod buylist;
pub mod comparison;
pub mod config;
pub mod database;
pub mod decklist;
pub mod diff;
pub mod error;
pub mod formatters;
pub mod models;
pub mod store;

pub use buylist::{buylist_entries, generate_buylist, BuylistEntry};
pub use comparison::{Comparison, Outcome, Selection, SnapshotRef};
pub use database::{SqliteStore, VersionInfo};
pub use decklist::{export_decklist, parse_decklist, ImportResult, ParseOptions, ParseWarning};
pub use diff::{calculate_diff, calculate_price_diff, DiffEntry, VersionDiff};
pub use error::{DeckError, Result};
pub use formatters::{format_deck, format_diff};
pub use models::{Bump, CardEntry, Category, Deck, DeckStats, Version, MAIN_BRANCH};
pub use store::{sanitize_branch_name, BranchSource, VersionStore};
