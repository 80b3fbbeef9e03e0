//! Persistence seam for deck branches and versions

use crate::error::{DeckError, Result};
use crate::models::{Bump, Deck};

/// Where a new branch takes its first snapshot from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchSource {
    /// The deck's live, unsaved working state
    Current,
    /// An existing saved version
    Version { branch: String, version: String },
}

/// Branch/version manifest of decks identified by name
pub trait VersionStore {
    /// Branch names, `main` first, the rest in creation order
    fn list_branches(&self, deck: &str) -> Result<Vec<String>>;

    /// Version identifiers of a branch in creation order
    fn list_versions(&self, deck: &str, branch: &str) -> Result<Vec<String>>;

    /// Full snapshot stored for (version, branch)
    fn load_version_snapshot(&self, deck: &str, version: &str, branch: &str) -> Result<Deck>;

    /// Fork a new branch; returns the sanitized branch name
    fn create_branch(&mut self, deck: &str, name: &str, source: BranchSource) -> Result<String>;

    fn delete_branch(&mut self, deck: &str, name: &str) -> Result<()>;

    /// Snapshot the working state as a new version on the current branch
    fn save_version(&mut self, deck: &str, bump: Bump) -> Result<String>;
}

/// Normalize a user-supplied branch name.
///
/// Lowercases, turns whitespace runs into a single hyphen, and drops every
/// character outside `[a-z0-9/-]`. Leading and trailing hyphens are trimmed.
pub fn sanitize_branch_name(raw: &str) -> Result<String> {
    let lowered = raw.trim().to_lowercase();
    let hyphenated = lowered.split_whitespace().collect::<Vec<_>>().join("-");
    let cleaned: String = hyphenated
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '/' || *c == '-')
        .collect();
    let cleaned = cleaned.trim_matches('-').to_string();

    if cleaned.is_empty() {
        return Err(DeckError::validation(format!(
            "Branch name '{}' has no usable characters",
            raw
        )));
    }
    Ok(cleaned)
}
