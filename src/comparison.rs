//! Version comparison state
//!
//! Turns a (from, to) selection into a diff. Every new selection bumps a
//! generation counter; a load that completes after a newer selection was
//! made is discarded, so the visible comparison always matches the most
//! recent selection.

use crate::diff::{calculate_diff, VersionDiff};
use crate::error::{DeckError, Result};
use crate::models::Deck;
use crate::store::VersionStore;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A saved version addressed as `branch@version`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotRef {
    pub branch: String,
    pub version: String,
}

impl SnapshotRef {
    pub fn new(branch: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.branch, self.version)
    }
}

impl FromStr for SnapshotRef {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('@') {
            Some((branch, version)) if !branch.is_empty() && !version.is_empty() => {
                Ok(SnapshotRef::new(branch.trim(), version.trim()))
            }
            _ => Err(DeckError::validation(format!(
                "Expected '<branch>@<version>', got '{}'",
                s
            ))),
        }
    }
}

/// The pair of versions being compared
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub from: SnapshotRef,
    pub to: SnapshotRef,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Handed out by [`Comparison::begin`], redeemed by [`Comparison::finish`]
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    selection: Selection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(VersionDiff),
    /// A newer selection was made while this one was loading
    Stale,
}

pub type Listener = Box<dyn Fn(&Selection, &VersionDiff) + Send + Sync>;

/// Comparison view state for one deck
pub struct Comparison<S> {
    store: Arc<Mutex<S>>,
    deck: String,
    generation: AtomicU64,
    current: Mutex<Option<(Selection, VersionDiff)>>,
    listeners: Mutex<Vec<Listener>>,
}

impl<S> Comparison<S> {
    pub fn new(store: Arc<Mutex<S>>, deck: impl Into<String>) -> Self {
        Self {
            store,
            deck: deck.into(),
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register a callback run every time a new diff is applied
    pub fn subscribe(&self, listener: Listener) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(listener);
        }
    }

    /// Start a new selection, superseding any in flight
    pub fn begin(&self, selection: Selection) -> Ticket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Comparison #{} started: {}", generation, selection);
        Ticket {
            generation,
            selection,
        }
    }

    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Complete a selection with its loaded snapshots
    pub fn finish(&self, ticket: Ticket, from: &Deck, to: &Deck) -> Result<Outcome> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| DeckError::load(ticket.selection.to_string(), "comparison state poisoned"))?;

        if !self.is_latest(&ticket) {
            log::debug!(
                "Discarding stale comparison #{}: {}",
                ticket.generation,
                ticket.selection
            );
            return Ok(Outcome::Stale);
        }

        let diff = calculate_diff(from, to)?;
        *current = Some((ticket.selection.clone(), diff.clone()));
        drop(current);

        if let Ok(listeners) = self.listeners.lock() {
            for listener in listeners.iter() {
                listener(&ticket.selection, &diff);
            }
        }
        Ok(Outcome::Applied(diff))
    }

    /// The diff currently on display, if any
    pub fn current(&self) -> Option<(Selection, VersionDiff)> {
        self.current.lock().ok().and_then(|c| c.clone())
    }

    /// Close the view: drop the diff and ignore loads still in flight
    pub fn close(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }
}

impl<S> Comparison<S>
where
    S: VersionStore + Send + 'static,
{
    /// Load both snapshots off the async runtime and apply the diff
    pub async fn select(&self, selection: Selection) -> Result<Outcome> {
        let ticket = self.begin(selection.clone());
        let store = Arc::clone(&self.store);
        let deck = self.deck.clone();

        let loaded = tokio::task::spawn_blocking(move || {
            let store = store
                .lock()
                .map_err(|_| DeckError::load(selection.to_string(), "store lock poisoned"))?;
            let from =
                store.load_version_snapshot(&deck, &selection.from.version, &selection.from.branch)?;
            let to =
                store.load_version_snapshot(&deck, &selection.to.version, &selection.to.branch)?;
            Ok::<_, DeckError>((from, to))
        })
        .await
        .map_err(|e| DeckError::load(ticket.selection.to_string(), e))?;

        match loaded {
            Ok((from, to)) => self.finish(ticket, &from, &to),
            Err(e) if !self.is_latest(&ticket) => {
                log::debug!("Ignoring failure of stale comparison {}: {}", ticket.selection, e);
                Ok(Outcome::Stale)
            }
            Err(e) => {
                log::warn!("Comparison {} failed: {}", ticket.selection, e);
                Err(e)
            }
        }
    }
}
