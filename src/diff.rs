//! Snapshot comparison
//!
//! Cards are keyed by (category, name) so the same card in two zones is
//! tracked separately. The engine is pure: no I/O, no logging of card data.

use crate::error::{DeckError, Result};
use crate::models::{CardEntry, Category, Deck};
use serde::Serialize;
use std::collections::BTreeMap;

/// One changed card between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub name: String,
    pub category: Category,
    /// Unit price in the source snapshot
    pub old_price: Option<f64>,
    /// Unit price in the target snapshot
    pub new_price: Option<f64>,
    pub old_quantity: u32,
    pub new_quantity: u32,
    pub quantity_delta: i64,
}

impl DiffEntry {
    fn new(
        name: &str,
        category: &Category,
        old: Option<&CardEntry>,
        new: Option<&CardEntry>,
    ) -> Self {
        let old_quantity = old.map(|c| c.quantity).unwrap_or(0);
        let new_quantity = new.map(|c| c.quantity).unwrap_or(0);
        Self {
            name: name.to_string(),
            category: category.clone(),
            old_price: old.and_then(|c| c.price),
            new_price: new.and_then(|c| c.price),
            old_quantity,
            new_quantity,
            quantity_delta: new_quantity as i64 - old_quantity as i64,
        }
    }

    /// Display price: the target snapshot's price, falling back to the source's
    pub fn price(&self) -> Option<f64> {
        self.new_price.or(self.old_price)
    }

    /// Monetary effect of this change; unpriced sides count as 0
    pub fn price_delta(&self) -> f64 {
        self.new_price.unwrap_or(0.0) * self.new_quantity as f64
            - self.old_price.unwrap_or(0.0) * self.old_quantity as f64
    }
}

/// Structured comparison between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VersionDiff {
    pub added: Vec<DiffEntry>,
    pub removed: Vec<DiffEntry>,
    pub modified: Vec<DiffEntry>,
}

impl VersionDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// All entries: added, then removed, then modified
    pub fn entries(&self) -> impl Iterator<Item = &DiffEntry> {
        self.added
            .iter()
            .chain(self.removed.iter())
            .chain(self.modified.iter())
    }
}

type FlatDeck<'a> = BTreeMap<(&'a Category, &'a str), &'a CardEntry>;

fn flatten(deck: &Deck) -> Result<FlatDeck<'_>> {
    let mut flat = BTreeMap::new();
    for (category, cards) in &deck.categories {
        for card in cards {
            if let Some(price) = card.price {
                if !price.is_finite() {
                    return Err(DeckError::validation(format!(
                        "Card '{}' in deck '{}' has a non-finite price",
                        card.name, deck.name
                    )));
                }
            }
            flat.insert((category, card.name.as_str()), card);
        }
    }
    Ok(flat)
}

/// Compare two snapshots, producing the changes that turn `from` into `to`
pub fn calculate_diff(from: &Deck, to: &Deck) -> Result<VersionDiff> {
    let old = flatten(from)?;
    let new = flatten(to)?;
    let mut diff = VersionDiff::default();

    for (&(category, name), &card) in &new {
        match old.get(&(category, name)) {
            None => diff
                .added
                .push(DiffEntry::new(name, category, None, Some(card))),
            Some(&previous) if previous.quantity != card.quantity => diff
                .modified
                .push(DiffEntry::new(name, category, Some(previous), Some(card))),
            Some(_) => {}
        }
    }

    for (&(category, name), &card) in &old {
        if !new.contains_key(&(category, name)) {
            diff.removed
                .push(DiffEntry::new(name, category, Some(card), None));
        }
    }

    for entries in [&mut diff.added, &mut diff.removed, &mut diff.modified] {
        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.category.cmp(&b.category)));
    }

    Ok(diff)
}

/// Net change in deck value across every entry of the diff
pub fn calculate_price_diff(diff: &VersionDiff) -> f64 {
    diff.entries().map(DiffEntry::price_delta).sum()
}
