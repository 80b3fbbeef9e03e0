//! Buylist projection of a diff: what has to be acquired to go from one
//! snapshot to the other.

use crate::diff::VersionDiff;
use std::collections::BTreeMap;

/// A card to buy and how many copies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuylistEntry {
    pub quantity: u64,
    pub name: String,
}

/// Cards with a positive delta (all additions plus increased quantities).
///
/// Copies of the same card in different categories are summed. Sorted
/// alphabetically, ignoring case.
pub fn buylist_entries(diff: &VersionDiff) -> Vec<BuylistEntry> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for entry in diff.added.iter().chain(diff.modified.iter()) {
        if let Ok(delta) = u64::try_from(entry.quantity_delta) {
            if delta > 0 {
                let total = totals.entry(entry.name.as_str()).or_default();
                *total = total.saturating_add(delta);
            }
        }
    }

    let mut entries: Vec<BuylistEntry> = totals
        .into_iter()
        .map(|(name, quantity)| BuylistEntry {
            quantity,
            name: name.to_string(),
        })
        .collect();
    entries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    entries
}

/// Plaintext buylist: one `<quantity> <name>` per line, newline separated
pub fn generate_buylist(diff: &VersionDiff) -> String {
    buylist_entries(diff)
        .iter()
        .map(|e| format!("{} {}", e.quantity, e.name))
        .collect::<Vec<_>>()
        .join("\n")
}
