use crate::diff::{calculate_price_diff, DiffEntry, VersionDiff};
use crate::models::Deck;

fn format_price(price: Option<f64>) -> String {
    price
        .map(|p| format!("${:.2}", p))
        .unwrap_or_else(|| "no price".to_string())
}

fn format_entry(prefix: char, entry: &DiffEntry) -> String {
    format!(
        "  {} {} [{}] {} -> {} ({:+}) @ {}\n",
        prefix,
        entry.name,
        entry.category,
        entry.old_quantity,
        entry.new_quantity,
        entry.quantity_delta,
        format_price(entry.price())
    )
}

/// Human-readable diff report with a price delta footer
pub fn format_diff(diff: &VersionDiff) -> String {
    if diff.is_empty() {
        return "No changes\n".to_string();
    }

    let mut output = String::new();
    let sections = [
        ("Added", '+', &diff.added),
        ("Removed", '-', &diff.removed),
        ("Modified", '~', &diff.modified),
    ];
    for (title, prefix, entries) in sections {
        if entries.is_empty() {
            continue;
        }
        output.push_str(&format!("{} ({}):\n", title, entries.len()));
        for entry in entries.iter() {
            output.push_str(&format_entry(prefix, entry));
        }
    }
    output.push_str(&format!(
        "Price change: {:+.2}\n",
        calculate_price_diff(diff)
    ));
    output
}

/// Category listing with totals
pub fn format_deck(deck: &Deck) -> String {
    let stats = deck.stats();
    let mut output = format!(
        "{} ({}@{})\n",
        deck.name, deck.current_branch, deck.current_version
    );
    for (category, cards) in &deck.categories {
        let count: u64 = cards.iter().map(|c| u64::from(c.quantity)).sum();
        output.push_str(&format!("{} ({})\n", category, count));
        for card in cards {
            match &card.mana_cost {
                Some(cost) => output.push_str(&format!(
                    "  {} {} {}\n",
                    card.quantity, card.name, cost
                )),
                None => output.push_str(&format!("  {} {}\n", card.quantity, card.name)),
            }
        }
    }
    let maybe: u64 = deck
        .maybeboard
        .values()
        .flatten()
        .map(|c| u64::from(c.quantity))
        .sum();
    if maybe > 0 {
        output.push_str(&format!("Maybeboard: {} cards\n", maybe));
    }
    output.push_str(&format!(
        "Total: {} cards, ${:.2}\n",
        stats.total_cards, stats.total_price
    ));
    output
}
