use crate::error::{DeckError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of the distinguished, non-deletable branch
pub const MAIN_BRANCH: &str = "main";

/// Card category within a deck
///
/// Ordering puts the commander first, then the fixed card types, then any
/// free-form categories alphabetically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Commander,
    Creature,
    Instant,
    Sorcery,
    Artifact,
    Enchantment,
    Planeswalker,
    Land,
    Battle,
    Other(String),
}

impl Category {
    /// Parse a category label, accepting plural forms ("Creatures") and any case
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_lowercase().as_str() {
            "commander" | "commanders" => Category::Commander,
            "creature" | "creatures" => Category::Creature,
            "instant" | "instants" => Category::Instant,
            "sorcery" | "sorceries" => Category::Sorcery,
            "artifact" | "artifacts" => Category::Artifact,
            "enchantment" | "enchantments" => Category::Enchantment,
            "planeswalker" | "planeswalkers" => Category::Planeswalker,
            "land" | "lands" => Category::Land,
            "battle" | "battles" => Category::Battle,
            _ => Category::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Commander => "Commander",
            Category::Creature => "Creature",
            Category::Instant => "Instant",
            Category::Sorcery => "Sorcery",
            Category::Artifact => "Artifact",
            Category::Enchantment => "Enchantment",
            Category::Planeswalker => "Planeswalker",
            Category::Land => "Land",
            Category::Battle => "Battle",
            Category::Other(name) => name,
        }
    }

    /// Fallback category for cards imported without one
    pub fn uncategorized() -> Self {
        Category::Other("Uncategorized".to_string())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::parse(&label)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

/// A single card line in a deck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardEntry {
    pub name: String,
    pub quantity: u32,
    /// Unit price, if known
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub mana_cost: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub set_code: Option<String>,
    #[serde(default)]
    pub collector_number: Option<String>,
    /// Printing finish such as "F" (foil) or "E" (etched)
    #[serde(default)]
    pub finish: Option<String>,
}

impl CardEntry {
    pub fn new(name: impl Into<String>, quantity: u32, category: Category) -> Self {
        Self {
            name: name.into(),
            quantity,
            price: None,
            mana_cost: None,
            category,
            set_code: None,
            collector_number: None,
            finish: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_mana_cost(mut self, mana_cost: impl Into<String>) -> Self {
        self.mana_cost = Some(mana_cost.into());
        self
    }

    /// Quantity times unit price; unpriced cards count as 0
    pub fn total_price(&self) -> f64 {
        self.price.unwrap_or(0.0) * self.quantity as f64
    }
}

/// Aggregate numbers shown alongside a deck
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeckStats {
    pub total_cards: u32,
    pub total_price: f64,
}

/// A deck snapshot: categorized cards plus the branch/version it belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub name: String,
    pub categories: BTreeMap<Category, Vec<CardEntry>>,
    /// Candidate cards kept outside the main list
    #[serde(default)]
    pub maybeboard: BTreeMap<Category, Vec<CardEntry>>,
    #[serde(default)]
    pub current_branch: String,
    #[serde(default)]
    pub current_version: String,
}

impl Deck {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current_branch: MAIN_BRANCH.to_string(),
            ..Self::default()
        }
    }

    /// Add a card to the main list, merging quantities with an existing entry
    /// of the same name in the same category
    pub fn add_card(&mut self, entry: CardEntry) {
        merge_entry(&mut self.categories, entry);
    }

    pub fn add_maybe(&mut self, entry: CardEntry) {
        merge_entry(&mut self.maybeboard, entry);
    }

    /// Iterate over every main-list entry in category order
    pub fn cards(&self) -> impl Iterator<Item = &CardEntry> {
        self.categories.values().flatten()
    }

    pub fn commanders(&self) -> &[CardEntry] {
        self.categories
            .get(&Category::Commander)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn stats(&self) -> DeckStats {
        self.cards().fold(DeckStats::default(), |mut stats, card| {
            stats.total_cards = stats.total_cards.saturating_add(card.quantity);
            stats.total_price += card.total_price();
            stats
        })
    }

    /// Checks required before a deck can be created or saved
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DeckError::validation("Deck name cannot be empty"));
        }
        if self.commanders().is_empty() {
            return Err(DeckError::validation("A commander must be selected"));
        }
        Ok(())
    }
}

fn merge_entry(board: &mut BTreeMap<Category, Vec<CardEntry>>, entry: CardEntry) {
    let cards = board.entry(entry.category.clone()).or_default();
    match cards.iter_mut().find(|c| c.name == entry.name) {
        Some(existing) => {
            existing.quantity = match existing.quantity.checked_add(entry.quantity) {
                Some(total) => total,
                None => {
                    log::warn!("Quantity of '{}' overflows, capping at {}", entry.name, u32::MAX);
                    u32::MAX
                }
            };
            if existing.price.is_none() {
                existing.price = entry.price;
            }
        }
        None => cards.push(entry),
    }
}

/// Which part of the version number a save increments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bump {
    Major,
    Minor,
    #[default]
    Patch,
}

impl FromStr for Bump {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "major" => Ok(Bump::Major),
            "minor" => Ok(Bump::Minor),
            "patch" => Ok(Bump::Patch),
            other => Err(DeckError::validation(format!(
                "Unknown version bump '{}', expected major, minor or patch",
                other
            ))),
        }
    }
}

/// Semantic version identifier of a saved snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Version given to the first snapshot of every branch
    pub const INITIAL: Version = Version {
        major: 1,
        minor: 0,
        patch: 0,
    };

    pub fn bump(self, bump: Bump) -> Self {
        match bump {
            Bump::Major => Version {
                major: self.major + 1,
                minor: 0,
                patch: 0,
            },
            Bump::Minor => Version {
                minor: self.minor + 1,
                patch: 0,
                ..self
            },
            Bump::Patch => Version {
                patch: self.patch + 1,
                ..self
            },
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = DeckError;

    /// Accepts "1.2.3", "v1.2.3", "1.2" and "1"; missing parts are 0
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DeckError::validation(format!("Invalid version '{}'", s));
        let trimmed = s.trim().trim_start_matches(['v', 'V']);
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }
        Ok(Version {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_accepts_plurals_and_case() {
        assert_eq!(Category::parse("Creatures"), Category::Creature);
        assert_eq!(Category::parse("sorceries"), Category::Sorcery);
        assert_eq!(Category::parse(" LAND "), Category::Land);
        assert_eq!(
            Category::parse("Ramp"),
            Category::Other("Ramp".to_string())
        );
    }

    #[test]
    fn category_order_puts_commander_first_and_custom_last() {
        let mut cats = vec![
            Category::Other("Ramp".to_string()),
            Category::Land,
            Category::Commander,
            Category::Creature,
            Category::Other("Draw".to_string()),
        ];
        cats.sort();
        assert_eq!(
            cats,
            vec![
                Category::Commander,
                Category::Creature,
                Category::Land,
                Category::Other("Draw".to_string()),
                Category::Other("Ramp".to_string()),
            ]
        );
    }

    #[test]
    fn category_serializes_as_plain_string() {
        let json = serde_json::to_string(&Category::Planeswalker).unwrap();
        assert_eq!(json, "\"Planeswalker\"");
        let back: Category = serde_json::from_str("\"Card Draw\"").unwrap();
        assert_eq!(back, Category::Other("Card Draw".to_string()));
    }

    #[test]
    fn add_card_merges_same_name_in_same_category() {
        let mut deck = Deck::new("Test");
        deck.add_card(CardEntry::new("Sol Ring", 1, Category::Artifact).with_price(2.0));
        deck.add_card(CardEntry::new("Sol Ring", 1, Category::Artifact));
        deck.add_card(CardEntry::new("Sol Ring", 1, Category::Other("Ramp".into())));

        assert_eq!(deck.categories[&Category::Artifact].len(), 1);
        assert_eq!(deck.categories[&Category::Artifact][0].quantity, 2);
        assert_eq!(deck.categories[&Category::Artifact][0].price, Some(2.0));
        assert_eq!(deck.cards().count(), 2);
    }

    #[test]
    fn add_card_saturates_instead_of_overflowing() {
        let mut deck = Deck::new("Rats");
        deck.add_card(CardEntry::new("Relentless Rats", 4_000_000_000, Category::Creature));
        deck.add_card(CardEntry::new("Relentless Rats", 4_000_000_000, Category::Creature));
        deck.add_card(CardEntry::new("Swamp", 10, Category::Land));

        assert_eq!(deck.categories[&Category::Creature][0].quantity, u32::MAX);
        assert_eq!(deck.stats().total_cards, u32::MAX);
    }

    #[test]
    fn stats_ignore_maybeboard_and_missing_prices() {
        let mut deck = Deck::new("Test");
        deck.add_card(CardEntry::new("Sol Ring", 2, Category::Artifact).with_price(2.5));
        deck.add_card(CardEntry::new("Island", 30, Category::Land));
        deck.add_maybe(CardEntry::new("Mana Crypt", 1, Category::Artifact).with_price(150.0));

        let stats = deck.stats();
        assert_eq!(stats.total_cards, 32);
        assert!((stats.total_price - 5.0).abs() < 0.001);
    }

    #[test]
    fn validate_requires_name_and_commander() {
        let mut deck = Deck::new("  ");
        assert!(deck.validate().unwrap_err().is_validation());

        deck.name = "Atraxa Superfriends".to_string();
        let err = deck.validate().unwrap_err();
        assert!(err.to_string().contains("commander"));

        deck.add_card(CardEntry::new(
            "Atraxa, Praetors' Voice",
            1,
            Category::Commander,
        ));
        assert!(deck.validate().is_ok());
    }

    #[test]
    fn version_bumps() {
        let v = Version::INITIAL;
        assert_eq!(v.bump(Bump::Patch).to_string(), "1.0.1");
        assert_eq!(v.bump(Bump::Minor).bump(Bump::Patch).to_string(), "1.1.1");
        assert_eq!(
            "1.4.7".parse::<Version>().unwrap().bump(Bump::Major).to_string(),
            "2.0.0"
        );
    }

    #[test]
    fn version_parse_accepts_short_and_prefixed_forms() {
        assert_eq!("v2.1.0".parse::<Version>().unwrap().to_string(), "2.1.0");
        assert_eq!("3".parse::<Version>().unwrap().to_string(), "3.0.0");
        assert!("1.x".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn version_ordering_is_numeric() {
        let a: Version = "1.9.0".parse().unwrap();
        let b: Version = "1.10.0".parse().unwrap();
        assert!(a < b);
    }
}
