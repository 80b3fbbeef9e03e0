//! Plaintext decklist import and export
//!
//! Line format: `<qty>[x] <card name> [(SET) collector_number] [*FINISH*] [[Category{tags},...]]`.
//! Section headers ("Commander", "Deck", "Sideboard", ...) switch where the
//! following lines go. Bad lines are collected as warnings, never fatal.

use crate::models::{CardEntry, Category, Deck};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

/// Largest quantity accepted on a single decklist line
pub const MAX_QUANTITY: u32 = 9_999;

lazy_static! {
    static ref CARD_LINE: Regex = Regex::new(
        r"^(?P<qty>\S+)\s+(?P<name>.+?)(?:\s+\((?P<set>[^)\s]+)\)(?:\s+(?P<cn>[^\s*\[]+))?)?(?:\s+\*(?P<finish>[^*]+)\*)?(?:\s+\[(?P<cats>[^\]]*)\])?\s*$"
    )
    .expect("valid regex");
    static ref SECTION_HEADER: Regex = Regex::new(
        r"(?i)^(?P<section>commanders?|deck|main|mainboard|sideboard|maybeboard|considering)\s*(?:\(\d+\))?\s*:?\s*$"
    )
    .expect("valid regex");
    static ref TAG: Regex = Regex::new(r"\{([^}]*)\}").expect("valid regex");
}

/// A recoverable problem with one input line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// 1-based line number
    pub line: usize,
    pub text: String,
    pub reason: String,
}

/// Which list a parsed card belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    Commander,
    Main,
    Maybe,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCard {
    pub line: usize,
    pub quantity: u32,
    pub name: String,
    pub set_code: Option<String>,
    pub collector_number: Option<String>,
    pub finish: Option<String>,
    /// Bracket categories in input order, tags stripped
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub board: Board,
}

impl ParsedCard {
    /// First bracket category that is not a board marker
    pub fn category(&self) -> Option<&str> {
        self.categories
            .iter()
            .map(String::as_str)
            .find(|c| !is_board_marker(c))
    }

    fn to_entry(&self, category: Category) -> CardEntry {
        let mut entry = CardEntry::new(self.name.clone(), self.quantity, category);
        entry.set_code = self.set_code.clone();
        entry.collector_number = self.collector_number.clone();
        entry.finish = self.finish.clone();
        entry
    }
}

/// How the commander was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommanderSource {
    /// `[Commander]` bracket tag or a "Commander" section
    Tagged,
    /// No tag found; the first card line was taken as the commander
    FirstLine,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Fall back to treating the first card line as the commander
    pub first_line_commander: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            first_line_commander: true,
        }
    }
}

/// Outcome of parsing a pasted decklist
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub cards: Vec<ParsedCard>,
    pub warnings: Vec<ParseWarning>,
    pub commander_source: CommanderSource,
    /// Tagged commanders and the first-line heuristic point at different cards
    pub commander_conflict: bool,
}

impl ImportResult {
    pub fn commanders(&self) -> impl Iterator<Item = &ParsedCard> {
        self.cards.iter().filter(|c| c.board == Board::Commander)
    }

    /// Build a deck from the parsed cards
    pub fn into_deck(self, name: impl Into<String>) -> Deck {
        let mut deck = Deck::new(name);
        for card in &self.cards {
            match card.board {
                Board::Commander => deck.add_card(card.to_entry(Category::Commander)),
                Board::Main => deck.add_card(card.to_entry(card_category(card))),
                Board::Maybe => deck.add_maybe(card.to_entry(card_category(card))),
            }
        }
        deck
    }
}

fn card_category(card: &ParsedCard) -> Category {
    card.category()
        .map(Category::parse)
        .filter(|c| *c != Category::Commander)
        .unwrap_or_else(Category::uncategorized)
}

fn is_board_marker(category: &str) -> bool {
    matches!(
        category.to_lowercase().as_str(),
        "commander" | "maybeboard" | "sideboard" | "considering"
    )
}

fn section_board(section: &str) -> Board {
    match section.to_lowercase().as_str() {
        "commander" | "commanders" => Board::Commander,
        "sideboard" | "maybeboard" | "considering" => Board::Maybe,
        _ => Board::Main,
    }
}

fn parse_quantity(token: &str) -> Option<u32> {
    let digits = token.strip_suffix(['x', 'X']).unwrap_or(token);
    digits.parse().ok()
}

/// Split `Commander{top},Ramp{noPrice}` into categories and tags
fn parse_categories(raw: &str) -> (Vec<String>, Vec<String>) {
    let mut categories = Vec::new();
    let mut tags = Vec::new();
    for part in raw.split(',') {
        for cap in TAG.captures_iter(part) {
            tags.push(cap[1].trim().to_string());
        }
        let name = TAG.replace_all(part, "");
        let name = name.trim();
        if !name.is_empty() {
            categories.push(name.to_string());
        }
    }
    (categories, tags)
}

fn parse_card_line(
    line_no: usize,
    line: &str,
    section: Board,
) -> std::result::Result<ParsedCard, ParseWarning> {
    let warning = |reason: String| ParseWarning {
        line: line_no,
        text: line.to_string(),
        reason,
    };

    let caps = CARD_LINE
        .captures(line)
        .ok_or_else(|| warning("Expected '<quantity> <card name>'".to_string()))?;

    let qty_token = &caps["qty"];
    let quantity = parse_quantity(qty_token)
        .ok_or_else(|| warning(format!("Invalid quantity '{}'", qty_token)))?;
    if quantity == 0 {
        return Err(warning("Quantity must be at least 1".to_string()));
    }
    if quantity > MAX_QUANTITY {
        return Err(warning(format!(
            "Quantity {} exceeds the maximum of {}",
            quantity, MAX_QUANTITY
        )));
    }

    let (categories, tags) = caps
        .name("cats")
        .map(|m| parse_categories(m.as_str()))
        .unwrap_or_default();

    let has_category = |wanted: &str| categories.iter().any(|c| c.eq_ignore_ascii_case(wanted));
    let board = if has_category("commander") {
        Board::Commander
    } else if has_category("maybeboard")
        || has_category("sideboard")
        || has_category("considering")
        || tags.iter().any(|t| t.eq_ignore_ascii_case("nodeck"))
    {
        Board::Maybe
    } else {
        section
    };

    Ok(ParsedCard {
        line: line_no,
        quantity,
        name: caps["name"].trim().to_string(),
        set_code: caps.name("set").map(|m| m.as_str().to_uppercase()),
        collector_number: caps.name("cn").map(|m| m.as_str().to_string()),
        finish: caps.name("finish").map(|m| m.as_str().to_string()),
        categories,
        tags,
        board,
    })
}

/// Parse a pasted decklist. Invalid lines are skipped and reported.
pub fn parse_decklist(text: &str, options: ParseOptions) -> ImportResult {
    let mut cards = Vec::new();
    let mut warnings = Vec::new();
    let mut section = Board::Main;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
            continue;
        }
        if let Some(caps) = SECTION_HEADER.captures(line) {
            section = section_board(&caps["section"]);
            log::debug!("Line {}: switching to {:?} section", idx + 1, section);
            continue;
        }
        match parse_card_line(idx + 1, line, section) {
            Ok(card) => cards.push(card),
            Err(warning) => {
                log::warn!(
                    "Skipping line {} '{}': {}",
                    warning.line,
                    warning.text,
                    warning.reason
                );
                warnings.push(warning);
            }
        }
    }

    let tagged = cards.iter().any(|c| c.board == Board::Commander);
    let first_main = cards.iter().position(|c| c.board != Board::Maybe);
    let mut commander_conflict = false;

    let commander_source = if tagged {
        if options.first_line_commander {
            if let Some(first) = first_main {
                if cards[first].board != Board::Commander {
                    log::warn!(
                        "Commander tags disagree with first line '{}'; using tagged commander",
                        cards[first].name
                    );
                    commander_conflict = true;
                }
            }
        }
        CommanderSource::Tagged
    } else if let (true, Some(first)) = (options.first_line_commander, first_main) {
        log::info!(
            "No commander tagged, assuming first card '{}' is the commander",
            cards[first].name
        );
        cards[first].board = Board::Commander;
        CommanderSource::FirstLine
    } else {
        CommanderSource::None
    };

    log::info!(
        "Parsed decklist: {} cards, {} warnings",
        cards.len(),
        warnings.len()
    );

    ImportResult {
        cards,
        warnings,
        commander_source,
        commander_conflict,
    }
}

/// A collector number is only written after a set code; without one it would
/// read back as part of the card name, so it is dropped.
fn format_entry(entry: &CardEntry, categories: &[&str]) -> String {
    let mut line = format!("{} {}", entry.quantity, entry.name);
    if let Some(set) = &entry.set_code {
        line.push_str(&format!(" ({})", set));
        if let Some(cn) = &entry.collector_number {
            line.push_str(&format!(" {}", cn));
        }
    }
    if let Some(finish) = &entry.finish {
        line.push_str(&format!(" *{}*", finish));
    }
    line.push_str(&format!(" [{}]", categories.join(",")));
    line
}

/// Write a deck in the import format, commanders first, maybeboard last
pub fn export_decklist(deck: &Deck) -> String {
    let mut lines = Vec::new();
    for (category, cards) in &deck.categories {
        for card in cards {
            lines.push(format_entry(card, &[category.as_str()]));
        }
    }
    for (category, cards) in &deck.maybeboard {
        for card in cards {
            lines.push(format_entry(card, &["Maybeboard", category.as_str()]));
        }
    }
    lines.join("\n")
}
