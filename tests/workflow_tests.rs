use deck_versions::config::open_store;
use deck_versions::{
    calculate_diff, calculate_price_diff, export_decklist, generate_buylist, parse_decklist,
    BranchSource, Bump, CardEntry, Category, Comparison, DeckError, Outcome, ParseOptions,
    Selection, SnapshotRef, VersionStore,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::{tempdir, NamedTempFile};

// Test fixtures - sample decklists

fn create_sample_decklist() -> String {
    r#"Commander
1 Kenrith, the Returned King (ELD) 303

Deck
1x Sol Ring (C21) 263 [Ramp]
1 Arcane Signet [Ramp]
abc Llanowar Elves
10 Forest [Land]

Maybeboard
1 Craterhoof Behemoth"#
        .to_string()
}

#[test]
fn test_import_save_branch_and_diff() {
    let dir = tempdir().unwrap();
    let mut store = open_store(&dir.path().join("decks.db")).unwrap();

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", create_sample_decklist()).unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();

    let result = parse_decklist(&text, ParseOptions::default());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].line, 7);
    let deck = result.into_deck("Kenrith");
    assert_eq!(deck.stats().total_cards, 13);
    store.create_deck(&deck).unwrap();

    // Fork a budget branch and cut the forests down
    let branch = store
        .create_branch("Kenrith", "Budget Build", BranchSource::Current)
        .unwrap();
    store.checkout("Kenrith", &branch, None).unwrap();
    let mut working = store.load_working("Kenrith").unwrap();
    working
        .categories
        .get_mut(&Category::Land)
        .unwrap()
        .iter_mut()
        .for_each(|c| c.quantity = 8);
    working.add_card(CardEntry::new("Counterspell", 1, Category::Instant).with_price(1.0));
    store.save_working(&working).unwrap();
    assert_eq!(store.save_version("Kenrith", Bump::Minor).unwrap(), "1.1.0");

    let from = store.load_version_snapshot("Kenrith", "1.0.0", "main").unwrap();
    let to = store
        .load_version_snapshot("Kenrith", "1.1.0", "budget-build")
        .unwrap();
    let diff = calculate_diff(&from, &to).unwrap();

    assert_eq!(diff.added.len(), 1);
    assert_eq!(diff.modified.len(), 1);
    assert_eq!(diff.modified[0].quantity_delta, -2);
    assert!((calculate_price_diff(&diff) - 1.0).abs() < 1e-9);
    assert_eq!(generate_buylist(&diff), "1 Counterspell");

    assert_eq!(
        store.list_branches("Kenrith").unwrap(),
        vec!["main", "budget-build"]
    );
}

#[test]
fn test_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("decks.db");

    {
        let mut store = open_store(&path).unwrap();
        let deck = parse_decklist("1 Kenrith, the Returned King\n1 Sol Ring", ParseOptions::default())
            .into_deck("Kenrith");
        store.create_deck(&deck).unwrap();
        store.save_version("Kenrith", Bump::Patch).unwrap();
    }

    let store = open_store(&path).unwrap();
    assert_eq!(
        store.list_versions("Kenrith", "main").unwrap(),
        vec!["1.0.0", "1.0.1"]
    );
    let working = store.load_working("Kenrith").unwrap();
    assert_eq!(working.current_version, "1.0.1");
    assert_eq!(working.commanders()[0].name, "Kenrith, the Returned King");
}

#[test]
fn test_export_round_trips_through_store() {
    let dir = tempdir().unwrap();
    let mut store = open_store(&dir.path().join("decks.db")).unwrap();
    let deck = parse_decklist(&create_sample_decklist(), ParseOptions::default()).into_deck("Kenrith");
    store.create_deck(&deck).unwrap();

    let saved = store.load_version_snapshot("Kenrith", "1.0.0", "main").unwrap();
    let reparsed = parse_decklist(&export_decklist(&saved), ParseOptions::default());
    assert!(reparsed.warnings.is_empty());
    let reimported = reparsed.into_deck("Kenrith");

    assert!(calculate_diff(&saved, &reimported).unwrap().is_empty());
    assert_eq!(reimported.maybeboard, saved.maybeboard);
}

#[test]
fn test_delete_main_rejected_on_disk_store() {
    let dir = tempdir().unwrap();
    let mut store = open_store(&dir.path().join("decks.db")).unwrap();
    let deck = parse_decklist("1 Kenrith, the Returned King", ParseOptions::default())
        .into_deck("Kenrith");
    store.create_deck(&deck).unwrap();

    let err = store.delete_branch("Kenrith", "main").unwrap_err();
    assert!(matches!(err, DeckError::Validation(_)));
    assert_eq!(store.list_branches("Kenrith").unwrap(), vec!["main"]);
}

#[tokio::test]
async fn test_comparison_over_shared_store() {
    let dir = tempdir().unwrap();
    let mut store = open_store(&dir.path().join("decks.db")).unwrap();
    let mut deck = parse_decklist("1 Kenrith, the Returned King\n1 Sol Ring", ParseOptions::default())
        .into_deck("Kenrith");
    store.create_deck(&deck).unwrap();
    deck.add_card(CardEntry::new("Rhystic Study", 1, Category::Enchantment).with_price(40.0));
    store.save_working(&deck).unwrap();
    store.save_version("Kenrith", Bump::Patch).unwrap();

    let comparison = Comparison::new(Arc::new(Mutex::new(store)), "Kenrith");
    let forward = Selection {
        from: SnapshotRef::new("main", "1.0.0"),
        to: SnapshotRef::new("main", "1.0.1"),
    };
    let backward = Selection {
        from: forward.to.clone(),
        to: forward.from.clone(),
    };

    let Outcome::Applied(ahead) = comparison.select(forward).await.unwrap() else {
        panic!("expected applied diff");
    };
    let Outcome::Applied(behind) = comparison.select(backward.clone()).await.unwrap() else {
        panic!("expected applied diff");
    };

    assert_eq!(ahead.added[0].name, "Rhystic Study");
    assert_eq!(behind.removed[0].name, "Rhystic Study");
    assert!((calculate_price_diff(&ahead) + calculate_price_diff(&behind)).abs() < 1e-9);
    assert_eq!(comparison.current().unwrap().0, backward);
}
