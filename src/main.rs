//! Deck Versions - MTG Commander deck history
//!
//! Imports decklists, saves versions, forks branches and compares snapshots.

use clap::{Parser, Subcommand};
use deck_versions::{
    config, export_decklist, format_deck, format_diff, generate_buylist, parse_decklist,
    BranchSource, Bump, Comparison, DeckError, Outcome, ParseOptions, Selection, SnapshotRef,
    SqliteStore, VersionDiff, VersionStore,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Commander deck versioning - branches, diffs and buylists
#[derive(Parser, Debug)]
#[command(name = "deck_versions")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_os_t = config::default_db_path())]
    database: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all decks
    Decks,
    /// Show the working state of a deck
    Show { deck: String },
    /// Import a plaintext decklist as a new deck or as the working state of an existing one
    Import {
        deck: String,
        file: PathBuf,
        /// Do not treat the first card as commander when none is tagged
        #[arg(long, default_value_t = false)]
        no_first_line_commander: bool,
    },
    /// Save the working state as a new version on the current branch
    Save {
        deck: String,
        /// Version part to increment: major, minor or patch
        #[arg(long, default_value = "patch")]
        bump: Bump,
    },
    /// List branches of a deck
    Branches { deck: String },
    /// List versions of a branch
    Versions { deck: String, branch: String },
    /// Create a branch from the working state or from <branch>@<version>
    Branch {
        deck: String,
        name: String,
        #[arg(long)]
        from: Option<SnapshotRef>,
    },
    /// Delete a branch (main cannot be deleted)
    DeleteBranch { deck: String, name: String },
    /// Load a saved version into the working state
    Checkout {
        deck: String,
        branch: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Compare two versions given as <branch>@<version>
    Diff {
        deck: String,
        from: SnapshotRef,
        to: SnapshotRef,
    },
    /// Print the cards needed to go from one version to another
    Buylist {
        deck: String,
        from: SnapshotRef,
        to: SnapshotRef,
    },
    /// Print a decklist, the working state unless --at is given
    Export {
        deck: String,
        #[arg(long)]
        at: Option<SnapshotRef>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::debug!("Database path: {}", args.database.display());

    let store = match config::open_store(&args.database) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    // Wrap store in Arc<Mutex> so comparisons can load on blocking tasks
    let store = Arc::new(Mutex::new(store));

    if let Err(e) = run(&store, args.command).await {
        log::error!("{}", e);
        if let DeckError::Load { .. } = e {
            eprintln!("Details: {}", e.detail());
        }
        std::process::exit(1);
    }
}

fn with_store<T>(
    store: &Arc<Mutex<SqliteStore>>,
    f: impl FnOnce(&mut SqliteStore) -> deck_versions::Result<T>,
) -> deck_versions::Result<T> {
    let mut guard = store
        .lock()
        .map_err(|_| DeckError::load("store", "store lock poisoned"))?;
    f(&mut *guard)
}

async fn compare(
    store: &Arc<Mutex<SqliteStore>>,
    deck: String,
    from: SnapshotRef,
    to: SnapshotRef,
) -> deck_versions::Result<VersionDiff> {
    let comparison = Comparison::new(Arc::clone(store), deck);
    match comparison.select(Selection { from, to }).await? {
        Outcome::Applied(diff) => Ok(diff),
        Outcome::Stale => Err(DeckError::load("comparison", "selection superseded")),
    }
}

async fn run(store: &Arc<Mutex<SqliteStore>>, command: Command) -> deck_versions::Result<()> {
    match command {
        Command::Decks => {
            for name in with_store(store, |s| s.list_decks())? {
                println!("{}", name);
            }
        }
        Command::Show { deck } => {
            let working = with_store(store, |s| s.load_working(&deck))?;
            print!("{}", format_deck(&working));
        }
        Command::Import {
            deck,
            file,
            no_first_line_commander,
        } => {
            let text = std::fs::read_to_string(&file)?;
            let options = ParseOptions {
                first_line_commander: !no_first_line_commander,
            };
            let result = parse_decklist(&text, options);
            for warning in &result.warnings {
                eprintln!(
                    "Skipped line {}: {} ({})",
                    warning.line, warning.text, warning.reason
                );
            }
            if result.commander_conflict {
                eprintln!("Commander tags disagree with the first line; using the tagged commander");
            }
            let skipped = result.warnings.len();
            let imported = result.into_deck(deck.clone());

            with_store(store, |s| {
                if s.list_decks()?.contains(&deck) {
                    s.save_working(&imported)?;
                    log::info!("Replaced working state of '{}'", deck);
                } else {
                    s.create_deck(&imported)?;
                }
                Ok(())
            })?;
            println!(
                "Imported {} cards into '{}' ({} lines skipped)",
                imported.stats().total_cards,
                deck,
                skipped
            );
        }
        Command::Save { deck, bump } => {
            let version = with_store(store, |s| s.save_version(&deck, bump))?;
            println!("Saved {} as {}", deck, version);
        }
        Command::Branches { deck } => {
            for name in with_store(store, |s| s.list_branches(&deck))? {
                println!("{}", name);
            }
        }
        Command::Versions { deck, branch } => {
            for info in with_store(store, |s| s.version_history(&deck, &branch))? {
                println!("{}  (saved {} UTC)", info.version, info.saved_at);
            }
        }
        Command::Branch { deck, name, from } => {
            let source = match from {
                Some(r) => BranchSource::Version {
                    branch: r.branch,
                    version: r.version,
                },
                None => BranchSource::Current,
            };
            let created = with_store(store, |s| s.create_branch(&deck, &name, source))?;
            println!("Created branch {}", created);
        }
        Command::DeleteBranch { deck, name } => {
            with_store(store, |s| s.delete_branch(&deck, &name))?;
            println!("Deleted branch {}", name);
        }
        Command::Checkout {
            deck,
            branch,
            version,
        } => {
            let snapshot =
                with_store(store, |s| s.checkout(&deck, &branch, version.as_deref()))?;
            println!(
                "Checked out {}@{}",
                snapshot.current_branch, snapshot.current_version
            );
        }
        Command::Diff { deck, from, to } => {
            let diff = compare(store, deck, from, to).await?;
            print!("{}", format_diff(&diff));
        }
        Command::Buylist { deck, from, to } => {
            let diff = compare(store, deck, from, to).await?;
            println!("{}", generate_buylist(&diff));
        }
        Command::Export { deck, at } => {
            let snapshot = with_store(store, |s| match &at {
                Some(r) => s.load_version_snapshot(&deck, &r.version, &r.branch),
                None => s.load_working(&deck),
            })?;
            println!("{}", export_decklist(&snapshot));
        }
    }
    Ok(())
}
