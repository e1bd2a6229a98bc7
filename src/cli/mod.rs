//! Command-line interface for the `citizen-store` binary.
//!
//! Every command applies pending migrations before it runs, so a fresh
//! database is usable straight away.

mod chats;
mod reps;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::store::Store;

pub use chats::run_chats_command;
pub use reps::{run_ingest_command, run_reps_command};

/// Inspect and maintain the CitizenConnect database.
#[derive(Parser, Debug)]
#[command(name = "citizen-store", version, about, long_about = None)]
pub struct Cli {
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Apply pending schema migrations and reconcile reference data
    Migrate,

    /// Show today's usage statistics and recent chats
    Stats {
        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },

    /// List representatives
    Reps {
        /// Match constituency or state (case-insensitive substring)
        #[arg(short, long, conflicts_with = "constituency")]
        search: Option<String>,

        /// Match constituency only (case-insensitive substring)
        #[arg(short, long)]
        constituency: Option<String>,
    },

    /// Import representatives from a JSON array, skipping ones already present
    Ingest {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// List stored chat exchanges
    Chats {
        /// Maximum number of chats
        #[arg(short, long, default_value = "10")]
        limit: i64,

        /// Only 5-star exchanges (at most five)
        #[arg(long, conflicts_with = "limit")]
        high_quality: bool,
    },
}

impl Command {
    /// Default log filter when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Command::Migrate => "info",
            _ => "warn",
        }
    }
}

/// Run a command against `store`.
pub async fn run_command(cmd: Command, store: &Store, json: bool) -> anyhow::Result<()> {
    let report = store.run_migrations().await?;

    match cmd {
        Command::Migrate => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Database migrated ({})", store.dialect().name);
                println!("  Migrations applied: {}", report.applied.len());
                for name in &report.applied {
                    println!("    + {}", name);
                }
                println!("  Seeded:   {}", report.seeded);
                println!("  Removed:  {}", report.removed);
                println!("  Enriched: {}", report.enriched);
                println!("  Inserted: {}", report.inserted);
            }
            Ok(())
        }
        Command::Stats { pretty } => {
            let stats = store.stats_report().await?;
            if pretty {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", serde_json::to_string(&stats)?);
            }
            Ok(())
        }
        Command::Reps {
            search,
            constituency,
        } => run_reps_command(store, search.as_deref(), constituency.as_deref(), json).await,
        Command::Ingest { file } => run_ingest_command(store, &file).await,
        Command::Chats {
            limit,
            high_quality,
        } => run_chats_command(store, limit, high_quality, json).await,
    }
}

/// Shorten `s` to at most `max_chars` characters, marking the cut.
pub(crate) fn truncate_content(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", &s[..idx]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_content() {
        assert_eq!(truncate_content("hello", 10), "hello");
        assert_eq!(truncate_content("hello world", 5), "hello...");
        assert_eq!(truncate_content("नमस्ते दुनिया", 3), "नमस...");
    }

    #[test]
    fn test_parse_reps_search() {
        let cli = Cli::try_parse_from(["citizen-store", "reps", "--search", "kerala"]).unwrap();
        match cli.command {
            Command::Reps {
                search,
                constituency,
            } => {
                assert_eq!(search.as_deref(), Some("kerala"));
                assert!(constituency.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_search_conflicts_with_constituency() {
        let parsed = Cli::try_parse_from([
            "citizen-store",
            "reps",
            "--search",
            "kerala",
            "--constituency",
            "Wayanad",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_chats_defaults() {
        let cli = Cli::try_parse_from(["citizen-store", "--json", "chats"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Chats {
                limit,
                high_quality,
            } => {
                assert_eq!(limit, 10);
                assert!(!high_quality);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_log_filter_per_command() {
        assert_eq!(Command::Migrate.default_log_filter(), "info");
        assert_eq!(Command::Stats { pretty: false }.default_log_filter(), "warn");
    }
}
