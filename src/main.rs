//! # docuchat CLI
//!
//! The `docuchat` binary is the primary interface for the chat service. It
//! provides commands for database initialization, document ingestion and
//! management, one-shot questions, conversation history, and starting the
//! HTTP chat API.
//!
//! ## Usage
//!
//! ```bash
//! docuchat --config ./config/docuchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docuchat init` | Create the SQLite database and run schema migrations |
//! | `docuchat ingest <file>` | Chunk, embed, and index a document |
//! | `docuchat sources` | List indexed source file names |
//! | `docuchat delete <file>` / `--all` | Remove a document's chunks, or wipe the store |
//! | `docuchat ask "<question>"` | One-shot grounded question |
//! | `docuchat history` | Show a user's recent conversation |
//! | `docuchat serve` | Start the HTTP chat API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docuchat::{chat, config, ingest, migrate, server, sources};

/// docuchat CLI — a retrieval-augmented document chat service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docuchat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docuchat",
    about = "docuchat — a retrieval-augmented document chat service",
    version,
    long_about = "docuchat ingests documents into a vector store (chunking and embedding them), \
    and answers chat questions grounded in the retrieved passages via a CLI and a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docuchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the chunk and chat-turn
    /// tables. Idempotent — running it multiple times is safe.
    Init,

    /// Chunk, embed, and index a document.
    ///
    /// Reads the file, extracts its text (PDF or UTF-8 text), splits it on
    /// paragraph boundaries, embeds the passages, and writes them to the
    /// store. Re-ingesting the same name duplicates chunks; delete first
    /// for replace semantics.
    Ingest {
        /// Path to the document (PDF, txt, md).
        file: PathBuf,

        /// Source name to index under; defaults to the file's name.
        #[arg(long)]
        name: Option<String>,
    },

    /// List indexed source file names.
    Sources,

    /// Remove a document's chunks, or wipe the whole store.
    Delete {
        /// Source file name to remove.
        file_name: Option<String>,

        /// Remove every indexed chunk.
        #[arg(long)]
        all: bool,
    },

    /// Ask a one-shot question grounded in the indexed documents.
    Ask {
        /// The question text.
        question: String,

        /// User id to record the turn under.
        #[arg(long, default_value = "cli")]
        user: String,
    },

    /// Show a user's recent conversation, oldest first.
    History {
        /// User id to show history for.
        #[arg(long, default_value = "cli")]
        user: String,

        /// Maximum number of turns.
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Start the HTTP chat API.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// ingestion, document management, chat, and history endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { file, name } => {
            ingest::run_ingest(&cfg, &file, name).await?;
        }
        Commands::Sources => {
            sources::run_sources(&cfg).await?;
        }
        Commands::Delete { file_name, all } => {
            sources::run_delete(&cfg, file_name, all).await?;
        }
        Commands::Ask { question, user } => {
            chat::run_ask(&cfg, &question, &user).await?;
        }
        Commands::History { user, limit } => {
            chat::run_history(&cfg, &user, limit).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
