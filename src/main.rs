//! # Study Helper CLI (`study`)
//!
//! The `study` binary drives the study assistant: summarize a PDF with a
//! locally hosted language model, ask grounded follow-up questions, review
//! the transcript, or start the browser UI.
//!
//! ## Usage
//!
//! ```bash
//! study --config ./config/study.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `study summarize <file.pdf>` | Extract text and generate study notes |
//! | `study ask "<question>"` | Ask a question about the summarized document |
//! | `study history` | Print the durable chat transcript |
//! | `study serve` | Start the browser UI and JSON API |
//!
//! ## Examples
//!
//! ```bash
//! # Summarize lecture notes (requires Ollama running locally)
//! study summarize ./lecture3.pdf
//!
//! # Ask about the document
//! study ask "What are the main theorems covered?"
//!
//! # Review everything asked so far
//! study history
//!
//! # Or use the browser UI at http://127.0.0.1:8080
//! study serve
//! ```

mod config;
mod extract;
mod model;
mod server;
mod session;
mod storage;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::model::ModelClient;
use crate::session::SessionContext;
use crate::storage::{Storage, CHAT_HISTORY_FILE, EXTRACTED_CONTENT_FILE, SUMMARY_FILE};

/// Study Helper — summarize a PDF with a local language model and ask
/// questions grounded in its text.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; built-in defaults (local Ollama, current directory for data files)
/// apply when the file is absent.
#[derive(Parser)]
#[command(
    name = "study",
    about = "Study Helper — summarize a PDF with a local language model and ask questions about it",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/study.toml`. Model endpoint, data directory,
    /// and server bind address are read from this file.
    #[arg(long, global = true, default_value = "./config/study.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Extract a PDF's text and generate a summary with key points.
    ///
    /// Writes the extracted text to `extracted_content.txt` and the
    /// model-generated study notes to `summary_and_key_points.txt` in the
    /// configured data directory.
    Summarize {
        /// Path to the PDF document.
        file: PathBuf,
    },

    /// Ask a question about the most recently summarized document.
    ///
    /// The question is grounded in the persisted extracted text (empty if
    /// no document has been summarized yet) and the exchange is appended
    /// to `chat_history.txt`.
    Ask {
        /// The question to ask.
        question: String,
    },

    /// Print the durable chat transcript file.
    History,

    /// Start the browser UI and JSON API.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// upload/summary/question page.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Summarize { file } => {
            run_summarize(&cfg, &file).await?;
        }
        Commands::Ask { question } => {
            run_ask(&cfg, &question).await?;
        }
        Commands::History => {
            run_history(&cfg)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_summarize(cfg: &config::Config, file: &Path) -> Result<()> {
    if !extract::is_pdf_filename(&file.to_string_lossy()) {
        anyhow::bail!("only PDF files are accepted, got '{}'", file.display());
    }
    let bytes = std::fs::read(file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", file.display(), e))?;

    let storage = Storage::new(&cfg.storage.dir)?;
    let client = ModelClient::new(&cfg.model)?;
    let mut session = SessionContext::new();

    println!("Extracting content from {}...", file.display());
    let result = session.handle_upload(&bytes, &storage, &client).await?;

    println!(
        "Extracted content saved to {}.",
        storage.path(EXTRACTED_CONTENT_FILE).display()
    );
    println!(
        "Summary and key points saved to {}.",
        storage.path(SUMMARY_FILE).display()
    );
    warn_skipped(result.skipped_lines);
    println!("\n{}", result.summary);
    Ok(())
}

async fn run_ask(cfg: &config::Config, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("question must not be empty");
    }

    let storage = Storage::new(&cfg.storage.dir)?;
    let client = ModelClient::new(&cfg.model)?;
    // Fresh process per invocation: document content comes from the
    // persisted extraction, empty when nothing was summarized yet.
    let mut session = SessionContext::resume(&storage)?;

    let result = session.handle_question(question, &storage, &client).await?;
    warn_skipped(result.skipped_lines);
    println!("{}", result.answer);
    Ok(())
}

fn run_history(cfg: &config::Config) -> Result<()> {
    let storage = Storage::new(&cfg.storage.dir)?;
    match storage.read_text_opt(CHAT_HISTORY_FILE)? {
        Some(contents) => print!("{}", contents),
        None => println!("Chat history file not found."),
    }
    Ok(())
}

fn warn_skipped(skipped: usize) {
    if skipped > 0 {
        eprintln!("warning: dropped {} malformed model response line(s)", skipped);
    }
}
