//! # Notifier - notes from the command line
//!
//! A thin front end over the document session: every subcommand loads the
//! session, runs one operation, and flushes it.
//!
//! ## Quick Start
//!
//! ```bash
//! # Add and list notes
//! cargo run -- add "Buy milk"
//! cargo run -- list
//!
//! # Open a file and show its counts
//! cargo run -- open path/to/file.txt
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notifier_core::{CloseChoice, Config, DeleteChoice, Document, Prompter, Session};

/// Notifier - a notes and plain-text editor
#[derive(Parser, Debug)]
#[command(name = "notifier")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the default
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Notes store to use instead of the configured one
    #[arg(short, long, value_name = "FILE", global = true)]
    notes: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Cmd {
    /// List notes with their titles
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print one note
    Show { index: usize },
    /// Append a note. Reads stdin when no text is given
    Add { text: Vec<String> },
    /// List notes matching a query, ignoring case
    Search { query: String },
    /// Delete a note
    Delete {
        index: usize,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Insert a copy of a note after it
    Duplicate { index: usize },
    /// Word and character counts of a note
    Stats {
        index: usize,
        #[arg(long)]
        json: bool,
    },
    /// Open a file, report on it, and remember it
    Open { path: PathBuf },
    /// Show recently opened files
    Recent {
        /// Forget every remembered file
        #[arg(long)]
        clear: bool,
    },
    /// Write the effective config to the default location
    InitConfig,
}

/// One row of `list --json`.
#[derive(Serialize)]
struct NoteSummary<'a> {
    index: usize,
    title: String,
    words: usize,
    chars: usize,
    content: &'a str,
}

/// Answers confirmations on the terminal.
struct TerminalPrompter {
    assume_yes: bool,
}

impl TerminalPrompter {
    fn ask(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{} [y/N] ", question);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(_) => false,
        }
    }
}

impl Prompter for TerminalPrompter {
    fn pick_open_path(&mut self) -> Option<PathBuf> {
        None
    }

    fn pick_save_path(&mut self, _default_name: &str) -> Option<PathBuf> {
        None
    }

    fn confirm_close(&mut self, title: &str) -> CloseChoice {
        if self.ask(&format!("Save changes to \"{}\"?", title)) {
            CloseChoice::Save
        } else {
            CloseChoice::Cancel
        }
    }

    fn confirm_delete(&mut self, title: &str) -> DeleteChoice {
        if self.ask(&format!("Delete note \"{}\"?", title)) {
            DeleteChoice::Confirm
        } else {
            DeleteChoice::Cancel
        }
    }
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(log_filter(log_level))
        .init();
}

/// `RUST_LOG` wins over the verbosity flags when it parses.
fn log_filter(log_level: tracing::Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(log_level).into()))
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(notes) = &args.notes {
        config.notes.path = notes.clone();
    }
    Ok(config)
}

/// Returns the note at `index` among the session's notes.
fn note_at(session: &Session, index: usize) -> anyhow::Result<&Document> {
    session
        .documents()
        .iter()
        .filter(|doc| doc.is_note())
        .nth(index)
        .with_context(|| format!("No note at index {}", index))
}

fn print_row(index: usize, doc: &Document) {
    println!("{:>4}  {}", index, doc.title());
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let mut session = Session::load(config).context("Failed to load notes")?;

    match args.command {
        Cmd::List { json } => {
            let notes = session.documents().iter().filter(|doc| doc.is_note());
            if json {
                let rows: Vec<NoteSummary> = notes
                    .enumerate()
                    .map(|(index, doc)| {
                        let stats = doc.stats();
                        NoteSummary {
                            index,
                            title: doc.title(),
                            words: stats.words,
                            chars: stats.chars,
                            content: doc.content(),
                        }
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for (index, doc) in notes.enumerate() {
                    print_row(index, doc);
                }
            }
        }
        Cmd::Show { index } => {
            println!("{}", note_at(&session, index)?.content());
        }
        Cmd::Add { text } => {
            let text = if text.is_empty() {
                io::read_to_string(io::stdin()).context("Failed to read stdin")?
            } else {
                text.join(" ")
            };
            if text.trim().is_empty() {
                bail!("Refusing to add an empty note");
            }
            let id = session.new_note(text.trim_end_matches('\n'));
            session.save(id)?;
            println!("Added: {}", session.document(id)?.title());
        }
        Cmd::Search { query } => {
            for index in session.filter(&query) {
                let doc = &session.documents()[index];
                if doc.is_note() {
                    print_row(index, doc);
                }
            }
        }
        Cmd::Delete { index, yes } => {
            let id = note_at(&session, index)?.id();
            let mut prompter = TerminalPrompter { assume_yes: yes };
            if session.delete_with(id, &mut prompter)? {
                session.save_notes()?;
                println!("Deleted note {}", index);
            } else {
                println!("Kept note {}", index);
            }
        }
        Cmd::Duplicate { index } => {
            let id = note_at(&session, index)?.id();
            let copy = session.duplicate(id)?;
            session.save_notes()?;
            println!("Duplicated: {}", session.document(copy)?.title());
        }
        Cmd::Stats { index, json } => {
            let stats = note_at(&session, index)?.stats();
            if json {
                println!("{}", serde_json::to_string(&stats)?);
            } else {
                println!("{}", stats);
            }
        }
        Cmd::Open { path } => {
            let id = session.open(&path)?;
            let doc = session.document(id)?;
            let mode = if doc.is_readonly() { " (read-only)" } else { "" };
            println!("{}{}", doc.title(), mode);
            println!("{}", doc.stats());
        }
        Cmd::Recent { clear } => {
            if clear {
                session.clear_recent().context("Failed to clear recent files")?;
            }
            for entry in session.recent().entries() {
                println!("{}", entry.display());
            }
        }
        Cmd::InitConfig => {
            session.config().save().context("Failed to write config")?;
            println!("{}", Config::default_path()?.display());
            return Ok(());
        }
    }

    let report = session.flush();
    for (id, err) in &report.failed {
        tracing::warn!("Could not save {}: {}", id, err);
    }
    if let Some(err) = report.notes_error {
        return Err(err).context("Failed to save notes");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    tracing::info!("Starting Notifier v{}", env!("CARGO_PKG_VERSION"));
    run(args)
}
