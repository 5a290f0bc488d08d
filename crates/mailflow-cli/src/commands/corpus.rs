//! Corpus command - inspect and extend the historical corpus.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use console::style;

use mailflow_core::JsonlCorpus;
use mailflow_core::dedup::CorpusSource;

/// Arguments for the corpus command.
#[derive(Args)]
pub struct CorpusArgs {
    #[command(subcommand)]
    command: CorpusCommand,
}

#[derive(Subcommand)]
enum CorpusCommand {
    /// Append the content of a file as one corpus entry
    Add {
        /// Corpus file (JSON Lines)
        #[arg(long)]
        corpus: PathBuf,

        /// File whose content becomes the entry
        file: PathBuf,
    },

    /// List corpus entries
    List {
        /// Corpus file (JSON Lines)
        #[arg(long)]
        corpus: PathBuf,

        /// Print whole entries instead of the first line
        #[arg(long)]
        full: bool,
    },
}

pub fn run(args: CorpusArgs) -> anyhow::Result<()> {
    match args.command {
        CorpusCommand::Add { corpus, file } => add_entry(corpus, file),
        CorpusCommand::List { corpus, full } => list_entries(corpus, full),
    }
}

fn add_entry(corpus: PathBuf, file: PathBuf) -> anyhow::Result<()> {
    let content = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let corpus = JsonlCorpus::new(corpus);
    corpus.append(&content)?;

    println!(
        "{} Added {} to {}",
        style("✓").green(),
        file.display(),
        corpus.path().display()
    );
    Ok(())
}

fn list_entries(corpus: PathBuf, full: bool) -> anyhow::Result<()> {
    let corpus = JsonlCorpus::new(corpus);
    let entries = corpus
        .snapshot()
        .with_context(|| format!("Failed to read corpus {}", corpus.path().display()))?;

    for (index, entry) in entries.iter().enumerate() {
        if full {
            println!("{}: {}", index + 1, entry);
        } else {
            println!("{}: {}", index + 1, entry.lines().next().unwrap_or(""));
        }
    }

    println!();
    println!("{} {} entries", style("ℹ").blue(), entries.len());
    Ok(())
}
