//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sibyl",
    version,
    about = "Grounded question answering over local document corpora",
    long_about = "Sibyl ingests local documents into a hybrid index (dense vectors plus BM25 \
                  keywords), fuses both rankings per query, diversifies the results, and builds \
                  citation-grounded prompts for answer generation."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/sibyl/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a document into the index
    Ingest {
        /// Path to the document (txt, md, csv)
        file: PathBuf,

        /// Print the ingestion receipt as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search the index with hybrid dense + keyword retrieval
    Query {
        /// Search query text
        query: String,

        /// Maximum number of results to return
        #[arg(short, long, default_value = "6")]
        limit: usize,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Retrieve context for a question and build a citation-grounded prompt
    Ask {
        /// Question to ask
        question: String,

        /// Number of context chunks to retrieve
        #[arg(short = 'n', long, default_value = "6")]
        context_size: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the config file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
