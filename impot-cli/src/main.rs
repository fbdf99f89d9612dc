use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use impot_cli::{commands, logging};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Income tax and URSSAF consolidation for French freelancers.
///
/// Reads a JSON calculation request and, optionally, the fields extracted
/// from tax documents, then prints the calculation result as JSON.
#[derive(Debug, Parser)]
#[command(name = "impot", version, about, long_about = None)]
struct Cli {
    /// Directory holding brackets.csv, regimes.csv and settings.toml.
    /// The official tables built into the binary are used when omitted.
    #[arg(long, global = true, env = "IMPOT_RULES_DIR")]
    rules_dir: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Calculate income tax, social contributions and the regime comparison.
    Calculate {
        /// JSON calculation request.
        #[arg(short, long)]
        request: PathBuf,

        /// JSON array of extracted documents, oldest first.
        #[arg(short, long)]
        documents: Option<PathBuf>,
    },

    /// Print the consolidated profile and its diagnostics.
    Consolidate {
        /// JSON array of extracted documents, oldest first.
        #[arg(short, long)]
        documents: PathBuf,

        /// Optional request whose values override the documents.
        #[arg(short, long)]
        request: Option<PathBuf>,
    },

    /// Print the rule tables.
    Rules {
        /// Tax year; every available year when omitted.
        #[arg(short, long)]
        year: Option<i32>,
    },
}

// ─── entry point ─────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(if cli.verbose { "debug" } else { "info" });
    debug!(?cli, "starting");

    let output = match &cli.command {
        Command::Calculate { request, documents } => {
            let store = commands::open_store(cli.rules_dir.as_deref())?;
            let input = commands::read_request(request)?;
            let documents = match documents {
                Some(path) => commands::read_documents(path)?,
                None => Vec::new(),
            };
            commands::to_json(&commands::calculate(&store, &input, documents)?)?
        }
        Command::Consolidate { documents, request } => {
            let documents = commands::read_documents(documents)?;
            let input = request
                .as_deref()
                .map(commands::read_request)
                .transpose()?;
            commands::to_json(&commands::consolidate(documents, input.as_ref())?)?
        }
        Command::Rules { year } => {
            let store = commands::open_store(cli.rules_dir.as_deref())?;
            commands::to_json(&commands::rules(&store, *year)?)?
        }
    };

    println!("{output}");
    Ok(())
}
