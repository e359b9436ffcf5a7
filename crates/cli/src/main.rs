//! Test-suite manifest CLI - manifest command

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli_lib::cmd;
use cli_lib::cmd::update::UpdateOptions;
use std::path::PathBuf;
use tracing::Level;

/// Manifest - Incremental index of a test-suite tree
#[derive(Parser)]
#[command(name = "manifest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the manifest
    Update {
        /// Root of the test tree (default: enclosing git top-level)
        #[arg(long)]
        tests_root: Option<PathBuf>,

        /// Manifest file (default: <tests-root>/MANIFEST.json)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Ignore the existing manifest and build from scratch
        #[arg(short, long)]
        rebuild: bool,

        /// Walk the working copy instead of asking git
        #[arg(long)]
        work: bool,

        /// Url prefix the tree is served under (default: from manifest.toml, or /)
        #[arg(long)]
        url_base: Option<String>,
    },
    /// Show what the manifest contains
    Info {
        /// Root of the test tree (default: enclosing git top-level)
        #[arg(long)]
        tests_root: Option<PathBuf>,

        /// Manifest file (default: <tests-root>/MANIFEST.json)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Update {
            tests_root,
            path,
            rebuild,
            work,
            url_base,
        } => cmd::update::run(UpdateOptions {
            tests_root,
            path,
            rebuild,
            work,
            url_base,
        }),
        Commands::Info { tests_root, path } => cmd::info::run(tests_root, path),
    }
}
