//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, ListCommand, ResetCommand, RunCommand, SubmitCommand};

/// Resumable, form-driven pipeline orchestrator
#[derive(Debug, Parser, Clone)]
#[command(name = "conveyor")]
#[command(author = "Conveyor Contributors")]
#[command(version = "0.1.0")]
#[command(about = "A resumable, form-driven pipeline orchestrator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the state database (defaults to the local data dir)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Account the request runs as
    #[arg(long, global = true, default_value = "operator")]
    pub account: String,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Present the current step of a pipeline
    Run(RunCommand),

    /// Submit input for the pipeline's pending step
    Submit(SubmitCommand),

    /// Discard a pipeline's persisted state
    Reset(ResetCommand),

    /// List registered pipelines and their positions
    List(ListCommand),

    /// Show when each pipeline last completed
    History(HistoryCommand),
}

impl Cli {
    pub fn from_args() -> Self {
        Self::parse()
    }
}
