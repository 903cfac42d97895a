//! Command-line argument definitions.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wicket",
    about = "LLM agent with sandboxed tools and encrypted sessions",
    version
)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the configured model.
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive chat over stdin (default).
    Chat,
    /// Print the resolved configuration with secrets masked.
    Config,
}
