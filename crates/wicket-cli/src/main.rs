//! wicket — a multi-channel LLM agent with sandboxed tools and encrypted
//! sessions, driven here through a local stdin channel.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("wicket=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "wicket=info".into()),
            )
            .init();
    }

    let config_store = wicket_core::ConfigStore::new();
    let mut config = config_store.load();
    wicket_core::apply_env_overrides(&mut config);

    if let Some(model) = cli.model {
        config.model = model;
    }

    match cli.command {
        None | Some(Commands::Chat) => commands::chat::run(config).await?,
        Some(Commands::Config) => {
            if !config.api_key.is_empty() {
                config.api_key = "<set>".to_string();
            }
            if config.session_secret.is_some() {
                config.session_secret = Some("<set>".to_string());
            }
            if !config.notion.api_key.is_empty() {
                config.notion.api_key = "<set>".to_string();
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
