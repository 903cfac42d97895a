//! Interactive chat: a local stdin channel adapter in front of the service.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, BufReader};
use wicket_core::{AgentRuntime, Config};
use wicket_gateway::{
    AgentService, Allowlist, ChannelMessage, RateDecision, RateLimitConfig, RateLimiter,
};
use wicket_provider::{OpenAiCompatConfig, OpenAiCompatProvider};
use wicket_session::{SessionManager, SessionStore, StoreConfig};
use wicket_tools::{register_default_tools, NotionConfig, NotionTool, ToolContext, ToolRegistry};

const APOLOGY: &str = "Sorry, something went wrong. Please try again.";

/// Run interactive chat mode.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let provider = build_provider(&config)?;
    let tools = build_tools(&config);

    let workspace_dir = match config.workspace_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let mut runtime = AgentRuntime::new(provider, tools)
        .with_max_tool_steps(config.max_tool_steps)
        .with_tool_context(ToolContext {
            workspace_dir,
            command_timeout: Duration::from_secs(10),
        });
    if let Some(ref prompt) = config.system_prompt {
        runtime = runtime.with_system_prompt(prompt.clone());
    }

    let store = Arc::new(SessionStore::new(StoreConfig {
        persist_dir: config.session_dir.clone(),
        secret: config.session_secret.clone(),
        ttl: Duration::from_secs(config.session_ttl_secs),
        sweep_interval: Duration::from_secs(config.session_sweep_secs),
    })?);

    let allowlist = match config.allowlist_path {
        Some(ref path) => Some(Allowlist::from_file(path)?),
        None => None,
    };

    let service = AgentService::new(
        Arc::new(runtime),
        SessionManager::new(Arc::clone(&store)),
        allowlist,
    );

    let limiter = RateLimiter::new(RateLimitConfig {
        max_messages_per_window: config.rate_limit.max_messages_per_window,
        window: Duration::from_secs(config.rate_limit.window_secs),
        max_connections_per_ip: config.rate_limit.max_connections_per_ip,
        sweep_interval: Duration::from_secs(60),
    });

    let user_id = std::env::var("USER").unwrap_or_else(|_| "local".to_string());
    println!("wicket chat — type 'exit' to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "exit" || text == "quit" {
            break;
        }

        if let RateDecision::Limited { retry_after } = limiter.check_message(&user_id) {
            println!(
                "You're sending messages too quickly. Try again in {}s.",
                retry_after.as_secs().max(1)
            );
            continue;
        }

        let message = ChannelMessage {
            channel: "cli".to_string(),
            user_id: user_id.clone(),
            text: text.to_string(),
            timestamp: unix_millis(),
        };

        match service.handle_message(&message).await {
            Ok(reply) => println!("{reply}"),
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                println!("{APOLOGY}");
            }
        }
    }

    limiter.shutdown();
    store.shutdown();
    Ok(())
}

fn build_provider(config: &Config) -> anyhow::Result<Arc<OpenAiCompatProvider>> {
    let provider = OpenAiCompatProvider::new(OpenAiCompatConfig {
        base_url: config.base_url.clone(),
        api_key: config.api_key.clone(),
        provider_name: config.provider.clone(),
        model: config.model.clone(),
    })
    .map_err(|e| {
        anyhow::anyhow!(
            "{e}. Set it with:\n  export OPENAI_API_KEY=your-key-here\n\
             or add \"api_key\" to ~/.wicket/config.json"
        )
    })?;
    Ok(Arc::new(provider))
}

fn build_tools(config: &Config) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    register_default_tools(&mut tools);

    // Optional integrations join only when configured.
    if !config.notion.api_key.is_empty() {
        match NotionTool::new(NotionConfig {
            api_key: config.notion.api_key.clone(),
            database_id: config.notion.database_id.clone(),
            default_parent_id: config.notion.default_parent_id.clone(),
        }) {
            Ok(tool) => tools.register(Arc::new(tool)),
            Err(e) => tracing::warn!(error = %e, "notion tool disabled"),
        }
    }

    tools
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
