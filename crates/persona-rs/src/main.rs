//! Command-line client for remembering, recalling and inspecting user facts.

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{debug, info};
use persona_rs::config::PersonaConfig;
use persona_rs::memory::{FactStore, InboundMessage, NoOracle, Oracle, StoreKey};
use persona_rs::{OracleRegistry, build_service, oracle_from_config};
use std::path::PathBuf;
use std::sync::Arc;

/// Registry id used when `--offline` is set.
const OFFLINE_ORACLE_ID: &str = "offline";

/// Command-line options for the memory client.
#[derive(Parser)]
#[command(name = "persona-memory", version)]
struct Cli {
    /// Platform the user belongs to
    #[arg(long, default_value = "cli")]
    platform: String,
    /// User id within the platform
    #[arg(long)]
    user: String,
    /// Optional path to a persona.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Model name overriding oracle.model
    #[arg(long)]
    model: Option<String>,
    /// Skip the oracle and rely on the fallback extractor
    #[arg(long)]
    offline: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract and store a durable fact from a message
    Remember {
        message: String,
        /// Recent conversation shown to the oracle
        #[arg(long)]
        context: Option<String>,
    },
    /// Print stored facts relevant to a message
    Recall {
        message: String,
        /// Recent conversation shown to the oracle
        #[arg(long)]
        context: Option<String>,
    },
    /// Dump the user's stored facts as JSON
    Show,
}

/// Entry point for the memory client.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    info!(
        "starting persona-memory (config_set={}, model_set={}, offline={})",
        cli.config.is_some(),
        cli.model.is_some(),
        cli.offline
    );
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let config = if let Some(path) = cli.config.as_ref() {
        PersonaConfig::load_from_path(path).context("failed to load config")?
    } else {
        let layered = PersonaConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };

    let registry = OracleRegistry::new();
    let oracle_id = if cli.offline {
        registry.register(OFFLINE_ORACLE_ID, Arc::new(NoOracle));
        OFFLINE_ORACLE_ID.to_string()
    } else {
        let api_key = std::env::var(&config.oracle.api_key_env).ok();
        let oracle = oracle_from_config(&config.oracle, cli.model.as_deref(), api_key)
            .context("failed to build oracle")?;
        registry.register(config.oracle.provider.clone(), oracle);
        config.oracle.provider.clone()
    };
    let oracle: Arc<dyn Oracle> = registry
        .resolve(Some(&oracle_id))
        .context("failed to resolve oracle")?;

    let service = build_service(&config, oracle, &cwd).context("failed to build memory service")?;
    let key = StoreKey::new(cli.platform, cli.user);

    match cli.command {
        Command::Remember { message, context } => {
            let outcome = service
                .remember(&key, &InboundMessage::new(message), context.as_deref())
                .await;
            println!("saved: {}", outcome.saved);
            println!("reasoning: {}", outcome.reasoning);
        }
        Command::Recall { message, context } => {
            let outcome = service
                .recall(&key, &InboundMessage::new(message), context.as_deref())
                .await;
            match outcome.context {
                Some(guidance) => println!("{guidance}"),
                None => println!("(no relevant memories)"),
            }
            println!("reasoning: {}", outcome.reasoning);
        }
        Command::Show => {
            let store = service
                .store()
                .load(&key)
                .await
                .context("failed to load memories")?;
            let json = serde_json::to_string_pretty(&store).context("failed to encode memories")?;
            println!("{json}");
        }
    }
    Ok(())
}
