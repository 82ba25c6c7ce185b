use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hermes_core::HermesConfig;
use hermes_engine::prompt::status_line;
use hermes_engine::Engine;
use hermes_llm::{AnthropicProvider, LlmProvider, MockProvider};
use tracing::info;

#[derive(Parser)]
#[command(name = "hermes", about = "Agentic research engine driving one research tree to completion")]
struct Cli {
    /// Path to a TOML config file. Missing file or parse failure falls back to defaults.
    #[arg(long, default_value = "hermes.toml")]
    config: PathBuf,

    /// Directory the research tree is persisted under, overriding the config file.
    #[arg(long)]
    root_dir: Option<PathBuf>,

    /// Model name passed to the collaborator backend.
    #[arg(long, default_value = "claude-3-5-sonnet-latest")]
    model: String,

    /// Drive the engine with a scripted mock backend instead of a live one.
    /// Each occurrence supplies one canned reply, consumed in order.
    #[arg(long = "mock-reply")]
    mock_replies: Vec<String>,

    /// Maximum number of turns to run before giving up, in case the
    /// collaborator never finishes or fails the research.
    #[arg(long, default_value_t = 200)]
    max_turns: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "hermes=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = HermesConfig::load(&cli.config);
    if let Some(root_dir) = cli.root_dir {
        config.backup_dir = root_dir.join(".backups");
        config.root_dir = root_dir;
    }

    let llm: Arc<dyn LlmProvider> = if !cli.mock_replies.is_empty() {
        info!("running against a scripted mock backend with {} replies", cli.mock_replies.len());
        Arc::new(MockProvider::new(cli.mock_replies))
    } else {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY must be set unless --mock-reply is used"))?;
        Arc::new(AnthropicProvider::new(api_key, cli.model))
    };

    let mut engine = Engine::new(config, llm)?;

    for turn in 1..=cli.max_turns {
        let finished = engine.run_turn().await?;
        if let Some(node) = engine.current_node() {
            info!(turn, "{}", status_line(&node));
        }
        if finished {
            info!("research run finished after {turn} turns");
            return Ok(());
        }
    }

    info!("stopping after reaching the turn limit ({}), research was not finished", cli.max_turns);
    Ok(())
}
