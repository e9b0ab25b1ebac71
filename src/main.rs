//! selfdx server entry point.

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use selfdx::persona::PersonaPreset;

#[derive(Parser)]
#[command(name = "selfdx")]
#[command(about = "Password-gated chat UI for LLM self-diagnosis studies")]
struct Cli {
    /// Path to config file (optional)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Override the persona preset from the config file
    #[arg(long)]
    persona: Option<PersonaPreset>,

    /// Override the listening port
    #[arg(long)]
    port: Option<u16>,

    /// Print the available persona presets and exit
    #[arg(long)]
    list_personas: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.list_personas {
        for preset in PersonaPreset::ALL {
            println!("{preset}\n{}", preset.prompt());
        }
        return Ok(());
    }

    let default_level = if cli.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("starting selfdx");

    let mut config = if let Some(config_path) = cli.config {
        selfdx::config::Config::load_from_path(&config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    } else {
        selfdx::config::Config::load().context("failed to load configuration")?
    };

    if let Some(preset) = cli.persona {
        config.persona = selfdx::persona::SystemPersona::from_preset(preset);
    }
    if let Some(port) = cli.port {
        config.api.port = port;
    }

    tracing::info!(
        persona = %config.persona.source(),
        model = %config.llm.model.model,
        temperature = config.llm.model.temperature,
        max_retries = config.llm.retry.max_retries,
        "configuration loaded"
    );

    let client = selfdx::llm::OpenAiClient::new(&config.llm)
        .context("failed to initialize completion client")?;
    let state = selfdx::api::ApiState::new(&config, std::sync::Arc::new(client))
        .context("failed to build API state")?;
    let state = std::sync::Arc::new(state);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let server = selfdx::api::start_http_server(config.api.socket_addr(), state, shutdown_rx)
        .await
        .context("failed to start HTTP server")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    server.await.context("HTTP server task panicked")?;

    tracing::info!("selfdx stopped");
    Ok(())
}
