//! Jarvis - interactive console entry point.

use std::process::ExitCode;
use std::sync::Arc;

use jarvis::config::{Config, ConfigError};
use jarvis::interface::Interface;
use jarvis::Agent;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging; stdout belongs to the conversation.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jarvis=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ConfigError>() {
                Some(config_error) => println!("Configuration error: {}", config_error),
                None => println!("Unexpected error: {}", e),
            }
            ExitCode::from(1)
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    info!(
        model = %config.model,
        timeout_secs = config.command_timeout.as_secs(),
        "Loaded configuration"
    );

    let agent = Arc::new(Agent::new(config));
    info!(tools = agent.tools().len(), "Agent ready");

    Interface::new(agent)
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    Ok(())
}
