//! NeuroNarrative - conversational companions for children
//!
#![doc = "NeuroNarrative - conversational companions for children"]
#![doc = "Main entry point for the NeuroNarrative terminal client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use neuronarrative::cli::Cli;
use neuronarrative::commands;
use neuronarrative::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    tracing::info!("Starting NeuroNarrative");

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    commands::run_command(config, cli.command).await
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "neuronarrative=debug"
    } else {
        "neuronarrative=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
