mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use dk_core::config::load_config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    init_tracing(&cli).await;

    match cli.command {
        Commands::Init { force, minimal } => commands::project::init(&cli.root, force, minimal).await,
        Commands::NewAgent { agent_id, name } => commands::project::new_agent(&cli.root, &agent_id, name.as_deref()),
        Commands::List { json } => commands::agents::list(&cli.root, json).await,
        Commands::Install { path, force } => commands::agents::install(&cli.root, &path, force).await,
        Commands::Uninstall { agent_id } => commands::agents::uninstall(&cli.root, &agent_id).await,
        Commands::Enable { agent_id } => commands::agents::set_enabled(&cli.root, &agent_id, true).await,
        Commands::Disable { agent_id } => commands::agents::set_enabled(&cli.root, &agent_id, false).await,
        Commands::Health { json } => commands::agents::health(&cli.root, json).await,
        Commands::Route { message, json } => commands::dispatch::route(&cli.root, &message, json).await,
        Commands::Ask {
            message,
            conversation,
            json,
        } => commands::dispatch::ask(&cli.root, &message, conversation.as_deref(), json).await,
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
async fn init_tracing(cli: &Cli) {
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level),
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => {
                let level = load_config(&cli.root)
                    .await
                    .map(|config| config.global.log_level)
                    .unwrap_or_else(|_| "warn".to_string());
                EnvFilter::new(level)
            }
        },
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
