use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dispatch",
    version,
    about = "Route requests to specialised AI agents and manage agent packages",
    after_help = "Project state lives in .dispatch-kit/ under --root.\nLog filter precedence: --log-level, RUST_LOG, then log_level in config.toml."
)]
pub struct Cli {
    /// Directory that holds .dispatch-kit/
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Tracing filter, e.g. `debug` or `dk_core=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .dispatch-kit/ with the default configuration and agents
    Init {
        /// Overwrite an existing .dispatch-kit/
        #[arg(long)]
        force: bool,

        /// Only create the general-purpose agent
        #[arg(long)]
        minimal: bool,
    },

    /// Scaffold a new agent package
    NewAgent {
        /// Lowercase agent id, e.g. `travel-planner`
        agent_id: String,

        /// Display name (defaults to the id in title case)
        #[arg(long)]
        name: Option<String>,
    },

    /// List installed agents
    List {
        #[arg(long)]
        json: bool,
    },

    /// Install an agent package directory or manifest file
    Install {
        path: PathBuf,

        /// Replace an installed agent with a different version
        #[arg(long)]
        force: bool,
    },

    /// Remove an installed agent package
    Uninstall { agent_id: String },

    /// Make an agent eligible for routing
    Enable { agent_id: String },

    /// Keep an agent installed but stop routing to it
    Disable { agent_id: String },

    /// Run every agent's self-diagnostic
    Health {
        #[arg(long)]
        json: bool,
    },

    /// Show which agents would answer a message, without invoking them
    Route {
        message: String,

        #[arg(long)]
        json: bool,
    },

    /// Answer a message with the selected agents
    Ask {
        message: String,

        /// Conversation id forwarded to agents
        #[arg(long)]
        conversation: Option<String>,

        #[arg(long)]
        json: bool,
    },
}
