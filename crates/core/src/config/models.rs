//! Configuration models that aggregate all settings.

use dk_protocol::DispatchConfig;
use std::path::{Path, PathBuf};

/// Name of the project directory holding config and packages.
pub const DISPATCH_DIR: &str = ".dispatch-kit";

/// File holding [`DispatchConfig`].
pub const CONFIG_FILE: &str = "config.toml";

/// Directory holding one sub-directory per installed package.
pub const AGENTS_DIR: &str = "agents";

/// Unified application configuration loaded from `.dispatch-kit/`.
///
/// # Example
///
/// ```rust,no_run
/// use dk_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("threshold = {}", config.global.threshold);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Project root (the directory that contains `.dispatch-kit/`).
    pub root: PathBuf,

    /// Global settings from `config.toml`.
    pub global: DispatchConfig,
}

impl AppConfig {
    /// Defaults rooted at `root`, used when `.dispatch-kit/` is absent.
    pub fn defaults(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            global: DispatchConfig::default(),
        }
    }

    pub fn dispatch_dir(&self) -> PathBuf {
        self.root.join(DISPATCH_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dispatch_dir().join(CONFIG_FILE)
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.dispatch_dir().join(AGENTS_DIR)
    }
}
