pub mod agents;
pub mod dispatch;
pub mod project;

use color_eyre::eyre::{Result, WrapErr};
use dk_core::runtime::{bootstrap, Runtime};
use std::path::Path;
use tracing::warn;

/// Load the project at `root` and report packages that failed to load.
pub(crate) async fn load_runtime(root: &Path) -> Result<Runtime> {
    let runtime = bootstrap(root)
        .await
        .wrap_err_with(|| format!("Failed to load dispatch-kit project at {}", root.display()))?;
    for failure in &runtime.discovery.failed {
        warn!(path = %failure.path.display(), error = %failure.error, "package not loaded");
    }
    Ok(runtime)
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
