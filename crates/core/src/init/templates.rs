//! Embedded template files for `.dispatch-kit` initialization.
//!
//! This module uses `rust-embed` to embed template files from the workspace
//! root `templates/` directory into the binary at compile time, so the CLI
//! can generate `.dispatch-kit/` structures without external files.

use rust_embed::RustEmbed;

/// Embedded template files from the `templates/` directory.
///
/// The path is relative to the crate root:
/// - `CARGO_MANIFEST_DIR` = `crates/core`
/// - `../../templates` = workspace root `templates/`
///
/// With the `debug-embed` feature, debug builds embed the files too, so
/// tests see exactly what a release binary ships.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../templates"]
pub struct TemplateAssets;

/// Template used by `new-agent`.
pub const NEW_AGENT_TEMPLATE: &str = "new-agent/agent.md";

/// Get template file content by path.
///
/// # Arguments
/// * `path` - Relative path from templates root (e.g., "config.toml", "agents/general/agent.md")
///
/// # Returns
/// The file content as a String, or None if the file doesn't exist.
///
/// # Example
/// ```
/// use dk_core::init::templates::get_template;
///
/// let config = get_template("config.toml").expect("config.toml should exist");
/// assert!(config.contains("threshold ="));
/// ```
pub fn get_template(path: &str) -> Option<String> {
    TemplateAssets::get(path).map(|file| String::from_utf8_lossy(file.data.as_ref()).to_string())
}

/// List all template files under a prefix, sorted.
///
/// # Example
/// ```
/// use dk_core::init::templates::list_templates;
///
/// let agents = list_templates("agents/");
/// assert!(agents.contains(&"agents/general/agent.md".to_string()));
/// ```
pub fn list_templates(prefix: &str) -> Vec<String> {
    let mut paths: Vec<String> = TemplateAssets::iter()
        .filter(|path| path.starts_with(prefix))
        .map(|path| path.to_string())
        .collect();
    paths.sort();
    paths
}

/// Replace every `{{key}}` in `template`.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{key}}}}}"), value)
    })
}
