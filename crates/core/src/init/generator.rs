//! Directory structure and file generation for `.dispatch-kit` initialization.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates, render, NEW_AGENT_TEMPLATE};
use crate::config::models::{AGENTS_DIR, DISPATCH_DIR};
use crate::registry::is_valid_agent_id;
use std::fs;
use std::path::{Path, PathBuf};

/// Agent created in minimal mode.
const MINIMAL_AGENT: &str = "agents/general/";

/// Options for initializing a .dispatch-kit directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Target directory where .dispatch-kit will be created.
    pub target_dir: PathBuf,

    /// Overwrite existing .dispatch-kit directory if it exists.
    pub force: bool,

    /// Create only the general-purpose agent.
    pub minimal: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
            minimal: false,
        }
    }
}

/// Generate a complete .dispatch-kit directory structure with templates.
///
/// This function creates the following structure:
/// ```text
/// .dispatch-kit/
/// ├── config.toml
/// └── agents/
///     ├── general/agent.md
///     ├── coding/agent.md    (unless minimal)
///     ├── research/agent.md  (unless minimal)
///     └── writing/agent.json (unless minimal)
/// ```
///
/// # Returns
/// The created `.dispatch-kit` path, or an `InitError` if:
/// - The .dispatch-kit directory already exists (without force flag)
/// - A template file cannot be found
/// - File system operations fail
///
/// # Example
/// ```no_run
/// use dk_core::init::{InitOptions, generate_dispatch_kit_structure};
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = InitOptions {
///     target_dir: PathBuf::from("."),
///     force: false,
///     minimal: false,
/// };
///
/// generate_dispatch_kit_structure(options).await?;
/// # Ok(())
/// # }
/// ```
pub async fn generate_dispatch_kit_structure(options: InitOptions) -> InitResult<PathBuf> {
    let dk_dir = options.target_dir.join(DISPATCH_DIR);

    if dk_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(dk_dir));
    }

    create_dir(&dk_dir.join(AGENTS_DIR))?;
    write_template_file(&dk_dir, "config.toml")?;

    let prefix = if options.minimal { MINIMAL_AGENT } else { "agents/" };
    let agents = list_templates(prefix);
    if agents.is_empty() {
        return Err(InitError::TemplateNotFound(prefix.to_string()));
    }
    for agent_path in agents {
        write_template_file(&dk_dir, &agent_path)?;
    }

    Ok(dk_dir)
}

/// Scaffold a new agent package at `.dispatch-kit/agents/<agent_id>/agent.md`.
///
/// # Arguments
/// * `root` - Directory that holds (or will hold) `.dispatch-kit/`
/// * `agent_id` - Lowercase slug for the new agent
/// * `name` - Display name; defaults to the id in title case
///
/// # Returns
/// Path of the written manifest.
pub fn scaffold_agent(root: &Path, agent_id: &str, name: Option<&str>) -> InitResult<PathBuf> {
    if !is_valid_agent_id(agent_id) {
        return Err(InitError::InvalidAgentId(agent_id.to_string()));
    }

    let package_dir = root.join(DISPATCH_DIR).join(AGENTS_DIR).join(agent_id);
    if package_dir.exists() {
        return Err(InitError::AgentExists(package_dir));
    }

    let template =
        get_template(NEW_AGENT_TEMPLATE).ok_or_else(|| InitError::TemplateNotFound(NEW_AGENT_TEMPLATE.to_string()))?;
    let name = name.map_or_else(|| title_case(agent_id), str::to_string);
    let author = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let content = render(&template, &[("agent_id", agent_id), ("name", &name), ("author", &author)]);

    create_dir(&package_dir)?;
    let manifest = package_dir.join("agent.md");
    fs::write(&manifest, content).map_err(|source| InitError::FileWrite {
        path: manifest.clone(),
        source,
    })?;
    Ok(manifest)
}

fn title_case(agent_id: &str) -> String {
    agent_id
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn create_dir(path: &Path) -> InitResult<()> {
    fs::create_dir_all(path).map_err(|source| InitError::DirectoryCreate {
        path: path.to_path_buf(),
        source,
    })
}

/// Helper function to write a template file to the target directory.
///
/// # Arguments
/// * `dk_dir` - The .dispatch-kit directory path
/// * `template_path` - Relative path of the template (e.g., "agents/general/agent.md")
fn write_template_file(dk_dir: &Path, template_path: &str) -> InitResult<()> {
    let content = get_template(template_path).ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = dk_dir.join(template_path);

    // Ensure parent directory exists
    if let Some(parent) = target_path.parent() {
        create_dir(parent)?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path,
        source,
    })?;

    Ok(())
}
