use color_eyre::eyre::Result;
use colored::Colorize;
use dk_core::init::{generate_dispatch_kit_structure, scaffold_agent, InitOptions};
use std::path::Path;

pub async fn init(root: &Path, force: bool, minimal: bool) -> Result<()> {
    let dk_dir = generate_dispatch_kit_structure(InitOptions {
        target_dir: root.to_path_buf(),
        force,
        minimal,
    })
    .await?;

    println!("{} Initialized dispatch-kit in {}", "✓".green(), dk_dir.display());
    println!("  Edit {} to configure routing", "config.toml".cyan());
    println!("  Run {} to try it", "dispatch ask \"hello\"".cyan());
    Ok(())
}

pub fn new_agent(root: &Path, agent_id: &str, name: Option<&str>) -> Result<()> {
    let manifest = scaffold_agent(root, agent_id, name)?;

    println!("{} Created agent {}", "✓".green(), agent_id.cyan());
    println!("  Manifest: {}", manifest.display());
    println!("  Add triggers so the router can pick it");
    Ok(())
}
