use super::{load_runtime, print_json};
use color_eyre::eyre::{bail, Result};
use colored::Colorize;
use dk_core::config::store::{install_package_dir, remove_package_dir, save_config};
use dk_core::registry::AgentPackage;
use dk_protocol::AgentSource;
use std::path::Path;

pub async fn list(root: &Path, json: bool) -> Result<()> {
    let runtime = load_runtime(root).await?;
    let agents = runtime.registry.list();

    if json {
        return print_json(&agents);
    }

    println!("{}", "Installed agents:".bold());
    println!();
    if agents.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for agent in &agents {
        let marker = if agent.enabled { "✓".green() } else { "○".dimmed() };
        let source = match &agent.source {
            AgentSource::Builtin => "builtin".dimmed().to_string(),
            AgentSource::Package { path } => path.display().to_string(),
        };
        println!(
            "  {marker} {:<16} {:<8} {}",
            agent.agent_id.cyan(),
            agent.config.version,
            source
        );
        if !agent.enabled {
            println!("    {}", "disabled".yellow());
        }
    }

    for failure in &runtime.discovery.failed {
        println!(
            "  {} {}: {}",
            "⚠".yellow(),
            failure.path.display(),
            failure.error
        );
    }
    Ok(())
}

pub async fn install(root: &Path, path: &Path, force: bool) -> Result<()> {
    let package = AgentPackage::load(path)?;
    let runtime = load_runtime(root).await?;

    let outcome = runtime.registry.install(&package, force)?;
    if outcome.unchanged {
        println!(
            "{} {} {} is already installed",
            "→".blue(),
            outcome.agent_id.cyan(),
            outcome.version
        );
        return Ok(());
    }

    let source = package.install_source().unwrap_or(path);
    let target = install_package_dir(root, &outcome.agent_id, source)?;

    let verb = if outcome.replaced { "Replaced" } else { "Installed" };
    println!(
        "{} {verb} {} {}",
        "✓".green(),
        outcome.agent_id.cyan(),
        outcome.version
    );
    println!("  Location: {}", target.display());
    Ok(())
}

pub async fn uninstall(root: &Path, agent_id: &str) -> Result<()> {
    let runtime = load_runtime(root).await?;
    runtime.registry.uninstall(agent_id)?;

    if !remove_package_dir(root, agent_id)? {
        println!(
            "{} {} is built in and returns on the next start",
            "⚠".yellow(),
            agent_id.cyan()
        );
        return Ok(());
    }

    let mut global = runtime.config.global.clone();
    if global.disabled_agents.iter().any(|id| id == agent_id) {
        global.disabled_agents.retain(|id| id != agent_id);
        save_config(root, &global)?;
    }

    println!("{} Uninstalled {}", "✓".green(), agent_id.cyan());
    Ok(())
}

/// Persist routing eligibility in `disabled_agents`.
pub async fn set_enabled(root: &Path, agent_id: &str, enabled: bool) -> Result<()> {
    let runtime = load_runtime(root).await?;
    if !runtime.registry.contains(agent_id) {
        bail!("Agent '{agent_id}' not found");
    }
    if !enabled && runtime.registry.is_pinned(agent_id) {
        bail!("Agent '{agent_id}' is the default agent and cannot be disabled");
    }

    let mut global = runtime.config.global.clone();
    let listed = global.disabled_agents.iter().any(|id| id == agent_id);
    match (enabled, listed) {
        (true, true) => global.disabled_agents.retain(|id| id != agent_id),
        (false, false) => global.disabled_agents.push(agent_id.to_string()),
        _ => {
            let state = if enabled { "enabled" } else { "disabled" };
            println!("{} {} is already {state}", "→".blue(), agent_id.cyan());
            return Ok(());
        }
    }
    save_config(root, &global)?;

    let verb = if enabled { "Enabled" } else { "Disabled" };
    println!("{} {verb} {}", "✓".green(), agent_id.cyan());
    Ok(())
}

pub async fn health(root: &Path, json: bool) -> Result<()> {
    let runtime = load_runtime(root).await?;
    let reports = runtime.registry.health_report().await;
    let unhealthy = reports.iter().filter(|r| !r.healthy).count();

    if json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            if report.healthy {
                println!("  {} {}", "✓".green(), report.agent_id.cyan());
            } else {
                let failing: Vec<_> = report
                    .checks
                    .iter()
                    .filter(|(_, ok)| !**ok)
                    .map(|(name, _)| name.as_str())
                    .collect();
                println!(
                    "  {} {} {}",
                    "✗".red(),
                    report.agent_id.cyan(),
                    format!("(failing: {})", failing.join(", ")).dimmed()
                );
            }
        }
    }

    if unhealthy > 0 {
        bail!("{unhealthy} agent(s) unhealthy");
    }
    Ok(())
}
