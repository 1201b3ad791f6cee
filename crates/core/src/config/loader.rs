//! Configuration file loader for the `.dispatch-kit/` directory structure.
//!
//! This module reads:
//! - `config.toml`: Global dispatch settings
//! - `agent.json` / `agent.yaml` / `agent.md`: Agent package manifests

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::{AppConfig, CONFIG_FILE, DISPATCH_DIR};
use dk_protocol::{AgentManifest, DispatchConfig};
use gray_matter::engine::YAML;
use gray_matter::Matter;
use std::path::{Path, PathBuf};
use tracing::debug;

/// JSON manifest file name inside a package directory.
pub const JSON_MANIFEST: &str = "agent.json";

/// YAML manifest file name inside a package directory.
pub const YAML_MANIFEST: &str = "agent.yaml";

/// Markdown manifest file name inside a package directory.
pub const MARKDOWN_MANIFEST: &str = "agent.md";

/// Loads the global configuration from the `.dispatch-kit/` directory.
///
/// # Arguments
///
/// * `root` - Root directory containing the `.dispatch-kit/` folder
///
/// # Returns
///
/// An `AppConfig` rooted at `root`. If `.dispatch-kit/` or `config.toml` is
/// missing, the default configuration is returned rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - `config.toml` exists but cannot be read
/// - `config.toml` has invalid TOML syntax
/// - A value is out of range (threshold outside `[0, 1]`, `max_agents = 0`,
///   empty `default_agent`)
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let dk_dir = root.join(DISPATCH_DIR);

    // If .dispatch-kit doesn't exist, return default config
    if !dk_dir.exists() {
        debug!(root = %root.display(), "no .dispatch-kit directory; using defaults");
        return Ok(AppConfig::defaults(root));
    }

    let global = load_global_config(&dk_dir)?;

    Ok(AppConfig {
        root: root.to_path_buf(),
        global,
    })
}

/// Loads global configuration from `config.toml`.
fn load_global_config(dk_dir: &Path) -> ConfigResult<DispatchConfig> {
    let config_path = dk_dir.join(CONFIG_FILE);

    // If config.toml doesn't exist, return default
    if !config_path.exists() {
        return Ok(DispatchConfig::default());
    }

    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
        path: config_path.clone(),
        source,
    })?;

    let config: DispatchConfig = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path.clone(),
        source,
    })?;

    validate_global_config(&config).map_err(|reason| ConfigError::InvalidConfig {
        path: config_path,
        reason,
    })?;

    Ok(config)
}

fn validate_global_config(config: &DispatchConfig) -> Result<(), String> {
    if !(0.0..=1.0).contains(&config.threshold) {
        return Err(format!("threshold must be within [0, 1], got {}", config.threshold));
    }
    if config.max_agents == Some(0) {
        return Err("max_agents must be at least 1".to_string());
    }
    if config.default_agent.trim().is_empty() {
        return Err("default_agent cannot be empty".to_string());
    }
    Ok(())
}

/// Resolve the manifest file of a package.
///
/// `path` may be a package directory or a manifest file. Inside a directory
/// `agent.json` wins over `agent.yaml`, which wins over `agent.md`.
pub fn manifest_path(path: &Path) -> ConfigResult<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    [JSON_MANIFEST, YAML_MANIFEST, MARKDOWN_MANIFEST]
        .iter()
        .map(|name| path.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ConfigError::ManifestMissing {
            path: path.to_path_buf(),
        })
}

/// Loads an agent package manifest.
///
/// JSON and YAML manifests are deserialized directly. Markdown manifests
/// carry the manifest as YAML front matter and the body becomes the agent's
/// system prompt.
///
/// # Errors
///
/// Returns `ConfigError` if no manifest is found, the file cannot be read,
/// or it does not parse.
pub fn load_manifest(path: &Path) -> ConfigResult<AgentManifest> {
    let manifest_file = manifest_path(path)?;

    let content = std::fs::read_to_string(&manifest_file).map_err(|source| ConfigError::FileRead {
        path: manifest_file.clone(),
        source,
    })?;

    match manifest_file.extension().and_then(|s| s.to_str()) {
        Some("md") => {}
        Some("yaml") | Some("yml") => {
            return serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: manifest_file,
                source,
            });
        }
        _ => {
            return serde_json::from_str(&content).map_err(|source| ConfigError::JsonParse {
                path: manifest_file,
                source,
            });
        }
    }

    // Parse Markdown with YAML front matter
    let matter = Matter::<YAML>::new();
    let result = matter.parse(&content);

    let mut manifest: AgentManifest = result
        .data
        .ok_or_else(|| ConfigError::MarkdownParse {
            path: manifest_file.clone(),
            reason: "Missing YAML front matter".to_string(),
        })?
        .deserialize()
        .map_err(|e| ConfigError::MarkdownParse {
            path: manifest_file.clone(),
            reason: format!("Failed to deserialize front matter: {e}"),
        })?;

    let body = result.content.trim();
    if !body.is_empty() {
        manifest.system_prompt = Some(body.to_string());
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const RESEARCH_MD: &str = r#"---
agent_id: research
name: Research Agent
description: Finds and summarises sources
version: 1.0.0
author: Dispatch Kit Contributors
main_module: prompt
tags: [research]
config:
  triggers: [research, sources]
---

You are a careful researcher. Cite your sources."#;

    /// RED: Full `.dispatch-kit/` structure loads the global settings.
    #[tokio::test]
    async fn test_load_config_acceptance() {
        let dir = tempdir().expect("Failed to create temp dir");
        let root = dir.path();
        let dk_dir = root.join(DISPATCH_DIR);
        fs::create_dir_all(dk_dir.join("agents")).expect("Failed to create agents dir");

        fs::write(
            dk_dir.join("config.toml"),
            "threshold = 0.5\nmax_agents = 2\ndefault_agent = \"helper\"\n",
        )
        .expect("Failed to write config.toml");

        let config = load_config(root).await.expect("Failed to load config");

        assert_eq!(config.global.threshold, 0.5);
        assert_eq!(config.global.max_agents, Some(2));
        assert_eq!(config.global.default_agent, "helper");
        assert_eq!(config.agents_dir(), dk_dir.join("agents"));
    }

    /// RED: No `.dispatch-kit/` folder yields defaults, not an error.
    #[tokio::test]
    async fn test_load_config_empty_directory() {
        let dir = tempdir().expect("Failed to create temp dir");

        let config = load_config(dir.path())
            .await
            .expect("Should handle missing .dispatch-kit");

        assert_eq!(config.global, DispatchConfig::default());
        assert_eq!(config.root, dir.path());
    }

    /// REFACTOR: Invalid TOML syntax reports the offending file.
    #[tokio::test]
    async fn test_load_config_invalid_toml() {
        let dir = tempdir().expect("Failed to create temp dir");
        let dk_dir = dir.path().join(DISPATCH_DIR);
        fs::create_dir_all(&dk_dir).expect("Failed to create .dispatch-kit");
        fs::write(dk_dir.join("config.toml"), "threshold = [invalid toml").expect("Failed to write config.toml");

        let result = load_config(dir.path()).await;

        if let Err(ConfigError::TomlParse { path, .. }) = result {
            assert!(path.ends_with("config.toml"));
        } else {
            panic!("Expected TomlParse error");
        }
    }

    /// REFACTOR: Out-of-range values are rejected.
    #[tokio::test]
    async fn test_load_config_rejects_bad_threshold() {
        let dir = tempdir().expect("Failed to create temp dir");
        let dk_dir = dir.path().join(DISPATCH_DIR);
        fs::create_dir_all(&dk_dir).expect("Failed to create .dispatch-kit");
        fs::write(dk_dir.join("config.toml"), "threshold = 1.5").expect("Failed to write config.toml");

        let result = load_config(dir.path()).await;

        match result {
            Err(ConfigError::InvalidConfig { reason, .. }) => assert!(reason.contains("threshold")),
            other => panic!("Expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_load_markdown_manifest() {
        let dir = tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("agent.md"), RESEARCH_MD).expect("Failed to write manifest");

        let manifest = load_manifest(dir.path()).expect("Failed to load manifest");

        assert_eq!(manifest.agent_id, "research");
        assert_eq!(manifest.config.triggers, vec!["research", "sources"]);
        assert_eq!(
            manifest.system_prompt.as_deref(),
            Some("You are a careful researcher. Cite your sources.")
        );
    }

    #[test]
    fn test_json_manifest_is_preferred() {
        let dir = tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("agent.md"), RESEARCH_MD).expect("Failed to write md");
        fs::write(
            dir.path().join("agent.json"),
            r#"{"agent_id":"research-json","name":"R","description":"d","version":"1.0.0","author":"a","main_module":"prompt"}"#,
        )
        .expect("Failed to write json");

        let manifest = load_manifest(dir.path()).expect("Failed to load manifest");

        assert_eq!(manifest.agent_id, "research-json");
        assert_eq!(manifest.system_prompt, None);
    }

    #[test]
    fn test_load_yaml_manifest() {
        let dir = tempdir().expect("Failed to create temp dir");
        fs::write(
            dir.path().join("agent.yaml"),
            "agent_id: summarizer\nname: Summarizer\ndescription: Shortens text\nversion: 0.2.0\nauthor: a\nmain_module: prompt\nconfig:\n  temperature: 0.2\n",
        )
        .expect("Failed to write yaml");

        let manifest = load_manifest(dir.path()).expect("Failed to load manifest");

        assert_eq!(manifest.agent_id, "summarizer");
        assert_eq!(manifest.config.temperature, Some(0.2));
    }

    #[test]
    fn test_manifest_missing() {
        let dir = tempdir().expect("Failed to create temp dir");
        let result = load_manifest(dir.path());
        assert!(matches!(result, Err(ConfigError::ManifestMissing { .. })));
    }

    #[test]
    fn test_markdown_without_front_matter() {
        let dir = tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("agent.md"), "Just plain markdown content").expect("Failed to write md");

        match load_manifest(dir.path()) {
            Err(ConfigError::MarkdownParse { path, reason }) => {
                assert!(path.ends_with("agent.md"));
                assert!(reason.contains("Missing YAML front matter"));
            }
            other => panic!("Expected MarkdownParse error, got {other:?}"),
        }
    }

    #[test]
    fn test_json_missing_required_field() {
        let dir = tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("agent.json"), r#"{"agent_id":"x"}"#).expect("Failed to write json");

        assert!(matches!(load_manifest(dir.path()), Err(ConfigError::JsonParse { .. })));
    }
}
