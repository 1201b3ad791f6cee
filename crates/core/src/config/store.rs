//! Writes to the `.dispatch-kit/` directory.
//!
//! Installing a package copies its directory into `agents/<agent_id>/` so it
//! is rediscovered on the next start.

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::loader::{JSON_MANIFEST, MARKDOWN_MANIFEST, YAML_MANIFEST};
use crate::config::models::{AGENTS_DIR, CONFIG_FILE, DISPATCH_DIR};
use dk_protocol::DispatchConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Persist `config` to `.dispatch-kit/config.toml`, creating the directory
/// if needed.
pub fn save_config(root: &Path, config: &DispatchConfig) -> ConfigResult<PathBuf> {
    let dk_dir = root.join(DISPATCH_DIR);
    create_dir(&dk_dir)?;

    let path = dk_dir.join(CONFIG_FILE);
    let content = toml::to_string_pretty(config).map_err(|source| ConfigError::TomlSerialize {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, content).map_err(|source| ConfigError::FileWrite {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Directory a package with `agent_id` is installed into.
pub fn package_dir(root: &Path, agent_id: &str) -> PathBuf {
    root.join(DISPATCH_DIR).join(AGENTS_DIR).join(agent_id)
}

/// Copy a package into `.dispatch-kit/agents/<agent_id>/`.
///
/// `source` is either a package directory, copied recursively, or a single
/// manifest file, copied alone under its canonical name (`agent.json`,
/// `agent.yaml` or `agent.md`). An existing copy is replaced. When `source`
/// already is the installed location nothing is copied.
///
/// # Returns
///
/// The installed directory.
pub fn install_package_dir(root: &Path, agent_id: &str, source: &Path) -> ConfigResult<PathBuf> {
    let target = package_dir(root, agent_id);

    let source_dir = if source.is_file() { source.parent().unwrap_or(source) } else { source };
    let same = match (fs::canonicalize(source_dir), fs::canonicalize(&target)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same {
        return Ok(target);
    }

    if source.is_file() {
        let content = fs::read(source).map_err(|e| ConfigError::FileRead {
            path: source.to_path_buf(),
            source: e,
        })?;
        if target.exists() {
            remove_dir(&target)?;
        }
        create_dir(&target)?;
        let dest = target.join(manifest_file_name(source));
        fs::write(&dest, content).map_err(|e| ConfigError::FileWrite { path: dest, source: e })?;
        debug!(agent_id, target = %target.display(), "manifest copied");
        return Ok(target);
    }

    if target.exists() {
        remove_dir(&target)?;
    }
    create_dir(&target)?;

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|e| ConfigError::DirectoryWalk {
            path: source.to_path_buf(),
            source: e,
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let dest = target.join(relative);
        if entry.file_type().is_dir() {
            create_dir(&dest)?;
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &dest)?;
        }
    }

    debug!(agent_id, target = %target.display(), "package copied");
    Ok(target)
}

/// Remove `.dispatch-kit/agents/<agent_id>/` if present.
///
/// # Returns
///
/// `true` if a directory was removed.
pub fn remove_package_dir(root: &Path, agent_id: &str) -> ConfigResult<bool> {
    let target = package_dir(root, agent_id);
    if !target.exists() {
        return Ok(false);
    }
    remove_dir(&target)?;
    Ok(true)
}

/// Installed name of a manifest file, picked by extension.
fn manifest_file_name(source: &Path) -> &'static str {
    match source.extension().and_then(|s| s.to_str()) {
        Some("md") => MARKDOWN_MANIFEST,
        Some("yaml") | Some("yml") => YAML_MANIFEST,
        _ => JSON_MANIFEST,
    }
}

fn remove_dir(path: &Path) -> ConfigResult<()> {
    fs::remove_dir_all(path).map_err(|source| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn create_dir(path: &Path) -> ConfigResult<()> {
    fs::create_dir_all(path).map_err(|source| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn copy_file(from: &Path, to: &Path) -> ConfigResult<()> {
    fs::copy(from, to).map_err(|source| ConfigError::FileWrite {
        path: to.to_path_buf(),
        source,
    })?;
    Ok(())
}
