//! Installable agent packages.

use crate::config::loader::{load_manifest, manifest_path};
use crate::config::ConfigResult;
use dk_protocol::{AgentConfig, AgentManifest};
use std::path::{Path, PathBuf};

/// A manifest plus the directory it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentPackage {
    pub manifest: AgentManifest,
    /// Package directory, or `None` for packages built in memory.
    pub path: Option<PathBuf>,
    /// Set when the package was loaded from a bare manifest file rather
    /// than a package directory.
    pub manifest_file: Option<PathBuf>,
}

impl AgentPackage {
    /// Read a package directory or a manifest file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let manifest = load_manifest(path)?;
        if path.is_dir() {
            return Ok(Self {
                manifest,
                path: Some(path.to_path_buf()),
                manifest_file: None,
            });
        }
        let file = manifest_path(path)?;
        Ok(Self {
            manifest,
            path: Some(file.parent().map(Path::to_path_buf).unwrap_or_default()),
            manifest_file: Some(file),
        })
    }

    /// Wrap a manifest that did not come from disk.
    pub fn from_manifest(manifest: AgentManifest) -> Self {
        Self {
            manifest,
            path: None,
            manifest_file: None,
        }
    }

    /// What installing this package copies: the manifest file alone when
    /// one was given, otherwise the whole package directory.
    pub fn install_source(&self) -> Option<&Path> {
        self.manifest_file.as_deref().or(self.path.as_deref())
    }

    pub fn agent_id(&self) -> &str {
        &self.manifest.agent_id
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn entry_point(&self) -> &str {
        &self.manifest.main_module
    }

    pub fn to_agent_config(&self) -> AgentConfig {
        self.manifest.to_agent_config()
    }
}
