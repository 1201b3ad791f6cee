//! The agent registry.
//!
//! The registry is the only shared mutable structure in the runtime. Each
//! entry is immutable once published and lives behind an `Arc`; mutations
//! build a new entry and swap it into the table under a write lock. Readers
//! clone the `Arc`s they need and drop the lock immediately, so a dispatch
//! holding an old entry keeps running the old instance after a hot-swap.

use crate::agents::{Agent, AgentFactory};
use crate::model::ModelClient;
use crate::registry::error::{PackageError, RegistryError, RegistryResult};
use crate::registry::package::AgentPackage;
use crate::registry::validation::{is_valid_agent_id, validate_manifest};
use dk_protocol::{AgentConfig, AgentListing, AgentSource, HealthReport, RegistryStatistics};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One registered agent.
#[derive(Clone)]
pub struct RegistryEntry {
    pub config: AgentConfig,
    pub agent: Arc<dyn Agent>,
    /// Eligible for routing.
    pub enabled: bool,
    pub source: AgentSource,
    /// Factory entry point for package agents, `None` for compiled-in agents.
    pub entry_point: Option<String>,
    /// Agents this one declared as dependencies.
    pub depends_on: Vec<String>,
}

impl RegistryEntry {
    pub fn agent_id(&self) -> &str {
        &self.config.agent_id
    }

    fn listing(&self) -> AgentListing {
        AgentListing {
            agent_id: self.config.agent_id.clone(),
            config: self.config.clone(),
            enabled: self.enabled,
            source: self.source.clone(),
        }
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("agent_id", &self.config.agent_id)
            .field("version", &self.config.version)
            .field("enabled", &self.enabled)
            .field("source", &self.source)
            .field("entry_point", &self.entry_point)
            .finish()
    }
}

/// Result of `install` / `register`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub agent_id: String,
    pub version: String,
    /// An existing entry was hot-swapped.
    pub replaced: bool,
    /// The same implementation was already installed; nothing changed.
    pub unchanged: bool,
}

/// A package that discovery could not install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of scanning package directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub installed: Vec<InstallOutcome>,
    pub failed: Vec<DiscoveryFailure>,
}

/// Process-wide table of agents.
///
/// # Example
///
/// ```rust,no_run
/// use dk_core::model::EchoModelClient;
/// use dk_core::registry::{AgentPackage, AgentRegistry};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = AgentRegistry::with_builtins(Arc::new(EchoModelClient::new()));
/// let package = AgentPackage::load(Path::new(".dispatch-kit/agents/research"))?;
/// let outcome = registry.install(&package, false)?;
/// println!("installed {} {}", outcome.agent_id, outcome.version);
/// # Ok(())
/// # }
/// ```
pub struct AgentRegistry {
    entries: RwLock<HashMap<String, Arc<RegistryEntry>>>,
    /// Serializes install/uninstall/toggle with respect to each other.
    mutation: Mutex<()>,
    /// Ids that may not be disabled or uninstalled.
    pinned: RwLock<HashSet<String>>,
    factory: AgentFactory,
    client: Arc<dyn ModelClient>,
}

impl AgentRegistry {
    /// Create an empty registry.
    ///
    /// # Arguments
    ///
    /// * `factory` - Entry points packages may name in `main_module`
    /// * `client` - Model backend handed to every agent built from a package
    pub fn new(factory: AgentFactory, client: Arc<dyn ModelClient>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            mutation: Mutex::new(()),
            pinned: RwLock::new(HashSet::new()),
            factory,
            client,
        }
    }

    /// Empty registry with the built-in entry points.
    pub fn with_builtins(client: Arc<dyn ModelClient>) -> Self {
        Self::new(AgentFactory::with_builtins(), client)
    }

    pub fn client(&self) -> Arc<dyn ModelClient> {
        Arc::clone(&self.client)
    }

    pub fn factory(&self) -> &AgentFactory {
        &self.factory
    }

    /// Keep `agent_id` enabled and installed for the life of the registry.
    ///
    /// A pinned agent can still be hot-swapped with `install(.., force)`.
    /// Pinning an agent that is currently disabled re-enables it.
    ///
    /// # Errors
    ///
    /// * `NotFound` - No agent is registered under `agent_id`
    pub fn pin(&self, agent_id: &str) -> RegistryResult<()> {
        let _guard = self.mutation.lock();
        let current = self
            .entries
            .read()
            .get(agent_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;
        if !current.enabled {
            let mut entry = RegistryEntry::clone(&current);
            entry.enabled = true;
            self.entries
                .write()
                .insert(agent_id.to_string(), Arc::new(entry));
        }
        self.pinned.write().insert(agent_id.to_string());
        info!(agent_id, "agent pinned");
        Ok(())
    }

    pub fn is_pinned(&self, agent_id: &str) -> bool {
        self.pinned.read().contains(agent_id)
    }

    /// Install a package.
    ///
    /// Re-installing the same entry point and version is a no-op. Installing
    /// a different implementation under an existing id fails with
    /// `Conflict` unless `force` is set, in which case the entry is swapped
    /// atomically and keeps its enabled flag.
    ///
    /// # Errors
    ///
    /// * `Validation` - The manifest was rejected; the registry is unchanged
    /// * `Conflict` - A different implementation exists and `force` is false
    pub fn install(&self, package: &AgentPackage, force: bool) -> RegistryResult<InstallOutcome> {
        let manifest = &package.manifest;
        let _guard = self.mutation.lock();

        validate_manifest(manifest, &self.factory, self.client.as_ref(), |id| {
            self.entries.read().contains_key(id)
        })
        .map_err(|e| RegistryError::validation(&manifest.agent_id, e))?;

        let existing = self.entries.read().get(&manifest.agent_id).cloned();
        if let Some(existing) = &existing {
            let same = existing.entry_point.as_deref() == Some(manifest.main_module.as_str())
                && existing.config.version == manifest.version;
            if same && !force {
                debug!(agent_id = %manifest.agent_id, version = %manifest.version, "already installed");
                return Ok(InstallOutcome {
                    agent_id: manifest.agent_id.clone(),
                    version: manifest.version.clone(),
                    replaced: false,
                    unchanged: true,
                });
            }
            if !force {
                return Err(RegistryError::Conflict {
                    agent_id: manifest.agent_id.clone(),
                    existing_version: existing.config.version.clone(),
                    new_version: manifest.version.clone(),
                });
            }
        }

        let config = package.to_agent_config();
        let agent = self
            .factory
            .create(&manifest.main_module, config.clone(), Arc::clone(&self.client))
            .ok_or_else(|| {
                RegistryError::validation(
                    &manifest.agent_id,
                    PackageError::UnknownEntryPoint {
                        entry_point: manifest.main_module.clone(),
                        known: self.factory.entry_points().join(", "),
                    },
                )
            })?;

        let source = match &package.path {
            Some(path) => AgentSource::Package { path: path.clone() },
            None => AgentSource::Builtin,
        };
        let entry = RegistryEntry {
            config,
            agent,
            enabled: existing.as_ref().map_or(true, |e| e.enabled),
            source,
            entry_point: Some(manifest.main_module.clone()),
            depends_on: manifest.dependencies.agents.clone(),
        };

        Ok(self.publish(entry, existing.is_some()))
    }

    /// Register a compiled-in agent under the same conflict rules as
    /// [`AgentRegistry::install`]. Registering the same instance twice is a
    /// no-op.
    pub fn register(&self, agent: Arc<dyn Agent>, source: AgentSource, force: bool) -> RegistryResult<InstallOutcome> {
        let config = agent.config().clone();
        if !is_valid_agent_id(&config.agent_id) {
            return Err(RegistryError::validation(
                &config.agent_id,
                PackageError::InvalidId(config.agent_id.clone()),
            ));
        }

        let _guard = self.mutation.lock();
        let existing = self.entries.read().get(&config.agent_id).cloned();
        if let Some(existing) = &existing {
            if Arc::ptr_eq(&existing.agent, &agent) {
                return Ok(InstallOutcome {
                    agent_id: config.agent_id,
                    version: config.version,
                    replaced: false,
                    unchanged: true,
                });
            }
            if !force {
                return Err(RegistryError::Conflict {
                    agent_id: config.agent_id.clone(),
                    existing_version: existing.config.version.clone(),
                    new_version: config.version,
                });
            }
        }

        let entry = RegistryEntry {
            config,
            agent,
            enabled: existing.as_ref().map_or(true, |e| e.enabled),
            source,
            entry_point: None,
            depends_on: Vec::new(),
        };
        Ok(self.publish(entry, existing.is_some()))
    }

    fn publish(&self, entry: RegistryEntry, replaced: bool) -> InstallOutcome {
        let outcome = InstallOutcome {
            agent_id: entry.config.agent_id.clone(),
            version: entry.config.version.clone(),
            replaced,
            unchanged: false,
        };
        self.entries
            .write()
            .insert(outcome.agent_id.clone(), Arc::new(entry));
        info!(agent_id = %outcome.agent_id, version = %outcome.version, replaced, "agent installed");
        outcome
    }

    /// Remove an agent. Dispatches already holding it finish normally.
    ///
    /// # Returns
    ///
    /// The removed agent's configuration.
    ///
    /// # Errors
    ///
    /// * `Pinned` - The agent was pinned with [`AgentRegistry::pin`]
    /// * `NotFound` - No agent is registered under `agent_id`
    pub fn uninstall(&self, agent_id: &str) -> RegistryResult<AgentConfig> {
        let _guard = self.mutation.lock();
        if self.is_pinned(agent_id) {
            return Err(RegistryError::Pinned(agent_id.to_string()));
        }
        let removed = self
            .entries
            .write()
            .remove(agent_id)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;
        info!(agent_id, "agent uninstalled");
        Ok(removed.config.clone())
    }

    /// Flip routing eligibility without unloading the instance.
    ///
    /// # Returns
    ///
    /// The previous enabled flag.
    ///
    /// # Errors
    ///
    /// * `Pinned` - Disabling an agent pinned with [`AgentRegistry::pin`]
    /// * `NotFound` - No agent is registered under `agent_id`
    pub fn toggle(&self, agent_id: &str, enabled: bool) -> RegistryResult<bool> {
        let _guard = self.mutation.lock();
        if !enabled && self.is_pinned(agent_id) {
            return Err(RegistryError::Pinned(agent_id.to_string()));
        }
        let current = self
            .entries
            .read()
            .get(agent_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;

        let previous = current.enabled;
        if previous != enabled {
            let mut entry = RegistryEntry::clone(&current);
            entry.enabled = enabled;
            self.entries
                .write()
                .insert(agent_id.to_string(), Arc::new(entry));
            info!(agent_id, enabled, "agent toggled");
        }
        Ok(previous)
    }

    /// Every agent, ordered by `agent_id`.
    pub fn list(&self) -> Vec<AgentListing> {
        self.sorted_entries().iter().map(|e| e.listing()).collect()
    }

    pub fn get(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.entries.read().get(agent_id).map(|e| Arc::clone(&e.agent))
    }

    pub fn entry(&self, agent_id: &str) -> Option<Arc<RegistryEntry>> {
        self.entries.read().get(agent_id).cloned()
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.entries.read().contains_key(agent_id)
    }

    /// Enabled entries ordered by `agent_id`, as one consistent snapshot.
    pub fn enabled_snapshot(&self) -> Vec<Arc<RegistryEntry>> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .values()
            .filter(|e| e.enabled)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.config.agent_id.cmp(&b.config.agent_id));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn sorted_entries(&self) -> Vec<Arc<RegistryEntry>> {
        let mut entries: Vec<_> = self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| a.config.agent_id.cmp(&b.config.agent_id));
        entries
    }

    /// Install every package found one level below each directory.
    ///
    /// Failures are reported per package and never abort the scan. Packages
    /// that depend on agents found later in the same scan are retried until
    /// no further progress is made.
    pub fn discover(&self, dirs: &[PathBuf], force: bool) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let mut pending: Vec<(PathBuf, AgentPackage)> = Vec::new();

        for dir in dirs {
            for path in package_dirs(dir) {
                match AgentPackage::load(&path) {
                    Ok(package) => pending.push((path, package)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable package");
                        report.failed.push(DiscoveryFailure {
                            path,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        loop {
            let before = pending.len();
            let mut waiting = Vec::new();
            for (path, package) in pending {
                match self.install(&package, force) {
                    Ok(outcome) => report.installed.push(outcome),
                    Err(RegistryError::Validation {
                        source: PackageError::MissingAgent(_),
                        ..
                    }) => waiting.push((path, package)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "package rejected");
                        report.failed.push(DiscoveryFailure {
                            path,
                            error: e.to_string(),
                        });
                    }
                }
            }
            pending = waiting;
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        for (path, package) in pending {
            let error = match self.install(&package, force) {
                Err(e) => e.to_string(),
                Ok(_) => continue,
            };
            warn!(path = %path.display(), error = %error, "package rejected");
            report.failed.push(DiscoveryFailure { path, error });
        }

        info!(
            installed = report.installed.len(),
            failed = report.failed.len(),
            "agent discovery finished"
        );
        report
    }

    /// Health of every agent, ordered by `agent_id`.
    ///
    /// Each report adds an `agent:<id>` check per declared agent dependency
    /// that is installed and enabled.
    pub async fn health_report(&self) -> Vec<HealthReport> {
        let entries = self.sorted_entries();
        let mut reports = Vec::with_capacity(entries.len());
        for entry in entries {
            let report = entry.agent.health().await;
            let mut checks = report.checks;
            for dependency in &entry.depends_on {
                let ok = self.entry(dependency).is_some_and(|e| e.enabled);
                checks.insert(format!("agent:{dependency}"), ok);
            }
            reports.push(HealthReport::from_checks(entry.agent_id(), checks));
        }
        reports
    }

    pub fn statistics(&self) -> RegistryStatistics {
        let entries = self.sorted_entries();
        let mut tags: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &entries {
            for tag in &entry.config.tags {
                *tags.entry(tag.clone()).or_default() += 1;
            }
        }
        let enabled = entries.iter().filter(|e| e.enabled).count();
        let builtin = entries
            .iter()
            .filter(|e| e.source == AgentSource::Builtin)
            .count();
        RegistryStatistics {
            total_agents: entries.len(),
            enabled_agents: enabled,
            disabled_agents: entries.len() - enabled,
            builtin_agents: builtin,
            package_agents: entries.len() - builtin,
            tags,
        }
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.len())
            .field("client", &self.client.name())
            .field("factory", &self.factory)
            .finish()
    }
}

/// Sub-directories of `dir`, sorted by name. A missing `dir` yields nothing.
fn package_dirs(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut dirs: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
        .collect();
    dirs.sort();
    dirs
}
