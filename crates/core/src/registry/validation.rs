//! Manifest validation.
//!
//! Every check runs before the registry is touched, so a rejected package
//! leaves the registry exactly as it was.

use crate::agents::AgentFactory;
use crate::model::ModelClient;
use crate::registry::error::PackageError;
use dk_protocol::AgentManifest;
use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static AGENT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid agent id regex"));

#[allow(clippy::expect_used)]
static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$").expect("valid semver regex")
});

/// Whether `agent_id` is a valid lowercase slug.
pub fn is_valid_agent_id(agent_id: &str) -> bool {
    AGENT_ID.is_match(agent_id)
}

/// Field-level checks that need nothing but the manifest.
pub fn validate_fields(manifest: &AgentManifest) -> Result<(), PackageError> {
    let required = [
        ("agent_id", &manifest.agent_id),
        ("name", &manifest.name),
        ("description", &manifest.description),
        ("version", &manifest.version),
        ("author", &manifest.author),
        ("main_module", &manifest.main_module),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(PackageError::MissingField(field));
        }
    }

    if !is_valid_agent_id(&manifest.agent_id) {
        return Err(PackageError::InvalidId(manifest.agent_id.clone()));
    }
    if !SEMVER.is_match(&manifest.version) {
        return Err(PackageError::InvalidVersion(manifest.version.clone()));
    }

    let config = &manifest.config;
    if let Some(temperature) = config.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(PackageError::OutOfRange {
                field: "temperature",
                reason: format!("{temperature} is not within [0, 2]"),
            });
        }
    }
    if config.max_tokens == Some(0) {
        return Err(PackageError::OutOfRange {
            field: "max_tokens",
            reason: "must be greater than 0".to_string(),
        });
    }
    if config.timeout_secs == Some(0) {
        return Err(PackageError::OutOfRange {
            field: "timeout_secs",
            reason: "must be greater than 0".to_string(),
        });
    }
    if let Some(base_score) = config.base_score {
        if !(0.0..=1.0).contains(&base_score) {
            return Err(PackageError::OutOfRange {
                field: "base_score",
                reason: format!("{base_score} is not within [0, 1]"),
            });
        }
    }
    Ok(())
}

/// Full validation: fields, entry point and declared dependencies.
///
/// # Arguments
///
/// * `is_installed` - Whether an agent id is currently registered
pub fn validate_manifest(
    manifest: &AgentManifest,
    factory: &AgentFactory,
    client: &dyn ModelClient,
    is_installed: impl Fn(&str) -> bool,
) -> Result<(), PackageError> {
    validate_fields(manifest)?;

    if !factory.contains(&manifest.main_module) {
        return Err(PackageError::UnknownEntryPoint {
            entry_point: manifest.main_module.clone(),
            known: factory.entry_points().join(", "),
        });
    }

    let models = manifest.config.model.iter().chain(&manifest.dependencies.models);
    for model in models {
        if !client.supports_model(model) {
            return Err(PackageError::UnsupportedModel(model.clone()));
        }
    }
    for api in &manifest.dependencies.apis {
        if !client.supports_api(api) {
            return Err(PackageError::UnsupportedApi(api.clone()));
        }
    }
    for agent in &manifest.dependencies.agents {
        if agent != &manifest.agent_id && !is_installed(agent) {
            return Err(PackageError::MissingAgent(agent.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EchoModelClient, ScriptedModelClient};
    use dk_protocol::{ManifestConfig, ManifestDependencies};

    fn manifest(agent_id: &str) -> AgentManifest {
        AgentManifest {
            agent_id: agent_id.to_string(),
            name: "Demo".to_string(),
            description: "Demo agent".to_string(),
            version: "1.0.0".to_string(),
            author: "tests".to_string(),
            main_module: "prompt".to_string(),
            main_class: None,
            tags: Vec::new(),
            dependencies: ManifestDependencies::default(),
            config: ManifestConfig::default(),
            system_prompt: None,
        }
    }

    fn check(manifest: &AgentManifest) -> Result<(), PackageError> {
        validate_manifest(manifest, &AgentFactory::with_builtins(), &EchoModelClient::new(), |_| false)
    }

    #[test]
    fn test_valid_manifest_passes() {
        assert_eq!(check(&manifest("demo")), Ok(()));
    }

    #[test]
    fn test_agent_id_slug() {
        assert!(is_valid_agent_id("code-review_2"));
        assert!(!is_valid_agent_id("Coding"));
        assert!(!is_valid_agent_id("-lead"));
        assert!(!is_valid_agent_id("has space"));
        assert_eq!(check(&manifest("Bad Id")), Err(PackageError::InvalidId("Bad Id".to_string())));
    }

    #[test]
    fn test_missing_field() {
        let mut m = manifest("demo");
        m.author = "  ".to_string();
        assert_eq!(check(&m), Err(PackageError::MissingField("author")));
    }

    #[test]
    fn test_version_format() {
        let mut m = manifest("demo");
        for ok in ["0.1.0", "2.10.3-beta.1", "1.0.0+build.5"] {
            m.version = ok.to_string();
            assert_eq!(check(&m), Ok(()), "{ok} should be accepted");
        }
        m.version = "1.0".to_string();
        assert!(matches!(check(&m), Err(PackageError::InvalidVersion(_))));
    }

    #[test]
    fn test_config_ranges() {
        let mut m = manifest("demo");
        m.config.temperature = Some(2.5);
        assert!(matches!(check(&m), Err(PackageError::OutOfRange { field: "temperature", .. })));

        let mut m = manifest("demo");
        m.config.timeout_secs = Some(0);
        assert!(matches!(check(&m), Err(PackageError::OutOfRange { field: "timeout_secs", .. })));

        let mut m = manifest("demo");
        m.config.max_tokens = Some(0);
        assert!(matches!(check(&m), Err(PackageError::OutOfRange { field: "max_tokens", .. })));
    }

    #[test]
    fn test_unknown_entry_point() {
        let mut m = manifest("demo");
        m.main_module = "agents.demo".to_string();
        match check(&m) {
            Err(PackageError::UnknownEntryPoint { entry_point, known }) => {
                assert_eq!(entry_point, "agents.demo");
                assert_eq!(known, "coding, prompt, research");
            }
            other => panic!("Expected UnknownEntryPoint, got {other:?}"),
        }
    }

    #[test]
    fn test_dependencies_must_be_satisfiable() {
        let client = ScriptedModelClient::always("ok").with_models(vec!["llama3".to_string()]);
        let factory = AgentFactory::with_builtins();

        let mut m = manifest("demo");
        m.dependencies.models = vec!["gpt-4o".to_string()];
        assert_eq!(
            validate_manifest(&m, &factory, &client, |_| true),
            Err(PackageError::UnsupportedModel("gpt-4o".to_string()))
        );

        let mut m = manifest("demo");
        m.dependencies.apis = vec!["openai".to_string()];
        assert_eq!(check(&m), Err(PackageError::UnsupportedApi("openai".to_string())));

        let mut m = manifest("demo");
        m.dependencies.agents = vec!["general".to_string()];
        assert_eq!(check(&m), Err(PackageError::MissingAgent("general".to_string())));
        assert_eq!(
            validate_manifest(&m, &factory, &EchoModelClient::new(), |id| id == "general"),
            Ok(())
        );
    }
}
