//! Inspection Request
//!
//! The validated input of one run. Built from an input document
//! (`actorName`, `modelName`, `pedantic`, `debug`), with configuration
//! defaults for everything but the Actor.

use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::config::Config;
use crate::types::{ActorId, InspectorError, Result, json_bool, json_string, json_string_or};

/// Immutable input of one inspection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRequest {
    pub actor: ActorId,
    pub model: String,
    pub pedantic: bool,
    pub debug: bool,
}

impl InspectionRequest {
    /// Build from an input document, falling back to configuration defaults
    pub fn from_input(input: &Value, config: &Config) -> Result<Self> {
        let Some(actor_name) = json_string(input, "actorName").filter(|s| !s.trim().is_empty())
        else {
            return Err(InspectorError::Config(
                "Missing the \"actorName\" attribute in the input. Provide the Actor in the \
                 form owner/name."
                    .to_string(),
            ));
        };

        let request = Self {
            actor: ActorId::parse(&actor_name)?,
            model: json_string_or(input, "modelName", &config.llm.default_model),
            pedantic: json_bool(input, "pedantic", config.inspection.pedantic),
            debug: json_bool(input, "debug", false),
        };
        request.validate(config)?;
        Ok(request)
    }

    /// Read an input document from a JSON file, or YAML for `.yaml`/`.yml`
    pub fn load_input(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InspectorError::Config(format!("Failed to read input {}: {}", path.display(), e))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "yaml" | "yml"));
        if is_yaml {
            return Ok(serde_yaml::from_str(&content)?);
        }
        serde_json::from_str(&content).map_err(|e| {
            InspectorError::Config(format!("Invalid input JSON in {}: {}", path.display(), e))
        })
    }

    /// Reject models outside the configured supported set
    pub fn validate(&self, config: &Config) -> Result<()> {
        if !config.llm.is_supported(&self.model) {
            return Err(InspectorError::Config(format!(
                "Unsupported model '{}'. Supported: {}",
                self.model,
                config.llm.supported_models.join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureKind;
    use serde_json::json;

    #[test]
    fn test_defaults_from_config() {
        let config = Config::default();
        let request = InspectionRequest::from_input(&json!({"actorName": "owner/pkg"}), &config).unwrap();
        assert_eq!(request.actor.as_str(), "owner/pkg");
        assert_eq!(request.model, "gpt-4o-mini");
        assert!(request.pedantic);
        assert!(!request.debug);
    }

    #[test]
    fn test_explicit_fields() {
        let mut config = Config::default();
        config.llm.supported_models.push("model-A".to_string());
        let request = InspectionRequest::from_input(
            &json!({"actorName": "owner/pkg", "modelName": "model-A", "pedantic": false, "debug": true}),
            &config,
        )
        .unwrap();
        assert_eq!(request.model, "model-A");
        assert!(!request.pedantic);
        assert!(request.debug);
    }

    #[test]
    fn test_missing_actor() {
        let err = InspectionRequest::from_input(&json!({"modelName": "gpt-4o"}), &Config::default())
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Configuration);
        assert!(err.to_string().contains("actorName"));

        assert!(InspectionRequest::from_input(&json!({"actorName": "  "}), &Config::default()).is_err());
    }

    #[test]
    fn test_malformed_actor() {
        let err = InspectionRequest::from_input(&json!({"actorName": "just-a-name"}), &Config::default())
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Configuration);
    }

    #[test]
    fn test_unsupported_model() {
        let err = InspectionRequest::from_input(
            &json!({"actorName": "owner/pkg", "modelName": "model-Z"}),
            &Config::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("model-Z"));
    }

    #[test]
    fn test_load_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(&path, r#"{"actorName": "owner/pkg"}"#).unwrap();
        assert_eq!(InspectionRequest::load_input(&path).unwrap()["actorName"], "owner/pkg");

        std::fs::write(&path, "{not json").unwrap();
        assert!(InspectionRequest::load_input(&path).is_err());
    }

    #[test]
    fn test_load_yaml_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.yaml");
        std::fs::write(&path, "actorName: owner/pkg\npedantic: false\n").unwrap();

        let input = InspectionRequest::load_input(&path).unwrap();
        let request = InspectionRequest::from_input(&input, &Config::default()).unwrap();
        assert_eq!(request.actor.as_str(), "owner/pkg");
        assert!(!request.pedantic);

        std::fs::write(&path, "actorName: [unclosed").unwrap();
        let err = InspectionRequest::load_input(&path).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Configuration);
    }
}
