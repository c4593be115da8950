//! Fetched Artifacts
//!
//! The unit every fetch tool returns. A missing README or schema is an
//! `Unavailable` artifact, not an error: it flows into the prompt and the
//! report as an explicit gap.

use serde::{Deserialize, Serialize};

/// What a fetched artifact contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Readme,
    InputSchema,
    SourceCode,
    PricingInfo,
    PlatformPricing,
    RelatedActors,
}

impl ArtifactKind {
    /// Human-readable label used in prompts and gap notices
    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Readme => "README",
            ArtifactKind::InputSchema => "input schema",
            ArtifactKind::SourceCode => "source code",
            ArtifactKind::PricingInfo => "pricing information",
            ArtifactKind::PlatformPricing => "platform pricing",
            ArtifactKind::RelatedActors => "related Actors",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Artifact body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactContent {
    Available { text: String },
    Unavailable { reason: String },
}

/// One piece of external metadata, read-only for the rest of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedArtifact {
    pub kind: ArtifactKind,
    /// Identifier or URL the artifact was fetched from
    pub source: String,
    pub content: ArtifactContent,
}

impl FetchedArtifact {
    pub fn available(kind: ArtifactKind, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            content: ArtifactContent::Available { text: text.into() },
        }
    }

    pub fn unavailable(
        kind: ArtifactKind,
        source: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            content: ArtifactContent::Unavailable {
                reason: reason.into(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.content, ArtifactContent::Available { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            ArtifactContent::Available { text } => Some(text),
            ArtifactContent::Unavailable { .. } => None,
        }
    }

    /// One-line description of the gap, `None` when available
    pub fn gap(&self) -> Option<String> {
        match &self.content {
            ArtifactContent::Available { .. } => None,
            ArtifactContent::Unavailable { reason } => Some(format!(
                "{} unavailable for {}: {}",
                self.kind.label(),
                self.source,
                reason
            )),
        }
    }

    /// Text handed to the model as a tool result or prompt attachment
    pub fn render(&self) -> String {
        match &self.content {
            ArtifactContent::Available { text } => text.clone(),
            ArtifactContent::Unavailable { reason } => format!(
                "UNAVAILABLE: the {} of {} could not be retrieved ({}). \
                 State this gap explicitly in your answer.",
                self.kind.label(),
                self.source,
                reason
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_artifact() {
        let artifact = FetchedArtifact::available(ArtifactKind::Readme, "owner/pkg", "# Hello");
        assert!(artifact.is_available());
        assert_eq!(artifact.text(), Some("# Hello"));
        assert_eq!(artifact.gap(), None);
        assert_eq!(artifact.render(), "# Hello");
    }

    #[test]
    fn test_unavailable_artifact_renders_gap() {
        let artifact =
            FetchedArtifact::unavailable(ArtifactKind::Readme, "owner/pkg", "no README in build");
        assert!(!artifact.is_available());
        assert_eq!(
            artifact.gap().as_deref(),
            Some("README unavailable for owner/pkg: no README in build")
        );
        assert!(artifact.render().starts_with("UNAVAILABLE"));
    }

    #[test]
    fn test_content_serialization_is_tagged() {
        let artifact = FetchedArtifact::unavailable(ArtifactKind::InputSchema, "a/b", "none");
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["kind"], "input_schema");
        assert_eq!(json["content"]["status"], "unavailable");
    }
}
