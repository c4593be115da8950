//! Task Definitions
//!
//! The ordered analysis tasks of an inspection. Each task is bound to one
//! agent role, names the artifacts to pre-fetch and the one artifact it
//! cannot be rated without, and renders its prompt from the artifacts and
//! every earlier section.

mod rating;

pub use rating::Rating;

use serde::{Deserialize, Serialize};

use crate::agents::{AgentRole, PEDANTIC_MESSAGE};
use crate::ai::prompt::PromptBuilder;
use crate::report::TaskResult;
use crate::tools::{FetchedArtifact, ToolInput, ToolKind};
use crate::types::ActorId;

/// Closing instruction that makes section ratings machine-readable
const RATING_INSTRUCTION: &str = "End the answer with a single line \
    `Overall rating: <great|good|bad|n/a>` for this section.";

/// Report section category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    CodeQuality,
    Documentation,
    Uniqueness,
    Pricing,
}

impl TaskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::CodeQuality => "code_quality",
            TaskCategory::Documentation => "documentation",
            TaskCategory::Uniqueness => "uniqueness",
            TaskCategory::Pricing => "pricing",
        }
    }

    /// Section heading in the report
    pub fn title(self) -> &'static str {
        match self {
            TaskCategory::CodeQuality => "Code quality",
            TaskCategory::Documentation => "Actor quality",
            TaskCategory::Uniqueness => "Uniqueness",
            TaskCategory::Pricing => "Pricing",
        }
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static description of one analysis task
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub category: TaskCategory,
    pub role: AgentRole,
    /// Task description, `{actor}` is replaced by the Actor id
    pub objective: &'static str,
    pub criteria: &'static [&'static str],
    pub expected_output: &'static [&'static str],
    /// Artifacts fetched before the agent runs
    pub prefetch: &'static [ToolKind],
    /// Without this artifact the section is rated `unknown`
    pub primary: ToolKind,
}

/// Every task, in execution order
pub const TASKS: [TaskSpec; 4] = [
    TaskSpec {
        category: TaskCategory::CodeQuality,
        role: AgentRole::CodeQuality,
        objective: "Analyze the code quality of the Apify Actor \"{actor}\". If the code is not \
            available, explicitly state that the code cannot be evaluated and assign an \"N/A\" \
            grade.",
        criteria: &[
            "**Tests**: Are tests present? \"bad\" (no tests), \"good\" (some tests, missing \
             major functionality) or \"great\" (most key functionality tested).",
            "**Linter**: Is a linter enabled? \"bad\" (not enabled), \"good\" (partially \
             enabled) or \"great\" (fully enabled).",
            "**Code smells**: Are there code smells such as duplication? \"bad\" (many), \
             \"good\" (some) or \"great\" (none).",
            "**Security**: Are there visible vulnerabilities such as outdated dependencies? \
             \"bad\" (many), \"good\" (some) or \"great\" (none).",
            "**Performance**: Are there performance issues such as inefficient loops? \"bad\" \
             (many), \"good\" (some) or \"great\" (none).",
            "**Style**: Are there style issues such as inconsistent naming? \"bad\" (many), \
             \"good\" (some) or \"great\" (none).",
        ],
        expected_output: &[
            "A markdown section per criterion (Tests, Linter, Code smells, Security, \
             Performance, Style) with a rating (\"bad\", \"good\", \"great\" or \"N/A\") and a \
             1-2 sentence explanation.",
            "A brief list of suggestions for improvement if applicable.",
            "A brief overall summary (2-3 sentences).",
        ],
        prefetch: &[ToolKind::CodeContext],
        primary: ToolKind::CodeContext,
    },
    TaskSpec {
        category: TaskCategory::Documentation,
        role: AgentRole::ActorEvaluator,
        objective: "Assess the quality of the Apify Actor \"{actor}\" based on its \
            documentation and usability.",
        criteria: &[
            "**README clarity**: Is the README well defined? \"bad\" (poorly defined), \"good\" \
             (partially clear) or \"great\" (fully detailed).",
            "**Input properties**: Are input properties clear and logical? \"bad\" (unclear), \
             \"good\" (partially clear) or \"great\" (well defined).",
            "**Usability**: Is the Actor easy to use based on the README? \"bad\" (confusing), \
             \"good\" (somewhat clear) or \"great\" (very intuitive).",
            "**Examples**: Are usage examples provided? \"bad\" (none), \"good\" (some) or \
             \"great\" (comprehensive).",
            "**GitHub link**: Is the GitHub link in the README? \"bad\" (missing), \"good\" \
             (present but not prominent) or \"great\" (clearly visible).",
        ],
        expected_output: &[
            "A markdown section per criterion (README clarity, Input properties, Usability, \
             Examples, GitHub link) with a rating and a 1-2 sentence explanation.",
            "A brief list of suggestions for improvement if applicable.",
            "A brief overall summary (2-3 sentences).",
        ],
        prefetch: &[ToolKind::ActorReadme, ToolKind::ActorInputSchema],
        primary: ToolKind::ActorReadme,
    },
    TaskSpec {
        category: TaskCategory::Uniqueness,
        role: AgentRole::UniquenessExpert,
        objective: "Evaluate the uniqueness of the Apify Actor \"{actor}\" compared to similar \
            Actors. Search the store with a few different keyword sets.",
        criteria: &[
            "**Comparison**: Is the Actor unique compared to peers? \"bad\" (very similar), \
             \"good\" (somewhat unique) or \"great\" (highly distinct).",
            "**Functionality**: Does it offer unique features? \"bad\" (none), \"good\" (some) \
             or \"great\" (highly unique).",
            "**Selling points**: Are there standout selling points? \"bad\" (none), \"good\" \
             (some) or \"great\" (multiple).",
        ],
        expected_output: &[
            "A markdown section per criterion (Comparison, Functionality, Selling points) with \
             a rating and a 1-2 sentence explanation.",
            "A brief overall summary (2-3 sentences) highlighting unique aspects and \
             improvement ideas.",
        ],
        prefetch: &[ToolKind::ActorReadme],
        primary: ToolKind::ActorReadme,
    },
    TaskSpec {
        category: TaskCategory::Pricing,
        role: AgentRole::PricingExpert,
        objective: "Analyze the pricing of the Apify Actor \"{actor}\" for competitiveness and \
            sensibility.",
        criteria: &[
            "**Competitiveness**: Is pricing competitive with similar Actors? \"bad\" \
             (expensive), \"good\" (moderate) or \"great\" (highly competitive).",
            "**Sensibility**: Does the pricing align with functionality? \"bad\" (not \
             sensible), \"good\" (somewhat sensible) or \"great\" (very sensible).",
            "**Transparency**: Are there hidden costs? \"bad\" (many), \"good\" (some) or \
             \"great\" (none).",
        ],
        expected_output: &[
            "A markdown section per criterion (Competitiveness, Sensibility, Transparency) with \
             a rating and a 1-2 sentence explanation.",
            "A brief list of suggestions for improvement if applicable.",
            "A brief overall summary (2-3 sentences).",
        ],
        prefetch: &[ToolKind::ActorPricing],
        primary: ToolKind::ActorPricing,
    },
];

impl TaskSpec {
    pub fn name(&self) -> &'static str {
        self.category.as_str()
    }

    /// Pre-fetch inputs for `actor`
    pub fn prefetch_inputs(&self, actor: &ActorId, code_max_tokens: usize) -> Vec<ToolInput> {
        self.prefetch
            .iter()
            .filter_map(|kind| actor_input(*kind, actor, code_max_tokens))
            .collect()
    }

    /// Render the task prompt from the pre-fetched artifacts and earlier sections
    pub fn prompt(
        &self,
        actor: &ActorId,
        pedantic: bool,
        artifacts: &[FetchedArtifact],
        prior: &[TaskResult],
    ) -> String {
        let mut builder = PromptBuilder::new()
            .task(&self.objective.replace("{actor}", actor.as_str()))
            .emphasis_if(pedantic, PEDANTIC_MESSAGE)
            .criteria(self.criteria)
            .context_item("Actor", actor.as_str());

        for result in prior {
            builder = builder.section(
                &format!("Earlier finding: {}", result.category.title()),
                &result.text,
            );
        }
        for artifact in artifacts {
            builder = builder.section(
                &format!("{} ({})", artifact.kind.label(), artifact.source),
                &artifact.render(),
            );
        }

        let mut output = self.expected_output.to_vec();
        output.push(RATING_INSTRUCTION);
        builder.output(&output).build()
    }
}

/// Actor-scoped tool input for `kind`; tools that are not keyed by an
/// Actor are never pre-fetched
fn actor_input(kind: ToolKind, actor: &ActorId, code_max_tokens: usize) -> Option<ToolInput> {
    match kind {
        ToolKind::ActorReadme => Some(ToolInput::Readme(actor.clone())),
        ToolKind::ActorInputSchema => Some(ToolInput::InputSchema(actor.clone())),
        ToolKind::ActorPricing => Some(ToolInput::Pricing(actor.clone())),
        ToolKind::CodeContext => Some(ToolInput::CodeContext {
            actor: actor.clone(),
            max_tokens: code_max_tokens,
        }),
        ToolKind::SearchRelatedActors | ToolKind::PlatformPricing => None,
    }
}

/// Prompt for the lead inspector's closing summary
pub fn summary_prompt(actor: &ActorId, pedantic: bool, results: &[TaskResult]) -> String {
    let mut builder = PromptBuilder::new()
        .task(&format!(
            "Compile a final quality assessment for the Apify Actor \"{}\". Include the Actor \
             name and a brief summary of its purpose, then summarize the findings of every \
             section below.",
            actor
        ))
        .emphasis_if(pedantic, PEDANTIC_MESSAGE)
        .context_item("Actor", actor.as_str());

    for result in results {
        builder = builder.section(
            &format!("{} (rated {})", result.category.title(), result.rating),
            &result.text,
        );
    }

    builder
        .output(&[
            "A header with the Actor name and a 2-3 sentence summary of what the Actor does.",
            "One short paragraph per category (Code quality, Actor quality, Uniqueness, \
             Pricing) with its rating and a 1-2 sentence explanation.",
            "A Suggestions list with concrete improvements.",
            "An Overall paragraph with a final rating and a 2-3 sentence justification.",
        ])
        .build()
}
