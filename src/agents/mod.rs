//! Agent Definitions
//!
//! Agents are configuration records: a persona, a model and the tools the
//! persona may call. Every role runs through the same [`AgentExecutor`].

mod executor;

pub use executor::{AgentExecutor, AgentOutcome};

use serde::{Deserialize, Serialize};

use crate::ai::ToolDefinition;
use crate::ai::prompt::PromptBuilder;
use crate::tools::ToolKind;

/// Instruction added to every prompt of a pedantic run
pub const PEDANTIC_MESSAGE: &str = "Be very strict and critical. Rate \"great\" only when a \
    criterion is fully and demonstrably met, and point out every shortcoming you find.";

/// Agent roles of an inspection crew
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    LeadInspector,
    CodeQuality,
    ActorEvaluator,
    UniquenessExpert,
    PricingExpert,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        AgentRole::LeadInspector,
        AgentRole::CodeQuality,
        AgentRole::ActorEvaluator,
        AgentRole::UniquenessExpert,
        AgentRole::PricingExpert,
    ];

    /// Persona name shown to the model
    pub fn role_name(self) -> &'static str {
        match self {
            AgentRole::LeadInspector => "Lead Actor Inspector",
            AgentRole::CodeQuality => "Code Quality Specialist",
            AgentRole::ActorEvaluator => "Apify Actor Evaluator",
            AgentRole::UniquenessExpert => "Apify Actor expert",
            AgentRole::PricingExpert => "Apify Pricing expert",
        }
    }

    /// Tools the role may call
    pub fn tools(self) -> &'static [ToolKind] {
        match self {
            AgentRole::LeadInspector => &[],
            AgentRole::CodeQuality => &[ToolKind::CodeContext],
            AgentRole::ActorEvaluator => &[ToolKind::ActorReadme, ToolKind::ActorInputSchema],
            AgentRole::UniquenessExpert => {
                &[ToolKind::ActorReadme, ToolKind::SearchRelatedActors]
            }
            AgentRole::PricingExpert => &[
                ToolKind::ActorPricing,
                ToolKind::SearchRelatedActors,
                ToolKind::PlatformPricing,
            ],
        }
    }

    fn goal(self) -> &'static str {
        match self {
            AgentRole::LeadInspector => {
                "Coordinate a comprehensive quality review of an Apify Actor by synthesizing \
                 detailed reports from specialized agents and delivering a final assessment \
                 with clear ratings and justifications."
            }
            AgentRole::CodeQuality => {
                "Deliver a precise evaluation of the code quality of an Apify Actor, focusing \
                 on tests, linting, code smells, security vulnerabilities, performance issues \
                 and code style consistency."
            }
            AgentRole::ActorEvaluator => {
                "Assess the quality of an Apify Actor's documentation and usability by \
                 analyzing its README clarity, input properties, ease of use, example \
                 provision and GitHub link visibility."
            }
            AgentRole::UniquenessExpert => {
                "Compare an Actor's functionality and uniqueness by reading its README and \
                 searching related Actors using keywords. Always explain functional \
                 differences briefly."
            }
            AgentRole::PricingExpert => {
                "Compare an Actor's pricing by retrieving its pricing information and \
                 searching for related Actors using keywords. Apify pricing models: free \
                 Actors paying only platform usage; rental with a flat monthly fee after a \
                 trial; pay per result; pay per event; pay per platform usage."
            }
        }
    }

    fn backstory(self) -> &'static str {
        match self {
            AgentRole::LeadInspector => {
                "I'm a veteran project manager with a deep understanding of Apify Actors, \
                 skilled at orchestrating teams of expert agents. My strength lies in \
                 distilling complex analyses into concise, actionable reports."
            }
            AgentRole::CodeQuality => {
                "I'm a seasoned software engineer with over a decade of experience auditing \
                 codebases. I excel at identifying strengths and weaknesses in code quality \
                 and offering actionable insights to improve reliability and maintainability."
            }
            AgentRole::ActorEvaluator => {
                "I'm a meticulous Apify expert with years of experience reviewing Actors for \
                 usability and documentation excellence. I make sure Actors are intuitive and \
                 well documented and meet Apify Store standards."
            }
            AgentRole::UniquenessExpert => {
                "I am an Apify expert familiar with the platform and its Actors. I run \
                 several searches with different keywords and gather at least a couple of \
                 related Actors before comparing."
            }
            AgentRole::PricingExpert => {
                "I am an Apify expert specialized in pricing analysis. I retrieve pricing \
                 details, find related Actors and evaluate overall pricing competitiveness."
            }
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.role_name())
    }
}

/// Static configuration of one agent
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub role: AgentRole,
    pub role_name: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
    pub tools: &'static [ToolKind],
    pub model: String,
}

impl AgentProfile {
    pub fn for_role(role: AgentRole, model: &str) -> Self {
        Self {
            role,
            role_name: role.role_name(),
            goal: role.goal(),
            backstory: role.backstory(),
            tools: role.tools(),
            model: model.to_string(),
        }
    }

    pub fn permits(&self, kind: ToolKind) -> bool {
        self.tools.contains(&kind)
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|kind| kind.definition()).collect()
    }

    pub fn system_prompt(&self) -> String {
        PromptBuilder::new()
            .persona(self.role_name, self.goal, self.backstory)
            .text("Always write \"Actor\" with a capital A. Answer in markdown.")
            .build()
    }
}
