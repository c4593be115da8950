//! Prompt Builder System
//!
//! Standardized prompt construction for the inspection agents.
//! Provides consistent structure across the system prompt of every agent
//! and every task prompt.
//!
//! Sections render in insertion order, so identical inputs always produce
//! identical prompts.

use std::fmt::Write;

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Agent persona
    Persona {
        role: String,
        goal: String,
        backstory: String,
    },
    /// What the agent must do
    Task(String),
    /// Bulleted evaluation criteria
    Criteria(Vec<String>),
    /// Ordered key-value pairs
    Context(Vec<(String, String)>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Strictness or other emphasized instruction
    Emphasis(String),
    /// Required shape of the answer
    Output(Vec<String>),
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a persona section
    pub fn persona(mut self, role: &str, goal: &str, backstory: &str) -> Self {
        self.sections.push(PromptSection::Persona {
            role: role.to_string(),
            goal: goal.to_string(),
            backstory: backstory.to_string(),
        });
        self
    }

    pub fn task(mut self, description: &str) -> Self {
        self.sections.push(PromptSection::Task(description.to_string()));
        self
    }

    /// Add criteria section
    pub fn criteria(mut self, criteria: &[&str]) -> Self {
        self.sections.push(PromptSection::Criteria(
            criteria.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    /// Add a context item, merged into the first context section
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let existing = self.sections.iter_mut().find_map(|section| match section {
            PromptSection::Context(items) => Some(items),
            _ => None,
        });
        match existing {
            Some(items) => items.push((key.to_string(), value.to_string())),
            None => self.sections.push(PromptSection::Context(vec![(
                key.to_string(),
                value.to_string(),
            )])),
        }
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Add text section
    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add an emphasized instruction, skipped when `enabled` is false
    pub fn emphasis_if(mut self, enabled: bool, content: &str) -> Self {
        if enabled {
            self.sections
                .push(PromptSection::Emphasis(content.to_string()));
        }
        self
    }

    /// Add expected output section
    pub fn output(mut self, requirements: &[&str]) -> Self {
        self.sections.push(PromptSection::Output(
            requirements.iter().map(|r| r.to_string()).collect(),
        ));
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Persona {
                    role,
                    goal,
                    backstory,
                } => {
                    let _ = write!(
                        prompt,
                        "<ROLE>\nYou are the {}.\n\nGoal: {}\n\nBackstory: {}\n</ROLE>\n\n",
                        role, goal, backstory
                    );
                }
                PromptSection::Task(description) => {
                    let _ = write!(prompt, "<TASK>\n{}\n</TASK>\n\n", description);
                }
                PromptSection::Criteria(criteria) => {
                    prompt.push_str("<CRITERIA>\n");
                    for criterion in criteria {
                        let _ = writeln!(prompt, "- {}", criterion);
                    }
                    prompt.push_str("</CRITERIA>\n\n");
                }
                PromptSection::Context(items) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in items {
                        let _ = writeln!(prompt, "**{}**: {}", key, value);
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        let _ = write!(prompt, "# {}\n\n", h);
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Emphasis(content) => {
                    let _ = write!(prompt, "IMPORTANT: {}\n\n", content);
                }
                PromptSection::Output(requirements) => {
                    prompt.push_str("<EXPECTED_OUTPUT>\n");
                    for requirement in requirements {
                        let _ = writeln!(prompt, "- {}", requirement);
                    }
                    prompt.push_str("</EXPECTED_OUTPUT>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_and_task() {
        let prompt = PromptBuilder::new()
            .persona("Apify Pricing expert", "Compare pricing", "I know pricing")
            .task("Analyze the pricing of \"owner/pkg\"")
            .build();

        assert!(prompt.starts_with("<ROLE>\nYou are the Apify Pricing expert."));
        assert!(prompt.contains("Goal: Compare pricing"));
        assert!(prompt.contains("<TASK>\nAnalyze the pricing"));
    }

    #[test]
    fn test_context_items_keep_order() {
        let prompt = PromptBuilder::new()
            .context_item("Actor", "owner/pkg")
            .context_item("Model", "gpt-4o-mini")
            .context_item("Attempt", "1")
            .build();

        let actor = prompt.find("**Actor**").unwrap();
        let model = prompt.find("**Model**").unwrap();
        let attempt = prompt.find("**Attempt**").unwrap();
        assert!(actor < model && model < attempt);
        assert_eq!(prompt.matches("# Context").count(), 1);
    }

    #[test]
    fn test_emphasis_if() {
        let on = PromptBuilder::new().emphasis_if(true, "Be strict").build();
        let off = PromptBuilder::new().emphasis_if(false, "Be strict").build();
        assert_eq!(on, "IMPORTANT: Be strict");
        assert!(off.is_empty());
    }

    #[test]
    fn test_criteria_and_output() {
        let prompt = PromptBuilder::new()
            .criteria(&["**Tests**: are tests present?"])
            .output(&["End with a rating line"])
            .build();

        assert!(prompt.contains("<CRITERIA>\n- **Tests**: are tests present?\n</CRITERIA>"));
        assert!(prompt.contains("<EXPECTED_OUTPUT>\n- End with a rating line"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let build = || {
            PromptBuilder::new()
                .section("README", "# Scraper")
                .context_item("Actor", "owner/pkg")
                .build()
        };
        assert_eq!(build(), build());
    }
}
