//! Inspection Report
//!
//! Section results and the final markdown document. Rendering depends only
//! on the report's fields, so identical runs produce identical bytes.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::ai::TokenUsage;
use crate::tasks::{Rating, TaskCategory};
use crate::types::ActorId;

/// Output of one analysis task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub category: TaskCategory,
    /// Model answer for the section
    pub text: String,
    pub rating: Rating,
    /// Metadata that could not be retrieved for this section
    pub gaps: Vec<String>,
    pub usage: TokenUsage,
}

impl TaskResult {
    pub fn name(&self) -> &'static str {
        self.category.as_str()
    }
}

/// Final report of one inspection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionReport {
    pub actor: ActorId,
    pub model: String,
    /// Sections in task order
    pub results: Vec<TaskResult>,
    pub overall: Rating,
    /// Lead inspector's closing assessment
    pub summary: String,
    pub usage: TokenUsage,
    pub markdown: String,
}

impl InspectionReport {
    /// Assemble the report; the overall rating is the worst known section rating
    pub fn assemble(
        actor: ActorId,
        model: impl Into<String>,
        results: Vec<TaskResult>,
        summary: impl Into<String>,
        summary_usage: TokenUsage,
    ) -> Self {
        let overall = Rating::aggregate(results.iter().map(|r| r.rating));
        let mut usage = summary_usage;
        for result in &results {
            usage += result.usage;
        }

        let mut report = Self {
            actor,
            model: model.into(),
            results,
            overall,
            summary: summary.into(),
            usage,
            markdown: String::new(),
        };
        report.markdown = report.render();
        report
    }

    pub fn gaps(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .flat_map(|r| r.gaps.iter().map(String::as_str))
    }

    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Actor inspection: {}\n", self.actor);
        let _ = writeln!(out, "**Overall rating:** {}  ", self.overall);
        let _ = writeln!(out, "**Model:** {}\n", self.model);

        out.push_str("| Category | Rating |\n|---|---|\n");
        for result in &self.results {
            let _ = writeln!(out, "| {} | {} |", result.category.title(), result.rating);
        }

        let _ = write!(out, "\n## Summary\n\n{}\n", self.summary.trim());

        for result in &self.results {
            let _ = write!(
                out,
                "\n## {}\n\n**Rating:** {}\n\n",
                result.category.title(),
                result.rating
            );
            for gap in &result.gaps {
                let _ = writeln!(out, "> **Gap:** {}", gap);
            }
            if !result.gaps.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "{}", result.text.trim());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(category: TaskCategory, rating: Rating, gaps: &[&str]) -> TaskResult {
        TaskResult {
            category,
            text: format!("{} findings", category.title()),
            rating,
            gaps: gaps.iter().map(|g| g.to_string()).collect(),
            usage: TokenUsage::from_openai(10, 5),
        }
    }

    fn report(ratings: [Rating; 4]) -> InspectionReport {
        let categories = [
            TaskCategory::CodeQuality,
            TaskCategory::Documentation,
            TaskCategory::Uniqueness,
            TaskCategory::Pricing,
        ];
        let results = categories
            .into_iter()
            .zip(ratings)
            .map(|(c, r)| result(c, r, &[]))
            .collect();
        InspectionReport::assemble(
            ActorId::parse("owner/pkg").unwrap(),
            "model-A",
            results,
            "Solid scraper.",
            TokenUsage::from_openai(1, 1),
        )
    }

    #[test]
    fn test_overall_is_worst_of() {
        let r = report([Rating::Bad, Rating::Good, Rating::Good, Rating::Great]);
        assert_eq!(r.overall, Rating::Bad);
        assert!(r.markdown.contains("**Overall rating:** bad"));
    }

    #[test]
    fn test_usage_totals_sections_and_summary() {
        let r = report([Rating::Good; 4]);
        assert_eq!(r.usage.total(), 4 * 15 + 2);
    }

    #[test]
    fn test_sections_in_order() {
        let r = report([Rating::Good; 4]);
        let positions: Vec<usize> = ["## Code quality", "## Actor quality", "## Uniqueness", "## Pricing"]
            .iter()
            .map(|h| r.markdown.find(h).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(r.markdown.find("## Summary").unwrap() < positions[0]);
    }

    #[test]
    fn test_gaps_are_rendered() {
        let results = vec![result(
            TaskCategory::Documentation,
            Rating::Unknown,
            &["README unavailable for owner/pkg: Actor or default build not found"],
        )];
        let r = InspectionReport::assemble(
            ActorId::parse("owner/pkg").unwrap(),
            "model-A",
            results,
            "n/a",
            TokenUsage::default(),
        );
        assert!(r.markdown.contains("> **Gap:** README unavailable for owner/pkg"));
        assert_eq!(r.gaps().count(), 1);
        assert_eq!(r.overall, Rating::Unknown);
    }

    #[test]
    fn test_render_is_deterministic() {
        let a = report([Rating::Great, Rating::Good, Rating::Unknown, Rating::Bad]);
        let b = report([Rating::Great, Rating::Good, Rating::Unknown, Rating::Bad]);
        assert_eq!(a.markdown, b.markdown);
    }
}
