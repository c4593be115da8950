use console::{StyledObject, style};

use crate::tasks::Rating;

/// Styled terminal output for command handlers
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Suppress everything but errors
    pub fn quiet(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("✓").green(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn section(&self, message: &str) {
        if !self.quiet {
            eprintln!("\n{}", style(message).bold());
            eprintln!("{}", "─".repeat(40));
        }
    }

    /// `label: rating` with the rating colored by severity
    pub fn rating(&self, label: &str, rating: Rating) {
        if !self.quiet {
            eprintln!("  {:<14} {}", label, styled_rating(rating));
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

pub fn styled_rating(rating: Rating) -> StyledObject<&'static str> {
    let text = style(rating.as_str());
    match rating {
        Rating::Great => text.green().bold(),
        Rating::Good => text.green(),
        Rating::Bad => text.red().bold(),
        Rating::Unknown => text.dim(),
    }
}
