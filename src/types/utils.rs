//! Shared utility functions for type serialization and common operations.
//!
//! ## JSON Extraction Helpers
//!
//! Provides ergonomic helpers for extracting values from `serde_json::Value`:
//! - `json_string`, `json_string_or` - Extract strings
//! - `json_bool` - Extract booleans
//!
//! Model-produced tool arguments and registry payloads are both loosely typed,
//! so these helpers are used on both sides.

use crate::tasks::{Rating, TaskCategory};
use serde::Serialize;
use std::fmt::Display;

// =============================================================================
// JSON Value Extraction Helpers
// =============================================================================

/// Extract string from JSON value by key.
#[inline]
pub fn json_string(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(String::from)
}

/// Extract string with default value.
#[inline]
pub fn json_string_or(value: &serde_json::Value, key: &str, default: &str) -> String {
    json_string(value, key).unwrap_or_else(|| default.to_string())
}

/// Extract boolean with default.
#[inline]
pub fn json_bool(value: &serde_json::Value, key: &str, default: bool) -> bool {
    value.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

// =============================================================================
// Type Parsing
// =============================================================================

/// Trait for parsing strings into enum types with a default fallback.
/// Used for deserializing database values where invalid strings should fall back gracefully.
/// Logs a warning when an invalid value is encountered.
pub trait ParseWithDefault: Sized {
    /// The name of this type for logging purposes.
    fn type_name() -> &'static str;

    /// The default value to use when parsing fails.
    fn default_value() -> Self;

    /// Try to parse the string, returning None if invalid.
    fn try_parse(s: &str) -> Option<Self>;

    /// Parse a string into this type, returning a default value if parsing fails.
    fn parse_or_default(s: &str) -> Self {
        match Self::try_parse(s) {
            Some(v) => v,
            None => {
                tracing::warn!("Invalid {} value '{}', using default", Self::type_name(), s);
                Self::default_value()
            }
        }
    }
}

impl ParseWithDefault for Rating {
    fn type_name() -> &'static str {
        "Rating"
    }

    fn default_value() -> Self {
        Rating::Unknown
    }

    fn try_parse(s: &str) -> Option<Self> {
        match s {
            "great" => Some(Rating::Great),
            "good" => Some(Rating::Good),
            "bad" => Some(Rating::Bad),
            "unknown" => Some(Rating::Unknown),
            _ => None,
        }
    }
}

impl ParseWithDefault for TaskCategory {
    fn type_name() -> &'static str {
        "TaskCategory"
    }

    fn default_value() -> Self {
        TaskCategory::CodeQuality
    }

    fn try_parse(s: &str) -> Option<Self> {
        match s {
            "code_quality" => Some(TaskCategory::CodeQuality),
            "documentation" => Some(TaskCategory::Documentation),
            "uniqueness" => Some(TaskCategory::Uniqueness),
            "pricing" => Some(TaskCategory::Pricing),
            _ => None,
        }
    }
}

/// Serialize an enum to its serde string representation (without quotes).
/// Uses serde_json internally to ensure consistent serialization with
/// the `#[serde(rename_all = ...)]` attributes on enums.
pub fn enum_to_str<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

/// Filter an iterator of Results, logging errors at warn level before discarding.
pub fn log_filter_warn<T, E: Display>(result: Result<T, E>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{}: {}", context, e);
            None
        }
    }
}

// =============================================================================
// Token Estimation
// =============================================================================

/// Token estimation configuration for different content types
#[derive(Debug, Clone, Copy)]
pub struct TokenEstimator {
    /// Characters per token for ASCII text (default: 4.0)
    pub ascii_chars_per_token: f32,
    /// Characters per token for non-ASCII (CJK, etc.) (default: 1.5)
    pub non_ascii_chars_per_token: f32,
    /// Extra tokens per line for code structure (default: 0.5)
    pub code_overhead_per_line: f32,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self {
            ascii_chars_per_token: 4.0,
            non_ascii_chars_per_token: 1.5,
            code_overhead_per_line: 0.5,
        }
    }
}

impl TokenEstimator {
    /// Create estimator optimized for code
    pub fn for_code() -> Self {
        Self {
            ascii_chars_per_token: 3.5,
            non_ascii_chars_per_token: 1.5,
            code_overhead_per_line: 0.8,
        }
    }

    /// Estimate token count for content
    pub fn estimate(&self, content: &str) -> usize {
        if content.is_empty() {
            return 0;
        }

        let (ascii_chars, non_ascii_chars) =
            content.chars().fold((0usize, 0usize), |(a, n), c| {
                if c.is_ascii() { (a + 1, n) } else { (a, n + 1) }
            });

        let line_count = content.lines().count();
        let code_overhead = (line_count as f32 * self.code_overhead_per_line) as usize;

        let ascii_tokens = (ascii_chars as f32 / self.ascii_chars_per_token) as usize;
        let non_ascii_tokens = (non_ascii_chars as f32 / self.non_ascii_chars_per_token) as usize;

        ascii_tokens + non_ascii_tokens + code_overhead
    }
}

/// Estimate tokens specifically for code content
#[inline]
pub fn estimate_code_tokens(content: &str) -> usize {
    TokenEstimator::for_code().estimate(content)
}

/// Truncate content to fit within token limit
///
/// Preserves line boundaries when possible.
pub fn truncate_to_token_limit(content: &str, max_tokens: usize) -> String {
    let estimated = estimate_code_tokens(content);
    if estimated <= max_tokens {
        return content.to_string();
    }

    let ratio = max_tokens as f64 / estimated as f64;
    let mut max_chars = (content.len() as f64 * ratio * 0.95) as usize;
    while max_chars > 0 && !content.is_char_boundary(max_chars) {
        max_chars -= 1;
    }

    let truncated = &content[..max_chars];
    let kept = match truncated.rfind('\n') {
        Some(pos) => &content[..pos],
        None => truncated,
    };

    format!("{}\n\n[Content truncated to about {} tokens]", kept, max_tokens)
}
