//! Ratings
//!
//! Coarse per-section rating, read back from the model's answer, and the
//! worst-of rule that combines section ratings into the overall rating.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Rating of one report section
///
/// Known ratings order as `Bad < Good < Great`; `Unknown` is outside that
/// scale and never dominates an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Bad,
    Good,
    Great,
    #[default]
    Unknown,
}

/// Last `<something> rating: <value>` line, tolerating markdown emphasis
static RATING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)\b(?:rating|score)\b[*_\s]*:[*_\s]*`?(great|good|bad|n/a|unknown)\b")
        .expect("valid rating pattern")
});

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Bad => "bad",
            Rating::Good => "good",
            Rating::Great => "great",
            Rating::Unknown => "unknown",
        }
    }

    pub fn is_known(self) -> bool {
        self != Rating::Unknown
    }

    /// Position on the known scale, `None` for `Unknown`
    fn rank(self) -> Option<u8> {
        match self {
            Rating::Bad => Some(0),
            Rating::Good => Some(1),
            Rating::Great => Some(2),
            Rating::Unknown => None,
        }
    }

    /// Read the rating from the last rating line of a section;
    /// `Unknown` when there is none or it says `n/a`
    pub fn extract(text: &str) -> Rating {
        RATING_LINE
            .captures_iter(text)
            .last()
            .and_then(|caps| caps.get(1))
            .map(|m| match m.as_str().to_lowercase().as_str() {
                "great" => Rating::Great,
                "good" => Rating::Good,
                "bad" => Rating::Bad,
                _ => Rating::Unknown,
            })
            .unwrap_or(Rating::Unknown)
    }

    /// Worst known rating wins; all-unknown stays unknown
    pub fn aggregate(ratings: impl IntoIterator<Item = Rating>) -> Rating {
        ratings
            .into_iter()
            .filter(|r| r.is_known())
            .min_by_key(|r| r.rank())
            .unwrap_or(Rating::Unknown)
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_plain_and_markdown() {
        assert_eq!(Rating::extract("Overall rating: great"), Rating::Great);
        assert_eq!(Rating::extract("**Overall rating:** GOOD"), Rating::Good);
        assert_eq!(Rating::extract("- **Rating**: *bad*"), Rating::Bad);
        assert_eq!(Rating::extract("Uniqueness score: GOOD"), Rating::Good);
    }

    #[test]
    fn test_extract_takes_last_line() {
        let text = "Tests rating: bad\nStyle rating: great\n\nOverall rating: good\n";
        assert_eq!(Rating::extract(text), Rating::Good);
    }

    #[test]
    fn test_extract_missing_or_na() {
        assert_eq!(Rating::extract("No verdict here."), Rating::Unknown);
        assert_eq!(Rating::extract("Overall rating: N/A"), Rating::Unknown);
        assert_eq!(Rating::extract("Overall rating: goodish"), Rating::Unknown);
    }

    #[test]
    fn test_aggregate_worst_of() {
        let ratings = [Rating::Bad, Rating::Good, Rating::Good, Rating::Great];
        assert_eq!(Rating::aggregate(ratings), Rating::Bad);
        assert_eq!(
            Rating::aggregate([Rating::Great, Rating::Unknown, Rating::Good]),
            Rating::Good
        );
        assert_eq!(
            Rating::aggregate([Rating::Unknown, Rating::Unknown]),
            Rating::Unknown
        );
        assert_eq!(Rating::aggregate([]), Rating::Unknown);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Rating::Great).unwrap(), "\"great\"");
    }

    fn rating() -> impl Strategy<Value = Rating> {
        prop_oneof![
            Just(Rating::Bad),
            Just(Rating::Good),
            Just(Rating::Great),
            Just(Rating::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn test_aggregate_never_beats_a_known_member(ratings in prop::collection::vec(rating(), 0..8)) {
            let overall = Rating::aggregate(ratings.clone());
            if ratings.iter().any(|r| r.is_known()) {
                prop_assert!(overall.is_known());
                for r in ratings.iter().filter(|r| r.is_known()) {
                    prop_assert!(overall.rank() <= r.rank());
                }
                prop_assert!(ratings.contains(&overall));
            } else {
                prop_assert_eq!(overall, Rating::Unknown);
            }
        }

        #[test]
        fn test_aggregate_ignores_order(mut ratings in prop::collection::vec(rating(), 0..8)) {
            let forward = Rating::aggregate(ratings.clone());
            ratings.reverse();
            prop_assert_eq!(forward, Rating::aggregate(ratings));
        }
    }
}
