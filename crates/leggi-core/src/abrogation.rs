//! Repeal ("abrogazione") markers on detail pages.
//!
//! Only explicit, parenthesised annotations count. Running text such as
//! `è abrogata` or a section titled `Abrogazioni` describes *other* laws and
//! must not cause a skip.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static PARENTHESISED_ABROGATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(\s*abrogata\s*\)").expect("abrogata pattern"));

/// Annotations consolidated-text sites append to repealed laws.
pub const DEFAULT_INDICATORS: &[&str] = &[
    "(abrogato dalla l.r.",
    "(abrogata dall'art.",
    "(legge abrogata dall'art",
    "(abrogato dall'art.",
    "(regolamento abrogato dall'art.",
    "(abrogata, a decorrere dal",
    "(abrogata dal",
];

/// How a site marks repealed laws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbrogationRule {
    /// A bare `(Abrogata)` annotation, any case, optional inner spaces.
    Parenthesised,
    /// Any of these substrings, compared lowercase with typographic
    /// apostrophes folded to `'`. Empty means [`DEFAULT_INDICATORS`].
    Indicators {
        #[serde(default)]
        phrases: Vec<String>,
    },
}

impl AbrogationRule {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Parenthesised => PARENTHESISED_ABROGATA.is_match(text),
            Self::Indicators { phrases } => {
                let folded = fold_for_matching(text);
                if phrases.is_empty() {
                    DEFAULT_INDICATORS.iter().any(|p| folded.contains(p))
                } else {
                    phrases
                        .iter()
                        .any(|p| folded.contains(&fold_for_matching(p)))
                }
            }
        }
    }
}

/// True when any rule flags `text` as repealed.
pub fn is_abrogated(text: &str, rules: &[AbrogationRule]) -> bool {
    rules.iter().any(|r| r.matches(text))
}

fn fold_for_matching(text: &str) -> String {
    text.to_lowercase()
        .replace(['\u{2019}', '\u{2018}', '`'], "'")
}
