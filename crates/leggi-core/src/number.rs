//! Law-number recognition.
//!
//! Ordered alternatives, first match wins:
//!
//! 1. caller-supplied patterns (first capture group is the number)
//! 2. `n. 12`, `n.12`, `n° 12`, `num. 12`, `numero 12`
//! 3. `n 12`
//! 4. `legge 12`, `l. 12`, `legge regionale 12`, unless the digits open a date
//!    (`legge regionale 15 gennaio 2023`)

use std::sync::LazyLock;

use regex::Regex;

use crate::CoreError;
use crate::date::month_number;

static NUMBER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bn\.|\bn°|\bnº|\bnum\.|\bnumero)\s*(\d+)").expect("number marker pattern")
});

static BARE_N: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bn\s+(\d+)\b").expect("bare n pattern"));

static LAW_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\blegge|\bl\.)\s+(?:regionale\s+)?(\d+)\b(?:\s+(\p{L}+))?")
        .expect("law prefix pattern")
});

/// A compiled, ordered set of law-number patterns.
#[derive(Debug, Clone, Default)]
pub struct NumberPatterns {
    extra: Vec<Regex>,
}

impl NumberPatterns {
    /// Compile caller-supplied patterns, tried before the built-ins.
    ///
    /// Each pattern must contain at least one capture group.
    pub fn with_extra<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CoreError> {
        let mut extra = Vec::with_capacity(patterns.len());
        for p in patterns {
            let p = p.as_ref();
            let re = Regex::new(p).map_err(|e| CoreError::Pattern {
                pattern: p.to_string(),
                reason: e.to_string(),
            })?;
            if re.captures_len() < 2 {
                return Err(CoreError::Pattern {
                    pattern: p.to_string(),
                    reason: "pattern has no capture group".into(),
                });
            }
            extra.push(re);
        }
        Ok(Self { extra })
    }

    /// Find the law number in `text`.
    pub fn find(&self, text: &str) -> Option<String> {
        for re in &self.extra {
            if let Some(n) = re.captures(text).and_then(|c| c.get(1)) {
                let n = n.as_str().trim();
                if !n.is_empty() {
                    return Some(normalize_number(n));
                }
            }
        }
        find_builtin(text)
    }
}

/// Find the law number in `text` with the built-in patterns only.
pub fn extract_law_number(text: &str) -> Option<String> {
    find_builtin(text)
}

fn find_builtin(text: &str) -> Option<String> {
    if let Some(c) = NUMBER_MARKER.captures(text) {
        return Some(normalize_number(&c[1]));
    }
    if let Some(c) = BARE_N.captures(text) {
        return Some(normalize_number(&c[1]));
    }
    LAW_PREFIX.captures_iter(text).find_map(|c| {
        let opens_date = c.get(2).is_some_and(|w| month_number(w.as_str()).is_some());
        (!opens_date).then(|| normalize_number(&c[1]))
    })
}

/// Strip leading zeros from purely numeric values (`007` → `7`).
fn normalize_number(n: &str) -> String {
    if n.chars().all(|c| c.is_ascii_digit()) {
        let trimmed = n.trim_start_matches('0');
        if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_variants() {
        assert_eq!(extract_law_number("Legge regionale 15 gennaio 2023, n. 12").as_deref(), Some("12"));
        assert_eq!(extract_law_number("L.R. n.7 del 2020").as_deref(), Some("7"));
        assert_eq!(extract_law_number("legge n° 45").as_deref(), Some("45"));
        assert_eq!(extract_law_number("num. 5").as_deref(), Some("5"));
        assert_eq!(extract_law_number("Legge Numero 8").as_deref(), Some("8"));
    }

    #[test]
    fn bare_n() {
        assert_eq!(extract_law_number("Legge regionale n 33 del 2021").as_deref(), Some("33"));
    }

    #[test]
    fn law_prefix() {
        assert_eq!(extract_law_number("legge 123 sulle acque").as_deref(), Some("123"));
        assert_eq!(extract_law_number("l. 4").as_deref(), Some("4"));
    }

    #[test]
    fn law_prefix_ignores_dates() {
        assert_eq!(extract_law_number("Legge regionale 15 gennaio 2023"), None);
    }

    #[test]
    fn marker_not_inside_words() {
        // "regione 12" must not read as "n 12".
        assert_eq!(extract_law_number("bilancio della regione 12"), None);
    }

    #[test]
    fn leading_zeros_stripped() {
        assert_eq!(extract_law_number("n. 007").as_deref(), Some("7"));
        assert_eq!(extract_law_number("n. 0").as_deref(), Some("0"));
    }

    #[test]
    fn extra_patterns_first() {
        let p = NumberPatterns::with_extra(&[r"lr\d{4}-(\d+)"]).unwrap();
        assert_eq!(p.find("https://x/lr2019-14.html n. 3").as_deref(), Some("14"));
        assert_eq!(p.find("nothing here n. 3").as_deref(), Some("3"));
    }

    #[test]
    fn extra_pattern_needs_group() {
        let err = NumberPatterns::with_extra(&[r"lr\d+"]).unwrap_err();
        assert!(matches!(err, CoreError::Pattern { .. }));
    }

    #[test]
    fn extra_pattern_must_compile() {
        assert!(NumberPatterns::with_extra(&["(unclosed"]).is_err());
    }

    #[test]
    fn nothing_found() {
        assert_eq!(extract_law_number("Disposizioni urgenti"), None);
        assert_eq!(NumberPatterns::default().find(""), None);
    }
}
