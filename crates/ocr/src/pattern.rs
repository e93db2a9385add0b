use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Invalid extraction pattern '{label}': {message}")]
    Pattern { label: &'static str, message: String },
}

impl ExtractError {
    fn pattern(label: &'static str, err: &regex::Error) -> Self {
        ExtractError::Pattern { label, message: err.to_string() }
    }
}

/// A matching rule paired with a human-readable label for diagnostics.
///
/// Tables of these are tried in declaration order and the first usable
/// match wins, so the order of a table is part of its meaning.
pub struct ExtractionPattern {
    pub label: &'static str,
    source: &'static str,
    compiled: OnceLock<Result<Regex, regex::Error>>,
}

impl ExtractionPattern {
    pub const fn new(source: &'static str, label: &'static str) -> Self {
        Self { label, source, compiled: OnceLock::new() }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Compiled on first use; a bad pattern is reported, not panicked on.
    pub fn regex(&self) -> Result<&Regex, ExtractError> {
        self.compiled
            .get_or_init(|| Regex::new(self.source))
            .as_ref()
            .map_err(|e| ExtractError::pattern(self.label, e))
    }
}

impl std::fmt::Debug for ExtractionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionPattern")
            .field("label", &self.label)
            .field("source", &self.source)
            .finish()
    }
}

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $label:expr, $pat:expr) => {
        fn $name() -> Result<&'static regex::Regex, $crate::pattern::ExtractError> {
            static P: $crate::pattern::ExtractionPattern =
                $crate::pattern::ExtractionPattern::new($pat, $label);
            P.regex()
        }
    };
}

pub(crate) use re;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_lazily_and_matches() {
        static P: ExtractionPattern = ExtractionPattern::new(r"\d{2}:\d{2}", "time of day");
        assert!(P.regex().unwrap().is_match("at 10:45 AM"));
        assert_eq!(P.source(), r"\d{2}:\d{2}");
    }

    #[test]
    fn invalid_pattern_is_an_error_every_time() {
        static BAD: ExtractionPattern = ExtractionPattern::new(r"([unclosed", "broken");
        let first = BAD.regex().unwrap_err();
        let second = BAD.regex().unwrap_err();
        assert_eq!(first, second);
        assert!(first.to_string().contains("broken"));
    }
}
