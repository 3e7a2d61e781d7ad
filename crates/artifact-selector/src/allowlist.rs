//! Pattern allowlists.
//!
//! Patterns are regular expressions matched against the whole candidate
//! string, so `kythe` matches the aspect `kythe` but not `kythe_extra`.

use regex::RegexSet;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
enum Matcher {
    Any,
    Set(RegexSet),
}

/// An immutable set of name patterns.
///
/// Non-membership is silent exclusion, never an error.
#[derive(Debug, Clone)]
pub struct Allowlist {
    patterns: Vec<String>,
    matcher: Matcher,
}

impl Allowlist {
    /// Compile an allowlist from patterns. An empty list matches nothing.
    pub fn build<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut anchored = Vec::with_capacity(patterns.len());
        for pattern in &patterns {
            let full = format!("^(?:{pattern})$");
            // Validate individually so the error names the offending pattern.
            regex::Regex::new(&full).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
            anchored.push(full);
        }
        let set = RegexSet::new(&anchored).map_err(|source| ConfigError::InvalidPattern {
            pattern: patterns.join("|"),
            source,
        })?;
        Ok(Self {
            patterns,
            matcher: Matcher::Set(set),
        })
    }

    /// An allowlist that matches nothing.
    pub fn nothing() -> Self {
        Self {
            patterns: Vec::new(),
            matcher: Matcher::Set(RegexSet::empty()),
        }
    }

    /// An allowlist that matches every string, including the empty one.
    pub fn any() -> Self {
        Self {
            patterns: vec![".*".to_string()],
            matcher: Matcher::Any,
        }
    }

    /// Whether `candidate` matches any pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Set(set) => set.is_match(candidate),
        }
    }

    /// The source patterns, unanchored.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for Allowlist {
    fn default() -> Self {
        Self::nothing()
    }
}
