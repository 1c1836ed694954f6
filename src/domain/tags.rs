//! Hashtag extraction.
//!
//! Tags are derived from post content, never set directly. A tag is a
//! whitespace-prefixed `#word`; the captured word is lowercased. Aliases are
//! additive: a tag with a configured alias yields both itself and its
//! canonical counterpart.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Capture group that holds the tag word.
pub const TAG_CAPTURE: &str = "tag";

pub const DEFAULT_HASHTAG_PATTERN: &str = r"\s#(?P<tag>[0-9A-Za-z_]+)";

pub const DEFAULT_ALIASES: &[(&str, &str)] = &[("hackerschool", "recursecenter")];

static DEFAULT_HASHTAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_HASHTAG_PATTERN).expect("default hashtag pattern compiles"));

#[derive(Debug, Error)]
pub enum TagRulesError {
    #[error("invalid hashtag pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("hashtag pattern must define a `(?P<tag>...)` capture group")]
    MissingCapture,
    #[error("tag alias `{alias}` has an empty canonical tag")]
    EmptyAlias { alias: String },
}

/// Compiled hashtag pattern plus alias table.
#[derive(Debug, Clone)]
pub struct TagRules {
    pattern: Regex,
    aliases: BTreeMap<String, String>,
}

impl TagRules {
    pub fn new<I, K, V>(pattern: &str, aliases: I) -> Result<Self, TagRulesError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let pattern = Regex::new(pattern)?;
        if !pattern.capture_names().flatten().any(|name| name == TAG_CAPTURE) {
            return Err(TagRulesError::MissingCapture);
        }

        let mut table = BTreeMap::new();
        for (alias, canonical) in aliases {
            let alias = alias.as_ref().trim().to_lowercase();
            let canonical = canonical.as_ref().trim().to_lowercase();
            if canonical.is_empty() {
                return Err(TagRulesError::EmptyAlias { alias });
            }
            table.insert(alias, canonical);
        }

        Ok(Self {
            pattern,
            aliases: table,
        })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn canonical(&self, tag: &str) -> Option<&str> {
        self.aliases.get(tag).map(String::as_str)
    }
}

impl Default for TagRules {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_HASHTAG_REGEX.clone(),
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagExtractor {
    rules: Arc<TagRules>,
}

impl TagExtractor {
    pub fn new(rules: TagRules) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    pub fn rules(&self) -> &TagRules {
        &self.rules
    }

    /// Sorted, deduplicated tags for `content`.
    pub fn extract(&self, content: &str) -> Vec<String> {
        let mut tags = BTreeSet::new();

        for captures in self.rules.pattern.captures_iter(content) {
            let Some(word) = captures.name(TAG_CAPTURE) else {
                continue;
            };
            let tag = word.as_str().to_lowercase();
            if let Some(canonical) = self.rules.canonical(&tag) {
                tags.insert(canonical.to_string());
            }
            tags.insert(tag);
        }

        tags.into_iter().collect()
    }
}
