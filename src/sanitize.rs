//! Assistant text sanitization
//!
//! Rewrites raw model output into the markup shown in the transcript. The
//! rewrite is an ordered list of named rules; each rule sees the output of the
//! ones before it, so the order is part of the observable behaviour.
//!
//! The pipeline is total and never fails. It is not idempotent: running it on
//! its own output wraps anchors again.

mod rules;

#[cfg(test)]
mod proptests;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default destination for canonicalized links and the end-of-chat message
pub const DEFAULT_CANONICAL_URL: &str = "https://dudesk.in/home";

/// How model-supplied links are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkPolicy {
    /// Keep the URLs the model produced
    PassThrough,
    /// Point every link at the canonical URL and display it instead
    #[default]
    Canonicalized,
}

impl FromStr for LinkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass-through" | "passthrough" => Ok(LinkPolicy::PassThrough),
            "canonicalized" | "canonical" => Ok(LinkPolicy::Canonicalized),
            other => Err(format!("unknown link policy: {other}")),
        }
    }
}

/// Settings the rules need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeConfig {
    pub link_policy: LinkPolicy,
    pub canonical_url: String,
}

impl SanitizeConfig {
    pub fn pass_through() -> Self {
        Self {
            link_policy: LinkPolicy::PassThrough,
            canonical_url: DEFAULT_CANONICAL_URL.to_string(),
        }
    }

    pub fn canonicalized(canonical_url: impl Into<String>) -> Self {
        Self {
            link_policy: LinkPolicy::Canonicalized,
            canonical_url: canonical_url.into(),
        }
    }
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self::canonicalized(DEFAULT_CANONICAL_URL)
    }
}

/// One named text rewrite
#[derive(Clone, Copy)]
pub struct RewriteRule {
    pub name: &'static str,
    apply: fn(&str, &SanitizeConfig) -> String,
}

impl RewriteRule {
    pub fn apply(&self, text: &str, config: &SanitizeConfig) -> String {
        (self.apply)(text, config)
    }
}

impl std::fmt::Debug for RewriteRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteRule").field("name", &self.name).finish()
    }
}

/// The rules, in application order
pub const PIPELINE: &[RewriteRule] = &[
    RewriteRule { name: "strip_data_file_names", apply: rules::strip_data_file_names },
    RewriteRule { name: "strip_bold", apply: rules::strip_bold },
    RewriteRule { name: "neutralize_source_phrases", apply: rules::neutralize_source_phrases },
    RewriteRule { name: "strip_asterisks", apply: rules::strip_asterisks },
    RewriteRule { name: "newlines_to_breaks", apply: rules::newlines_to_breaks },
    RewriteRule { name: "rewrite_markdown_links", apply: rules::rewrite_markdown_links },
    RewriteRule { name: "number_bullets", apply: rules::number_bullets },
    RewriteRule { name: "close_list_items", apply: rules::close_list_items },
    RewriteRule { name: "close_lists", apply: rules::close_lists },
    RewriteRule { name: "strip_csv_disclaimer", apply: rules::strip_csv_disclaimer },
    RewriteRule { name: "linkify_urls", apply: rules::linkify_urls },
    RewriteRule { name: "normalize_greeting", apply: rules::normalize_greeting },
];

/// Run the full pipeline over `raw`
pub fn sanitize(raw: &str, config: &SanitizeConfig) -> String {
    PIPELINE
        .iter()
        .fold(raw.to_string(), |text, rule| rule.apply(&text, config))
}
