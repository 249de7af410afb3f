//! The individual rewrite rules of the sanitization pipeline

use super::{LinkPolicy, SanitizeConfig};
use regex::{Captures, Regex};
use std::sync::LazyLock;

const NEUTRAL_PHRASE: &str = "analyzed the relevant information";

const CSV_DISCLAIMER: &str = "Please note that this list is based on the provided CSV data.";

const ANCHOR_CLASS: &str = "text-blue-600 underline hover:text-blue-800";

static DATA_FILE_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cuet_data\.csv|links\.csv|list\.csv").expect("data file name pattern")
});

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern"));

// The back-ticks cover a file name already removed by the first rule.
static SOURCE_PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"analyzed the provided files|based on the (?:`{0,2} )?file you provided,")
        .expect("source phrase pattern")
});

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\((https?://\S+)\)").expect("markdown link pattern")
});

static BULLET_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\*\s").expect("bullet pattern"));

static DASH_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("dash pattern"));

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url pattern"));

/// Never reveal the private data files backing the model.
///
/// Repeats until nothing matches, so removing one name cannot splice
/// another one together.
pub(super) fn strip_data_file_names(text: &str, _config: &SanitizeConfig) -> String {
    let mut out = text.to_string();
    while DATA_FILE_NAMES.is_match(&out) {
        out = DATA_FILE_NAMES.replace_all(&out, "").into_owned();
    }
    out
}

pub(super) fn strip_bold(text: &str, _config: &SanitizeConfig) -> String {
    BOLD.replace_all(text, "${1}").into_owned()
}

pub(super) fn neutralize_source_phrases(text: &str, _config: &SanitizeConfig) -> String {
    SOURCE_PHRASES.replace_all(text, NEUTRAL_PHRASE).into_owned()
}

pub(super) fn strip_asterisks(text: &str, _config: &SanitizeConfig) -> String {
    text.replace('*', "")
}

pub(super) fn newlines_to_breaks(text: &str, _config: &SanitizeConfig) -> String {
    text.replace('\n', "<br />")
}

pub(super) fn rewrite_markdown_links(text: &str, config: &SanitizeConfig) -> String {
    MARKDOWN_LINK
        .replace_all(text, |caps: &Captures<'_>| {
            let target = match config.link_policy {
                LinkPolicy::PassThrough => &caps[2],
                LinkPolicy::Canonicalized => config.canonical_url.as_str(),
            };
            format!("[{}]({target})", &caps[1])
        })
        .into_owned()
}

/// Opens an ordered list at a bullet line.
///
/// The item number is the match offset plus one, counted in UTF-16 units the
/// way a browser counts string positions. It is not a running counter.
pub(super) fn number_bullets(text: &str, _config: &SanitizeConfig) -> String {
    BULLET_LINE
        .replace_all(text, |caps: &Captures<'_>| {
            let start = caps.get(0).map_or(0, |m| m.start());
            let position = text.get(..start).map_or(0, |head| head.encode_utf16().count()) + 1;
            format!(r#"<ol class="list-decimal pl-5"><li>{position}."#)
        })
        .into_owned()
}

/// Closes a list item at every raw newline, whether or not a list is open
pub(super) fn close_list_items(text: &str, _config: &SanitizeConfig) -> String {
    text.replace('\n', "</li>")
}

/// Closes a list at every dash run, whether or not a list is open
pub(super) fn close_lists(text: &str, _config: &SanitizeConfig) -> String {
    DASH_RUN.replace_all(text, "</ol>").into_owned()
}

pub(super) fn strip_csv_disclaimer(text: &str, _config: &SanitizeConfig) -> String {
    text.replace(CSV_DISCLAIMER, "")
}

/// Wrap bare URLs in anchors that open a new tab.
///
/// A URL never ends in `]`: trailing brackets stay in the text. A candidate
/// with nothing left after the scheme is not a URL.
pub(super) fn linkify_urls(text: &str, config: &SanitizeConfig) -> String {
    BARE_URL
        .replace_all(text, |caps: &Captures<'_>| {
            let candidate = &caps[0];
            let url = candidate.trim_end_matches(']');
            let scheme_len = url.find("://").map_or(url.len(), |i| i + 3);
            if url.len() <= scheme_len {
                return candidate.to_string();
            }
            let trailing = candidate.get(url.len()..).unwrap_or_default();
            let shown = match config.link_policy {
                LinkPolicy::PassThrough => url,
                LinkPolicy::Canonicalized => config.canonical_url.as_str(),
            };
            format!(r#"<a href="{shown}" target="_blank" class="{ANCHOR_CLASS}">{shown}</a>{trailing}"#)
        })
        .into_owned()
}

pub(super) fn normalize_greeting(text: &str, _config: &SanitizeConfig) -> String {
    text.replace("Good day", "Hello")
}
