//! Finds verification links and fallback codes in a message body.

use std::sync::LazyLock;

use regex::Regex;

/// Link shapes, in priority order: travel (temporary access) first, then the
/// generic account verification path.
static LINK_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"https://www\.netflix\.com/account/travel/verify\?[^\s"'<>\]]+"#).unwrap(),
        Regex::new(r#"https://www\.netflix\.com/account/verify\?[^\s"'<>\]]+"#).unwrap(),
    ]
});

static RE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4,6}\b").unwrap());

/// Codes reported per message when there is no link.
pub const MAX_CODES: usize = 3;

/// Something actionable found in a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// A verification URL; only the first one of a message is ever visited.
    Link(String),
    /// A 4-6 digit code. Reported, never submitted.
    Code(String),
}

impl Artifact {
    pub fn as_link(&self) -> Option<&str> {
        match self {
            Artifact::Link(url) => Some(url),
            Artifact::Code(_) => None,
        }
    }

    pub fn as_code(&self) -> Option<&str> {
        match self {
            Artifact::Code(code) => Some(code),
            Artifact::Link(_) => None,
        }
    }
}

/// Extracts artifacts from a body.
///
/// Returns every link matching either pattern (travel matches first, trailing
/// `]`/`>` stripped, exact duplicates removed). Only when there are no links
/// does it fall back to at most [`MAX_CODES`] standalone 4-6 digit codes.
pub fn extract(body: &str) -> Vec<Artifact> {
    let links = extract_links(body);
    if !links.is_empty() {
        return links.into_iter().map(Artifact::Link).collect();
    }

    RE_CODE
        .find_iter(body)
        .take(MAX_CODES)
        .map(|m| Artifact::Code(m.as_str().to_string()))
        .collect()
}

fn extract_links(body: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();

    for pattern in LINK_PATTERNS.iter() {
        for m in pattern.find_iter(body) {
            let link = m.as_str().trim_end_matches([']', '>']);
            if !links.iter().any(|seen| seen == link) {
                links.push(link.to_string());
            }
        }
    }

    links
}

/// The first link among the artifacts, if any.
pub fn first_link(artifacts: &[Artifact]) -> Option<&str> {
    artifacts.iter().find_map(Artifact::as_link)
}

/// All codes among the artifacts.
pub fn codes(artifacts: &[Artifact]) -> Vec<&str> {
    artifacts.iter().filter_map(Artifact::as_code).collect()
}
