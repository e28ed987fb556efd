//! Completion text → test case titles.
//!
//! Models answer in one of two list notations. Numbered items win outright:
//! once any `N.` item is found, bullet lines are never consulted.

use std::sync::OnceLock;

use regex::Regex;

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.[^\S\n]*([^\n]+)").expect("static regex"))
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-*•][^\S\n]*([^\n]+)").expect("static regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    Numbered,
    Bulleted,
    Unrecognized,
}

/// Titles in the order they appear. An answer with no recognizable list
/// yields an empty vec, which is not an error.
pub fn extract_titles(completion: &str) -> Vec<String> {
    extract_with_format(completion).1
}

pub fn extract_with_format(completion: &str) -> (ListFormat, Vec<String>) {
    let numbered = captures(numbered_re(), completion);
    if !numbered.is_empty() {
        return (ListFormat::Numbered, numbered);
    }

    let bulleted = captures(bullet_re(), completion);
    if !bulleted.is_empty() {
        return (ListFormat::Bulleted, bulleted);
    }

    (ListFormat::Unrecognized, Vec::new())
}

fn captures(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
