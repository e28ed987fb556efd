//! Plain-text view of the rich-text fields stored on work items.

use std::sync::OnceLock;

use regex::Regex;

const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<.*?>").expect("static regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Strip tags, decode the common entities and collapse whitespace.
///
/// Tag removal is a non-greedy `<...>` match, not a markup parse, so
/// malformed markup can lose more or less text than a browser would show.
pub fn normalize(raw: Option<&str>) -> String {
    let raw = match raw {
        Some(s) if !s.is_empty() => s,
        _ => return String::new(),
    };

    let stripped = tag_re().replace_all(raw, "");
    let decoded = decode_entities(&stripped);

    whitespace_re().replace_all(&decoded, " ").trim().to_string()
}

/// Single left-to-right pass; substituted text is never rescanned,
/// so `&amp;lt;` decodes to `&lt;`, not `<`.
fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    'scan: while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        for (entity, replacement) in ENTITIES {
            if let Some(tail) = rest.strip_prefix(entity) {
                out.push_str(replacement);
                rest = tail;
                continue 'scan;
            }
        }

        out.push('&');
        rest = &rest[1..];
    }

    out.push_str(rest);
    out
}
