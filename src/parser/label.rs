use super::get_regex;
use regex::Regex;
use std::sync::OnceLock;

/// Metadata parsed out of a mirror link label such as `"SubsPlease · 1080p (120MB)"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkLabel {
    pub sub: Option<String>,
    pub resolution: Option<String>,
    pub file_size: Option<String>,
}

#[must_use]
pub fn parse_label(text: &str) -> LinkLabel {
    static FULL: OnceLock<Regex> = OnceLock::new();
    static RESOLUTION: OnceLock<Regex> = OnceLock::new();
    static SIZE: OnceLock<Regex> = OnceLock::new();

    let text = text.trim();
    let full = get_regex(
        &FULL,
        r"(?i)^(?P<sub>.+?)\s*·\s*(?P<res>\d{3,4}p)(?:\s*\((?P<size>[\d.]+\s*[KMGT]?i?B)\))?",
    );

    if let Some(caps) = full.captures(text) {
        return LinkLabel {
            sub: caps.name("sub").map(|m| m.as_str().trim().to_string()),
            resolution: caps.name("res").map(|m| m.as_str().to_lowercase()),
            file_size: caps.name("size").map(|m| m.as_str().replace(' ', "")),
        };
    }

    // Partial labels: pick out whatever pieces are recognisable.
    let resolution = get_regex(&RESOLUTION, r"(?i)\b(\d{3,4}p)\b")
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase());
    let file_size = get_regex(&SIZE, r"(?i)\(([\d.]+\s*[KMGT]?i?B)\)")
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace(' ', ""));
    let sub = text
        .split('·')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty() && resolution.as_deref() != Some(&s.to_lowercase()))
        .filter(|_| text.contains('·'))
        .map(str::to_string);

    LinkLabel {
        sub,
        resolution,
        file_size,
    }
}
