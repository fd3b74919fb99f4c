pub mod label;
pub mod links;
pub mod obfuscation;

use regex::Regex;
use std::sync::OnceLock;

pub(crate) fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Removes markup tags, decodes entities and collapses whitespace.
#[must_use]
pub fn strip_tags(fragment: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let without_tags = get_regex(&RE, r"(?s)<[^>]*>").replace_all(fragment, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nested_markup() {
        assert_eq!(
            strip_tags("<span class=\"x\">SubsPlease</span>\n  &middot; <b>1080p</b>"),
            "SubsPlease · 1080p"
        );
        assert_eq!(strip_tags("   "), "");
    }
}
