use crate::models::episode::{KwikLink, PaheLink};
use crate::parser::strip_tags;
use regex::{Captures, Regex};
use std::collections::HashSet;

/// Links discovered on an episode play page, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedLinks {
    pub kwik: Vec<KwikLink>,
    pub pahe: Vec<PaheLink>,
}

/// Pulls redirector and mirror links out of raw play-page markup.
///
/// Implementations must keep the two-pass order for redirector links: links
/// carried by a player button come first, followed by any further redirector
/// URLs found elsewhere in the document.
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedLinks;
}

/// Regex-driven extractor keyed on the redirector and mirror URL prefixes.
pub struct PatternExtractor {
    button: Regex,
    data_src: Regex,
    anchor: Regex,
    fansub: Regex,
    resolution: Regex,
    src: Regex,
}

impl PatternExtractor {
    pub fn new(kwik_prefix: &str, pahe_prefix: &str) -> Result<Self, regex::Error> {
        let kwik = regex::escape(kwik_prefix.trim_end_matches('/'));
        let pahe = regex::escape(pahe_prefix.trim_end_matches('/'));

        Ok(Self {
            button: Regex::new(&format!(
                r#"(?is)<button([^>]*data-src="{kwik}[^"]*"[^>]*)>(.*?)</button>"#
            ))?,
            data_src: Regex::new(&format!(r#"(?i)data-src="({kwik}[^"]*)""#))?,
            anchor: Regex::new(&format!(
                r#"(?is)<a\s[^>]*href="({pahe}[^"]*)"[^>]*>(.*?)</a>"#
            ))?,
            fansub: Regex::new(r#"(?i)data-fansub="([^"]*)""#)?,
            resolution: Regex::new(r#"(?i)data-resolution="([^"]*)""#)?,
            src: Regex::new(r#"(?i)data-src="([^"]*)""#)?,
        })
    }

    fn attribute(re: &Regex, attrs: &str) -> Option<String> {
        re.captures(attrs)
            .and_then(|c| c.get(1))
            .map(|m| decode_attribute(m.as_str()))
            .filter(|v| !v.is_empty())
    }

    fn button_link(&self, caps: &Captures<'_>) -> Option<KwikLink> {
        let attrs = caps.get(1)?.as_str();
        let url = Self::attribute(&self.src, attrs)?;
        let sub = Self::attribute(&self.fansub, attrs);
        let resolution = Self::attribute(&self.resolution, attrs);
        let inner = caps.get(2).map(|m| strip_tags(m.as_str())).unwrap_or_default();

        let text = match (&sub, &resolution) {
            (Some(s), Some(r)) => format!("{s} · {r}"),
            (Some(s), None) => s.clone(),
            (None, Some(r)) => r.clone(),
            (None, None) if !inner.is_empty() => inner,
            (None, None) => "Play".to_string(),
        };

        let mut link = KwikLink::new(url, text);
        link.sub = sub;
        link.resolution = resolution;
        Some(link)
    }
}

fn decode_attribute(raw: &str) -> String {
    html_escape::decode_html_entities(raw.trim()).into_owned()
}

impl LinkExtractor for PatternExtractor {
    fn extract(&self, html: &str) -> ExtractedLinks {
        let mut kwik: Vec<KwikLink> = self
            .button
            .captures_iter(html)
            .filter_map(|caps| self.button_link(&caps))
            .collect();

        let mut seen: HashSet<String> = kwik.iter().map(|l| l.url.clone()).collect();
        for caps in self.data_src.captures_iter(html) {
            let Some(url) = caps.get(1).map(|m| decode_attribute(m.as_str())) else {
                continue;
            };
            if seen.insert(url.clone()) {
                kwik.push(KwikLink::new(url, "Play"));
            }
        }

        let pahe = self
            .anchor
            .captures_iter(html)
            .filter_map(|caps| {
                let url = decode_attribute(caps.get(1)?.as_str());
                let text = caps.get(2).map(|m| strip_tags(m.as_str())).unwrap_or_default();
                let text = if text.is_empty() {
                    "Download".to_string()
                } else {
                    text
                };
                Some(PaheLink { url, text })
            })
            .collect();

        ExtractedLinks { kwik, pahe }
    }
}
