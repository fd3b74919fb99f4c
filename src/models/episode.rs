use serde::{Deserialize, Serialize};

fn default_kwik_kind() -> String {
    "kwik".to_string()
}

/// A redirector link discovered on an episode play page.
///
/// `direct_url` stays `None` until the redirector has been resolved to the
/// final media location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KwikLink {
    pub url: String,
    #[serde(default)]
    pub direct_url: Option<String>,
    pub text: String,
    #[serde(rename = "type", default = "default_kwik_kind")]
    pub kind: String,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(rename = "fileSize", default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
}

impl KwikLink {
    #[must_use]
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            direct_url: None,
            text: text.into(),
            kind: default_kwik_kind(),
            sub: None,
            resolution: None,
            file_size: None,
        }
    }

    #[must_use]
    pub fn has_direct_url(&self) -> bool {
        self.direct_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// A download mirror link. Never resolved further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaheLink {
    pub url: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeLinks {
    #[serde(default)]
    pub kwik: Vec<KwikLink>,
    #[serde(default)]
    pub pahe: Vec<PaheLink>,
}

impl EpisodeLinks {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kwik.is_empty() && self.pahe.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode: f64,
    #[serde(default)]
    pub duration: String,
    pub session: String,
    #[serde(default)]
    pub snapshot: String,
    #[serde(default)]
    pub links: EpisodeLinks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub total: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of the upstream episode listing with links attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodePage {
    pub pagination: Pagination,
    pub episodes: Vec<EpisodeRecord>,
}

/// How the episodes of a catalog entry are kept.
///
/// Small catalogs are stored inline; large ones are only counted and
/// resolved live on every read.
#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeListing {
    Stored(Vec<EpisodeRecord>),
    Live { total: u32 },
}
