use crate::models::episode::EpisodeRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeTitles {
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub jp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSeason {
    pub year: i32,
    pub season: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broadcast {
    #[serde(default)]
    pub day_of_the_week: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub anime_id: i64,
    pub title: String,
    pub poster: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedAnimeSummary {
    pub anime_id: i64,
    pub title: String,
    pub poster: String,
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default)]
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedAnime {
    pub anime: RelatedAnimeSummary,
    #[serde(rename = "type")]
    pub relation: String,
    #[serde(default)]
    pub type_formatted: String,
}

/// The persisted catalog entry for one metadata-provider id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeDocument {
    pub anime_id: i64,
    pub session: Option<String>,
    pub title: String,
    pub alternative_titles: AlternativeTitles,
    pub synopsis: String,
    pub poster: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub score: f64,
    pub status: String,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub start_season: Option<StartSeason>,
    pub start_date: String,
    pub end_date: String,
    pub episode_count: i64,
    pub current_episode_count: i64,
    pub broadcast: Option<Broadcast>,
    pub duration: i64,
    pub rating: String,
    pub episodes: Vec<EpisodeRecord>,
    pub recommendations: Vec<Recommendation>,
    pub related_anime: Vec<RelatedAnime>,
    pub use_api: bool,
}

/// Field-level changes to apply to a stored [`AnimeDocument`].
///
/// Only `Some` fields are written; an empty patch means no write at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimePatch {
    pub title: Option<String>,
    pub synopsis: Option<String>,
    pub status: Option<String>,
    pub episode_count: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub score: Option<f64>,
    pub rating: Option<String>,
    pub genres: Option<Vec<String>>,
    pub studios: Option<Vec<String>>,
    pub alternative_titles: Option<AlternativeTitles>,
    pub recommendations: Option<Vec<Recommendation>>,
    pub related_anime: Option<Vec<RelatedAnime>>,
    pub current_episode_count: Option<i64>,
    pub episodes: Option<Vec<EpisodeRecord>>,
    pub use_api: Option<bool>,
}

impl AnimePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Names of the fields this patch touches, in document order.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let flags = [
            ("title", self.title.is_some()),
            ("synopsis", self.synopsis.is_some()),
            ("status", self.status.is_some()),
            ("episode_count", self.episode_count.is_some()),
            ("start_date", self.start_date.is_some()),
            ("end_date", self.end_date.is_some()),
            ("score", self.score.is_some()),
            ("rating", self.rating.is_some()),
            ("genres", self.genres.is_some()),
            ("studios", self.studios.is_some()),
            ("alternative_titles", self.alternative_titles.is_some()),
            ("recommendations", self.recommendations.is_some()),
            ("related_anime", self.related_anime.is_some()),
            ("current_episode_count", self.current_episode_count.is_some()),
            ("episodes", self.episodes.is_some()),
            ("use_api", self.use_api.is_some()),
        ];
        flags
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }

    pub fn apply(&self, doc: &mut AnimeDocument) {
        fn set<T: Clone>(target: &mut T, value: Option<&T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut doc.title, self.title.as_ref());
        set(&mut doc.synopsis, self.synopsis.as_ref());
        set(&mut doc.status, self.status.as_ref());
        set(&mut doc.episode_count, self.episode_count.as_ref());
        set(&mut doc.start_date, self.start_date.as_ref());
        set(&mut doc.end_date, self.end_date.as_ref());
        set(&mut doc.score, self.score.as_ref());
        set(&mut doc.rating, self.rating.as_ref());
        set(&mut doc.genres, self.genres.as_ref());
        set(&mut doc.studios, self.studios.as_ref());
        set(&mut doc.alternative_titles, self.alternative_titles.as_ref());
        set(&mut doc.recommendations, self.recommendations.as_ref());
        set(&mut doc.related_anime, self.related_anime.as_ref());
        set(
            &mut doc.current_episode_count,
            self.current_episode_count.as_ref(),
        );
        set(&mut doc.episodes, self.episodes.as_ref());
        set(&mut doc.use_api, self.use_api.as_ref());
    }
}

/// Compact summary used by the airing feed and the `mal_id` lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicAnimeInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mal_id: Option<i64>,
    pub session: String,
    pub title: String,
    pub eng_title: String,
    pub poster: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub rating: String,
    pub episode_count: i64,
    pub duration: i64,
    pub status: String,
}

impl BasicAnimeInfo {
    /// Stand-in used when the metadata lookup for an airing entry fails.
    #[must_use]
    pub fn placeholder(session: &str, title: &str) -> Self {
        Self {
            mal_id: None,
            session: session.to_string(),
            title: title.to_string(),
            eng_title: title.to_string(),
            poster: String::new(),
            media_type: "TV".to_string(),
            rating: "g".to_string(),
            episode_count: 0,
            duration: 0,
            status: "unknown".to_string(),
        }
    }
}

/// Result of the `links` read: cross-reference id plus one episode page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeLinks {
    pub mal_id: String,
    #[serde(flatten)]
    pub page: crate::models::episode::EpisodePage,
}
