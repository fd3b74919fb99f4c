use crate::clients::pahe::record_upstream;
use crate::clients::{ScrapeError, ScrapeResult};
use crate::constants::mal::{BASIC_FIELDS, CLIENT_ID_HEADER, FULL_FIELDS, RELATED_FIELDS};
use crate::models::anime::{
    AlternativeTitles, AnimeDocument, BasicAnimeInfo, Broadcast, Recommendation, RelatedAnime,
    RelatedAnimeSummary, StartSeason,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;
use url::Url;

const SERVICE: &str = "mal";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MalPicture {
    pub medium: Option<String>,
    pub large: Option<String>,
}

fn poster_of(picture: Option<&MalPicture>) -> String {
    picture
        .and_then(|p| p.large.clone().or_else(|| p.medium.clone()))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MalAlternativeTitles {
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub en: Option<String>,
    pub ja: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MalNamed {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MalNode {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub main_picture: Option<MalPicture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MalRecommendation {
    pub node: MalNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MalRelated {
    pub node: MalNode,
    #[serde(default)]
    pub relation_type: String,
    pub relation_type_formatted: Option<String>,
}

impl MalRelated {
    /// Related entry without the per-item detail lookup applied.
    #[must_use]
    pub fn to_stub(&self) -> RelatedAnime {
        RelatedAnime {
            anime: RelatedAnimeSummary {
                anime_id: self.node.id,
                title: self.node.title.clone(),
                poster: poster_of(self.node.main_picture.as_ref()),
                media_type: String::new(),
                duration: 0,
            },
            relation: self.relation_type.clone(),
            type_formatted: self.relation_type_formatted.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MalAnime {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub main_picture: Option<MalPicture>,
    pub alternative_titles: Option<MalAlternativeTitles>,
    pub synopsis: Option<String>,
    pub mean: Option<f64>,
    pub media_type: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub genres: Vec<MalNamed>,
    #[serde(default)]
    pub studios: Vec<MalNamed>,
    pub num_episodes: Option<i64>,
    pub start_season: Option<StartSeason>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub broadcast: Option<Broadcast>,
    pub average_episode_duration: Option<i64>,
    pub rating: Option<String>,
    #[serde(default)]
    pub related_anime: Vec<MalRelated>,
    #[serde(default)]
    pub recommendations: Vec<MalRecommendation>,
}

impl MalAnime {
    #[must_use]
    pub fn poster(&self) -> String {
        poster_of(self.main_picture.as_ref())
    }

    /// Upper-cased media type, `TV` when absent.
    #[must_use]
    pub fn media_type_label(&self) -> String {
        self.media_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map_or_else(|| "TV".to_string(), str::to_uppercase)
    }

    #[must_use]
    pub fn rating_label(&self) -> String {
        self.rating
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "g".to_string())
    }

    #[must_use]
    pub fn alternative_titles(&self) -> AlternativeTitles {
        let alt = self.alternative_titles.clone().unwrap_or_default();
        AlternativeTitles {
            synonyms: alt.synonyms,
            en: alt
                .en
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| self.title.clone()),
            jp: alt.ja.unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn genre_names(&self) -> Vec<String> {
        self.genres.iter().map(|g| g.name.clone()).collect()
    }

    #[must_use]
    pub fn studio_names(&self) -> Vec<String> {
        self.studios.iter().map(|s| s.name.clone()).collect()
    }

    #[must_use]
    pub fn recommendation_list(&self) -> Vec<Recommendation> {
        self.recommendations
            .iter()
            .map(|r| Recommendation {
                anime_id: r.node.id,
                title: r.node.title.clone(),
                poster: poster_of(r.node.main_picture.as_ref()),
            })
            .collect()
    }

    /// Builds a fresh catalog document. Episodes start empty.
    #[must_use]
    pub fn to_document(&self, session: Option<String>) -> AnimeDocument {
        AnimeDocument {
            anime_id: self.id,
            session,
            title: self.title.clone(),
            alternative_titles: self.alternative_titles(),
            synopsis: self.synopsis.clone().unwrap_or_default(),
            poster: self.poster(),
            media_type: self.media_type_label(),
            score: self.mean.unwrap_or(0.0),
            status: self.status.clone().unwrap_or_default(),
            genres: self.genre_names(),
            studios: self.studio_names(),
            start_season: self.start_season.clone(),
            start_date: self.start_date.clone().unwrap_or_default(),
            end_date: self.end_date.clone().unwrap_or_default(),
            episode_count: self.num_episodes.unwrap_or(0),
            current_episode_count: 0,
            broadcast: self.broadcast.clone(),
            duration: self.average_episode_duration.unwrap_or(0),
            rating: self.rating_label(),
            episodes: Vec::new(),
            recommendations: self.recommendation_list(),
            related_anime: self.related_anime.iter().map(MalRelated::to_stub).collect(),
            use_api: false,
        }
    }

    #[must_use]
    pub fn to_basic_info(&self, session: &str) -> BasicAnimeInfo {
        BasicAnimeInfo {
            mal_id: Some(self.id),
            session: session.to_string(),
            title: self.title.clone(),
            eng_title: self.alternative_titles().en,
            poster: self.poster(),
            media_type: self.media_type_label(),
            rating: self.rating_label(),
            episode_count: self.num_episodes.unwrap_or(0),
            duration: self.average_episode_duration.unwrap_or(0),
            status: self
                .status
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// Supplementary fields fetched per related entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MalRelatedDetails {
    pub media_type: Option<String>,
    pub average_episode_duration: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MalErrorBody {
    error: Option<String>,
}

#[derive(Clone)]
pub struct MalClient {
    client: Client,
    base_url: String,
    client_id: Option<String>,
}

impl MalClient {
    #[must_use]
    pub fn with_shared_client(client: Client, base_url: &str, client_id: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.filter(|id| !id.is_empty()),
        }
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, id: i64, fields: &str) -> ScrapeResult<T> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(ScrapeError::Configuration("MAL_CLIENT_ID"))?;

        let mut url = Url::parse(&format!("{}/{id}", self.base_url))
            .map_err(|_| ScrapeError::Configuration("mal.base_url"))?;
        url.query_pairs_mut().append_pair("fields", fields);

        let response = self
            .client
            .get(url)
            .header(CLIENT_ID_HEADER, client_id)
            .send()
            .await
            .map_err(|e| {
                record_upstream(SERVICE, "error");
                ScrapeError::request(SERVICE, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            record_upstream(SERVICE, "http_error");
            let code = response
                .json::<MalErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| "unknown".to_string());
            warn!(anime_id = id, status = %status, error = %code, "MAL API error");
            return Err(ScrapeError::UpstreamUnavailable {
                service: SERVICE,
                status,
            });
        }

        record_upstream(SERVICE, "ok");
        response
            .json()
            .await
            .map_err(|e| ScrapeError::request(SERVICE, e))
    }

    pub async fn anime(&self, id: i64) -> ScrapeResult<MalAnime> {
        self.fetch(id, FULL_FIELDS).await
    }

    pub async fn basic(&self, id: i64) -> ScrapeResult<MalAnime> {
        self.fetch(id, BASIC_FIELDS).await
    }

    pub async fn related_details(&self, id: i64) -> ScrapeResult<MalRelatedDetails> {
        self.fetch(id, RELATED_FIELDS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MalAnime {
        serde_json::from_str(
            r#"{
                "id": 52991,
                "title": "Sousou no Frieren",
                "main_picture": {"medium": "m.jpg", "large": "l.jpg"},
                "alternative_titles": {"synonyms": ["Frieren at the Funeral"], "en": "", "ja": "葬送のフリーレン"},
                "media_type": "tv",
                "status": "finished_airing",
                "genres": [{"id": 1, "name": "Adventure"}, {"id": 8, "name": "Drama"}],
                "studios": [{"id": 11, "name": "Madhouse"}],
                "num_episodes": 28,
                "start_season": {"year": 2023, "season": "fall"},
                "related_anime": [{"node": {"id": 56885, "title": "Sousou no Frieren: Marumaru", "main_picture": {"medium": "r.jpg"}}, "relation_type": "side_story", "relation_type_formatted": "Side Story"}],
                "recommendations": [{"node": {"id": 1, "title": "Mushishi"}, "num_recommendations": 3}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn maps_document_with_defaults() {
        let doc = sample().to_document(Some("sess".to_string()));
        assert_eq!(doc.anime_id, 52991);
        assert_eq!(doc.alternative_titles.en, "Sousou no Frieren");
        assert_eq!(doc.alternative_titles.jp, "葬送のフリーレン");
        assert_eq!(doc.poster, "l.jpg");
        assert_eq!(doc.media_type, "TV");
        assert!(doc.score.abs() < f64::EPSILON);
        assert_eq!(doc.rating, "g");
        assert_eq!(doc.genres, vec!["Adventure", "Drama"]);
        assert_eq!(doc.related_anime[0].anime.poster, "r.jpg");
        assert_eq!(doc.related_anime[0].type_formatted, "Side Story");
        assert_eq!(doc.recommendations[0].poster, "");
        assert!(!doc.use_api);
    }

    #[test]
    fn maps_basic_info() {
        let info = sample().to_basic_info("sess");
        assert_eq!(info.mal_id, Some(52991));
        assert_eq!(info.eng_title, "Sousou no Frieren");
        assert_eq!(info.episode_count, 28);
        assert_eq!(info.status, "finished_airing");
    }

    #[tokio::test]
    async fn missing_client_id_is_configuration_error() {
        let client = MalClient::with_shared_client(Client::new(), "http://127.0.0.1:9", None);
        let err = client.anime(1).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Configuration(_)));
    }
}
