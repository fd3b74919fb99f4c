use crate::entities::{anime_documents, prelude::*};
use crate::models::anime::{AnimeDocument, AnimePatch};
use anyhow::{Context, Result};
use chrono::SecondsFormat;
use sea_orm::{
    ActiveValue, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("Failed to serialize document field")
}

fn from_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("Corrupt JSON in column {column}"))
}

fn optional_json<T: Serialize>(value: Option<&T>) -> Result<Option<String>> {
    value.map(to_json).transpose()
}

fn set_opt<T: Clone + Into<sea_orm::Value>>(value: Option<&T>) -> ActiveValue<T> {
    value.map_or(NotSet, |v| Set(v.clone()))
}

fn set_json<T: Serialize>(value: Option<&T>) -> Result<ActiveValue<String>> {
    Ok(match value {
        Some(v) => Set(to_json(v)?),
        None => NotSet,
    })
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn to_document(model: anime_documents::Model) -> Result<AnimeDocument> {
    Ok(AnimeDocument {
        anime_id: model.anime_id,
        session: model.session,
        title: model.title,
        alternative_titles: from_json("alternative_titles", &model.alternative_titles)?,
        synopsis: model.synopsis,
        poster: model.poster,
        media_type: model.media_type,
        score: model.score,
        status: model.status,
        genres: from_json("genres", &model.genres)?,
        studios: from_json("studios", &model.studios)?,
        start_season: model
            .start_season
            .as_deref()
            .map(|raw| from_json("start_season", raw))
            .transpose()?,
        start_date: model.start_date,
        end_date: model.end_date,
        episode_count: model.episode_count,
        current_episode_count: model.current_episode_count,
        broadcast: model
            .broadcast
            .as_deref()
            .map(|raw| from_json("broadcast", raw))
            .transpose()?,
        duration: model.duration,
        rating: model.rating,
        episodes: from_json("episodes", &model.episodes)?,
        recommendations: from_json("recommendations", &model.recommendations)?,
        related_anime: from_json("related_anime", &model.related_anime)?,
        use_api: model.use_api,
    })
}

pub struct AnimeRepository {
    conn: DatabaseConnection,
}

impl AnimeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, anime_id: i64) -> Result<Option<AnimeDocument>> {
        AnimeDocuments::find_by_id(anime_id)
            .one(&self.conn)
            .await?
            .map(to_document)
            .transpose()
    }

    pub async fn find_by_session(&self, session: &str) -> Result<Option<AnimeDocument>> {
        AnimeDocuments::find()
            .filter(anime_documents::Column::Session.eq(session))
            .one(&self.conn)
            .await?
            .map(to_document)
            .transpose()
    }

    pub async fn insert(&self, doc: &AnimeDocument) -> Result<()> {
        let now = now();
        let active_model = anime_documents::ActiveModel {
            anime_id: Set(doc.anime_id),
            session: Set(doc.session.clone()),
            title: Set(doc.title.clone()),
            alternative_titles: Set(to_json(&doc.alternative_titles)?),
            synopsis: Set(doc.synopsis.clone()),
            poster: Set(doc.poster.clone()),
            media_type: Set(doc.media_type.clone()),
            score: Set(doc.score),
            status: Set(doc.status.clone()),
            genres: Set(to_json(&doc.genres)?),
            studios: Set(to_json(&doc.studios)?),
            start_season: Set(optional_json(doc.start_season.as_ref())?),
            start_date: Set(doc.start_date.clone()),
            end_date: Set(doc.end_date.clone()),
            episode_count: Set(doc.episode_count),
            current_episode_count: Set(doc.current_episode_count),
            broadcast: Set(optional_json(doc.broadcast.as_ref())?),
            duration: Set(doc.duration),
            rating: Set(doc.rating.clone()),
            episodes: Set(to_json(&doc.episodes)?),
            recommendations: Set(to_json(&doc.recommendations)?),
            related_anime: Set(to_json(&doc.related_anime)?),
            use_api: Set(doc.use_api),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        AnimeDocuments::insert(active_model)
            .exec_without_returning(&self.conn)
            .await?;
        Ok(())
    }

    /// Writes only the columns present in `patch`. Returns whether a row was touched.
    pub async fn update(&self, anime_id: i64, patch: &AnimePatch) -> Result<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let active_model = anime_documents::ActiveModel {
            title: set_opt(patch.title.as_ref()),
            synopsis: set_opt(patch.synopsis.as_ref()),
            status: set_opt(patch.status.as_ref()),
            episode_count: set_opt(patch.episode_count.as_ref()),
            start_date: set_opt(patch.start_date.as_ref()),
            end_date: set_opt(patch.end_date.as_ref()),
            score: set_opt(patch.score.as_ref()),
            rating: set_opt(patch.rating.as_ref()),
            genres: set_json(patch.genres.as_ref())?,
            studios: set_json(patch.studios.as_ref())?,
            alternative_titles: set_json(patch.alternative_titles.as_ref())?,
            recommendations: set_json(patch.recommendations.as_ref())?,
            related_anime: set_json(patch.related_anime.as_ref())?,
            current_episode_count: set_opt(patch.current_episode_count.as_ref()),
            episodes: set_json(patch.episodes.as_ref())?,
            use_api: set_opt(patch.use_api.as_ref()),
            updated_at: Set(now()),
            ..Default::default()
        };

        let result = AnimeDocuments::update_many()
            .set(active_model)
            .filter(anime_documents::Column::AnimeId.eq(anime_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}
