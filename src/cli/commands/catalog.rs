use super::print_json;
use crate::config::Config;
use crate::domain::MalId;
use crate::state::SharedState;
use anyhow::Context;

pub async fn cmd_links(config: Config, session: &str, page: u32) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;
    let links = state
        .anime_service
        .anime_links(session, page.max(1))
        .await
        .with_context(|| format!("Failed to scrape links for {session}"))?;
    print_json(&links)
}

pub async fn cmd_anime_info(config: Config, id_str: &str) -> anyhow::Result<()> {
    let id: MalId = id_str.parse()?;
    let state = SharedState::new(config).await?;
    let doc = state
        .anime_service
        .anime_info(id)
        .await
        .with_context(|| format!("Failed to fetch anime {id}"))?;
    print_json(&doc)
}

pub async fn cmd_episode(
    config: Config,
    session: &str,
    episode_session: &str,
    number: f64,
) -> anyhow::Result<()> {
    let state = SharedState::new(config).await?;
    let episode = state
        .anime_service
        .episode_data(session, episode_session, number)
        .await
        .with_context(|| format!("Failed to load episode {episode_session}"))?;
    print_json(&episode)
}
