//! End-to-end runs of the scrape pipeline against the local fake upstream.

mod support;

use pahe_relay::domain::MalId;
use pahe_relay::models::anime::AnimePatch;
use pahe_relay::models::episode::{KwikLink, PaheLink};
use pahe_relay::services::{DirectLinkSource, LocalDirectLinks};
use pahe_relay::state::SharedState;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use support::{FLAKY, FORTY, FRIEREN, LONG_SHOW, direct_url_for, episode_session, spawn_upstream, test_config};

#[tokio::test]
async fn all_episodes_walks_every_listing_page() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();

    let episodes = state.catalog.all_episodes(LONG_SHOW.session).await.unwrap();

    assert_eq!(episodes.len(), 75);
    let sessions: HashSet<_> = episodes.iter().map(|e| e.session.as_str()).collect();
    assert_eq!(sessions.len(), 75);
    assert!(
        episodes
            .windows(2)
            .all(|w| w[0].episode.total_cmp(&w[1].episode).is_lt())
    );
    assert_eq!(episodes[74].session, episode_session(LONG_SHOW.session, 75));
}

#[tokio::test]
async fn short_show_is_stored_with_resolved_links() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();

    let doc = state
        .anime_service
        .anime_info(MalId::new(52991))
        .await
        .unwrap();

    assert_eq!(doc.session.as_deref(), Some(FRIEREN.session));
    assert!(!doc.use_api);
    assert_eq!(doc.episodes.len(), 12);
    assert_eq!(doc.current_episode_count, 12);
    assert_eq!(doc.genres, vec!["Drama", "Adventure"]);

    for episode in &doc.episodes {
        assert_eq!(
            episode.snapshot,
            format!("/api/anime/pahe/snapshots/frieren-{}.jpg", episode.episode)
        );
        let link = &episode.links.kwik[0];
        assert_eq!(link.sub.as_deref(), Some("GroupX"));
        assert_eq!(link.resolution.as_deref(), Some("720p"));
        assert_eq!(link.direct_url, Some(direct_url_for(&episode.session)));
        assert_eq!(episode.links.pahe.len(), 1);
    }

    let related = &doc.related_anime[0];
    assert_eq!(related.anime.media_type, "MOVIE");
    assert_eq!(related.anime.duration, 3000);

    let stored = state
        .store
        .find_anime_by_id(52991)
        .await
        .unwrap()
        .expect("document should be persisted");
    assert_eq!(stored, doc);
}

#[tokio::test]
async fn long_show_is_served_live() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();

    let doc = state
        .anime_service
        .anime_info(MalId::new(100))
        .await
        .unwrap();

    assert_eq!(doc.session.as_deref(), Some(FORTY.session));
    assert!(doc.use_api);
    assert!(doc.episodes.is_empty());
    assert_eq!(doc.current_episode_count, 40);
    assert_eq!(upstream.counters.resolutions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn live_episode_is_fetched_from_its_listing_page() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();
    state
        .anime_service
        .anime_info(MalId::new(100))
        .await
        .unwrap();

    let ep35 = episode_session(FORTY.session, 35);
    let episode = state
        .anime_service
        .episode_data(FORTY.session, &ep35, 35.0)
        .await
        .unwrap();

    assert_eq!(episode.session, ep35);
    assert_eq!(episode.links.kwik[0].direct_url, Some(direct_url_for(&ep35)));

    let stored = state.store.find_anime_by_id(100).await.unwrap().unwrap();
    assert!(stored.episodes.is_empty());
}

#[tokio::test]
async fn resolver_gives_up_after_retry_budget() {
    let upstream = spawn_upstream().await;
    let mut config = test_config(&upstream);
    config.resolver.retry_attempts = 3;
    let state = SharedState::new(config).await.unwrap();

    let result = state
        .resolver
        .resolve(&format!("{}/kwik/never", upstream.base))
        .await;

    assert!(result.is_err());
    assert_eq!(upstream.counters.never_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn resolver_follows_packed_form_to_direct_url() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();

    let direct = state
        .resolver
        .resolve(&format!("{}/kwik/f/abc123", upstream.base))
        .await
        .unwrap();

    assert_eq!(direct, "https://cdn.example/abc123.mp4");
}

#[tokio::test]
async fn mirror_link_resolves_through_second_hop() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();

    let mirror = PaheLink {
        url: format!("{}/mirror/zz9", upstream.base),
        text: "GroupX · 1080p (120 MB)".to_string(),
    };
    let link = state.resolver.resolve_mirror(&mirror).await.unwrap();

    assert_eq!(link.url, format!("{}/kwik/f/zz9", upstream.base));
    assert_eq!(link.sub.as_deref(), Some("GroupX"));
    assert_eq!(link.resolution.as_deref(), Some("1080p"));
    assert_eq!(link.file_size.as_deref(), Some("120MB"));
    assert_eq!(link.direct_url.as_deref(), Some("https://cdn.example/zz9.mp4"));
}

#[tokio::test]
async fn failing_play_page_degrades_to_empty_stub() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();

    let page = state.catalog.episode_page(FLAKY.session, 1).await.unwrap();

    assert_eq!(page.episodes.len(), 3);
    assert!(!page.pagination.has_next);
    assert!(!page.pagination.has_prev);

    let broken = &page.episodes[1];
    assert_eq!(broken.session, episode_session(FLAKY.session, 2));
    assert!(broken.links.is_empty());
    assert_eq!(broken.duration, "00:24:00");

    assert!(!page.episodes[0].links.kwik.is_empty());
    assert!(!page.episodes[2].links.kwik.is_empty());
}

#[tokio::test]
async fn episode_data_backfills_and_persists_direct_links() {
    let upstream = spawn_upstream().await;
    let mut config = test_config(&upstream);
    config.resolver.resolve_on_listing = false;
    let state = SharedState::new(config).await.unwrap();

    let doc = state
        .anime_service
        .anime_info(MalId::new(52991))
        .await
        .unwrap();
    assert!(doc.episodes.iter().all(|e| e.links.kwik[0].direct_url.is_none()));
    assert_eq!(upstream.counters.resolutions.load(Ordering::SeqCst), 0);

    let ep3 = episode_session(FRIEREN.session, 3);
    let episode = state
        .anime_service
        .episode_data(FRIEREN.session, &ep3, 3.0)
        .await
        .unwrap();
    assert_eq!(episode.links.kwik[0].direct_url, Some(direct_url_for(&ep3)));

    let stored = state
        .store
        .find_anime_by_session(FRIEREN.session)
        .await
        .unwrap()
        .unwrap();
    let stored_ep3 = stored.episodes.iter().find(|e| e.session == ep3).unwrap();
    assert_eq!(stored_ep3.links.kwik[0].direct_url, Some(direct_url_for(&ep3)));
    assert!(
        stored
            .episodes
            .iter()
            .filter(|e| e.session != ep3)
            .all(|e| e.links.kwik[0].direct_url.is_none())
    );
}

#[tokio::test]
async fn episode_data_for_unknown_anime_is_not_found() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();

    let err = state
        .anime_service
        .episode_data("nobody", "nobody-ep1", 1.0)
        .await
        .unwrap_err();

    assert!(matches!(err, pahe_relay::services::AnimeError::NotFound(_)));
}

#[tokio::test]
async fn second_lookup_changes_nothing() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();

    let first = state
        .anime_service
        .anime_info(MalId::new(52991))
        .await
        .unwrap();
    let second = state
        .anime_service
        .anime_info(MalId::new(52991))
        .await
        .unwrap();

    assert_eq!(first, second);
    let stored = state.store.find_anime_by_id(52991).await.unwrap().unwrap();
    assert_eq!(stored, first);
}

#[tokio::test]
async fn unknown_provider_id_is_not_found() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();

    let err = state
        .anime_service
        .anime_info(MalId::new(424_242))
        .await
        .unwrap_err();

    assert!(matches!(err, pahe_relay::services::AnimeError::NotFound(_)));
}

#[tokio::test]
async fn finale_is_listed_when_stored_show_was_airing() {
    let upstream = spawn_upstream().await;
    let state = SharedState::new(test_config(&upstream)).await.unwrap();

    let created = state
        .anime_service
        .anime_info(MalId::new(300))
        .await
        .unwrap();
    assert_eq!(created.episodes.len(), 3);

    let patch = AnimePatch {
        status: Some("currently_airing".to_string()),
        episodes: Some(created.episodes[..2].to_vec()),
        current_episode_count: Some(2),
        ..Default::default()
    };
    assert!(state.store.update_anime(300, &patch).await.unwrap());

    let refreshed = state
        .anime_service
        .anime_info(MalId::new(300))
        .await
        .unwrap();

    assert_eq!(refreshed.status, FLAKY.status);
    assert_eq!(refreshed.episodes.len(), 3);
    assert_eq!(refreshed.current_episode_count, 3);

    let stored = state.store.find_anime_by_id(300).await.unwrap().unwrap();
    assert_eq!(stored.episodes.len(), 3);
    assert_eq!(stored.status, "finished_airing");
}

#[tokio::test]
async fn redirector_fetches_share_one_concurrency_cap() {
    let upstream = spawn_upstream().await;
    let mut config = test_config(&upstream);
    config.resolver.max_concurrency = 3;
    let state = SharedState::new(config).await.unwrap();

    let source = LocalDirectLinks::new(state.resolver.clone(), 3);
    let links: Vec<KwikLink> = (0..6)
        .map(|n| KwikLink::new(format!("{}/kwik/f/slow{n}", upstream.base), "Play"))
        .collect();

    let (a, b, c) = tokio::join!(
        source.resolve_links("a", "a-ep1", &links),
        source.resolve_links("b", "b-ep1", &links),
        source.resolve_links("c", "c-ep1", &links)
    );

    for resolved in [a, b, c] {
        assert!(resolved.iter().all(Option::is_some));
    }
    assert!(upstream.counters.peak_redirector.load(Ordering::SeqCst) <= 3);
    assert!(upstream.counters.peak_redirector.load(Ordering::SeqCst) >= 2);
}
