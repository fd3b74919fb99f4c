mod support;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::atomic::Ordering;
use support::{FRIEREN, UNLINKED, Upstream, spawn_upstream, test_config};
use tower::ServiceExt;

async fn spawn_app() -> (Router, std::sync::Arc<Upstream>) {
    let upstream = spawn_upstream().await;
    let state = pahe_relay::api::create_app_state_from_config(test_config(&upstream), None)
        .await
        .expect("Failed to create app state");
    (pahe_relay::api::router(state), upstream)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn links_requires_method_and_session() {
    let (app, _upstream) = spawn_app().await;

    let (status, body) = get_json(&app, "/api/anime/pahe/links").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "method parameter is required");
    assert!(body.get("details").is_none());

    let (status, body) = get_json(&app, "/api/anime/pahe/links?method=links").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid method or missing session");

    let (status, _) = get_json(&app, "/api/anime/pahe/links?method=bogus&session=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        get_json(&app, "/api/anime/pahe/links?method=links&session=frieren&page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid page number");
}

#[tokio::test]
async fn links_returns_cross_reference_and_page() {
    let (app, _upstream) = spawn_app().await;

    let (status, body) =
        get_json(&app, "/api/anime/pahe/links?method=links&session=frieren").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mal_id"], "52991");
    assert_eq!(body["pagination"]["current_page"], 1);
    assert_eq!(body["pagination"]["total"], 12);
    assert_eq!(body["pagination"]["has_next"], false);
    assert_eq!(body["pagination"]["has_prev"], false);

    let episodes = body["episodes"].as_array().unwrap();
    assert_eq!(episodes.len(), 12);
    let first = &episodes[0];
    assert_eq!(first["session"], "frieren-ep1");
    assert_eq!(first["snapshot"], "/api/anime/pahe/snapshots/frieren-1.jpg");
    assert_eq!(first["links"]["kwik"][0]["type"], "kwik");
    assert_eq!(
        first["links"]["kwik"][0]["direct_url"],
        "https://cdn.example/frieren-ep1.mp4"
    );
}

#[tokio::test]
async fn links_without_cross_reference_is_server_error() {
    let (app, _upstream) = spawn_app().await;

    let uri = format!("/api/anime/pahe/links?method=links&session={}", UNLINKED.session);
    let (status, body) = get_json(&app, &uri).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to scrape links");
    assert!(body["details"].as_str().unwrap().contains(UNLINKED.session));
}

#[tokio::test]
async fn mal_id_wraps_basic_info() {
    let (app, _upstream) = spawn_app().await;

    let (status, body) =
        get_json(&app, "/api/anime/pahe/links?method=mal_id&session=frieren").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mal_id"], 52991);
    assert_eq!(body["data"]["title"], FRIEREN.title);
    assert_eq!(body["data"]["type"], "TV");

    let (status, body) =
        get_json(&app, "/api/anime/pahe/links?method=mal_id&session=unlinked").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Anime not found");
}

#[tokio::test]
async fn info_creates_document_and_rejects_bad_ids() {
    let (app, _upstream) = spawn_app().await;

    let (status, body) = get_json(&app, "/api/anime/pahe/links?method=info&id=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("details").is_none());

    let (status, body) = get_json(&app, "/api/anime/pahe/links?method=info&id=52991").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["anime_id"], 52991);
    assert_eq!(body["session"], "frieren");
    assert_eq!(body["use_api"], false);
    assert_eq!(body["episodes"].as_array().unwrap().len(), 12);

    let (status, body) = get_json(&app, "/api/anime/pahe/links?method=info&id=7777").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Failed to fetch anime info");
}

#[tokio::test]
async fn episode_data_serves_stored_episode() {
    let (app, _upstream) = spawn_app().await;

    let (status, _) = get_json(&app, "/api/anime/pahe/links?method=info&id=52991").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_json(
        &app,
        "/api/anime/pahe/links?method=episode_data&session=frieren&ep=frieren-ep4&episode=4",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"], "frieren-ep4");
    assert_eq!(body["episode"], 4.0);

    let (status, _) = get_json(
        &app,
        "/api/anime/pahe/links?method=episode_data&session=frieren&ep=frieren-ep4&episode=-1",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn airing_feed_is_cached_until_refresh() {
    let (app, upstream) = spawn_app().await;

    let (status, body) = get_json(&app, "/api/anime/pahe/airing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 2);

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["anime_session"], "frieren");
    assert_eq!(data[0]["fansub"], "SubsPlease");
    assert_eq!(data[0]["anime_info"]["mal_id"], 52991);

    let placeholder = &data[1]["anime_info"];
    assert_eq!(placeholder["title"], "Mystery Show");
    assert_eq!(placeholder["status"], "unknown");
    assert!(placeholder.get("mal_id").is_none());

    let (_, cached) = get_json(&app, "/api/anime/pahe/airing").await;
    assert_eq!(cached, body);
    assert_eq!(upstream.counters.airing_hits.load(Ordering::SeqCst), 1);

    let (status, _) = get_json(&app, "/api/anime/pahe/airing?refresh=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upstream.counters.airing_hits.load(Ordering::SeqCst), 2);

    let (status, _) = get_json(&app, "/api/anime/pahe/airing?page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upstream.counters.airing_hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn snapshots_fall_through_hosts() {
    let (app, _upstream) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/anime/pahe/snapshots/frieren-1.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=86400"
    );

    let (status, body) = get(&app, "/api/anime/pahe/snapshots/missing-1.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, b"Image not found");
}

#[tokio::test]
async fn decode_url_percent_decodes() {
    let (app, _upstream) = spawn_app().await;

    let request = |body: Value| {
        Request::builder()
            .method("POST")
            .uri("/api/decode-url")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(request(json!({"encodedText": "Frieren%20%26%20Fern"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["decodedText"], "Frieren & Fern");

    let response = app.clone().oneshot(request(json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_database() {
    let (app, _upstream) = spawn_app().await;

    let (status, body) = get_json(&app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}
