#![allow(dead_code)]

//! A local stand-in for the scrape target, the redirector host, the
//! metadata provider and the snapshot CDN.

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use pahe_relay::config::Config;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const PER_PAGE: u32 = 30;
pub const SESSION_COOKIE: &str = "kwik_session=s3cr3t";
const ALPHABET: &str = "abcdefghij";
const OFFSET: u32 = 11;
const BASE: u32 = 5;
const REDIRECTOR_DELAY: Duration = Duration::from_millis(25);

/// One show known to the fake upstream.
#[derive(Clone)]
pub struct Show {
    pub session: &'static str,
    pub title: &'static str,
    pub mal_id: Option<i64>,
    pub episodes: u32,
    pub status: &'static str,
}

pub const FRIEREN: Show = Show {
    session: "frieren",
    title: "Sousou no Frieren",
    mal_id: Some(52991),
    episodes: 12,
    status: "currently_airing",
};

pub const LONG_SHOW: Show = Show {
    session: "long-show",
    title: "Long Show",
    mal_id: Some(21),
    episodes: 75,
    status: "currently_airing",
};

pub const FORTY: Show = Show {
    session: "forty",
    title: "Forty Episodes",
    mal_id: Some(100),
    episodes: 40,
    status: "finished_airing",
};

pub const UNLINKED: Show = Show {
    session: "unlinked",
    title: "No Meta Tag",
    mal_id: None,
    episodes: 2,
    status: "finished_airing",
};

pub const FLAKY: Show = Show {
    session: "flaky",
    title: "Flaky Pages",
    mal_id: Some(300),
    episodes: 3,
    status: "finished_airing",
};

/// Related entry every provider record points at.
pub const RELATED_ID: i64 = 999;

#[derive(Default)]
pub struct Counters {
    pub never_hits: AtomicUsize,
    pub airing_hits: AtomicUsize,
    pub resolutions: AtomicUsize,
    pub redirector_in_flight: AtomicUsize,
    pub peak_redirector: AtomicUsize,
}

pub struct Upstream {
    pub base: String,
    pub shows: HashMap<&'static str, Show>,
    pub counters: Counters,
}

impl Upstream {
    fn show_by_mal(&self, id: i64) -> Option<&Show> {
        self.shows.values().find(|s| s.mal_id == Some(id))
    }
}

/// Inverse of the redirector cipher.
pub fn encode(plain: &str, alphabet: &str, offset: u32, base: u32) -> String {
    let symbols: Vec<char> = alphabet.chars().collect();
    let separator = symbols[base as usize];
    let mut out = String::new();
    for c in plain.chars() {
        let mut value = u64::from(c as u32) + u64::from(offset);
        let mut digits = Vec::new();
        while value > 0 {
            digits.push(symbols[(value % u64::from(base)) as usize]);
            value /= u64::from(base);
        }
        out.extend(digits.iter().rev());
        out.push(separator);
    }
    out
}

pub fn episode_session(show: &str, n: u32) -> String {
    format!("{show}-ep{n}")
}

pub fn direct_url_for(id: &str) -> String {
    format!("https://cdn.example/{id}.mp4")
}

#[derive(Deserialize)]
struct ApiQuery {
    m: String,
    id: Option<String>,
    q: Option<String>,
    page: Option<u32>,
}

async fn api(State(up): State<Arc<Upstream>>, Query(q): Query<ApiQuery>) -> Response {
    let page = q.page.unwrap_or(1).max(1);
    match q.m.as_str() {
        "release" => {
            let Some(show) = q.id.as_deref().and_then(|id| up.shows.get(id)) else {
                return StatusCode::NOT_FOUND.into_response();
            };
            let last_page = show.episodes.div_ceil(PER_PAGE).max(1);
            let first = (page - 1) * PER_PAGE + 1;
            let last = (page * PER_PAGE).min(show.episodes);
            let data: Vec<Value> = (first..=last)
                .map(|n| {
                    json!({
                        "id": n,
                        "anime_id": 1,
                        "episode": n,
                        "duration": "00:24:00",
                        "session": episode_session(show.session, n),
                        "snapshot": format!("https://i.example/snapshots/{}-{n}.jpg", show.session),
                        "audio": "jpn",
                    })
                })
                .collect();
            Json(json!({
                "total": show.episodes,
                "per_page": PER_PAGE,
                "current_page": page,
                "last_page": last_page,
                "data": data,
            }))
            .into_response()
        }
        "search" => {
            let query = q.q.unwrap_or_default().to_lowercase();
            let data: Vec<Value> = up
                .shows
                .values()
                .filter(|s| s.title.to_lowercase().contains(&query))
                .map(|s| json!({"session": s.session, "title": s.title, "episodes": s.episodes}))
                .collect();
            Json(json!({ "total": data.len(), "data": data })).into_response()
        }
        "airing" => {
            up.counters.airing_hits.fetch_add(1, Ordering::SeqCst);
            Json(json!({
                "total": 2,
                "per_page": 12,
                "current_page": page,
                "last_page": 1,
                "data": [
                    {"anime_session": "frieren", "anime_title": "Sousou no Frieren", "episode": 12, "fansub": "SubsPlease"},
                    {"anime_session": "mystery", "anime_title": "Mystery Show", "episode": 1, "fansub": "Erai"}
                ]
            }))
            .into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn anime_page(State(up): State<Arc<Upstream>>, Path(session): Path<String>) -> Response {
    match up.shows.get(session.as_str()) {
        Some(show) => {
            let meta = show
                .mal_id
                .map(|id| format!(r#"<meta name="myanimelist" content="{id}">"#))
                .unwrap_or_default();
            Html(format!(
                "<html><head>{meta}<title>{}</title></head><body></body></html>",
                show.title
            ))
            .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn play_page(
    State(up): State<Arc<Upstream>>,
    Path((anime, episode)): Path<(String, String)>,
) -> Response {
    if anime == FLAKY.session && episode == episode_session(FLAKY.session, 2) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let base = &up.base;
    Html(format!(
        r#"<div id="resolutionMenu">
<button class="dropdown-item" data-src="{base}/kwik/f/{episode}" data-fansub="GroupX" data-resolution="720p" data-audio="jpn">GroupX · 720p</button>
</div>
<div id="pickDownload">
<a href="{base}/mirror/{episode}" class="dropdown-item">GroupX · 720p (110MB)</a>
</div>"#
    ))
    .into_response()
}

async fn kwik_page(State(up): State<Arc<Upstream>>, Path(id): Path<String>) -> Response {
    let in_flight = up.counters.redirector_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    up.counters.peak_redirector.fetch_max(in_flight, Ordering::SeqCst);
    tokio::time::sleep(REDIRECTOR_DELAY).await;
    up.counters.redirector_in_flight.fetch_sub(1, Ordering::SeqCst);

    let form = format!(
        r#"<form action="{}/kwik/f/{id}" method="POST"><input type="hidden" name="_token" value="tok-{id}"></form>"#,
        up.base
    );
    let packed = encode(&form, ALPHABET, OFFSET, BASE);
    let body = format!(
        "<html><script>\neval(function(h,u,n,t,e,r){{return r}}(\"{packed}\",42,\"{ALPHABET}\",{OFFSET},{BASE},\n21))\n</script></html>"
    );
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/; HttpOnly"))],
        Html(body),
    )
        .into_response()
}

#[derive(Deserialize)]
struct TokenForm {
    #[serde(rename = "_token")]
    token: String,
}

async fn kwik_post(
    State(up): State<Arc<Upstream>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<TokenForm>,
) -> Response {
    let has_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|c| c.contains(SESSION_COOKIE));
    if !has_cookie || form.token != format!("tok-{id}") {
        return StatusCode::FORBIDDEN.into_response();
    }
    up.counters.resolutions.fetch_add(1, Ordering::SeqCst);
    (StatusCode::FOUND, [(header::LOCATION, direct_url_for(&id))]).into_response()
}

async fn kwik_never(State(up): State<Arc<Upstream>>) -> Html<&'static str> {
    up.counters.never_hits.fetch_add(1, Ordering::SeqCst);
    Html("<html><script>var nothing = 1;</script></html>")
}

async fn mirror_page(State(up): State<Arc<Upstream>>, Path(id): Path<String>) -> Html<String> {
    Html(format!(
        r#"<html><a class="redirect" href="{}/kwik/f/{id}">Continue</a></html>"#,
        up.base
    ))
}

async fn mal(
    State(up): State<Arc<Upstream>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if headers.get("X-MAL-CLIENT-ID").is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_request"})),
        )
            .into_response();
    }

    if id == RELATED_ID {
        return Json(json!({
            "id": RELATED_ID,
            "title": "Side Story",
            "media_type": "movie",
            "average_episode_duration": 3000
        }))
        .into_response();
    }

    let Some(show) = up.show_by_mal(id) else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "not_found"}))).into_response();
    };

    Json(json!({
        "id": id,
        "title": show.title,
        "main_picture": {"medium": "https://img.example/m.jpg", "large": "https://img.example/l.jpg"},
        "alternative_titles": {"synonyms": [], "en": format!("{} (EN)", show.title), "ja": ""},
        "synopsis": "A story.",
        "mean": 8.5,
        "media_type": "tv",
        "status": show.status,
        "genres": [{"id": 1, "name": "Drama"}, {"id": 2, "name": "Adventure"}],
        "studios": [{"id": 11, "name": "Madhouse"}],
        "num_episodes": show.episodes,
        "start_date": "2023-09-29",
        "average_episode_duration": 1440,
        "rating": "pg_13",
        "related_anime": [{
            "node": {"id": RELATED_ID, "title": "Side Story"},
            "relation_type": "side_story",
            "relation_type_formatted": "Side Story"
        }],
        "recommendations": []
    }))
    .into_response()
}

async fn snapshot_miss() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn snapshot_hit(Path(path): Path<String>) -> Response {
    if path.starts_with("missing") {
        return StatusCode::NOT_FOUND.into_response();
    }
    ([(header::CONTENT_TYPE, "image/png")], vec![0x89_u8, b'P', b'N', b'G']).into_response()
}

/// Starts the fake upstream on an ephemeral port.
pub async fn spawn_upstream() -> Arc<Upstream> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let shows = [FRIEREN, LONG_SHOW, FORTY, UNLINKED, FLAKY]
        .into_iter()
        .map(|s| (s.session, s))
        .collect();

    let upstream = Arc::new(Upstream {
        base,
        shows,
        counters: Counters::default(),
    });

    let app = Router::new()
        .route("/api", get(api))
        .route("/anime/{session}", get(anime_page))
        .route("/play/{anime}/{episode}", get(play_page))
        .route("/kwik/never", get(kwik_never))
        .route("/kwik/f/{id}", get(kwik_page))
        .route("/kwik/d/{id}", post(kwik_post))
        .route("/mirror/{id}", get(mirror_page))
        .route("/mal/{id}", get(mal))
        .route("/snap-a/{*path}", get(snapshot_miss))
        .route("/snap-b/{*path}", get(snapshot_hit))
        .with_state(upstream.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    upstream
}

/// Config pointing every collaborator at the fake upstream.
pub fn test_config(upstream: &Upstream) -> Config {
    let base = &upstream.base;
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.pahe.base_url = base.clone();
    config.pahe.api_url = format!("{base}/api");
    config.pahe.snapshot_urls = vec![format!("{base}/snap-a"), format!("{base}/snap-b")];
    config.pahe.kwik_prefix = format!("{base}/kwik");
    config.pahe.mirror_prefix = format!("{base}/mirror");
    config.pahe.cookie = None;
    config.pahe.request_timeout_seconds = 5;
    config.mal.base_url = format!("{base}/mal");
    config.mal.client_id = Some("test-client".to_string());
    config.catalog.page_size = PER_PAGE;
    config.catalog.use_api_threshold = 30;
    config
}
