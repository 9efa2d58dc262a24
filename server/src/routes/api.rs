use crate::app_state::CategoryPage;
use crate::app_state::WatchPage;
use crate::AppState;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::Json;
use axum::Router;
use jikan::Anime;
use jikan::AnimeList;
use jikan::Episode;
use jikan::EpisodeList;
use std::num::NonZeroU32;
use std::sync::Arc;
use stream_resolver::Resolution;
use stream_resolver::VideoSource;
use tracing::error;

#[derive(Debug, serde::Serialize)]
struct ApiError {
    messages: Vec<String>,
}

impl ApiError {
    fn from_anyhow(error: &anyhow::Error) -> Self {
        Self {
            messages: error.chain().map(|e| e.to_string()).collect(),
        }
    }

    fn message(message: &str) -> Self {
        Self {
            messages: vec![message.to_string()],
        }
    }
}

fn error_response(error: anyhow::Error) -> Response {
    error!("{error:?}");

    let not_found = error.chain().any(|error| {
        error
            .downcast_ref::<jikan::Error>()
            .is_some_and(jikan::Error::is_not_found)
    });
    let status = if not_found {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(ApiError::from_anyhow(&error))).into_response()
}

fn json_response<T, U>(result: anyhow::Result<T>, map: impl FnOnce(T) -> U) -> Response
where
    U: serde::Serialize,
{
    match result {
        Ok(value) => (StatusCode::OK, Json(map(value))).into_response(),
        Err(error) => error_response(error),
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/anime/top", get(api_anime_top))
        .route("/anime/seasonal", get(api_anime_seasonal))
        .route("/anime/search", get(api_anime_search))
        .route("/anime/category/:genre", get(api_anime_category))
        .route("/anime/:id", get(api_anime_id))
        .route("/anime/:id/episodes", get(api_anime_id_episodes))
        .route("/streams/:id/:episode", get(api_streams))
        .route("/streams/:id/:episode/fallback", get(api_streams_fallback))
        .route("/watch/:id/:episode", get(api_watch))
}

#[derive(Debug, serde::Deserialize)]
struct PageParams {
    page: Option<NonZeroU32>,
}

impl PageParams {
    fn page(&self) -> NonZeroU32 {
        self.page.unwrap_or(NonZeroU32::MIN)
    }
}

#[derive(Debug, serde::Deserialize)]
struct SearchParams {
    q: Option<String>,
    page: Option<NonZeroU32>,
}

#[derive(Debug, serde::Serialize)]
struct ApiAnime {
    id: u64,
    title: String,
    title_english: Option<String>,
    display_title: String,
    synopsis: Option<String>,
    status: Option<String>,
    episodes: Option<u32>,
    score: Option<f64>,
    rating: Option<String>,
    genres: Vec<String>,

    image: Option<String>,
    image_large: Option<String>,
    trailer_embed_url: Option<String>,

    aired_from: Option<String>,
    aired_to: Option<String>,
}

impl From<&Anime> for ApiAnime {
    fn from(anime: &Anime) -> Self {
        Self {
            id: anime.mal_id,
            title: anime.title.clone(),
            title_english: anime.title_english.clone(),
            display_title: anime.display_title().to_string(),
            synopsis: anime.synopsis.clone(),
            status: anime.status.clone(),
            episodes: anime.episodes,
            score: anime.score,
            rating: anime.rating.clone(),
            genres: anime.genres.iter().map(|genre| genre.name.clone()).collect(),

            image: anime.images.jpg.image_url.clone(),
            image_large: anime.images.jpg.large_image_url.clone(),
            trailer_embed_url: anime
                .trailer
                .as_ref()
                .and_then(|trailer| trailer.embed_url.clone()),

            aired_from: anime.aired.as_ref().and_then(|aired| aired.from.clone()),
            aired_to: anime.aired.as_ref().and_then(|aired| aired.to.clone()),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ApiAnimeList {
    data: Vec<ApiAnime>,
    last_visible_page: u32,
    has_next_page: bool,
}

impl From<&AnimeList> for ApiAnimeList {
    fn from(list: &AnimeList) -> Self {
        Self {
            data: list.data.iter().map(ApiAnime::from).collect(),
            last_visible_page: list.pagination.last_visible_page,
            has_next_page: list.pagination.has_next_page,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ApiCategory {
    genre: String,
    matched: bool,
    data: Vec<ApiAnime>,
    last_visible_page: u32,
    has_next_page: bool,
}

impl ApiCategory {
    fn new(genre: String, page: CategoryPage) -> Self {
        Self {
            genre,
            matched: page.matched,
            data: page.anime.iter().map(ApiAnime::from).collect(),
            last_visible_page: page.pagination.last_visible_page,
            has_next_page: page.pagination.has_next_page,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ApiEpisode {
    number: u32,
    title: Option<String>,
    aired: Option<String>,
    filler: bool,
    recap: bool,
}

impl From<&Episode> for ApiEpisode {
    fn from(episode: &Episode) -> Self {
        Self {
            number: episode.number(),
            title: episode.title.clone(),
            aired: episode.aired.clone(),
            filler: episode.filler,
            recap: episode.recap,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ApiEpisodeList {
    data: Vec<ApiEpisode>,
    last_visible_page: u32,
    has_next_page: bool,
}

impl From<&EpisodeList> for ApiEpisodeList {
    fn from(list: &EpisodeList) -> Self {
        Self {
            data: list.data.iter().map(ApiEpisode::from).collect(),
            last_visible_page: list.pagination.last_visible_page,
            has_next_page: list.pagination.has_next_page,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ApiStreams {
    sources: Vec<VideoSource>,
    origin: &'static str,
}

impl From<Resolution> for ApiStreams {
    fn from(resolution: Resolution) -> Self {
        Self {
            sources: resolution.sources,
            origin: resolution.origin.as_str(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ApiWatch {
    anime: ApiAnime,
    episode: Option<ApiEpisode>,
    related_episodes: Vec<ApiEpisode>,
    has_previous: bool,
    has_next: bool,

    #[serde(flatten)]
    streams: ApiStreams,
}

impl From<WatchPage> for ApiWatch {
    fn from(page: WatchPage) -> Self {
        Self {
            anime: ApiAnime::from(&*page.anime),
            episode: page.episode.as_ref().map(ApiEpisode::from),
            related_episodes: page.related_episodes.iter().map(ApiEpisode::from).collect(),
            has_previous: page.has_previous,
            has_next: page.has_next,
            streams: ApiStreams::from(page.resolution),
        }
    }
}

async fn api_anime_top(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let result = app_state.get_top_anime(params.page()).await;
    json_response(result, |list| ApiAnimeList::from(&*list))
}

async fn api_anime_seasonal(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let result = app_state.get_seasonal_anime(params.page()).await;
    json_response(result, |list| ApiAnimeList::from(&*list))
}

async fn api_anime_search(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError::message("missing `q` query param")),
        )
            .into_response();
    }

    let page = params.page.unwrap_or(NonZeroU32::MIN);
    let result = app_state.search_anime(query, page).await;
    json_response(result, |list| ApiAnimeList::from(&*list))
}

async fn api_anime_category(
    State(app_state): State<Arc<AppState>>,
    Path(genre): Path<String>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let result = app_state.get_category_anime(&genre, params.page()).await;
    json_response(result, |page| ApiCategory::new(genre, page))
}

async fn api_anime_id(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let result = app_state.get_anime(id).await;
    json_response(result, |anime| ApiAnime::from(&*anime))
}

async fn api_anime_id_episodes(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let result = app_state.get_anime_episodes(id, params.page()).await;
    json_response(result, |list| ApiEpisodeList::from(&*list))
}

async fn api_streams(
    State(app_state): State<Arc<AppState>>,
    Path((id, episode)): Path<(u64, u32)>,
) -> impl IntoResponse {
    let resolution = app_state.resolve_streams(id, episode).await;
    Json(ApiStreams::from(resolution))
}

async fn api_streams_fallback(
    State(app_state): State<Arc<AppState>>,
    Path((id, episode)): Path<(u64, u32)>,
) -> impl IntoResponse {
    Json(app_state.fallback_streams(id, episode))
}

async fn api_watch(
    State(app_state): State<Arc<AppState>>,
    Path((id, episode)): Path<(u64, u32)>,
) -> impl IntoResponse {
    let result = app_state.get_watch_page(id, episode).await;
    json_response(result, ApiWatch::from)
}

#[cfg(test)]
mod test {
    use crate::AppState;
    use crate::Config;
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::sync::Arc;
    use stream_resolver::VideoSource;
    use tower::ServiceExt;

    const TOP_ANIME: &str = include_str!("../../../lib/jikan-rs/test_data/top_anime.json");

    /// A config whose providers point at a port nothing listens on.
    fn config(jikan_base_url: &str) -> Config {
        let config = format!(
            r#"
            bind-address = "127.0.0.1:0"

            [jikan]
            base-url = "{jikan_base_url}"
            request-delay-ms = 0

            [providers]
            primary-url = "http://127.0.0.1:9/"
            backup-url = "http://127.0.0.1:9/"
            "#
        );
        Config::parse(&config).expect("failed to parse config")
    }

    /// A jikan that knows the top anime, and no anime details.
    async fn spawn_jikan() -> String {
        let app = Router::new()
            .route("/v4/top/anime", get(|| async { TOP_ANIME }))
            .route(
                "/v4/anime/:id",
                get(|| async { (StatusCode::NOT_FOUND, r#"{"status":404}"#) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind");
        let address = listener.local_addr().expect("missing local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock jikan failed");
        });

        format!("http://{address}/v4")
    }

    async fn fetch_with(config: &Config, uri: &str) -> (StatusCode, serde_json::Value) {
        let app_state = Arc::new(AppState::new(config).expect("failed to make app state"));
        let app = crate::routes::routes(config, app_state).expect("failed to make routes");

        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .expect("request failed");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read body");
        let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

        (status, body)
    }

    /// Make a request with every upstream offline.
    async fn fetch(uri: &str) -> (StatusCode, serde_json::Value) {
        fetch_with(&config("http://127.0.0.1:9/v4"), uri).await
    }

    fn fallback_json(id: u64, episode: u32) -> serde_json::Value {
        serde_json::to_value(stream_resolver::synthetic_fallback(id, episode)).unwrap()
    }

    #[tokio::test]
    async fn fallback_streams() {
        let (status, body) = fetch("/api/streams/21/3/fallback").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, fallback_json(21, 3));

        let sources: Vec<VideoSource> = serde_json::from_value(body).unwrap();
        assert_eq!(sources[0].quality, "1080p");
    }

    #[tokio::test]
    async fn streams_fall_back_when_providers_are_down() {
        let (status, body) = fetch("/api/streams/21/3").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["origin"], "synthetic");
        assert_eq!(body["sources"], fallback_json(21, 3));
    }

    #[tokio::test]
    async fn search_requires_a_query() {
        for uri in ["/api/anime/search", "/api/anime/search?q=%20%20"] {
            let (status, body) = fetch(uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["messages"][0], "missing `q` query param");
        }
    }

    #[tokio::test]
    async fn page_zero_is_rejected() {
        let (status, _body) = fetch("/api/anime/top?page=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn catalog_errors_are_reported() {
        let (status, body) = fetch("/api/anime/21").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["messages"][0], "failed to get anime 21");
    }

    #[tokio::test]
    async fn unknown_anime_is_not_found() {
        let config = config(&spawn_jikan().await);
        let (status, body) = fetch_with(&config, "/api/anime/404404").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["messages"][0], "failed to get anime 404404");
    }

    #[tokio::test]
    async fn category_filters_top_anime() {
        let config = config(&spawn_jikan().await);
        let (status, body) = fetch_with(&config, "/api/anime/category/ACTION").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["genre"], "ACTION");
        assert_eq!(body["matched"], true);
        let ids: Vec<u64> = body["data"]
            .as_array()
            .expect("data is not an array")
            .iter()
            .filter_map(|anime| anime["id"].as_u64())
            .collect();
        assert_eq!(ids, [5114]);
    }

    #[tokio::test]
    async fn unknown_category_falls_back_to_top_anime() {
        let config = config(&spawn_jikan().await);
        let (status, body) = fetch_with(&config, "/api/anime/category/romance").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matched"], false);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["data"][1]["display_title"], "Steins;Gate");
    }
}
