mod api;

use crate::AppState;
use crate::Config;
use anyhow::Context;
use axum::Router;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::services::ServeFile;
use tower_http::trace::DefaultMakeSpan;
use tower_http::trace::DefaultOnFailure;
use tower_http::trace::DefaultOnRequest;
use tower_http::trace::DefaultOnResponse;
use tower_http::trace::TraceLayer;

pub fn routes(config: &Config, app_state: Arc<AppState>) -> anyhow::Result<Router> {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(
            DefaultMakeSpan::new()
                .level(tracing::Level::INFO)
                .include_headers(config.logging.include_headers),
        )
        .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
        .on_response(DefaultOnResponse::new().level(tracing::Level::INFO))
        .on_failure(DefaultOnFailure::new().level(tracing::Level::ERROR));

    let mut router = Router::new().nest("/api", self::api::routes());

    if let Some(public_directory) = config.public_directory.as_ref() {
        let public_directory = std::fs::canonicalize(public_directory)
            .context("failed to canonicalize public directory")?;
        let index_path = public_directory.join("index.html");
        let serve_dir = ServeDir::new(&public_directory).fallback(ServeFile::new(index_path));

        router = router.fallback_service(serve_dir);
    }

    Ok(router.layer(trace_layer).with_state(app_state))
}
