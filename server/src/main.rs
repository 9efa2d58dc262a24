mod app_state;
mod config;
mod logger;
mod routes;

pub use self::app_state::AppState;
pub use self::config::Config;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load_path(&config_path).context("failed to load config")?;
    crate::logger::init(&config).context("failed to init logger")?;

    let tokio_rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    tokio_rt.block_on(async_main(config))
}

async fn async_main(config: Config) -> anyhow::Result<()> {
    let app_state = Arc::new(AppState::new(&config).context("failed to init app state")?);
    let app = self::routes::routes(&config, app_state.clone())?;
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind to address \"{}\"", config.bind_address))?;

    info!("listening on \"{}\"", config.bind_address);

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error");

    // In-flight catalog requests are drained here, after the last connection closed.
    let shutdown_result = app_state
        .shutdown()
        .await
        .context("failed to shutdown app state");
    if let Err(error) = shutdown_result.as_ref() {
        error!("{error:?}");
    }

    serve_result.and(shutdown_result)
}

/// Resolves on ctrl+c, or right away if the handler cannot be installed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c()
        .await
        .context("failed to register ctrl+c handler")
    {
        Ok(()) => info!("shutting down"),
        Err(error) => error!("{error:?}"),
    }
}
