mod anime;
mod episode;

pub use crate::anime::Aired;
pub use crate::anime::Anime;
pub use crate::anime::AnimeList;
pub use crate::anime::Genre;
pub use crate::anime::ImageSet;
pub use crate::anime::Images;
pub use crate::anime::Trailer;
pub use crate::episode::Episode;
pub use crate::episode::EpisodeList;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;
use url::Url;

static DEFAULT_BASE_URL: Lazy<Url> =
    Lazy::new(|| Url::parse("https://api.jikan.moe/v4").expect("invalid default base url"));

/// The delay before every request.
///
/// Jikan rejects bursts, so requests are spaced out.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(100);

/// The error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A HTTP error
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// The base url cannot have path segments
    #[error("the base url \"{0}\" cannot be a base")]
    InvalidBaseUrl(Url),
}

impl Error {
    /// Returns `true` if the server said the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Reqwest(error) => error.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::InvalidBaseUrl(_) => false,
        }
    }
}

/// A single-object response
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Document<T> {
    pub data: T,
}

/// Paging info for list responses
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Pagination {
    pub last_visible_page: u32,
    pub has_next_page: bool,
}

/// The client
#[derive(Debug, Clone)]
pub struct Client {
    /// The inner http client
    pub client: reqwest::Client,

    base_url: Url,
    request_delay: Duration,
}

impl Client {
    /// Make a new client for the public api
    pub fn new() -> Self {
        Self::with_base_url(
            reqwest::Client::new(),
            DEFAULT_BASE_URL.clone(),
            DEFAULT_REQUEST_DELAY,
        )
    }

    /// Make a new client for a specific api root, like a mirror or a test server.
    pub fn with_base_url(client: reqwest::Client, base_url: Url, request_delay: Duration) -> Self {
        Self {
            client,
            base_url,
            request_delay,
        }
    }

    /// The api root
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T>(&self, path: &[&str], query: &[(&str, &str)]) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(path);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        tokio::time::sleep(self.request_delay).await;

        debug!("GET \"{url}\"");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Get the top rated anime.
    ///
    /// `page` starts at 1.
    pub async fn get_top_anime(&self, page: NonZeroU32) -> Result<AnimeList, Error> {
        let page = page.to_string();
        self.get_json(&["top", "anime"], &[("page", page.as_str())]).await
    }

    /// Get the anime airing this season.
    pub async fn get_seasonal_anime(&self, page: NonZeroU32) -> Result<AnimeList, Error> {
        let page = page.to_string();
        self.get_json(&["seasons", "now"], &[("page", page.as_str())]).await
    }

    /// Get an anime
    pub async fn get_anime(&self, id: u64) -> Result<Document<Anime>, Error> {
        let id = id.to_string();
        self.get_json(&["anime", id.as_str()], &[]).await
    }

    /// Get a page of anime episodes
    pub async fn get_anime_episodes(
        &self,
        id: u64,
        page: NonZeroU32,
    ) -> Result<EpisodeList, Error> {
        let id = id.to_string();
        let page = page.to_string();
        self.get_json(&["anime", id.as_str(), "episodes"], &[("page", page.as_str())])
            .await
    }

    /// Perform a search for anime
    pub async fn search(&self, query: &str, page: NonZeroU32) -> Result<AnimeList, Error> {
        let page = page.to_string();
        self.get_json(&["anime"], &[("q", query), ("page", page.as_str())])
            .await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
