mod catalog;

use self::catalog::CatalogTask;
use crate::Config;
use anyhow::Context;
use jikan::Anime;
use jikan::AnimeList;
use jikan::Episode;
use jikan::EpisodeList;
use jikan::Pagination;
use std::num::NonZeroU32;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use stream_resolver::IdMapper;
use stream_resolver::Resolution;
use stream_resolver::Resolver;
use stream_resolver::VideoSource;
use tracing::warn;

const MAPPING_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// How far around the current episode related episodes are picked from.
const RELATED_EPISODE_RADIUS: u32 = 2;

/// Everything the watch page shows
#[derive(Debug)]
pub struct WatchPage {
    pub anime: Arc<Anime>,

    /// The current episode, if the catalog lists it
    pub episode: Option<Episode>,

    /// Listed episodes close to the current one, sorted by number
    pub related_episodes: Vec<Episode>,

    pub has_previous: bool,
    pub has_next: bool,

    pub resolution: Resolution,
}

/// A page of top anime narrowed down to one genre
#[derive(Debug)]
pub struct CategoryPage {
    /// Whether any anime on the page has the genre.
    ///
    /// If not, `anime` is the whole page.
    pub matched: bool,
    pub anime: Vec<Anime>,
    pub pagination: Pagination,
}

pub struct AppState {
    catalog: CatalogTask,
    resolver: Resolver,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let jikan_http = reqwest::Client::builder()
            .build()
            .context("failed to build jikan http client")?;
        let jikan = jikan::Client::with_base_url(
            jikan_http,
            config.jikan.base_url.clone(),
            config.jikan.request_delay(),
        );

        let provider_http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.providers.timeout_secs))
            .build()
            .context("failed to build provider http client")?;
        let primary =
            stream_resolver::Client::with_client(provider_http.clone(), config.providers.primary_url.clone());
        let backup = config.providers.backup_mirror_urls.iter().cloned().fold(
            stream_resolver::Client::with_client(provider_http, config.providers.backup_url.clone()),
            stream_resolver::Client::with_mirror,
        );

        let fetcher = Arc::new(jikan.clone());
        let mapper = match config.cache.mapping_seconds {
            0 => IdMapper::new(fetcher),
            seconds => IdMapper::with_memoization(
                fetcher,
                MAPPING_CACHE_CAPACITY,
                Duration::from_secs(seconds),
            ),
        };
        let resolver = Resolver::new(Arc::new(primary), Arc::new(backup), Arc::new(mapper));

        let catalog = CatalogTask::new(jikan, Duration::from_secs(config.cache.catalog_seconds));

        Ok(Self { catalog, resolver })
    }

    pub async fn get_top_anime(&self, page: NonZeroU32) -> anyhow::Result<Arc<AnimeList>> {
        self.catalog.get_top_anime(page).await
    }

    pub async fn get_seasonal_anime(&self, page: NonZeroU32) -> anyhow::Result<Arc<AnimeList>> {
        self.catalog.get_seasonal_anime(page).await
    }

    /// Get a page of top anime with the given genre, matched case-insensitively.
    pub async fn get_category_anime(
        &self,
        genre: &str,
        page: NonZeroU32,
    ) -> anyhow::Result<CategoryPage> {
        let list = self.get_top_anime(page).await?;
        Ok(build_category_page(&list, genre))
    }

    pub async fn search_anime(
        &self,
        query: &str,
        page: NonZeroU32,
    ) -> anyhow::Result<Arc<AnimeList>> {
        self.catalog.search(query, page).await
    }

    pub async fn get_anime(&self, id: u64) -> anyhow::Result<Arc<Anime>> {
        self.catalog.get_anime(id).await
    }

    pub async fn get_anime_episodes(
        &self,
        id: u64,
        page: NonZeroU32,
    ) -> anyhow::Result<Arc<EpisodeList>> {
        self.catalog.get_anime_episodes(id, page).await
    }

    pub async fn resolve_streams(&self, id: u64, episode: u32) -> Resolution {
        self.resolver.resolve(id, episode).await
    }

    pub fn fallback_streams(&self, id: u64, episode: u32) -> Vec<VideoSource> {
        stream_resolver::synthetic_fallback(id, episode)
    }

    /// Gather the anime, its first episode page and the sources for one episode.
    ///
    /// A missing episode list only hides navigation, it does not fail the page.
    pub async fn get_watch_page(&self, id: u64, episode: u32) -> anyhow::Result<WatchPage> {
        let catalog = async {
            let anime = self.get_anime(id).await?;
            let episodes = match self.get_anime_episodes(id, NonZeroU32::MIN).await {
                Ok(episodes) => episodes.data.clone(),
                Err(error) => {
                    warn!("{error:?}");
                    Vec::new()
                }
            };
            anyhow::Ok((anime, episodes))
        };
        let (catalog, resolution) = tokio::join!(catalog, self.resolve_streams(id, episode));
        let (anime, episodes) = catalog?;

        Ok(build_watch_page(anime, episodes, episode, resolution))
    }

    /// Shutdown the app state.
    ///
    /// This should only be called once
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.catalog
            .shutdown()
            .await
            .context("failed to shutdown the catalog task")
    }
}

fn build_category_page(list: &AnimeList, genre: &str) -> CategoryPage {
    let genre = genre.trim().to_lowercase();
    let matching: Vec<Anime> = list
        .data
        .iter()
        .filter(|anime| {
            anime
                .genres
                .iter()
                .any(|anime_genre| anime_genre.name.to_lowercase() == genre)
        })
        .cloned()
        .collect();

    let matched = !matching.is_empty();
    CategoryPage {
        matched,
        anime: if matched { matching } else { list.data.clone() },
        pagination: list.pagination.clone(),
    }
}

fn build_watch_page(
    anime: Arc<Anime>,
    episodes: Vec<Episode>,
    current: u32,
    resolution: Resolution,
) -> WatchPage {
    let has_previous = current > 1;
    let has_next = episodes
        .iter()
        .any(|episode| Some(episode.number()) == current.checked_add(1));
    let episode = episodes
        .iter()
        .find(|episode| episode.number() == current)
        .cloned();

    let mut related_episodes: Vec<Episode> = episodes
        .into_iter()
        .filter(|episode| episode.number().abs_diff(current) <= RELATED_EPISODE_RADIUS)
        .collect();
    related_episodes.sort_by_key(Episode::number);

    WatchPage {
        anime,
        episode,
        related_episodes,
        has_previous,
        has_next,
        resolution,
    }
}
