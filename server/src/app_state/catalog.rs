use anistream_util::ArcAnyhowError;
use anistream_util::AsyncTimedLruCache;
use anyhow::Context;
use jikan::Anime;
use jikan::AnimeList;
use jikan::EpisodeList;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroU32;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::info;
use tracing::warn;

const CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

type CatalogResult<T, E = ArcAnyhowError> = Result<Arc<T>, E>;
type CatalogCache<K, T> = AsyncTimedLruCache<K, CatalogResult<T>>;
type CatalogTx<T> = tokio::sync::oneshot::Sender<CatalogResult<T, anyhow::Error>>;

#[derive(Debug)]
enum CatalogTaskMessage {
    Close {
        tx: tokio::sync::oneshot::Sender<()>,
    },
    GetTopAnime {
        page: NonZeroU32,
        tx: CatalogTx<AnimeList>,
    },
    GetSeasonalAnime {
        page: NonZeroU32,
        tx: CatalogTx<AnimeList>,
    },
    Search {
        query: Box<str>,
        page: NonZeroU32,
        tx: CatalogTx<AnimeList>,
    },
    GetAnime {
        id: u64,
        tx: CatalogTx<Anime>,
    },
    GetAnimeEpisodes {
        id: u64,
        page: NonZeroU32,
        tx: CatalogTx<EpisodeList>,
    },
}

/// Owns the jikan client and its caches.
#[derive(Debug)]
pub struct CatalogTask {
    tx: tokio::sync::mpsc::Sender<CatalogTaskMessage>,
    handle: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl CatalogTask {
    pub fn new(client: jikan::Client, valid_for: Duration) -> Self {
        let (tx, rx) = tokio::sync::mpsc::channel(16);

        let handle = tokio::spawn(catalog_task_impl(rx, client, valid_for));

        Self {
            tx,
            handle: std::sync::Mutex::new(Some(handle)),
        }
    }

    async fn request<T>(
        &self,
        make_message: impl FnOnce(CatalogTx<T>) -> CatalogTaskMessage,
    ) -> anyhow::Result<Arc<T>> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(make_message(tx))
            .await
            .context("the catalog task is gone")?;
        rx.await?
    }

    pub async fn get_top_anime(&self, page: NonZeroU32) -> anyhow::Result<Arc<AnimeList>> {
        self.request(|tx| CatalogTaskMessage::GetTopAnime { page, tx })
            .await
    }

    pub async fn get_seasonal_anime(&self, page: NonZeroU32) -> anyhow::Result<Arc<AnimeList>> {
        self.request(|tx| CatalogTaskMessage::GetSeasonalAnime { page, tx })
            .await
    }

    pub async fn search(&self, query: &str, page: NonZeroU32) -> anyhow::Result<Arc<AnimeList>> {
        self.request(|tx| CatalogTaskMessage::Search {
            query: query.into(),
            page,
            tx,
        })
        .await
    }

    pub async fn get_anime(&self, id: u64) -> anyhow::Result<Arc<Anime>> {
        self.request(|tx| CatalogTaskMessage::GetAnime { id, tx })
            .await
    }

    pub async fn get_anime_episodes(
        &self,
        id: u64,
        page: NonZeroU32,
    ) -> anyhow::Result<Arc<EpisodeList>> {
        self.request(|tx| CatalogTaskMessage::GetAnimeEpisodes { id, page, tx })
            .await
    }

    async fn close(&self) -> anyhow::Result<()> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.tx.send(CatalogTaskMessage::Close { tx }).await?;
        rx.await?;
        Ok(())
    }

    async fn join(&self) -> anyhow::Result<()> {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .context("missing handle")?;

        handle.await?;

        Ok(())
    }

    /// Close and join the task
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        // If we failed to close,
        // its probably because the task is dead.
        // Therefore, it is safe to join.
        let close_result = self.close().await;
        let join_result = self.join().await;

        join_result.or(close_result)
    }
}

async fn catalog_task_impl(
    mut rx: tokio::sync::mpsc::Receiver<CatalogTaskMessage>,
    client: jikan::Client,
    valid_for: Duration,
) {
    let top_cache = Arc::new(CatalogCache::new(CACHE_CAPACITY, valid_for));
    let seasonal_cache = Arc::new(CatalogCache::new(CACHE_CAPACITY, valid_for));
    let search_cache = Arc::new(CatalogCache::new(CACHE_CAPACITY, valid_for));
    let anime_cache = Arc::new(CatalogCache::new(CACHE_CAPACITY, valid_for));
    let episodes_cache = Arc::new(CatalogCache::new(CACHE_CAPACITY, valid_for));
    let mut join_set = JoinSet::new();

    loop {
        tokio::select! {
            message = rx.recv() => {
                let client = client.clone();
                match message {
                    Some(CatalogTaskMessage::Close { tx }) => {
                        rx.close();
                        let _ = tx.send(()).is_ok();
                    }
                    Some(CatalogTaskMessage::GetTopAnime { page, tx }) => {
                        join_set.spawn(cached_request_task_impl(
                            top_cache.clone(),
                            page,
                            move || async move {
                                info!("getting top anime page {page}");
                                client
                                    .get_top_anime(page)
                                    .await
                                    .with_context(|| format!("failed to get top anime page {page}"))
                            },
                            tx,
                        ));
                    }
                    Some(CatalogTaskMessage::GetSeasonalAnime { page, tx }) => {
                        join_set.spawn(cached_request_task_impl(
                            seasonal_cache.clone(),
                            page,
                            move || async move {
                                info!("getting seasonal anime page {page}");
                                client
                                    .get_seasonal_anime(page)
                                    .await
                                    .with_context(|| format!("failed to get seasonal anime page {page}"))
                            },
                            tx,
                        ));
                    }
                    Some(CatalogTaskMessage::Search { query, page, tx }) => {
                        join_set.spawn(cached_request_task_impl(
                            search_cache.clone(),
                            (query.clone(), page),
                            move || async move {
                                info!("searching for \"{query}\" page {page}");
                                client
                                    .search(&query, page)
                                    .await
                                    .with_context(|| format!("failed to search for \"{query}\""))
                            },
                            tx,
                        ));
                    }
                    Some(CatalogTaskMessage::GetAnime { id, tx }) => {
                        join_set.spawn(cached_request_task_impl(
                            anime_cache.clone(),
                            id,
                            move || async move {
                                info!("getting anime {id}");
                                client
                                    .get_anime(id)
                                    .await
                                    .map(|document| document.data)
                                    .with_context(|| format!("failed to get anime {id}"))
                            },
                            tx,
                        ));
                    }
                    Some(CatalogTaskMessage::GetAnimeEpisodes { id, page, tx }) => {
                        join_set.spawn(cached_request_task_impl(
                            episodes_cache.clone(),
                            (id, page),
                            move || async move {
                                info!("getting episodes of anime {id} page {page}");
                                client
                                    .get_anime_episodes(id, page)
                                    .await
                                    .with_context(|| format!("failed to get episodes of anime {id}"))
                            },
                            tx,
                        ));
                    }
                    None => {
                        break;
                    }
                }
            }
            Some(result) = join_set.join_next() => {
                match result.context("failed to join task") {
                    Ok(()) => {}
                    Err(error) => {
                        warn!("{error}");
                    }
                }
            }
        }
    }

    while let Some(result) = join_set.join_next().await {
        if let Err(error) = result.context("failed to join task") {
            warn!("{error}");
        }
    }
}

async fn cached_request_task_impl<K, T, FN, FUT>(
    cache: Arc<CatalogCache<K, T>>,
    key: K,
    fetch: FN,
    tx: CatalogTx<T>,
) where
    K: Eq + Hash + Clone,
    FN: FnOnce() -> FUT,
    FUT: Future<Output = anyhow::Result<T>>,
{
    // Only successes outlive the request, so a rate limit or outage is retried next time.
    let result = cache
        .get_if(
            key,
            || async move { fetch().await.map(Arc::new).map_err(ArcAnyhowError::new) },
            Result::is_ok,
        )
        .await
        .map_err(anyhow::Error::from);

    let _ = tx.send(result).is_ok();
}
