use crate::synthetic_fallback;
use crate::CatalogId;
use crate::IdMapper;
use crate::StreamProvider;
use crate::VideoSource;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;
use tracing::info;

/// One step of the resolution chain.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Attempt {
    /// Ask the primary provider, using the catalog id as is.
    Primary,

    /// Ask the backup provider, using the catalog id as is.
    Backup,

    /// Map the catalog id to a provider id, then ask the backup provider.
    BackupMapped,
}

impl Attempt {
    /// The chain used unless told otherwise.
    pub const DEFAULT_CHAIN: &'static [Attempt] =
        &[Attempt::Primary, Attempt::Backup, Attempt::BackupMapped];

    /// Get this as a str.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Backup => "backup",
            Self::BackupMapped => "backup-mapped",
        }
    }
}

impl std::fmt::Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a list of sources came from
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Origin {
    /// A provider attempt hit
    Provider(Attempt),

    /// Every attempt missed, so sample clips were picked
    Synthetic,
}

impl Origin {
    /// Get this as a str.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Provider(attempt) => attempt.as_str(),
            Self::Synthetic => "synthetic",
        }
    }

    /// Returns `true` if this is `Synthetic`.
    pub fn is_synthetic(self) -> bool {
        matches!(self, Self::Synthetic)
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of resolving an episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Never empty
    pub sources: Vec<VideoSource>,
    pub origin: Origin,
}

/// Resolves playable sources for an episode.
///
/// Attempts are made one after another, stopping at the first provider with sources.
/// When they all miss, sample clips are returned instead, so resolving never fails.
#[derive(Clone)]
pub struct Resolver {
    primary: Arc<dyn StreamProvider>,
    backup: Arc<dyn StreamProvider>,
    mapper: Arc<IdMapper>,
    chain: Arc<[Attempt]>,
}

impl Resolver {
    /// Make a new resolver using [`Attempt::DEFAULT_CHAIN`].
    pub fn new(
        primary: Arc<dyn StreamProvider>,
        backup: Arc<dyn StreamProvider>,
        mapper: Arc<IdMapper>,
    ) -> Self {
        Self {
            primary,
            backup,
            mapper,
            chain: Attempt::DEFAULT_CHAIN.into(),
        }
    }

    /// Replace the attempt chain.
    ///
    /// An empty chain always resolves to sample clips.
    pub fn with_chain(mut self, chain: &[Attempt]) -> Self {
        self.chain = chain.into();
        self
    }

    /// The attempts, in the order they are made
    pub fn chain(&self) -> &[Attempt] {
        &self.chain
    }

    /// Resolve the sources for an episode.
    pub async fn resolve(&self, catalog_id: CatalogId, episode: u32) -> Resolution {
        for &attempt in self.chain.iter() {
            if let Some(sources) = self.try_attempt(attempt, catalog_id, episode).await {
                info!(
                    "resolved catalog id {catalog_id} episode {episode} via {attempt} ({} sources)",
                    sources.len()
                );
                return Resolution {
                    sources,
                    origin: Origin::Provider(attempt),
                };
            }
        }

        info!("no provider has catalog id {catalog_id} episode {episode}, using sample clips");
        Resolution {
            sources: synthetic_fallback(catalog_id, episode),
            origin: Origin::Synthetic,
        }
    }

    /// Resolve the sources for an episode, dropping where they came from.
    pub async fn resolve_streams(&self, catalog_id: CatalogId, episode: u32) -> Vec<VideoSource> {
        self.resolve(catalog_id, episode).await.sources
    }

    /// Make a single attempt, returning the sources on a hit.
    async fn try_attempt(
        &self,
        attempt: Attempt,
        catalog_id: CatalogId,
        episode: u32,
    ) -> Option<Vec<VideoSource>> {
        let (provider, id): (&dyn StreamProvider, Cow<'_, str>) = match attempt {
            Attempt::Primary => (&*self.primary, catalog_id.to_string().into()),
            Attempt::Backup => (&*self.backup, catalog_id.to_string().into()),
            Attempt::BackupMapped => {
                let Some(provider_id) = self.mapper.resolve_provider_id(catalog_id).await else {
                    debug!("{attempt}: no provider id for catalog id {catalog_id}");
                    return None;
                };
                (&*self.backup, String::from(provider_id.as_str()).into())
            }
        };

        match provider.get_streams(&id, episode).await {
            Ok(result) if result.is_hit() => Some(result.sources),
            Ok(_) => {
                debug!("{attempt}: \"{id}\" episode {episode} has no sources");
                None
            }
            Err(error) => {
                debug!("{attempt}: \"{id}\" episode {episode} failed: {error}");
                None
            }
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("mapper", &self.mapper)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Client;
    use crate::Error;
    use crate::MetadataFetcher;
    use crate::StreamResult;
    use crate::TitleDetails;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    /// A provider that knows a fixed set of `(id, episode)` pairs and records every request.
    #[derive(Default)]
    struct FakeProvider {
        streams: HashMap<(String, u32), Vec<VideoSource>>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn with(mut self, id: &str, episode: u32, sources: Vec<VideoSource>) -> Self {
            self.streams.insert((id.into(), episode), sources);
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StreamProvider for FakeProvider {
        async fn get_streams(&self, id: &str, episode: u32) -> Result<StreamResult, Error> {
            self.requests.lock().unwrap().push(id.to_string());
            match self.streams.get(&(id.to_string(), episode)) {
                Some(sources) => Ok(StreamResult::from_sources(sources.clone())),
                None => Err(Error::EmptySources),
            }
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        titles: HashMap<CatalogId, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataFetcher for FakeFetcher {
        async fn get_details(&self, catalog_id: CatalogId) -> Result<TitleDetails, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let title = self
                .titles
                .get(&catalog_id)
                .cloned()
                .ok_or_else(|| Error::Metadata("not found".into()))?;
            Ok(TitleDetails {
                title,
                title_english: None,
            })
        }
    }

    fn sources(tag: &str) -> Vec<VideoSource> {
        vec![
            VideoSource::new("1080p", format!("https://{tag}.example/1080.m3u8")),
            VideoSource::new("360p", format!("https://{tag}.example/360.m3u8")),
        ]
    }

    fn resolver(
        primary: &Arc<FakeProvider>,
        backup: &Arc<FakeProvider>,
        fetcher: &Arc<FakeFetcher>,
    ) -> Resolver {
        let mapper = Arc::new(IdMapper::new(fetcher.clone()));
        Resolver::new(primary.clone(), backup.clone(), mapper)
    }

    #[test]
    fn default_chain_order() {
        assert_eq!(
            Attempt::DEFAULT_CHAIN,
            [Attempt::Primary, Attempt::Backup, Attempt::BackupMapped]
        );
    }

    #[tokio::test]
    async fn primary_hit_short_circuits() {
        let primary = Arc::new(FakeProvider::default().with("21", 3, sources("primary")));
        let backup = Arc::new(FakeProvider::default().with("21", 3, sources("backup")));
        let fetcher = Arc::new(FakeFetcher::default());

        let resolution = resolver(&primary, &backup, &fetcher).resolve(21, 3).await;

        assert_eq!(resolution.origin, Origin::Provider(Attempt::Primary));
        assert_eq!(resolution.sources, sources("primary"));
        assert!(backup.requests().is_empty());
    }

    #[tokio::test]
    async fn backup_direct_hit() {
        let primary = Arc::new(FakeProvider::default());
        let backup = Arc::new(FakeProvider::default().with("100", 1, sources("backup")));
        let fetcher = Arc::new(FakeFetcher::default());

        let resolution = resolver(&primary, &backup, &fetcher).resolve(100, 1).await;

        assert_eq!(resolution.origin, Origin::Provider(Attempt::Backup));
        assert_eq!(resolution.sources, sources("backup"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mapped_hit_is_returned_exactly() {
        let primary = Arc::new(FakeProvider::default());
        let backup = Arc::new(FakeProvider::default().with("vinland-saga", 2, sources("mapped")));
        let fetcher = Arc::new(FakeFetcher {
            titles: HashMap::from([(37521, "Vinland Saga".to_string())]),
            ..Default::default()
        });

        let resolution = resolver(&primary, &backup, &fetcher).resolve(37521, 2).await;

        assert_eq!(resolution.origin, Origin::Provider(Attempt::BackupMapped));
        assert_eq!(resolution.sources, sources("mapped"));
        assert_eq!(primary.requests(), ["37521"]);
        assert_eq!(backup.requests(), ["37521", "vinland-saga"]);
    }

    #[tokio::test]
    async fn all_misses_fall_back_to_samples() {
        let primary = Arc::new(FakeProvider::default());
        let backup = Arc::new(FakeProvider::default());
        let fetcher = Arc::new(FakeFetcher::default());
        let resolver = resolver(&primary, &backup, &fetcher);

        let resolution = resolver.resolve(21, 3).await;

        assert!(resolution.origin.is_synthetic());
        assert_eq!(resolution.sources, synthetic_fallback(21, 3));
        // 21 is curated, so the mapped attempt still reaches the backup provider.
        assert_eq!(backup.requests(), ["21", "one-piece"]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mapping_miss_skips_mapped_attempt() {
        let primary = Arc::new(FakeProvider::default());
        let backup = Arc::new(FakeProvider::default());
        let fetcher = Arc::new(FakeFetcher::default());

        let resolution = resolver(&primary, &backup, &fetcher).resolve(999_999, 1).await;

        assert!(resolution.origin.is_synthetic());
        assert_eq!(backup.requests(), ["999999"]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_provider_response_is_a_miss() {
        let primary = Arc::new(FakeProvider::default().with("7", 1, Vec::new()));
        let backup = Arc::new(FakeProvider::default().with("7", 1, sources("backup")));
        let fetcher = Arc::new(FakeFetcher::default());

        let resolution = resolver(&primary, &backup, &fetcher).resolve(7, 1).await;

        assert_eq!(resolution.origin, Origin::Provider(Attempt::Backup));
    }

    #[tokio::test]
    async fn resolved_lists_are_never_empty_and_unique() {
        let primary = Arc::new(FakeProvider::default().with(
            "1",
            1,
            vec![
                VideoSource::new("720p", "https://a.example/1"),
                VideoSource::new("720p", "https://a.example/2"),
            ],
        ));
        let backup = Arc::new(FakeProvider::default());
        let fetcher = Arc::new(FakeFetcher::default());
        let resolver = resolver(&primary, &backup, &fetcher);

        for (id, episode) in [(1, 1), (1, 2), (21, 3), (40_000, 12)] {
            let sources = resolver.resolve_streams(id, episode).await;
            let qualities: HashSet<&str> =
                sources.iter().map(|source| source.quality.as_str()).collect();

            assert!(!sources.is_empty());
            assert_eq!(qualities.len(), sources.len());
        }
    }

    #[tokio::test]
    async fn custom_chain_is_followed() {
        let primary = Arc::new(FakeProvider::default().with("5", 5, sources("primary")));
        let backup = Arc::new(FakeProvider::default().with("5", 5, sources("backup")));
        let fetcher = Arc::new(FakeFetcher::default());
        let resolver = resolver(&primary, &backup, &fetcher).with_chain(&[Attempt::Backup]);

        assert_eq!(resolver.chain(), [Attempt::Backup]);
        let resolution = resolver.resolve(5, 5).await;
        assert_eq!(resolution.origin, Origin::Provider(Attempt::Backup));
        assert!(primary.requests().is_empty());

        let resolution = resolver.clone().with_chain(&[]).resolve(5, 5).await;
        assert!(resolution.origin.is_synthetic());
    }

    #[tokio::test]
    async fn unreachable_providers_fall_back_to_samples() {
        // Nothing listens on the discard port.
        let dead = url::Url::parse("http://127.0.0.1:9/").unwrap();
        let primary = Arc::new(Client::new(dead.clone()));
        let backup = Arc::new(Client::new(dead.clone()).with_mirror(dead));
        let mapper = Arc::new(IdMapper::new(Arc::new(FakeFetcher::default())));
        let resolver = Resolver::new(primary, backup, mapper);

        assert_eq!(
            resolver.resolve_streams(21, 3).await,
            synthetic_fallback(21, 3)
        );
    }
}
