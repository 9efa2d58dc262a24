use crate::CatalogId;
use crate::MetadataFetcher;
use anistream_util::AsyncTimedLruCache;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing::warn;

/// Hand-picked catalog ids whose provider id cannot be guessed from the title.
static CURATED: Lazy<HashMap<CatalogId, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (1, "cowboy-bebop"),
        (20, "naruto"),
        (21, "one-piece"),
        (269, "bleach"),
        (1535, "death-note"),
        (1735, "naruto-shippuden"),
        (5114, "fullmetal-alchemist-brotherhood"),
        (9253, "steinsgate"),
        (11061, "hunter-x-hunter-2011"),
        (16498, "attack-on-titan"),
        (30276, "one-punch-man"),
        (31964, "my-hero-academia"),
        (38000, "demon-slayer-kimetsu-no-yaiba"),
        (40748, "jujutsu-kaisen-tv"),
        (44511, "chainsaw-man"),
        (50265, "spy-x-family"),
        (52991, "frieren-beyond-journeys-end"),
    ])
});

/// An id in the scheme the streaming providers use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderId(Box<str>);

impl ProviderId {
    /// Get this as a str
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this id is the empty string
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.into())
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Look up a catalog id in the curated table.
pub fn static_lookup(catalog_id: CatalogId) -> Option<ProviderId> {
    CURATED.get(&catalog_id).copied().map(ProviderId::from)
}

/// Turn a title into a provider slug.
///
/// The title is lowercased, everything but ascii alphanumerics and whitespace is dropped,
/// and each whitespace run becomes a single `-`.
/// The result is empty if the title has no alphanumerics.
pub fn derive_slug(title: &str) -> ProviderId {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join("-").into()
}

/// Maps catalog ids to provider ids.
pub struct IdMapper {
    fetcher: Arc<dyn MetadataFetcher>,
    cache: Option<AsyncTimedLruCache<CatalogId, Option<ProviderId>>>,
}

impl IdMapper {
    /// Make a new mapper that asks `fetcher` for titles on every curated-table miss.
    pub fn new(fetcher: Arc<dyn MetadataFetcher>) -> Self {
        Self {
            fetcher,
            cache: None,
        }
    }

    /// Make a new mapper that remembers derived ids for `valid_for`.
    ///
    /// Misses are not remembered, so a failed lookup is retried on the next call.
    pub fn with_memoization(
        fetcher: Arc<dyn MetadataFetcher>,
        capacity: NonZeroUsize,
        valid_for: Duration,
    ) -> Self {
        Self {
            fetcher,
            cache: Some(AsyncTimedLruCache::new(capacity, valid_for)),
        }
    }

    /// Returns `true` if title lookups are memoized
    pub fn is_memoized(&self) -> bool {
        self.cache.is_some()
    }

    /// Map a catalog id to a provider id.
    ///
    /// The curated table wins; otherwise the id is derived from the catalog title.
    /// Returns `None` if the title lookup fails or yields an empty slug.
    pub async fn resolve_provider_id(&self, catalog_id: CatalogId) -> Option<ProviderId> {
        if let Some(provider_id) = static_lookup(catalog_id) {
            return Some(provider_id);
        }

        match self.cache.as_ref() {
            Some(cache) => {
                cache
                    .get_if(
                        catalog_id,
                        || self.derive_from_title(catalog_id),
                        Option::is_some,
                    )
                    .await
            }
            None => self.derive_from_title(catalog_id).await,
        }
    }

    async fn derive_from_title(&self, catalog_id: CatalogId) -> Option<ProviderId> {
        let details = match self.fetcher.get_details(catalog_id).await {
            Ok(details) => details,
            Err(error) => {
                warn!("failed to fetch title for catalog id {catalog_id}: {error}");
                return None;
            }
        };

        let provider_id = std::iter::once(details.title.as_str())
            .chain(details.title_english.as_deref())
            .map(derive_slug)
            .find(|slug| !slug.is_empty());

        match provider_id.as_ref() {
            Some(provider_id) => debug!("mapped catalog id {catalog_id} to \"{provider_id}\""),
            None => debug!("catalog id {catalog_id} has no usable title"),
        }

        provider_id
    }
}

impl std::fmt::Debug for IdMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdMapper")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
