mod client;
mod fallback;
mod mapper;
mod provider;
mod resolver;
mod source;

pub use self::client::Client;
pub use self::fallback::synthetic_fallback;
pub use self::fallback::QUALITY_LADDER;
pub use self::fallback::SAMPLE_POOL;
pub use self::mapper::derive_slug;
pub use self::mapper::static_lookup;
pub use self::mapper::IdMapper;
pub use self::mapper::ProviderId;
pub use self::provider::MetadataFetcher;
pub use self::provider::StreamProvider;
pub use self::provider::TitleDetails;
pub use self::resolver::Attempt;
pub use self::resolver::Origin;
pub use self::resolver::Resolution;
pub use self::resolver::Resolver;
pub use self::source::StreamResult;
pub use self::source::VideoSource;

/// An id from the metadata catalog (a MyAnimeList id).
pub type CatalogId = u64;

/// The library error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A HTTP error
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    /// A provider host cannot have path segments
    #[error("the provider url \"{0}\" cannot be a base")]
    InvalidBaseUrl(url::Url),

    /// The provider answered, but had nothing to play
    #[error("the provider returned no sources")]
    EmptySources,

    /// A jikan error
    #[cfg(feature = "jikan")]
    #[error(transparent)]
    Jikan(#[from] jikan::Error),

    /// Some other metadata fetcher failed
    #[error("failed to fetch metadata")]
    Metadata(#[source] Box<dyn std::error::Error + Send + Sync>),
}
