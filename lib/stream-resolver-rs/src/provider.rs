use crate::CatalogId;
use crate::Error;
use crate::StreamResult;
use async_trait::async_trait;

/// Something that can list the sources of an episode.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Get the sources for an episode.
    ///
    /// `id` is whatever id scheme the provider understands.
    /// An `Ok` result may still be empty.
    async fn get_streams(&self, id: &str, episode: u32) -> Result<StreamResult, Error>;
}

/// The titles of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleDetails {
    pub title: String,
    pub title_english: Option<String>,
}

/// Looks up catalog metadata, for deriving provider ids from titles.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn get_details(&self, catalog_id: CatalogId) -> Result<TitleDetails, Error>;
}

#[cfg(feature = "jikan")]
#[async_trait]
impl MetadataFetcher for jikan::Client {
    async fn get_details(&self, catalog_id: CatalogId) -> Result<TitleDetails, Error> {
        let document = self.get_anime(catalog_id).await?;
        Ok(TitleDetails {
            title: document.data.title,
            title_english: document.data.title_english,
        })
    }
}
