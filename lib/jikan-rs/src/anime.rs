use crate::Pagination;

/// An Anime Object.
/// [Docs](https://docs.api.jikan.moe/#tag/anime/operation/getAnimeById)
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Anime {
    /// The MyAnimeList id
    pub mal_id: u64,

    /// The default (usually romanized) title
    pub title: String,
    pub title_english: Option<String>,

    pub images: Images,
    pub trailer: Option<Trailer>,

    pub synopsis: Option<String>,
    pub status: Option<String>,

    /// The number of episodes, if known
    pub episodes: Option<u32>,
    pub score: Option<f64>,

    #[serde(default)]
    pub genres: Vec<Genre>,

    pub aired: Option<Aired>,
    pub rating: Option<String>,
}

impl Anime {
    /// The english title if there is one, otherwise the default title.
    pub fn display_title(&self) -> &str {
        self.title_english
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(&self.title)
    }
}

/// Cover images, by format
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Images {
    pub jpg: ImageSet,
    pub webp: Option<ImageSet>,
}

/// One image in a few sizes
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Trailer {
    pub youtube_id: Option<String>,
    pub url: Option<String>,
    pub embed_url: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Genre {
    pub mal_id: u64,
    pub name: String,
}

/// Airing dates, as ISO 8601 strings
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Aired {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// A page of anime
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AnimeList {
    pub data: Vec<Anime>,
    pub pagination: Pagination,
}
