use crate::Pagination;

/// An episode from an Anime
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Episode {
    /// The episode number.
    ///
    /// Jikan reuses the `mal_id` field for this.
    pub mal_id: u32,

    pub title: Option<String>,
    pub title_romanji: Option<String>,

    /// The MyAnimeList page for this episode
    pub url: Option<String>,
    pub forum_url: Option<String>,

    /// The date the episode was aired
    pub aired: Option<String>,
    pub score: Option<f64>,

    #[serde(default)]
    pub filler: bool,
    #[serde(default)]
    pub recap: bool,
}

impl Episode {
    /// The episode number
    pub fn number(&self) -> u32 {
        self.mal_id
    }
}

/// A page of episodes
#[derive(Debug, Clone, serde::Deserialize)]
pub struct EpisodeList {
    pub data: Vec<Episode>,
    pub pagination: Pagination,
}
