use std::collections::HashSet;

/// A playable url with a quality label, like "1080p".
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct VideoSource {
    pub quality: String,
    pub url: String,
}

impl VideoSource {
    /// Make a new source
    pub fn new(quality: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            quality: quality.into(),
            url: url.into(),
        }
    }
}

/// The sources a provider (or the fallback) produced for one episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamResult {
    pub sources: Vec<VideoSource>,

    /// `true` if there is at least one source.
    pub success: bool,
}

impl StreamResult {
    /// Build a result from raw sources.
    ///
    /// Only the first source for each quality label is kept.
    pub fn from_sources(sources: Vec<VideoSource>) -> Self {
        let mut seen = HashSet::with_capacity(sources.len());
        let sources: Vec<VideoSource> = sources
            .into_iter()
            .filter(|source| seen.insert(source.quality.clone()))
            .collect();
        let success = !sources.is_empty();

        Self { sources, success }
    }

    /// Returns `true` if this result has something to play.
    pub fn is_hit(&self) -> bool {
        self.success && !self.sources.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_source_per_quality_wins() {
        let result = StreamResult::from_sources(vec![
            VideoSource::new("1080p", "https://a.example/1080.m3u8"),
            VideoSource::new("720p", "https://a.example/720.m3u8"),
            VideoSource::new("1080p", "https://b.example/1080.m3u8"),
        ]);

        assert!(result.is_hit());
        assert_eq!(
            result.sources,
            [
                VideoSource::new("1080p", "https://a.example/1080.m3u8"),
                VideoSource::new("720p", "https://a.example/720.m3u8"),
            ]
        );
    }

    #[test]
    fn empty_is_a_miss() {
        let result = StreamResult::from_sources(Vec::new());
        assert!(!result.success);
        assert!(!result.is_hit());
    }
}
