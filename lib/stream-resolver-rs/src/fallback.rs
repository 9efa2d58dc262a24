use crate::CatalogId;
use crate::VideoSource;

/// Sample clips used when no provider has the episode.
///
/// The order is fixed; the first, third and fifth entries are the old static mock list.
pub const SAMPLE_POOL: [&str; 8] = [
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/Sintel.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ElephantsDream.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/TearsOfSteel.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerBlazes.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerEscapes.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerFun.mp4",
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/ForBiggerJoyrides.mp4",
];

/// Quality labels and their offset into [`SAMPLE_POOL`], best first.
pub const QUALITY_LADDER: [(&str, usize); 3] = [("1080p", 0), ("720p", 2), ("480p", 4)];

/// Pick sample sources for an episode.
///
/// This is a pure function of its inputs and never returns an empty list.
pub fn synthetic_fallback(catalog_id: CatalogId, episode: u32) -> Vec<VideoSource> {
    let len = SAMPLE_POOL.len();
    // Reduce both terms first so the sum cannot overflow.
    let index = ((catalog_id % len as u64) as usize + (episode as usize % len)) % len;

    QUALITY_LADDER
        .iter()
        .map(|(quality, offset)| VideoSource::new(*quality, SAMPLE_POOL[(index + offset) % len]))
        .collect()
}
