#[cfg(feature = "arc-anyhow-error")]
mod arc_anyhow_error;
#[cfg(feature = "arc-anyhow-error")]
pub use self::arc_anyhow_error::*;

#[cfg(feature = "async-timed-lru-cache")]
mod async_timed_lru_cache;
#[cfg(feature = "async-timed-lru-cache")]
pub use self::async_timed_lru_cache::*;
