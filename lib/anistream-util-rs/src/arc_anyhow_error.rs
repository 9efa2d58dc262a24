use std::sync::Arc;

/// A cloneable [`anyhow::Error`].
///
/// Display, debug and the source chain all forward to the wrapped error.
#[derive(Clone)]
pub struct ArcAnyhowError(Arc<anyhow::Error>);

impl ArcAnyhowError {
    /// Wrap an error.
    pub fn new(error: anyhow::Error) -> Self {
        Self(Arc::new(error))
    }
}

impl std::fmt::Debug for ArcAnyhowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl std::fmt::Display for ArcAnyhowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ArcAnyhowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}
