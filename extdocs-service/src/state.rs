use extdocs_core::ContentRouter;
use std::sync::Arc;

pub type SharedState = Arc<AppState>;

/// Per-process state. Every request builds its own outline tree; nothing
/// rendered is cached between requests.
pub struct AppState {
    pub router: ContentRouter,
    /// Where blocks come from, for /status
    pub source: String,
}

impl AppState {
    pub fn new(router: ContentRouter, source: impl Into<String>) -> Self {
        Self {
            router,
            source: source.into(),
        }
    }
}
