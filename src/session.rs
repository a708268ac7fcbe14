//! Per-page viewer state.

use crate::location::Routes;

/// One per page load; dropped when the host page goes away.
///
/// The frame's current path is not stored here; it is read live from the
/// frame each time.
#[derive(Debug, Clone)]
pub struct ViewerSession {
    routes: Routes,
    /// Markup of the last rendered result list, reused to reopen the overlay.
    last_search_results: Option<String>,
}

impl ViewerSession {
    pub fn new(archive: &str) -> Self {
        Self {
            routes: Routes::new(archive),
            last_search_results: None,
        }
    }

    pub fn archive(&self) -> &str {
        self.routes.archive()
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn last_search_results(&self) -> Option<&str> {
        self.last_search_results.as_deref()
    }

    pub fn cache_search_results(&mut self, markup: String) {
        self.last_search_results = Some(markup);
    }

    pub fn drop_search_results(&mut self) {
        self.last_search_results = None;
    }
}
