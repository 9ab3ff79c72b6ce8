//! Header search box: keyword lookup and the results dropdown.

use tracing::{debug, warn};

use crate::backend::WatchBackend;
use crate::types::SearchHit;

#[derive(Debug, Default)]
pub struct SearchPanel {
    results: Option<Vec<SearchHit>>,
    visible: bool,
}

impl SearchPanel {
    /// Runs a search. A blank query clears the panel without a request.
    pub async fn search<B: WatchBackend>(&mut self, backend: &B, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            self.results = None;
            self.visible = false;
            return;
        }
        match backend.search(query).await {
            Ok(hits) => {
                debug!(query, hits = hits.len(), "search finished");
                self.visible = !hits.is_empty();
                self.results = Some(hits);
            }
            Err(err) => {
                warn!(query, error = %err, "search failed");
                self.results = None;
                self.visible = false;
            }
        }
    }

    /// A pointer press outside the panel closes it. Results are kept.
    pub fn on_pointer_down(&mut self, inside: bool) {
        if !inside {
            self.visible = false;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn results(&self) -> &[SearchHit] {
        self.results.as_deref().unwrap_or(&[])
    }
}
