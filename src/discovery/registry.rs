//! Engine registry: union of all applicable engines, failures isolated.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::{debug, warn};

use super::{Candidate, DiscoveryEngine, DiscoveryQuery};
use crate::fetch::FetchClient;

/// Ordered collection of discovery engines.
pub struct DiscoveryRegistry {
    engines: Vec<Box<dyn DiscoveryEngine>>,
}

impl DiscoveryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
        }
    }

    #[tracing::instrument(skip(self, engine), fields(engine_name))]
    pub fn register(&mut self, engine: Box<dyn DiscoveryEngine>) {
        tracing::Span::current().record("engine_name", engine.name());
        debug!(name = engine.name(), "registering discovery engine");
        self.engines.push(engine);
    }

    #[must_use]
    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|engine| engine.name()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Runs every engine that handles `query` and unions their results.
    ///
    /// An engine that errors or panics contributes nothing; the others still
    /// run. Duplicates are removed by exact URL string, keeping first-seen
    /// order and provenance.
    #[tracing::instrument(skip(self, client), fields(query = %query.label()))]
    pub async fn discover_all(&self, query: &DiscoveryQuery, client: &FetchClient) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for engine in self.engines.iter().filter(|engine| engine.handles(query)) {
            let outcome = AssertUnwindSafe(engine.discover(query, client))
                .catch_unwind()
                .await;
            let urls = match outcome {
                Ok(Ok(urls)) => urls,
                Ok(Err(error)) => {
                    warn!(engine = engine.name(), error = %error, "discovery engine failed");
                    continue;
                }
                Err(_) => {
                    warn!(engine = engine.name(), "discovery engine panicked");
                    continue;
                }
            };

            debug!(engine = engine.name(), count = urls.len(), "engine results");
            for url in urls {
                if seen.insert(url.clone()) {
                    candidates.push(Candidate::new(url, engine.name(), query));
                }
            }
        }
        candidates
    }
}

impl std::fmt::Debug for DiscoveryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryRegistry")
            .field("engines", &self.engine_names())
            .finish()
    }
}

impl Default for DiscoveryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
