//! Per-connection session state consulted by background jobs.

use std::sync::Arc;

use crate::cache::ObjectCache;

/// State a client connection carries for its lifetime.
///
/// Jobs only need the metadata cache, which is shared behind an `Arc` so the
/// language-server handlers and background refreshes see the same store.
#[derive(Debug, Clone)]
pub struct ClientSessionState {
    connection_id: String,
    object_cache: Arc<ObjectCache>,
}

impl ClientSessionState {
    /// Creates session state with a fresh, empty cache.
    #[must_use]
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self::with_cache(connection_id, Arc::new(ObjectCache::new()))
    }

    /// Creates session state around an existing cache.
    #[must_use]
    pub fn with_cache(connection_id: impl Into<String>, object_cache: Arc<ObjectCache>) -> Self {
        Self {
            connection_id: connection_id.into(),
            object_cache,
        }
    }

    /// Identifier of the owning connection.
    #[must_use]
    pub const fn connection_id(&self) -> &str {
        self.connection_id.as_str()
    }

    /// Metadata cache for this session.
    #[must_use]
    pub const fn object_cache(&self) -> &Arc<ObjectCache> {
        &self.object_cache
    }
}
