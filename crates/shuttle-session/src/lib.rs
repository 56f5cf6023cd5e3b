//! Client session state and its metadata cache.
//!
//! Background jobs write sidecar results into the [`ObjectCache`] reached
//! through a connection's [`ClientSessionState`]; request handlers read the
//! cache synchronously.

pub mod cache;
pub mod session;

pub use self::cache::{CacheError, CachedObject, ImportSummary, ObjectCache};
pub use self::session::ClientSessionState;
