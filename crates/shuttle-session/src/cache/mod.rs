//! Per-connection store of sidecar metadata.
//!
//! The cache maps `(kind, identity key)` to the most recently imported entry.
//! Every import is an upsert: an entry replaces whatever was cached under the
//! same slot and nothing is ever expired here.
//!
//! Concurrency policy: all access goes through one `RwLock`, so each import
//! is atomic with respect to readers. An aggregate document is imported
//! under one write guard, so its three lists land together. Imports from
//! different actions for the same connection (say `default_classes` and
//! `default_aggregate`) are not ordered with respect to each other;
//! whichever finishes last wins for any slot they both write.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use thiserror::Error;
use tracing::debug;

use shuttle_sidecar::{
    AggregateMetadata, MetadataEntry, MetadataList, MetadataObject, ObjectKind, Origin,
};

/// Tracing target for cache operations.
const CACHE_TARGET: &str = "shuttle_session::cache";

/// A cached entry together with the origin it was imported from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedObject {
    object: MetadataObject,
    origin: Origin,
}

impl CachedObject {
    /// Wraps an entry with its origin.
    #[must_use]
    pub const fn new(object: MetadataObject, origin: Origin) -> Self {
        Self { object, origin }
    }

    /// Kind of the entry.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        self.object.kind()
    }

    /// Identity key of the entry.
    #[must_use]
    pub fn key(&self) -> &str {
        self.object.key()
    }

    /// Origin the entry was imported from.
    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// The entry itself.
    #[must_use]
    pub const fn object(&self) -> &MetadataObject {
        &self.object
    }

    /// Consumes the wrapper, returning the entry.
    #[must_use]
    pub fn into_object(self) -> MetadataObject {
        self.object
    }
}

/// What an [`ObjectCache::import`] call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Kind the entries were imported under.
    pub kind: ObjectKind,
    /// Entries written to slots that were previously empty.
    pub inserted: usize,
    /// Entries that overwrote an existing slot.
    pub replaced: usize,
}

impl ImportSummary {
    /// Total number of entries written.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.inserted + self.replaced
    }
}

/// Errors raised by cache mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// A writer panicked while holding the cache lock.
    #[error("object cache lock poisoned while importing {kind} entries")]
    Poisoned {
        /// Kind being imported when the poisoned lock was observed.
        kind: ObjectKind,
    },
}

type Section = HashMap<String, CachedObject>;

/// Metadata cache owned by one client session.
///
/// # Example
///
/// ```
/// use shuttle_session::ObjectCache;
/// use shuttle_sidecar::{ObjectKind, Origin, PuppetClass, PuppetClassList};
///
/// let cache = ObjectCache::new();
/// let list: PuppetClassList = vec![PuppetClass::new("ntp")].into_iter().collect();
/// cache.import(list, Origin::Default).expect("import");
///
/// assert!(cache.object_by_name(ObjectKind::Class, "ntp").is_some());
/// assert!(cache.object_by_name(ObjectKind::Type, "ntp").is_none());
/// ```
#[derive(Debug, Default)]
pub struct ObjectCache {
    sections: RwLock<HashMap<ObjectKind, Section>>,
}

impl ObjectCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the entry cached under `(kind, key)`.
    #[must_use]
    pub fn object_by_name(&self, kind: ObjectKind, key: &str) -> Option<CachedObject> {
        self.read()
            .get(&kind)
            .and_then(|section| section.get(key))
            .cloned()
    }

    /// Writes every entry of `list` under its kind, replacing existing slots.
    ///
    /// Entries later in the list win over earlier entries with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] if a previous writer panicked while
    /// holding the lock.
    pub fn import<T: MetadataEntry>(
        &self,
        list: MetadataList<T>,
        origin: Origin,
    ) -> Result<ImportSummary, CacheError> {
        let mut sections = self
            .sections
            .write()
            .map_err(|_| CacheError::Poisoned { kind: T::KIND })?;
        let summary = write_section(&mut sections, list, origin);
        drop(sections);
        log_import(summary, origin);
        Ok(summary)
    }

    /// Writes all three lists of `aggregate` under a single write lock.
    ///
    /// Readers see either none or all of the aggregate's entries. Summaries
    /// are returned in class, function, type order.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Poisoned`] if a previous writer panicked while
    /// holding the lock. Nothing is written in that case.
    pub fn import_aggregate(
        &self,
        aggregate: AggregateMetadata,
        origin: Origin,
    ) -> Result<Vec<ImportSummary>, CacheError> {
        let (classes, functions, types) = aggregate.into_parts();
        let mut sections = self.sections.write().map_err(|_| CacheError::Poisoned {
            kind: ObjectKind::Class,
        })?;
        let summaries = vec![
            write_section(&mut sections, classes, origin),
            write_section(&mut sections, functions, origin),
            write_section(&mut sections, types, origin),
        ];
        drop(sections);
        for summary in &summaries {
            log_import(*summary, origin);
        }
        Ok(summaries)
    }

    /// All entries of one kind, ordered by key.
    #[must_use]
    pub fn objects_by_kind(&self, kind: ObjectKind) -> Vec<CachedObject> {
        let mut objects: Vec<CachedObject> = self
            .read()
            .get(&kind)
            .map(|section| section.values().cloned().collect())
            .unwrap_or_default();
        objects.sort_by(|left, right| left.key().cmp(right.key()));
        objects
    }

    /// All entries imported from `origin`, ordered by kind then key.
    #[must_use]
    pub fn objects_by_origin(&self, origin: Origin) -> Vec<CachedObject> {
        let mut objects: Vec<CachedObject> = self
            .read()
            .values()
            .flat_map(HashMap::values)
            .filter(|object| object.origin() == origin)
            .cloned()
            .collect();
        objects.sort_by(|left, right| {
            left.kind()
                .cmp(&right.kind())
                .then_with(|| left.key().cmp(right.key()))
        });
        objects
    }

    /// Number of entries of one kind.
    #[must_use]
    pub fn len_of(&self, kind: ObjectKind) -> usize {
        self.read().get(&kind).map_or(0, HashMap::len)
    }

    /// Total number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().values().map(HashMap::len).sum()
    }

    /// Returns `true` when nothing has been imported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads recover from poisoning; each slot is written by a single insert.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ObjectKind, Section>> {
        self.sections.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Upserts `list` into its kind's section.
fn write_section<T: MetadataEntry>(
    sections: &mut HashMap<ObjectKind, Section>,
    list: MetadataList<T>,
    origin: Origin,
) -> ImportSummary {
    let mut summary = ImportSummary {
        kind: T::KIND,
        inserted: 0,
        replaced: 0,
    };
    let section = sections.entry(T::KIND).or_default();
    for entry in list {
        let key = entry.key().to_owned();
        let cached = CachedObject::new(entry.into(), origin);
        if section.insert(key, cached).is_some() {
            summary.replaced += 1;
        } else {
            summary.inserted += 1;
        }
    }
    summary
}

fn log_import(summary: ImportSummary, origin: Origin) {
    debug!(
        target: CACHE_TARGET,
        kind = %summary.kind,
        %origin,
        inserted = summary.inserted,
        replaced = summary.replaced,
        "imported sidecar entries"
    );
}

#[cfg(test)]
mod tests;
