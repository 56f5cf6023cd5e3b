//! Ordered lists of one kind of metadata entry.

use std::slice;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use super::PROTOCOL_TARGET;
use super::entries::{MetadataEntry, PuppetClass, PuppetFunction, PuppetType};
use crate::error::ProtocolError;

/// An ordered list of entries of one kind, as written by the sidecar.
///
/// On the wire the list is a bare JSON array. Decoding is lenient per
/// element: an element that cannot be turned into an entry (for example
/// because it has no `key`, or the key is empty) is skipped, logged, and
/// counted in [`skipped`](Self::skipped); the rest of the list is kept. A
/// document that is not an array fails as a whole.
///
/// # Example
///
/// ```
/// use shuttle_sidecar::protocol::{MetadataEntry, PuppetClass, PuppetClassList};
///
/// let mut list = PuppetClassList::new();
/// list.push(PuppetClass::new("apache::vhost"));
/// let json = list.to_json().expect("serialise");
///
/// let back = PuppetClassList::from_json(&json).expect("deserialise");
/// assert_eq!(back.get(0).map(|c| c.key()), Some("apache::vhost"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataList<T> {
    entries: Vec<T>,
    skipped: usize,
}

/// List of puppet classes.
pub type PuppetClassList = MetadataList<PuppetClass>;
/// List of puppet functions.
pub type PuppetFunctionList = MetadataList<PuppetFunction>;
/// List of puppet resource types.
pub type PuppetTypeList = MetadataList<PuppetType>;

impl<T> Default for MetadataList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            skipped: 0,
        }
    }
}

impl<T> MetadataList<T> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }

    /// Entry at `index`, in insertion order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the entries in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.entries.iter()
    }

    /// Entries as a slice.
    #[must_use]
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// Number of elements dropped while decoding.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<T: MetadataEntry> MetadataList<T> {
    /// Serialises the list to a JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Serialize`] if an entry cannot be encoded.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|err| ProtocolError::serialize(T::LIST_NAME, err))
    }

    /// Decodes a JSON array written by the sidecar.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Deserialize`] if the document is not valid
    /// JSON or is not an array.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|err| ProtocolError::deserialize(T::LIST_NAME, err))
    }

    fn from_values(values: Vec<serde_json::Value>) -> Self {
        let mut list = Self::new();
        for (index, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<T>(value) {
                Ok(entry) if entry.key().is_empty() => {
                    list.skip(index, "identity key is empty");
                }
                Ok(entry) => list.entries.push(entry),
                Err(error) => list.skip(index, &error.to_string()),
            }
        }
        list
    }

    fn skip(&mut self, index: usize, reason: &str) {
        warn!(
            target: PROTOCOL_TARGET,
            kind = %T::KIND,
            index,
            reason,
            "skipping sidecar entry"
        );
        self.skipped += 1;
    }
}

impl<T> FromIterator<T> for MetadataList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            skipped: 0,
        }
    }
}

impl<T> Extend<T> for MetadataList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<'a, T> IntoIterator for &'a MetadataList<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<T> IntoIterator for MetadataList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T: Serialize> Serialize for MetadataList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.entries)
    }
}

impl<'de, T: MetadataEntry> Deserialize<'de> for MetadataList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
        Ok(Self::from_values(values))
    }
}
