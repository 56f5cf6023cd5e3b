//! The combined class, function and type document.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entries::{MetadataEntry, MetadataObject};
use super::list::{MetadataList, PuppetClassList, PuppetFunctionList, PuppetTypeList};
use crate::error::ProtocolError;

const DOCUMENT: &str = "aggregate metadata";

/// Classes, functions and types reported by one aggregate sidecar run.
///
/// Serialised as `{ "classes": [...], "functions": [...], "types": [...] }`.
/// A list missing from the document decodes as empty; anything other than a
/// JSON object is rejected.
///
/// # Example
///
/// ```
/// use shuttle_sidecar::protocol::{AggregateMetadata, PuppetClass, PuppetType};
///
/// let mut aggregate = AggregateMetadata::new();
/// aggregate.append(PuppetClass::new("ntp").into());
/// aggregate.append(PuppetType::new("file").into());
/// assert_eq!(aggregate.classes().len(), 1);
/// assert_eq!(aggregate.types().len(), 1);
/// assert!(aggregate.functions().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateMetadata {
    classes: PuppetClassList,
    functions: PuppetFunctionList,
    types: PuppetTypeList,
}

impl AggregateMetadata {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry to the list matching its kind.
    pub fn append(&mut self, object: MetadataObject) {
        match object {
            MetadataObject::Class(entry) => self.classes.push(entry),
            MetadataObject::Function(entry) => self.functions.push(entry),
            MetadataObject::Type(entry) => self.types.push(entry),
        }
    }

    /// Class list.
    #[must_use]
    pub const fn classes(&self) -> &PuppetClassList {
        &self.classes
    }

    /// Function list.
    #[must_use]
    pub const fn functions(&self) -> &PuppetFunctionList {
        &self.functions
    }

    /// Type list.
    #[must_use]
    pub const fn types(&self) -> &PuppetTypeList {
        &self.types
    }

    /// Splits the aggregate into its three lists.
    #[must_use]
    pub fn into_parts(self) -> (PuppetClassList, PuppetFunctionList, PuppetTypeList) {
        (self.classes, self.functions, self.types)
    }

    /// Elements dropped across all three lists while decoding.
    #[must_use]
    pub const fn skipped(&self) -> usize {
        self.classes.skipped() + self.functions.skipped() + self.types.skipped()
    }

    /// Serialises the aggregate to a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Serialize`] if an entry cannot be encoded.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|err| ProtocolError::serialize(DOCUMENT, err))
    }

    /// Decodes the aggregate document written by the sidecar.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Deserialize`] if the document is not a JSON
    /// object or any of its lists is not an array.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(|err| ProtocolError::deserialize(DOCUMENT, err))
    }
}

impl<'de> Deserialize<'de> for AggregateMetadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self {
            classes: take_list(&mut fields, "classes")?,
            functions: take_list(&mut fields, "functions")?,
            types: take_list(&mut fields, "types")?,
        })
    }
}

fn take_list<T, E>(fields: &mut Map<String, Value>, name: &str) -> Result<MetadataList<T>, E>
where
    T: MetadataEntry,
    E: de::Error,
{
    fields.remove(name).map_or_else(
        || Ok(MetadataList::new()),
        |value| {
            MetadataList::<T>::deserialize(value)
                .map_err(|err| E::custom(format_args!("invalid `{name}` list: {err}")))
        },
    )
}
