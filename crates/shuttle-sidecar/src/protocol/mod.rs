//! JSON documents exchanged with the sidecar.
//!
//! The sidecar writes one document to stdout and exits. List actions write a
//! JSON array of entries; aggregate actions write an object with `classes`,
//! `functions` and `types` arrays. Every entry carries a mandatory `key` (its
//! qualified name) alongside descriptive attributes that the refresh engine
//! stores without interpreting.

mod aggregate;
mod entries;
mod list;

/// Tracing target for protocol decoding.
const PROTOCOL_TARGET: &str = "shuttle_sidecar::protocol";

pub use self::aggregate::AggregateMetadata;
pub use self::entries::{
    ClassParameter, FunctionSignature, MetadataEntry, MetadataObject, PuppetClass,
    PuppetFunction, PuppetType, SignatureParameter, SourceLocation, TypeAttribute,
};
pub use self::list::{MetadataList, PuppetClassList, PuppetFunctionList, PuppetTypeList};
