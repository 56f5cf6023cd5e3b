//! Sidecar lookups for the refresh engine.
//!
//! The sidecar is a short-lived helper process that enumerates the puppet
//! classes, functions and types visible to a client. This crate owns the
//! three pieces of that boundary:
//!
//! - [`Action`]: which lookup to run, and what shape of document it yields.
//! - [`protocol`]: the typed JSON documents the sidecar writes to stdout.
//! - [`invoker`]: running the sidecar and collecting stdout, stderr, and the
//!   exit status.
//!
//! Deciding what a failed run means, and where decoded entries end up, is
//! left to the caller.

pub mod action;
pub mod error;
pub mod invoker;
pub mod kind;
pub mod protocol;

pub use self::action::{Action, ActionParseError, ActionPayload};
pub use self::error::{ProtocolError, SidecarError};
pub use self::invoker::{ProcessInvoker, SidecarInvoker, SidecarOutput};
pub use self::kind::{ObjectKind, Origin};
pub use self::protocol::{
    AggregateMetadata, MetadataEntry, MetadataList, MetadataObject, PuppetClass, PuppetClassList,
    PuppetFunction, PuppetFunctionList, PuppetType, PuppetTypeList,
};
