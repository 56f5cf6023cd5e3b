//! Lookup actions understood by the sidecar.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::kind::{ObjectKind, Origin};

/// A sidecar lookup, passed to the process as `--action=<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Classes, functions and types from the installation, in one document.
    DefaultAggregate,
    /// Classes from the installation.
    DefaultClasses,
    /// Functions from the installation.
    DefaultFunctions,
    /// Types from the installation.
    DefaultTypes,
    /// Classes, functions and types from the workspace, in one document.
    WorkspaceAggregate,
    /// Classes from the workspace.
    WorkspaceClasses,
    /// Functions from the workspace.
    WorkspaceFunctions,
    /// Types from the workspace.
    WorkspaceTypes,
}

/// Shape of the document an action produces on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPayload {
    /// An object holding one list per [`ObjectKind`].
    Aggregate,
    /// A single list of the given kind.
    List(ObjectKind),
}

impl Action {
    /// Every supported action.
    pub const ALL: [Self; 8] = [
        Self::DefaultAggregate,
        Self::DefaultClasses,
        Self::DefaultFunctions,
        Self::DefaultTypes,
        Self::WorkspaceAggregate,
        Self::WorkspaceClasses,
        Self::WorkspaceFunctions,
        Self::WorkspaceTypes,
    ];

    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DefaultAggregate => "default_aggregate",
            Self::DefaultClasses => "default_classes",
            Self::DefaultFunctions => "default_functions",
            Self::DefaultTypes => "default_types",
            Self::WorkspaceAggregate => "workspace_aggregate",
            Self::WorkspaceClasses => "workspace_classes",
            Self::WorkspaceFunctions => "workspace_functions",
            Self::WorkspaceTypes => "workspace_types",
        }
    }

    /// Origin stamped on every entry imported from this action.
    #[must_use]
    pub const fn origin(self) -> Origin {
        match self {
            Self::DefaultAggregate
            | Self::DefaultClasses
            | Self::DefaultFunctions
            | Self::DefaultTypes => Origin::Default,
            Self::WorkspaceAggregate
            | Self::WorkspaceClasses
            | Self::WorkspaceFunctions
            | Self::WorkspaceTypes => Origin::Workspace,
        }
    }

    /// Document shape the sidecar writes for this action.
    #[must_use]
    pub const fn payload(self) -> ActionPayload {
        match self {
            Self::DefaultAggregate | Self::WorkspaceAggregate => ActionPayload::Aggregate,
            Self::DefaultClasses | Self::WorkspaceClasses => ActionPayload::List(ObjectKind::Class),
            Self::DefaultFunctions | Self::WorkspaceFunctions => {
                ActionPayload::List(ObjectKind::Function)
            }
            Self::DefaultTypes | Self::WorkspaceTypes => ActionPayload::List(ObjectKind::Type),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when an action name is not recognised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported sidecar action: {0}")]
pub struct ActionParseError(String);

impl ActionParseError {
    /// Creates a parse error describing the unsupported value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the offending value that could not be parsed.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == normalised)
            .ok_or_else(|| ActionParseError::new(normalised))
    }
}
