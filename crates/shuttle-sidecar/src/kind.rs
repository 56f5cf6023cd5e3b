//! Classification of metadata entries and where they came from.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of metadata entry reported by the sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// A puppet class.
    Class,
    /// A puppet function.
    Function,
    /// A puppet resource type.
    Type,
}

impl ObjectKind {
    /// Every kind, in the order the aggregate document lists them.
    pub const ALL: [Self; 3] = [Self::Class, Self::Function, Self::Type];

    /// Lower-case label used in logs and cache diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Function => "function",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Where a batch of metadata was discovered.
///
/// `default_*` actions enumerate the puppet installation and its module path;
/// `workspace_*` actions enumerate the module open in the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Installation-wide metadata.
    Default,
    /// Metadata from the client's workspace.
    Workspace,
}

impl fmt::Display for Origin {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Default => "default",
            Self::Workspace => "workspace",
        };
        formatter.write_str(label)
    }
}
