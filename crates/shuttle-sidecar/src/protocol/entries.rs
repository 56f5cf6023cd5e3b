//! Typed metadata entries reported by the sidecar.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::kind::ObjectKind;

/// Behaviour shared by every entry type that can appear in a sidecar list.
///
/// The identity key is the entry's qualified name. It is the only field the
/// refresh engine interprets; the remaining attributes are carried through to
/// the cache untouched.
pub trait MetadataEntry:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Into<MetadataObject> + Send + Sync
{
    /// Kind under which entries of this type are cached.
    const KIND: ObjectKind;

    /// Name of a list of these entries, used in error messages.
    const LIST_NAME: &'static str;

    /// Stable identity key of the entry.
    fn key(&self) -> &str;
}

/// Where an entry is defined, as reported by the sidecar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calling_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(rename = "char", default, skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<u32>,
}

impl SourceLocation {
    /// Creates a location pointing at `line`/`column` in `source`.
    #[must_use]
    pub fn new(source: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            calling_source: None,
            source: Some(source.into()),
            line: Some(line),
            column: Some(column),
            length: None,
        }
    }

    /// Records the file that caused the entry to be loaded.
    #[must_use]
    pub fn with_calling_source(mut self, calling_source: impl Into<String>) -> Self {
        self.calling_source = Some(calling_source.into());
        self
    }

    /// Records the length of the definition's name token.
    #[must_use]
    pub const fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// File that caused the entry to be loaded.
    #[must_use]
    pub fn calling_source(&self) -> Option<&str> {
        self.calling_source.as_deref()
    }

    /// File that defines the entry.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Zero-based line of the definition.
    #[must_use]
    pub const fn line(&self) -> Option<u32> {
        self.line
    }

    /// Zero-based column of the definition.
    #[must_use]
    pub const fn column(&self) -> Option<u32> {
        self.column
    }

    /// Length of the definition's name token.
    #[must_use]
    pub const fn length(&self) -> Option<u32> {
        self.length
    }
}

/// A parameter accepted by a puppet class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassParameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    data_type: Option<String>,
}

impl ClassParameter {
    /// Creates a parameter description.
    #[must_use]
    pub fn new(data_type: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            doc: Some(doc.into()),
            data_type: Some(data_type.into()),
        }
    }

    /// Documentation for the parameter.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Declared data type, e.g. `Optional[String]`.
    #[must_use]
    pub fn data_type(&self) -> Option<&str> {
        self.data_type.as_deref()
    }
}

/// A puppet class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuppetClass {
    key: String,
    #[serde(flatten)]
    location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    parameters: BTreeMap<String, ClassParameter>,
}

impl PuppetClass {
    /// Creates a class with the given qualified name.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            location: SourceLocation::default(),
            doc: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Attaches documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Attaches a source location.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, parameter: ClassParameter) -> Self {
        self.parameters.insert(name.into(), parameter);
        self
    }

    /// Source location of the definition.
    #[must_use]
    pub const fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Documentation string.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Parameters keyed by name.
    #[must_use]
    pub const fn parameters(&self) -> &BTreeMap<String, ClassParameter> {
        &self.parameters
    }
}

impl MetadataEntry for PuppetClass {
    const KIND: ObjectKind = ObjectKind::Class;
    const LIST_NAME: &'static str = "class list";

    fn key(&self) -> &str {
        self.key.as_str()
    }
}

/// A parameter in one function signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParameter {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature_key_offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature_key_length: Option<u32>,
}

impl SignatureParameter {
    /// Creates a parameter accepting the given types.
    #[must_use]
    pub fn new(name: impl Into<String>, types: Vec<String>) -> Self {
        Self {
            name: name.into(),
            types,
            ..Self::default()
        }
    }

    /// Parameter name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Accepted types.
    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Documentation string.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

/// One callable signature of a puppet function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    return_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<SignatureParameter>,
}

impl FunctionSignature {
    /// Creates a signature with its rendered form, e.g. `lookup(String $name)`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: SignatureParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the return types.
    #[must_use]
    pub fn with_return_types(mut self, return_types: Vec<String>) -> Self {
        self.return_types = return_types;
        self
    }

    /// Rendered signature.
    #[must_use]
    pub const fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Documentation string.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Declared return types.
    #[must_use]
    pub fn return_types(&self) -> &[String] {
        &self.return_types
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[SignatureParameter] {
        &self.parameters
    }
}

/// A puppet function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuppetFunction {
    key: String,
    #[serde(flatten)]
    location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    signatures: Vec<FunctionSignature>,
}

impl PuppetFunction {
    /// Creates a function with the given qualified name.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            location: SourceLocation::default(),
            doc: None,
            function_version: None,
            signatures: Vec::new(),
        }
    }

    /// Attaches documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Attaches a source location.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Records the function API version (3 or 4).
    #[must_use]
    pub const fn with_function_version(mut self, version: u32) -> Self {
        self.function_version = Some(version);
        self
    }

    /// Adds a signature.
    #[must_use]
    pub fn with_signature(mut self, signature: FunctionSignature) -> Self {
        self.signatures.push(signature);
        self
    }

    /// Source location of the definition.
    #[must_use]
    pub const fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Documentation string.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Function API version.
    #[must_use]
    pub const fn function_version(&self) -> Option<u32> {
        self.function_version
    }

    /// Callable signatures.
    #[must_use]
    pub fn signatures(&self) -> &[FunctionSignature] {
        &self.signatures
    }
}

impl MetadataEntry for PuppetFunction {
    const KIND: ObjectKind = ObjectKind::Function;
    const LIST_NAME: &'static str = "function list";

    fn key(&self) -> &str {
        self.key.as_str()
    }
}

/// An attribute (parameter or property) of a puppet resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAttribute {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    attribute_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(rename = "required?", default, skip_serializing_if = "Option::is_none")]
    required: Option<bool>,
    #[serde(rename = "isnamevar?", default, skip_serializing_if = "Option::is_none")]
    is_namevar: Option<bool>,
}

impl TypeAttribute {
    /// Creates an attribute of the given flavour (`param` or `property`).
    #[must_use]
    pub fn new(attribute_type: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            attribute_type: Some(attribute_type.into()),
            doc: Some(doc.into()),
            required: None,
            is_namevar: None,
        }
    }

    /// Marks the attribute as the resource's namevar.
    #[must_use]
    pub const fn as_namevar(mut self) -> Self {
        self.is_namevar = Some(true);
        self
    }

    /// Marks the attribute as required.
    #[must_use]
    pub const fn as_required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    /// Attribute flavour, `param` or `property`.
    #[must_use]
    pub fn attribute_type(&self) -> Option<&str> {
        self.attribute_type.as_deref()
    }

    /// Documentation string.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Whether the attribute must be supplied.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    /// Whether the attribute is the namevar.
    #[must_use]
    pub fn is_namevar(&self) -> bool {
        self.is_namevar.unwrap_or(false)
    }
}

/// A puppet resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuppetType {
    key: String,
    #[serde(flatten)]
    location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    doc: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, TypeAttribute>,
}

impl PuppetType {
    /// Creates a type with the given name.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            location: SourceLocation::default(),
            doc: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Attaches documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Attaches a source location.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: TypeAttribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Source location of the definition.
    #[must_use]
    pub const fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Documentation string.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Attributes keyed by name.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, TypeAttribute> {
        &self.attributes
    }
}

impl MetadataEntry for PuppetType {
    const KIND: ObjectKind = ObjectKind::Type;
    const LIST_NAME: &'static str = "type list";

    fn key(&self) -> &str {
        self.key.as_str()
    }
}

/// Any entry the sidecar can report, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataObject {
    /// A puppet class.
    Class(PuppetClass),
    /// A puppet function.
    Function(PuppetFunction),
    /// A puppet resource type.
    Type(PuppetType),
}

impl MetadataObject {
    /// Kind of the wrapped entry.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Class(_) => ObjectKind::Class,
            Self::Function(_) => ObjectKind::Function,
            Self::Type(_) => ObjectKind::Type,
        }
    }

    /// Identity key of the wrapped entry.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Class(entry) => entry.key(),
            Self::Function(entry) => entry.key(),
            Self::Type(entry) => entry.key(),
        }
    }

    /// Returns the class, if this is one.
    #[must_use]
    pub const fn as_class(&self) -> Option<&PuppetClass> {
        match self {
            Self::Class(entry) => Some(entry),
            Self::Function(_) | Self::Type(_) => None,
        }
    }

    /// Returns the function, if this is one.
    #[must_use]
    pub const fn as_function(&self) -> Option<&PuppetFunction> {
        match self {
            Self::Function(entry) => Some(entry),
            Self::Class(_) | Self::Type(_) => None,
        }
    }

    /// Returns the type, if this is one.
    #[must_use]
    pub const fn as_type(&self) -> Option<&PuppetType> {
        match self {
            Self::Type(entry) => Some(entry),
            Self::Class(_) | Self::Function(_) => None,
        }
    }
}

impl From<PuppetClass> for MetadataObject {
    fn from(entry: PuppetClass) -> Self {
        Self::Class(entry)
    }
}

impl From<PuppetFunction> for MetadataObject {
    fn from(entry: PuppetFunction) -> Self {
        Self::Function(entry)
    }
}

impl From<PuppetType> for MetadataObject {
    fn from(entry: PuppetType) -> Self {
        Self::Type(entry)
    }
}
