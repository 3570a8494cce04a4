//! Error types for 3MF reading, resolution and writing
//!
//! All errors carry an error code in their message so that callers can match on a
//! stable identifier even when the descriptive text changes.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and package errors
//! - **E2xxx**: XML and document structure errors
//! - **E3xxx**: Model, reference and graph errors
//! - **E4xxx**: Unsupported features
//! - **E5xxx**: Reader policy (strict mode, cancellation)
//!
//! Recoverable conditions found while reading are not errors: they are recorded as
//! [`crate::parser::Warning`]s and only surface here as [`Error::StrictModeWarning`]
//! when strict mode is enabled.

use std::io;
use thiserror::Error;

use crate::model::ResourceId;
use crate::parser::WarningCode;

/// Result type for 3MF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
///
/// Mirrors the failure taxonomy of the reader: structural errors in the document,
/// dangling or out-of-range references, graph errors in the component hierarchy,
/// promoted warnings and user cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Package or stream level failure
    Io,
    /// Malformed document: missing attribute/element, duplicate ID, invalid literal
    Structural,
    /// Dangling or out-of-range cross-reference
    Reference,
    /// Cycle or excessive nesting in the component graph
    Graph,
    /// A recoverable warning promoted to an error by strict mode
    Warning,
    /// The progress callback requested cancellation
    Aborted,
    /// Serialization failure
    Write,
}

/// Errors that can occur when reading, resolving or writing 3MF models
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading or writing
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - The package file cannot be opened or created
    /// - A package entry could not be read in full
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - The input is not a ZIP archive (an STL or a bare model document, for example)
    /// - A truncated download
    /// - An entry compressed with a method the `zip` build does not include
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Missing part in the package
    ///
    /// **Error Code**: E1003
    ///
    /// **Common Causes**:
    /// - Incomplete 3MF package
    /// - A slice reference or `p:path` pointing at a part that was never written
    /// - Reading a linked part without a package
    #[error("[E1003] Missing required file: {0}")]
    MissingFile(String),

    /// XML tokenizer error
    ///
    /// **Error Code**: E2001
    ///
    /// **Common Causes**:
    /// - Mismatched or unclosed tags in a model part
    /// - An undeclared namespace prefix
    /// - A malformed entity or character reference
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute error
    ///
    /// **Error Code**: E2002
    ///
    /// **Common Causes**:
    /// - Duplicate attribute on one element
    /// - Unquoted attribute value
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Invalid XML structure
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Missing required attributes or child elements
    /// - Duplicate `<resources>` or `<build>` sections
    /// - Out-of-range vertex indices
    ///
    /// **Suggestions**:
    /// - Check element hierarchy matches the 3MF core specification
    /// - Verify required attributes are present
    #[error("[E2003] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Invalid package format
    ///
    /// **Error Code**: E2004
    ///
    /// **Common Causes**:
    /// - No `[Content_Types].xml` or no `_rels/.rels`
    /// - No 3D model relationship from the package root
    /// - A part name that breaks the OPC naming rules
    #[error("[E2004] Invalid 3MF format: {0}")]
    InvalidFormat(String),

    /// XML writing error
    ///
    /// **Error Code**: E2005
    #[error("[E2005] XML writing error: {0}")]
    XmlWrite(String),

    /// A resource with the same ID already exists in the part
    ///
    /// **Error Code**: E2006
    ///
    /// **Suggestions**:
    /// - Use [`crate::Model::generate_resource_id`] to obtain a free ID
    #[error("[E2006] Duplicate resource ID {id} in part '{part}'")]
    DuplicateResourceId {
        /// Part path owning the resource
        part: String,
        /// Conflicting resource ID
        id: ResourceId,
    },

    /// A reader node was driven out of its lifecycle order
    ///
    /// **Error Code**: E2007
    #[error("[E2007] Invalid reader node state for <{element}>: {message}")]
    InvalidNodeState {
        /// Element the node was created for
        element: String,
        /// What went wrong
        message: String,
    },

    /// Invalid model structure
    ///
    /// **Error Code**: E3001
    ///
    /// **Common Causes**:
    /// - An object with both a mesh and components, or neither
    /// - Slices out of Z order
    /// - Build items in a non-root part
    #[error("[E3001] Invalid model: {0}")]
    InvalidModel(String),

    /// A numeric, color or transform literal could not be read
    ///
    /// **Error Code**: E3002
    ///
    /// Locale-formatted numbers such as `1,5` are a frequent source.
    #[error("[E3002] Parse error: {0}")]
    ParseError(String),

    /// A reference did not resolve to any resource
    ///
    /// **Error Code**: E3003
    #[error("[E3003] Resource {id} not found in part '{part}' (referenced by {referenced_by})")]
    ResourceNotFound {
        /// Part path the reference points into
        part: String,
        /// Referenced ID
        id: ResourceId,
        /// Description of the referencing element
        referenced_by: String,
    },

    /// A reference resolved to a resource of the wrong kind
    ///
    /// **Error Code**: E3004
    #[error("[E3004] Resource {id} is a {found}, expected {expected}")]
    ResourceTypeMismatch {
        /// Referenced ID
        id: ResourceId,
        /// Expected resource kind
        expected: String,
        /// Actual resource kind
        found: String,
    },

    /// A property index is outside its group
    ///
    /// **Error Code**: E3005
    ///
    /// Property indices are never clamped.
    #[error("[E3005] Property index {index} out of range for group {group} with {count} entries")]
    PropertyIndexOutOfRange {
        /// Group resource ID
        group: ResourceId,
        /// Offending index
        index: u32,
        /// Number of entries in the group
        count: usize,
    },

    /// The component graph contains a cycle
    ///
    /// **Error Code**: E3006
    #[error("[E3006] Circular reference: {0}")]
    CircularReference(String),

    /// The component graph is nested deeper than the reader allows
    ///
    /// **Error Code**: E3007
    #[error("[E3007] Component nesting of object {object} exceeds the limit of {limit}")]
    ExcessiveNestingDepth {
        /// Object at which the limit was exceeded
        object: ResourceId,
        /// Configured limit
        limit: u32,
    },

    /// A mesh information channel already exists
    ///
    /// **Error Code**: E3008
    #[error("[E3008] Mesh information channel {0} already exists")]
    DuplicateChannel(String),

    /// Unsupported feature
    ///
    /// **Error Code**: E4001
    #[error("[E4001] Unsupported feature: {0}")]
    Unsupported(String),

    /// Required extension not supported
    ///
    /// **Error Code**: E4002
    ///
    /// **Suggestions**:
    /// - Check the file's `requiredextensions` attribute
    /// - Enable the extension in [`crate::ParserConfig`]
    #[error("[E4002] Required extension not supported: {0}")]
    UnsupportedExtension(String),

    /// A warning was recorded while strict mode is enabled
    ///
    /// **Error Code**: E5001
    #[error("[E5001] Strict mode: {code}: {message}")]
    StrictModeWarning {
        /// Code of the promoted warning
        code: WarningCode,
        /// Warning text
        message: String,
    },

    /// The progress callback requested cancellation
    ///
    /// **Error Code**: E5002
    #[error("[E5002] Reading aborted by progress callback")]
    UserAborted,
}

impl From<std::num::ParseFloatError> for Error {
    fn from(err: std::num::ParseFloatError) -> Self {
        Error::ParseError(format!("Failed to parse floating-point number: {}", err))
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseError(format!("Failed to parse integer: {}", err))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Io(_) | Error::Zip(_) | Error::MissingFile(_) => ErrorCategory::Io,
            Error::Xml(_)
            | Error::XmlAttr(_)
            | Error::InvalidXml(_)
            | Error::InvalidFormat(_)
            | Error::DuplicateResourceId { .. }
            | Error::InvalidNodeState { .. }
            | Error::InvalidModel(_)
            | Error::ParseError(_)
            | Error::DuplicateChannel(_)
            | Error::Unsupported(_)
            | Error::UnsupportedExtension(_) => ErrorCategory::Structural,
            Error::ResourceNotFound { .. }
            | Error::ResourceTypeMismatch { .. }
            | Error::PropertyIndexOutOfRange { .. } => ErrorCategory::Reference,
            Error::CircularReference(_) | Error::ExcessiveNestingDepth { .. } => {
                ErrorCategory::Graph
            }
            Error::StrictModeWarning { .. } => ErrorCategory::Warning,
            Error::UserAborted => ErrorCategory::Aborted,
            Error::XmlWrite(_) => ErrorCategory::Write,
        }
    }

    /// InvalidXml naming the offending element, e.g. a `<triangle>` past the vertex count
    pub fn invalid_xml_element(element: &str, message: &str) -> Self {
        Error::InvalidXml(format!("Element '<{}>': {}", element, message))
    }

    /// Create an InvalidXml error for a missing required attribute
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        Error::InvalidXml(format!(
            "Element '<{}>' is missing required attribute '{}'. \
             Check the 3MF specification for required attributes.",
            element, attribute
        ))
    }

    /// ParseError for a literal in `field_name` (`element@attribute` in the reader)
    pub fn parse_error_with_context(field_name: &str, value: &str, expected_type: &str) -> Self {
        Error::ParseError(format!(
            "Failed to parse '{}': expected {}, got '{}'. \
             Verify the value is properly formatted.",
            field_name, expected_type, value
        ))
    }

    /// Create an XmlWrite error
    pub fn xml_write(message: String) -> Self {
        Error::XmlWrite(message)
    }

    /// Create a ResourceNotFound error
    pub fn resource_not_found(part: &str, id: ResourceId, referenced_by: impl Into<String>) -> Self {
        Error::ResourceNotFound {
            part: part.to_string(),
            id,
            referenced_by: referenced_by.into(),
        }
    }

    /// Create a ResourceTypeMismatch error
    pub fn type_mismatch(id: ResourceId, expected: &str, found: &str) -> Self {
        Error::ResourceTypeMismatch {
            id,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}
