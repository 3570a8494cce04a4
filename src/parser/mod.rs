//! XML parsing for 3MF model files
//!
//! Reading is a recursive descent over [`node::Node`]s. Every handler receives the
//! shared [`context::ReadContext`], records recoverable problems as [`Warning`]s and
//! propagates fatal ones with `?`. Cross references are queued and resolved when the
//! enclosing `<resources>` section ends.

mod beam_lattice;
pub(crate) mod context;
mod core;
mod material;
pub mod node;
mod slice;

use std::fmt;
use std::io::{Read, Seek};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Attachment, MAX_RESOURCE_INDEX, Model, ParserConfig, ResourceId};
use crate::opc::{MODEL_REL_TYPE, PACKAGE_SOURCE, PackageReader, ZipPackage, normalize_part_name};
use crate::validator;

use context::ReadContext;
use node::Attribute;

/// Vertices or triangles read between two progress callbacks
pub const PROGRESS_FACE_STRIDE: usize = 10_000;

/// Slices read between two progress callbacks
pub const PROGRESS_SLICE_STRIDE: usize = 100;

/// Reading stage reported to the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// Starting a model part
    ReadModel,
    /// Entering `<resources>`
    ReadResources,
    /// Reading mesh vertices and triangles
    ReadMesh,
    /// Reading slice stacks
    ReadSlices,
    /// Entering `<build>`
    ReadBuild,
    /// Resolving queued cross references
    ResolveReferences,
    /// Loading a linked model part
    ReadLinkedPart,
}

/// What the reader should do after a progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressControl {
    /// Keep reading
    Continue,
    /// Stop with [`Error::UserAborted`]
    Abort,
}

/// Identifies a recoverable reading problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
    /// Unknown element in a known namespace
    NamespaceInvalidElement,
    /// Unknown attribute in a known namespace
    NamespaceInvalidAttribute,
    /// A metadata name appeared twice
    DuplicateMetadata,
    /// Object type not one of model, support, solidsupport, other
    InvalidObjectType,
    /// Unit not one of the six 3MF units
    InvalidUnit,
    /// Required extension the reader does not support
    UnsupportedRequiredExtension,
    /// Triangle with repeated vertex indices
    DegenerateTriangle,
    /// Triangle properties on an object without a default property
    MissingDefaultProperty,
    /// Invalid value of an optional enumeration
    InvalidOptionalValue,
    /// Texture whose image part is missing from the package
    MissingAttachment,
    /// Metadata name with an undeclared namespace prefix
    InvalidMetadataName,
}

impl WarningCode {
    /// Severity of the condition
    pub fn level(&self) -> WarningLevel {
        match self {
            WarningCode::NamespaceInvalidElement | WarningCode::NamespaceInvalidAttribute => {
                WarningLevel::Info
            }
            WarningCode::UnsupportedRequiredExtension
            | WarningCode::MissingAttachment
            | WarningCode::MissingDefaultProperty => WarningLevel::Severe,
            _ => WarningLevel::Warning,
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Severity of a [`Warning`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WarningLevel {
    /// Content was skipped without affecting the model
    Info,
    /// A default was substituted
    Warning,
    /// The model may not render as the producer intended
    Severe,
}

/// A recoverable problem found while reading
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    /// Condition
    pub code: WarningCode,
    /// Severity
    pub level: WarningLevel,
    /// Description
    pub message: String,
}

/// Reads models from packages or model XML
///
/// The warnings of the most recent read stay available through
/// [`ModelReader::warnings`], also after the read failed.
///
/// ```
/// use lib3mf_core::ParserConfig;
/// use lib3mf_core::parser::{ModelReader, WarningCode};
///
/// let xml = r#"<model unit="parsec" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
///   <resources/>
///   <build/>
/// </model>"#;
///
/// let mut reader = ModelReader::new(ParserConfig::default());
/// let model = reader.read_from_str(xml).unwrap();
/// assert_eq!(model.unit.as_str(), "millimeter");
/// assert_eq!(reader.warnings()[0].code, WarningCode::InvalidUnit);
/// ```
pub struct ModelReader {
    config: ParserConfig,
    warnings: Vec<Warning>,
}

impl ModelReader {
    /// Create a reader
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            warnings: Vec::new(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Warnings of the last read, in document order
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Read a 3MF package from a ZIP archive
    pub fn read<R: Read + Seek>(&mut self, reader: R) -> Result<Model> {
        let mut package = ZipPackage::open(reader)?;
        self.read_from_package(&mut package)
    }

    /// Read the root model part of a package, its attachments and any linked parts
    pub fn read_from_package(&mut self, package: &mut dyn PackageReader) -> Result<Model> {
        self.warnings.clear();

        let root = normalize_part_name(&package.root_model_path()?);
        let mut model = Model::new();
        model.set_root_part(root.clone());
        self.load_attachments(package, &mut model, &root)?;

        let xml = read_part_string(package, &root)?;
        let mut ctx = ReadContext::new(&mut model, &self.config, &mut self.warnings, Some(package));
        core::read_document(&mut ctx, &xml, context::PartRole::Root)?;
        ctx.check_texture_attachments()?;
        drop(ctx);

        validator::resolve_model(&model)?;
        debug!(resources = model.resource_count(), items = model.build_items().len(); "Read 3MF package");
        Ok(model)
    }

    /// Read a standalone root model part
    ///
    /// Linked parts cannot be loaded without a package, so every `p:path` or slice ref
    /// to another part is left unresolved.
    pub fn read_from_str(&mut self, xml: &str) -> Result<Model> {
        self.warnings.clear();

        let mut model = Model::new();
        let mut ctx = ReadContext::new(&mut model, &self.config, &mut self.warnings, None);
        core::read_document(&mut ctx, xml, context::PartRole::Root)?;
        drop(ctx);

        validator::resolve_model(&model)?;
        Ok(model)
    }

    fn load_attachments(
        &self,
        package: &mut dyn PackageReader,
        model: &mut Model,
        root: &str,
    ) -> Result<()> {
        let mut relationships = package.relationships(root)?;
        relationships.extend(
            package
                .relationships(PACKAGE_SOURCE)?
                .into_iter()
                .filter(|rel| rel.target != root),
        );

        for rel in relationships {
            if !self.config.relationship_filter().accepts(&rel.rel_type) {
                debug!(target = rel.target.as_str(), rel_type = rel.rel_type.as_str(); "Relationship filtered out");
                continue;
            }
            if rel.rel_type == MODEL_REL_TYPE {
                continue;
            }
            if !package.has_part(&rel.target) {
                warn!(target = rel.target.as_str(); "Relationship target missing from package");
                continue;
            }
            let attachment = if self.config.lazy_attachments() {
                Attachment::deferred(rel.target, rel.rel_type)
            } else {
                let data = package.read_part(&rel.target)?;
                Attachment::new(rel.target, rel.rel_type, data)
            };
            model.add_attachment(attachment);
        }

        Ok(())
    }
}

/// Parse a root model part with the given configuration
///
/// Shorthand for [`ModelReader::read_from_str`] that discards warnings.
#[doc(hidden)]
pub fn parse_model_xml(xml: &str, config: ParserConfig) -> Result<Model> {
    ModelReader::new(config).read_from_str(xml)
}

pub(crate) fn read_part_string(package: &mut dyn PackageReader, path: &str) -> Result<String> {
    let bytes = package.read_part(path)?;
    String::from_utf8(bytes)
        .map_err(|e| Error::InvalidFormat(format!("Model part {} is not valid UTF-8: {}", path, e)))
}

pub(crate) fn parse_f64(element: &str, attr: &Attribute) -> Result<f64> {
    let value = attr.value.trim().parse::<f64>().map_err(|_| {
        Error::parse_error_with_context(
            &format!("{}@{}", element, attr.name),
            &attr.value,
            "floating-point number",
        )
    })?;
    if !value.is_finite() {
        return Err(Error::invalid_xml_element(
            element,
            &format!("Attribute '{}' must be finite (got {})", attr.name, attr.value),
        ));
    }
    Ok(value)
}

pub(crate) fn parse_u32(element: &str, attr: &Attribute) -> Result<u32> {
    attr.value.trim().parse::<u32>().map_err(|_| {
        Error::parse_error_with_context(
            &format!("{}@{}", element, attr.name),
            &attr.value,
            "non-negative integer",
        )
    })
}

/// Index into a vertex list or property group
pub(crate) fn parse_index(element: &str, attr: &Attribute) -> Result<u32> {
    let index = parse_u32(element, attr)?;
    if index > MAX_RESOURCE_INDEX {
        return Err(Error::invalid_xml_element(
            element,
            &format!("Attribute '{}' exceeds {} (got {})", attr.name, MAX_RESOURCE_INDEX, index),
        ));
    }
    Ok(index)
}

/// Resource ID, 1..=2147483647
pub(crate) fn parse_resource_id(element: &str, attr: &Attribute) -> Result<ResourceId> {
    let id = parse_index(element, attr)?;
    if id == 0 {
        return Err(Error::invalid_xml_element(
            element,
            &format!("Attribute '{}' must be a positive resource ID", attr.name),
        ));
    }
    Ok(id)
}

pub(crate) fn parse_u32_list(element: &str, attr: &Attribute) -> Result<Vec<u32>> {
    attr.value
        .split_whitespace()
        .map(|part| {
            part.parse::<u32>().map_err(|_| {
                Error::parse_error_with_context(
                    &format!("{}@{}", element, attr.name),
                    part,
                    "space-separated list of non-negative integers",
                )
            })
        })
        .collect()
}

pub(crate) fn parse_f64_list(element: &str, attr: &Attribute) -> Result<Vec<f64>> {
    attr.value
        .split_whitespace()
        .map(|part| match part.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(Error::parse_error_with_context(
                &format!("{}@{}", element, attr.name),
                part,
                "space-separated list of numbers",
            )),
        })
        .collect()
}

pub(crate) fn parse_bool(element: &str, attr: &Attribute) -> Result<bool> {
    match attr.value.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(Error::parse_error_with_context(
            &format!("{}@{}", element, attr.name),
            other,
            "one of 0, 1, false, true",
        )),
    }
}
