//! OPC (Open Packaging Conventions) handling for 3MF files
//!
//! 3MF files are ZIP archives following the OPC standard, containing
//! various parts including the main 3D model file and relationships.
//!
//! The reader and writer only talk to packages through [`PackageReader`] and
//! [`PackageWriter`]. [`ZipPackage`] and [`ZipPackageWriter`] implement them over the
//! `zip` crate; [`MemoryPackage`] keeps every part in memory.

mod content_types;
mod reader;
mod relationships;
mod validation;
mod writer;

use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};

pub use content_types::ContentTypes;
pub use reader::ZipPackage;
pub use relationships::{parse_relationships, relationships_part_for, resolve_target, write_relationships};
pub use validation::{normalize_part_name, validate_part_name};
pub use writer::ZipPackageWriter;

/// Main 3D model file path within the 3MF archive
pub const MODEL_PATH: &str = "3D/3dmodel.model";

/// Content types file path
pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";

/// Relationships file path
pub const RELS_PATH: &str = "_rels/.rels";

/// 3D model relationship type
pub const MODEL_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";

/// Texture relationship type
pub const TEXTURE_REL_TYPE: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dtexture";

/// Thumbnail relationship type (OPC standard)
pub const THUMBNAIL_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

/// Content type of model parts
pub const MODEL_CONTENT_TYPE: &str = "application/vnd.ms-package.3dmanufacturing-3dmodel+xml";

/// Content type of relationship parts
pub const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Source part name of package-level relationships
pub const PACKAGE_SOURCE: &str = "/";

/// An OPC relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Identifier, unique within the relationship part
    pub id: String,
    /// Absolute part name of the target
    pub target: String,
    /// Relationship type URI
    pub rel_type: String,
}

impl Relationship {
    /// Create a new relationship
    pub fn new(id: impl Into<String>, target: impl Into<String>, rel_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target: target.into(),
            rel_type: rel_type.into(),
        }
    }
}

/// Selects relationships by type
///
/// With no include set every type is accepted unless excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipFilter {
    include: Option<HashSet<String>>,
    exclude: HashSet<String>,
}

impl RelationshipFilter {
    /// Accept every relationship type
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept the listed types (cumulative)
    pub fn include(mut self, rel_type: impl Into<String>) -> Self {
        self.include
            .get_or_insert_with(HashSet::new)
            .insert(rel_type.into());
        self
    }

    /// Reject a type
    pub fn exclude(mut self, rel_type: impl Into<String>) -> Self {
        self.exclude.insert(rel_type.into());
        self
    }

    /// True when the type passes the filter
    pub fn accepts(&self, rel_type: &str) -> bool {
        if self.exclude.contains(rel_type) {
            return false;
        }
        self.include
            .as_ref()
            .is_none_or(|include| include.contains(rel_type))
    }
}

/// Read access to a package
pub trait PackageReader {
    /// Bytes of a part
    fn read_part(&mut self, path: &str) -> Result<Vec<u8>>;

    /// True when the part exists
    fn has_part(&mut self, path: &str) -> bool;

    /// Relationships whose source is `source_part` (`/` for the package)
    fn relationships(&mut self, source_part: &str) -> Result<Vec<Relationship>>;

    /// Target of the package's 3D model relationship
    fn root_model_path(&mut self) -> Result<String> {
        self.relationships(PACKAGE_SOURCE)?
            .into_iter()
            .find(|r| r.rel_type == MODEL_REL_TYPE)
            .map(|r| r.target)
            .ok_or_else(|| Error::MissingFile("3D model relationship not found".to_string()))
    }
}

/// Write access to a package
pub trait PackageWriter {
    /// Store a part
    fn write_part(&mut self, path: &str, content_type: &str, data: &[u8]) -> Result<()>;

    /// Record a relationship from `source_part` (`/` for the package)
    fn add_relationship(&mut self, source_part: &str, relationship: Relationship) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoryPart {
    content_type: String,
    data: Vec<u8>,
}

/// Package kept entirely in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPackage {
    parts: BTreeMap<String, MemoryPart>,
    relationships: BTreeMap<String, Vec<Relationship>>,
}

impl MemoryPackage {
    /// Create an empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// Part names in sorted order
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Content type of a part
    pub fn content_type(&self, path: &str) -> Option<&str> {
        self.parts
            .get(&normalize_part_name(path))
            .map(|p| p.content_type.as_str())
    }

    /// Bytes of a part without copying
    pub fn part(&self, path: &str) -> Option<&[u8]> {
        self.parts
            .get(&normalize_part_name(path))
            .map(|p| p.data.as_slice())
    }
}

impl PackageReader for MemoryPackage {
    fn read_part(&mut self, path: &str) -> Result<Vec<u8>> {
        self.part(path)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::MissingFile(path.to_string()))
    }

    fn has_part(&mut self, path: &str) -> bool {
        self.parts.contains_key(&normalize_part_name(path))
    }

    fn relationships(&mut self, source_part: &str) -> Result<Vec<Relationship>> {
        Ok(self
            .relationships
            .get(&normalize_part_name(source_part))
            .cloned()
            .unwrap_or_default())
    }
}

impl PackageWriter for MemoryPackage {
    fn write_part(&mut self, path: &str, content_type: &str, data: &[u8]) -> Result<()> {
        let path = normalize_part_name(path);
        validate_part_name(&path)?;
        self.parts.insert(
            path,
            MemoryPart {
                content_type: content_type.to_string(),
                data: data.to_vec(),
            },
        );
        Ok(())
    }

    fn add_relationship(&mut self, source_part: &str, relationship: Relationship) -> Result<()> {
        self.relationships
            .entry(normalize_part_name(source_part))
            .or_default()
            .push(relationship);
        Ok(())
    }
}
