//! # lib3mf-core
//!
//! Reading, validating and writing 3MF (3D Manufacturing Format) packages.
//!
//! A 3MF file is a ZIP container following the Open Packaging Conventions. Its model
//! parts are XML documents describing a graph of resources (mesh objects, assemblies,
//! property groups, slice stacks) and a build plan placing objects on the platform.
//!
//! ## Features
//!
//! - Pure Rust implementation with no unsafe code
//! - Namespace-dispatched reader with a warning policy and strict mode
//! - Core, materials, production, slice and beam lattice (with balls) extensions
//! - Forward references and cross-part references resolved after reading
//! - Sparse per-triangle property overlay
//! - Deterministic writer producing the same bytes for the same model
//!
//! ## Example
//!
//! ```no_run
//! use lib3mf_core::Model;
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("model.3mf")?;
//! let model = Model::from_reader(file)?;
//!
//! println!("Model contains {} resources", model.resource_count());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod mesh_info;
pub mod model;
pub mod opc;
pub mod parser;
pub mod validator;
pub mod writer;

pub use error::{Error, ErrorCategory, Result};
pub use mesh_info::{ChannelKind, FaceProperties, MeshInformation, PropertyChannel};
pub use model::{
    Attachment, BaseMaterial, BaseMaterialGroup, Beam, BeamCapMode, BeamLattice, BeamSet,
    BlendMethod, Build, BuildItem, Color, ColorGroup, Component, ComponentsObject, Composite,
    CompositeMaterials, Extension, FilterMode, Mesh, MeshObject, MetadataEntry, Model, Multi,
    MultiProperties, ObjectType, PackageResourceId, ParserConfig, Resource, ResourceId, Slice,
    SliceStack, Tex2Coord, Texture2D, Texture2DGroup, TileStyle, Transform, Triangle, Unit, Vertex,
};
pub use parser::{ModelReader, ProgressControl, ProgressStage, Warning, WarningCode, WarningLevel};

use std::io::{Read, Seek, Write};

use crate::opc::{ZipPackage, ZipPackageWriter};

impl Model {
    /// Parse a 3MF file from a reader
    ///
    /// Uses [`ParserConfig::default`], which supports every known extension. Warnings
    /// are discarded; use [`ModelReader`] to inspect them.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_core::Model;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = File::open("model.3mf")?;
    /// let model = Model::from_reader(file)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_reader_with_config(reader, ParserConfig::default())
    }

    /// Parse a 3MF file from a reader with custom configuration
    ///
    /// Elements of extensions missing from `config` are skipped like unknown content.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_core::{Extension, Model, ParserConfig};
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let file = File::open("model.3mf")?;
    /// let config = ParserConfig::new()
    ///     .with_extension(Extension::Material)
    ///     .with_strict_mode(true);
    ///
    /// let model = Model::from_reader_with_config(file, config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader_with_config<R: Read + Seek>(reader: R, config: ParserConfig) -> Result<Self> {
        ModelReader::new(config).read(reader)
    }

    /// Read the package thumbnail of a 3MF file
    ///
    /// Returns `None` when the package has no thumbnail relationship.
    pub fn read_thumbnail<R: Read + Seek>(reader: R) -> Result<Option<Vec<u8>>> {
        use crate::opc::{PACKAGE_SOURCE, PackageReader, THUMBNAIL_REL_TYPE};

        let mut package = ZipPackage::open(reader)?;
        let target = package
            .relationships(PACKAGE_SOURCE)?
            .into_iter()
            .find(|rel| rel.rel_type == THUMBNAIL_REL_TYPE)
            .map(|rel| rel.target);
        match target {
            Some(path) if package.has_part(&path) => Ok(Some(package.read_part(&path)?)),
            _ => Ok(None),
        }
    }

    /// Write the model as a 3MF file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lib3mf_core::Model;
    /// use std::fs::File;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let model = Model::new();
    /// let file = File::create("output.3mf")?;
    /// model.to_writer(file)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn to_writer<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut package = ZipPackageWriter::new(writer);
        writer::write_package(self, &mut package)?;
        package.finish()
    }

    /// Write the model as a 3MF file at `path`
    pub fn write_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_writer(file)?;
        Ok(())
    }
}
