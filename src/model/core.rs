//! Core 3MF types and structures

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::opc::PackageReader;

use super::resource::ResourceId;

/// Namespace of the `xml:` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Largest coordinate magnitude accepted for vertices
pub const MAX_COORDINATE_VALUE: f64 = 1.0e9;

/// 3MF extension specification
///
/// Each extension owns one namespace URI. The reader dispatches elements and attributes
/// by namespace; an extension disabled in [`crate::ParserConfig`] is treated like an
/// unknown namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Extension {
    /// Core 3MF specification (always supported)
    Core,
    /// Materials & Properties Extension
    Material,
    /// Production Extension
    Production,
    /// Slice Extension
    Slice,
    /// Beam Lattice Extension
    BeamLattice,
    /// Beam Lattice balls addendum
    BeamLatticeBalls,
}

impl Extension {
    /// All extensions known to the reader
    pub const ALL: [Extension; 6] = [
        Extension::Core,
        Extension::Material,
        Extension::Production,
        Extension::Slice,
        Extension::BeamLattice,
        Extension::BeamLatticeBalls,
    ];

    /// Get the namespace URI for this extension
    pub fn namespace(&self) -> &'static str {
        match self {
            Extension::Core => "http://schemas.microsoft.com/3dmanufacturing/core/2015/02",
            Extension::Material => "http://schemas.microsoft.com/3dmanufacturing/material/2015/02",
            Extension::Production => {
                "http://schemas.microsoft.com/3dmanufacturing/production/2015/06"
            }
            Extension::Slice => "http://schemas.microsoft.com/3dmanufacturing/slice/2015/07",
            Extension::BeamLattice => {
                "http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02"
            }
            Extension::BeamLatticeBalls => {
                "http://schemas.microsoft.com/3dmanufacturing/beamlattice/balls/2020/07"
            }
        }
    }

    /// Get extension from namespace URI
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ext| ext.namespace() == namespace)
    }

    /// Prefix used when writing elements of this extension
    pub fn prefix(&self) -> &'static str {
        match self {
            Extension::Core => "",
            Extension::Material => "m",
            Extension::Production => "p",
            Extension::Slice => "s",
            Extension::BeamLattice => "b",
            Extension::BeamLatticeBalls => "b2",
        }
    }

    /// Get a human-readable name for this extension
    pub fn name(&self) -> &'static str {
        match self {
            Extension::Core => "Core",
            Extension::Material => "Material",
            Extension::Production => "Production",
            Extension::Slice => "Slice",
            Extension::BeamLattice => "BeamLattice",
            Extension::BeamLatticeBalls => "BeamLatticeBalls",
        }
    }
}

/// Unit of the model coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Unit {
    /// 0.001 mm
    Micron,
    /// The default unit
    #[default]
    Millimeter,
    /// 10 mm
    Centimeter,
    /// 25.4 mm
    Inch,
    /// 304.8 mm
    Foot,
    /// 1000 mm
    Meter,
}

impl Unit {
    /// Length of one unit in millimeters
    pub fn scale_to_millimeter(&self) -> f64 {
        match self {
            Unit::Micron => 0.001,
            Unit::Millimeter => 1.0,
            Unit::Centimeter => 10.0,
            Unit::Inch => 25.4,
            Unit::Foot => 304.8,
            Unit::Meter => 1000.0,
        }
    }

    /// Attribute value of this unit
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Micron => "micron",
            Unit::Millimeter => "millimeter",
            Unit::Centimeter => "centimeter",
            Unit::Inch => "inch",
            Unit::Foot => "foot",
            Unit::Meter => "meter",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "micron" => Ok(Unit::Micron),
            "millimeter" => Ok(Unit::Millimeter),
            "centimeter" => Ok(Unit::Centimeter),
            "inch" => Ok(Unit::Inch),
            "foot" => Ok(Unit::Foot),
            "meter" => Ok(Unit::Meter),
            _ => Err(Error::InvalidXml(format!(
                "Invalid unit '{}'. Must be one of: micron, millimeter, centimeter, inch, foot, meter",
                s
            ))),
        }
    }
}

/// A vertex in 3D space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A triangle face referencing three vertices by index
///
/// Per-corner properties are not stored here; they live in the mesh's
/// [`crate::mesh_info::MeshInformation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    /// Index of first vertex
    pub v1: u32,
    /// Index of second vertex
    pub v2: u32,
    /// Index of third vertex
    pub v3: u32,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v1: u32, v2: u32, v3: u32) -> Self {
        Self { v1, v2, v3 }
    }

    /// Vertex indices in corner order
    pub fn indices(&self) -> [u32; 3] {
        [self.v1, self.v2, self.v3]
    }

    /// True when two corners share a vertex
    pub fn is_degenerate(&self) -> bool {
        self.v1 == self.v2 || self.v1 == self.v3 || self.v2 == self.v3
    }
}

/// Size of 3MF transformation matrix (4x3 affine transform in row-major order)
pub const TRANSFORM_MATRIX_SIZE: usize = 12;

/// 4x3 affine transform
///
/// Stored in attribute order `m00 m01 m02 m10 m11 m12 m20 m21 m22 m30 m31 m32`; the last
/// row is the translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(pub [f64; TRANSFORM_MATRIX_SIZE]);

impl Transform {
    /// The identity transform
    pub const IDENTITY: Transform = Transform([
        1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
    ]);

    /// Pure translation
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::IDENTITY.0;
        m[9] = x;
        m[10] = y;
        m[11] = z;
        Transform(m)
    }

    /// Parse a `transform` attribute value
    pub fn parse(value: &str) -> Result<Self> {
        let values = value
            .split_whitespace()
            .map(|s| {
                s.parse::<f64>().map_err(|_| {
                    Error::parse_error_with_context("transform", s, "floating-point number")
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if values.len() != TRANSFORM_MATRIX_SIZE {
            return Err(Error::InvalidXml(format!(
                "Transform matrix must have exactly {} values (got {})",
                TRANSFORM_MATRIX_SIZE,
                values.len()
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidXml(format!(
                "Transform matrix values must be finite (got {})",
                bad
            )));
        }

        let mut matrix = [0.0; TRANSFORM_MATRIX_SIZE];
        matrix.copy_from_slice(&values);
        Ok(Transform(matrix))
    }

    /// Attribute representation of the matrix
    pub fn to_attribute(&self) -> String {
        self.0
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True for the identity matrix
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// True when the transform keeps the XY plane parallel to itself without Z scaling
    ///
    /// Slice data can only be instantiated through planar transforms.
    pub fn is_planar(&self) -> bool {
        let m = &self.0;
        m[2] == 0.0 && m[5] == 0.0 && m[6] == 0.0 && m[7] == 0.0 && m[8] == 1.0
    }

    /// Apply to a point
    pub fn apply(&self, v: &Vertex) -> Vertex {
        let m = &self.0;
        Vertex::new(
            v.x * m[0] + v.y * m[3] + v.z * m[6] + m[9],
            v.x * m[1] + v.y * m[4] + v.z * m[7] + m[10],
            v.x * m[2] + v.y * m[5] + v.z * m[8] + m[11],
        )
    }

    /// `self` followed by `other`
    pub fn then(&self, other: &Transform) -> Transform {
        let a = &self.0;
        let b = &other.0;
        let mut m = [0.0; TRANSFORM_MATRIX_SIZE];
        for row in 0..4 {
            for col in 0..3 {
                let mut sum = a[row * 3] * b[col] + a[row * 3 + 1] * b[3 + col] + a[row * 3 + 2] * b[6 + col];
                if row == 3 {
                    sum += b[9 + col];
                }
                m[row * 3 + col] = sum;
            }
        }
        Transform(m)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Metadata entry
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    /// Name, optionally namespace-prefixed
    pub name: String,
    /// Text value
    pub value: String,
    /// Whether editors should keep the entry when the model changes
    pub preserve: Option<bool>,
    /// Declared value type (e.g. `xs:string`)
    pub metadata_type: Option<String>,
}

impl MetadataEntry {
    /// Create a new metadata entry
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            preserve: None,
            metadata_type: None,
        }
    }

    /// Create a metadata entry with the preserve flag set
    pub fn with_preserve(name: impl Into<String>, value: impl Into<String>, preserve: bool) -> Self {
        Self {
            preserve: Some(preserve),
            ..Self::new(name, value)
        }
    }
}

/// Per-model unique handle of a build item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildItemHandle(NonZeroU32);

impl BuildItemHandle {
    /// Numeric value of the handle
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

/// A placed instance of an object in the build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildItem {
    /// ID of the referenced object
    pub object_id: ResourceId,
    /// Part holding the object, when not the root part (`p:path`)
    pub path: Option<String>,
    /// Placement transform
    pub transform: Option<Transform>,
    /// Production UUID
    pub uuid: Option<String>,
    /// Part number
    pub part_number: Option<String>,
    /// Item metadata
    pub metadata: Vec<MetadataEntry>,
    handle: Option<BuildItemHandle>,
}

impl BuildItem {
    /// Create a new build item
    pub fn new(object_id: ResourceId) -> Self {
        Self {
            object_id,
            path: None,
            transform: None,
            uuid: None,
            part_number: None,
            metadata: Vec::new(),
            handle: None,
        }
    }

    /// Create a build item with a transform
    pub fn with_transform(object_id: ResourceId, transform: Transform) -> Self {
        Self {
            transform: Some(transform),
            ..Self::new(object_id)
        }
    }

    /// Handle assigned when the item was added to a build
    pub fn handle(&self) -> Option<BuildItemHandle> {
        self.handle
    }
}

/// Build section
#[derive(Debug, Clone, Default)]
pub struct Build {
    /// Production UUID of the build
    pub uuid: Option<String>,
    items: Vec<BuildItem>,
    last_handle: u32,
}

impl Build {
    /// Create an empty build
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item and assign its handle
    pub fn add_item(&mut self, mut item: BuildItem) -> BuildItemHandle {
        self.last_handle += 1;
        let handle = BuildItemHandle(
            NonZeroU32::new(self.last_handle).unwrap_or(NonZeroU32::MIN),
        );
        item.handle = Some(handle);
        self.items.push(item);
        handle
    }

    /// Items in build order
    pub fn items(&self) -> &[BuildItem] {
        &self.items
    }

    /// Find an item by handle
    pub fn item(&self, handle: BuildItemHandle) -> Option<&BuildItem> {
        self.items.iter().find(|i| i.handle == Some(handle))
    }

    /// Find an item by handle for editing
    pub fn item_mut(&mut self, handle: BuildItemHandle) -> Option<&mut BuildItem> {
        self.items.iter_mut().find(|i| i.handle == Some(handle))
    }

    /// Remove an item
    pub fn remove_item(&mut self, handle: BuildItemHandle) -> Option<BuildItem> {
        let pos = self.items.iter().position(|i| i.handle == Some(handle))?;
        Some(self.items.remove(pos))
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the build has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A non-model part of the package (texture image, thumbnail, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Absolute part path, e.g. `/3D/Textures/wood.png`
    pub path: String,
    /// Relationship type linking the part to its model
    pub relationship_type: String,
    data: Option<Vec<u8>>,
}

impl Attachment {
    /// Create an attachment holding its payload
    pub fn new(path: impl Into<String>, relationship_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            relationship_type: relationship_type.into(),
            data: Some(data),
        }
    }

    /// Create an attachment whose payload is read later with [`Attachment::load`]
    pub fn deferred(path: impl Into<String>, relationship_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            relationship_type: relationship_type.into(),
            data: None,
        }
    }

    /// Payload, if loaded
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// True once the payload is in memory
    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// Replace the payload
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = Some(data);
    }

    /// Payload, reading it from the package on first use
    pub fn load(&mut self, package: &mut dyn PackageReader) -> Result<&[u8]> {
        if self.data.is_none() {
            self.data = Some(package.read_part(&self.path)?);
        }
        Ok(self.data.as_deref().unwrap_or_default())
    }
}
