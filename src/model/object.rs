//! Object resources: meshes and component assemblies

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::core::{MetadataEntry, Transform};
use super::mesh::Mesh;
use super::resource::ResourceId;

/// Object type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObjectType {
    /// A printable model
    #[default]
    Model,
    /// Support structure, removable after printing
    Support,
    /// Solid support structure
    SolidSupport,
    /// Anything else; cannot be placed in the build
    Other,
}

impl ObjectType {
    /// Attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Model => "model",
            ObjectType::Support => "support",
            ObjectType::SolidSupport => "solidsupport",
            ObjectType::Other => "other",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "model" => Ok(ObjectType::Model),
            "support" => Ok(ObjectType::Support),
            "solidsupport" => Ok(ObjectType::SolidSupport),
            "other" => Ok(ObjectType::Other),
            _ => Err(Error::parse_error_with_context(
                "object type",
                s,
                "one of model, support, solidsupport, other",
            )),
        }
    }
}

/// Which geometry the object's slice stack replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshResolution {
    /// The mesh is authoritative
    #[default]
    FullRes,
    /// The mesh is a preview; the slices are authoritative
    LowRes,
}

impl MeshResolution {
    /// Attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            MeshResolution::FullRes => "fullres",
            MeshResolution::LowRes => "lowres",
        }
    }
}

impl FromStr for MeshResolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fullres" => Ok(MeshResolution::FullRes),
            "lowres" => Ok(MeshResolution::LowRes),
            _ => Err(Error::parse_error_with_context(
                "meshresolution",
                s,
                "fullres or lowres",
            )),
        }
    }
}

/// Fields shared by mesh and components objects
#[derive(Debug, Clone, Default)]
pub struct ObjectInfo {
    /// Object name
    pub name: Option<String>,
    /// Part number
    pub part_number: Option<String>,
    /// Production UUID
    pub uuid: Option<String>,
    /// Object type
    pub object_type: ObjectType,
    /// Path of the thumbnail attachment
    pub thumbnail: Option<String>,
    /// Slice stack describing the object (`s:slicestackid`)
    pub slice_stack_id: Option<ResourceId>,
    /// Role of the mesh next to the slice stack
    pub mesh_resolution: MeshResolution,
    /// Object metadata
    pub metadata: Vec<MetadataEntry>,
    depth: Cell<Option<u32>>,
}

impl ObjectInfo {
    /// Memoized component nesting depth
    pub fn cached_depth(&self) -> Option<u32> {
        self.depth.get()
    }

    pub(crate) fn cache_depth(&self, depth: u32) {
        self.depth.set(Some(depth));
    }

    pub(crate) fn clear_depth(&self) {
        self.depth.set(None);
    }
}

impl PartialEq for ObjectInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.part_number == other.part_number
            && self.uuid == other.uuid
            && self.object_type == other.object_type
            && self.thumbnail == other.thumbnail
            && self.slice_stack_id == other.slice_stack_id
            && self.mesh_resolution == other.mesh_resolution
            && self.metadata == other.metadata
    }
}

/// Object holding a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct MeshObject {
    /// Resource ID
    pub id: ResourceId,
    /// Shared object fields
    pub info: ObjectInfo,
    /// Geometry and properties
    pub mesh: Mesh,
}

impl MeshObject {
    /// Create a new mesh object
    pub fn new(id: ResourceId, mesh: Mesh) -> Self {
        Self {
            id,
            info: ObjectInfo::default(),
            mesh,
        }
    }
}

/// Reference to another object with a placement
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Referenced object ID
    pub object_id: ResourceId,
    /// Part holding the object, when not the component's own part (`p:path`)
    pub path: Option<String>,
    /// Placement relative to the parent
    pub transform: Transform,
    /// Production UUID
    pub uuid: Option<String>,
}

impl Component {
    /// Create a new component
    pub fn new(object_id: ResourceId) -> Self {
        Self {
            object_id,
            path: None,
            transform: Transform::IDENTITY,
            uuid: None,
        }
    }

    /// Create a new component with a transformation
    pub fn with_transform(object_id: ResourceId, transform: Transform) -> Self {
        Self {
            transform,
            ..Self::new(object_id)
        }
    }
}

/// Object assembled from other objects
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentsObject {
    /// Resource ID
    pub id: ResourceId,
    /// Shared object fields
    pub info: ObjectInfo,
    /// Children in document order
    pub components: Vec<Component>,
}

impl ComponentsObject {
    /// Create a new components object
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            info: ObjectInfo::default(),
            components: Vec::new(),
        }
    }
}

/// Borrowed view of an object resource
#[derive(Debug, Clone, Copy)]
pub enum ObjectRef<'a> {
    /// Mesh object
    Mesh(&'a MeshObject),
    /// Components object
    Components(&'a ComponentsObject),
}

impl<'a> ObjectRef<'a> {
    /// Resource ID
    pub fn id(&self) -> ResourceId {
        match self {
            ObjectRef::Mesh(o) => o.id,
            ObjectRef::Components(o) => o.id,
        }
    }

    /// Shared object fields
    pub fn info(&self) -> &'a ObjectInfo {
        match self {
            ObjectRef::Mesh(o) => &o.info,
            ObjectRef::Components(o) => &o.info,
        }
    }
}
