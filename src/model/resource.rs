//! Resource identifiers, the resource sum type and property groups

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::num::NonZeroU32;

use super::material::{
    BaseMaterialGroup, ColorGroup, CompositeMaterials, MultiProperties, Texture2D, Texture2DGroup,
};
use super::object::{ComponentsObject, MeshObject, ObjectInfo};
use super::slice::SliceStack;

/// Resource ID, unique within one package part
pub type ResourceId = u32;

/// Property ID inside a property group
///
/// Assigned monotonically from 1; 0 never names an entry and marks "no property" in
/// face records.
pub type PropertyId = u32;

/// Largest resource ID or index accepted in a document
pub const MAX_RESOURCE_INDEX: u32 = 2_147_483_647;

/// (part, ID) pair naming a resource in a multi-part package
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    /// Absolute part path, e.g. `/3D/3dmodel.model`
    pub part: String,
    /// Resource ID within the part
    pub id: ResourceId,
}

impl ResourceKey {
    /// Create a new key
    pub fn new(part: impl Into<String>, id: ResourceId) -> Self {
        Self {
            part: part.into(),
            id,
        }
    }
}

/// Opaque model-wide handle of a resource
///
/// Handles are unique across all parts of a model, so they can be stored in face records
/// without carrying the part path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageResourceId(NonZeroU32);

impl PackageResourceId {
    pub(crate) fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(PackageResourceId)
    }

    /// Numeric value of the handle (never 0)
    pub fn unique_id(&self) -> u32 {
        self.0.get()
    }
}

/// Ordered group of property values addressed by index or by property ID
///
/// Entries get increasing property IDs. The index → property ID map is built on first
/// indexed access and dropped by every mutation, so an append after the map was used
/// extends the group without changing any existing index.
#[derive(Debug, Clone)]
pub struct PropertyGroup<T> {
    entries: BTreeMap<PropertyId, T>,
    next_property_id: PropertyId,
    index_map: OnceCell<Vec<PropertyId>>,
}

impl<T> PropertyGroup<T> {
    /// Create an empty group
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_property_id: 1,
            index_map: OnceCell::new(),
        }
    }

    /// Append a value and return its property ID
    pub fn add(&mut self, value: T) -> PropertyId {
        let id = self.next_property_id;
        self.next_property_id += 1;
        self.entries.insert(id, value);
        self.index_map.take();
        id
    }

    /// Value by property ID
    pub fn get(&self, id: PropertyId) -> Option<&T> {
        self.entries.get(&id)
    }

    /// Value by property ID for editing
    pub fn get_mut(&mut self, id: PropertyId) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    /// Remove a value; later entries shift down one index
    pub fn remove(&mut self, id: PropertyId) -> Option<T> {
        let removed = self.entries.remove(&id);
        if removed.is_some() {
            self.index_map.take();
        }
        removed
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the group is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Property ID of the entry at a 0-based index
    pub fn property_id_at(&self, index: usize) -> Option<PropertyId> {
        self.index_map().get(index).copied()
    }

    /// 0-based index of a property ID
    pub fn index_of(&self, id: PropertyId) -> Option<usize> {
        self.index_map().binary_search(&id).ok()
    }

    /// Value at a 0-based index
    pub fn get_by_index(&self, index: usize) -> Option<&T> {
        self.property_id_at(index).and_then(|id| self.entries.get(&id))
    }

    /// Entries in index order
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &T)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }

    /// Values in index order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    fn index_map(&self) -> &[PropertyId] {
        self.index_map
            .get_or_init(|| self.entries.keys().copied().collect())
    }
}

impl<T> Default for PropertyGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for PropertyGroup<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<T> FromIterator<T> for PropertyGroup<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut group = Self::new();
        for value in iter {
            group.add(value);
        }
        group
    }
}

/// Any ID-addressable entity of a model
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// Object with a triangle mesh
    Mesh(MeshObject),
    /// Object assembled from components
    Components(ComponentsObject),
    /// `<basematerials>`
    BaseMaterials(BaseMaterialGroup),
    /// `<m:colorgroup>`
    Colors(ColorGroup),
    /// `<m:texture2d>`
    Texture2D(Texture2D),
    /// `<m:texture2dgroup>`
    Texture2DGroup(Texture2DGroup),
    /// `<m:compositematerials>`
    CompositeMaterials(CompositeMaterials),
    /// `<m:multiproperties>`
    MultiProperties(MultiProperties),
    /// `<s:slicestack>`
    SliceStack(SliceStack),
}

impl Resource {
    /// Resource ID within its part
    pub fn id(&self) -> ResourceId {
        match self {
            Resource::Mesh(o) => o.id,
            Resource::Components(o) => o.id,
            Resource::BaseMaterials(g) => g.id,
            Resource::Colors(g) => g.id,
            Resource::Texture2D(t) => t.id,
            Resource::Texture2DGroup(g) => g.id,
            Resource::CompositeMaterials(g) => g.id,
            Resource::MultiProperties(g) => g.id,
            Resource::SliceStack(s) => s.id,
        }
    }

    /// Name of the resource kind, as used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Resource::Mesh(_) => "mesh object",
            Resource::Components(_) => "components object",
            Resource::BaseMaterials(_) => "basematerials",
            Resource::Colors(_) => "colorgroup",
            Resource::Texture2D(_) => "texture2d",
            Resource::Texture2DGroup(_) => "texture2dgroup",
            Resource::CompositeMaterials(_) => "compositematerials",
            Resource::MultiProperties(_) => "multiproperties",
            Resource::SliceStack(_) => "slicestack",
        }
    }

    /// True for mesh and components objects
    pub fn is_object(&self) -> bool {
        matches!(self, Resource::Mesh(_) | Resource::Components(_))
    }

    /// Shared object fields
    pub fn object_info(&self) -> Option<&ObjectInfo> {
        match self {
            Resource::Mesh(o) => Some(&o.info),
            Resource::Components(o) => Some(&o.info),
            _ => None,
        }
    }

    /// Shared object fields for editing
    pub fn object_info_mut(&mut self) -> Option<&mut ObjectInfo> {
        match self {
            Resource::Mesh(o) => Some(&mut o.info),
            Resource::Components(o) => Some(&mut o.info),
            _ => None,
        }
    }

    /// True for resources a triangle `pid` may reference
    pub fn is_property_resource(&self) -> bool {
        self.property_count().is_some()
    }

    /// Number of indexable properties, for property resources
    pub fn property_count(&self) -> Option<usize> {
        match self {
            Resource::BaseMaterials(g) => Some(g.materials.len()),
            Resource::Colors(g) => Some(g.colors.len()),
            Resource::Texture2DGroup(g) => Some(g.coords.len()),
            Resource::CompositeMaterials(g) => Some(g.composites.len()),
            Resource::MultiProperties(g) => Some(g.multis.len()),
            _ => None,
        }
    }

    /// Property ID at a 0-based index, through the group's index map
    pub fn property_id_at(&self, index: usize) -> Option<PropertyId> {
        match self {
            Resource::BaseMaterials(g) => g.materials.property_id_at(index),
            Resource::Colors(g) => g.colors.property_id_at(index),
            Resource::Texture2DGroup(g) => g.coords.property_id_at(index),
            Resource::CompositeMaterials(g) => g.composites.property_id_at(index),
            Resource::MultiProperties(g) => g.multis.property_id_at(index),
            _ => None,
        }
    }

    /// 0-based index of a property ID
    pub fn index_of_property(&self, id: PropertyId) -> Option<usize> {
        match self {
            Resource::BaseMaterials(g) => g.materials.index_of(id),
            Resource::Colors(g) => g.colors.index_of(id),
            Resource::Texture2DGroup(g) => g.coords.index_of(id),
            Resource::CompositeMaterials(g) => g.composites.index_of(id),
            Resource::MultiProperties(g) => g.multis.index_of(id),
            _ => None,
        }
    }
}

macro_rules! impl_from_resource {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Resource {
                fn from(value: $ty) -> Self {
                    Resource::$variant(value)
                }
            }
        )*
    };
}

impl_from_resource!(
    Mesh(MeshObject),
    Components(ComponentsObject),
    BaseMaterials(BaseMaterialGroup),
    Colors(ColorGroup),
    Texture2D(Texture2D),
    Texture2DGroup(Texture2DGroup),
    CompositeMaterials(CompositeMaterials),
    MultiProperties(MultiProperties),
    SliceStack(SliceStack),
);
