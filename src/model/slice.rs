//! Slice extension types

use crate::error::{Error, Result};

use super::resource::ResourceId;
use super::store::ROOT_MODEL_PART;

/// A 2D vertex in a slice plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex2D {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Vertex2D {
    /// Create a new 2D vertex
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A segment in a slice polygon
///
/// The segment starts at the polygon's start vertex or at the end of the previous segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceSegment {
    /// End vertex index
    pub v2: u32,
}

impl SliceSegment {
    /// Create a new slice segment
    pub fn new(v2: u32) -> Self {
        Self { v2 }
    }
}

/// A polyline in a slice, closed when it ends where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct SlicePolygon {
    /// Starting vertex index
    pub start: u32,
    /// Segments in drawing order
    pub segments: Vec<SliceSegment>,
}

impl SlicePolygon {
    /// Create a new slice polygon
    pub fn new(start: u32) -> Self {
        Self {
            start,
            segments: Vec::new(),
        }
    }

    /// Vertex indices in drawing order, start vertex included
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        std::iter::once(self.start).chain(self.segments.iter().map(|s| s.v2))
    }

    /// True when the last segment returns to the start vertex
    pub fn is_closed(&self) -> bool {
        self.segments.len() >= 2
            && self.segments.last().map(|s| s.v2) == Some(self.start)
    }
}

/// A single slice at a specific Z height
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    /// Z coordinate of the top of this slice
    pub ztop: f64,
    /// Vertex pool shared by the slice's polygons
    pub vertices: Vec<Vertex2D>,
    /// Polygons of this slice
    pub polygons: Vec<SlicePolygon>,
}

impl Slice {
    /// Create a new slice
    pub fn new(ztop: f64) -> Self {
        Self {
            ztop,
            vertices: Vec::new(),
            polygons: Vec::new(),
        }
    }
}

/// Pointer to the stack in another part that holds the slices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceReference {
    /// Absolute part path (`slicepath`)
    pub path: String,
    /// Stack ID inside that part (`slicestackid`)
    pub stack_id: ResourceId,
}

impl SliceReference {
    /// Create a new slice reference
    pub fn new(path: impl Into<String>, stack_id: ResourceId) -> Self {
        Self {
            path: path.into(),
            stack_id,
        }
    }
}

/// Where a stack's slices live
#[derive(Debug, Clone, PartialEq)]
pub enum SliceStackContent {
    /// Slices held by this stack
    Owned(Vec<Slice>),
    /// Slices held by a stack in another part
    Referenced(SliceReference),
}

/// `<s:slicestack>`
#[derive(Debug, Clone, PartialEq)]
pub struct SliceStack {
    /// Resource ID
    pub id: ResourceId,
    /// Z coordinate of the bottom of the stack
    pub bottom_z: f64,
    /// Slices or the reference to them
    pub content: SliceStackContent,
    /// Write the slices into their own part and reference them from here
    pub uses_slice_ref: bool,
}

impl SliceStack {
    /// Create an empty stack owning its slices
    pub fn new(id: ResourceId, bottom_z: f64) -> Self {
        Self {
            id,
            bottom_z,
            content: SliceStackContent::Owned(Vec::new()),
            uses_slice_ref: false,
        }
    }

    /// Create a stack that points at a stack in another part
    pub fn referenced(id: ResourceId, bottom_z: f64, reference: SliceReference) -> Self {
        Self {
            id,
            bottom_z,
            content: SliceStackContent::Referenced(reference),
            uses_slice_ref: false,
        }
    }

    /// Append a slice
    ///
    /// Fails when the stack is referenced or when the slice's top lies below the bottom
    /// of the stack or below the previous slice.
    pub fn add_slice(&mut self, slice: Slice) -> Result<()> {
        let bottom_z = self.bottom_z;
        let SliceStackContent::Owned(slices) = &mut self.content else {
            return Err(Error::InvalidModel(format!(
                "Slice stack {} references another stack and cannot own slices",
                self.id
            )));
        };

        if slice.ztop < bottom_z {
            return Err(Error::InvalidModel(format!(
                "Slice stack {}: slice ztop {} is below zbottom {}",
                self.id, slice.ztop, bottom_z
            )));
        }
        if let Some(previous) = slices.last()
            && slice.ztop < previous.ztop
        {
            return Err(Error::InvalidModel(format!(
                "Slice stack {}: slice ztop {} is below previous ztop {}",
                self.id, slice.ztop, previous.ztop
            )));
        }

        slices.push(slice);
        Ok(())
    }

    /// Turn an empty owned stack into a referencing one
    pub fn set_reference(&mut self, reference: SliceReference) -> Result<()> {
        match &self.content {
            SliceStackContent::Owned(slices) if slices.is_empty() => {
                self.content = SliceStackContent::Referenced(reference);
                Ok(())
            }
            SliceStackContent::Owned(_) => Err(Error::InvalidModel(format!(
                "Slice stack {} mixes slices and slice references",
                self.id
            ))),
            SliceStackContent::Referenced(_) => Err(Error::InvalidModel(format!(
                "Slice stack {} has more than one slice reference",
                self.id
            ))),
        }
    }

    /// Slices held by this stack, `None` for a referencing stack
    pub fn owned_slices(&self) -> Option<&[Slice]> {
        match &self.content {
            SliceStackContent::Owned(slices) => Some(slices),
            SliceStackContent::Referenced(_) => None,
        }
    }

    /// The reference, for a referencing stack
    pub fn reference(&self) -> Option<&SliceReference> {
        match &self.content {
            SliceStackContent::Referenced(r) => Some(r),
            SliceStackContent::Owned(_) => None,
        }
    }

    /// True when every polygon of every owned slice is closed
    pub fn all_polygons_closed(&self) -> bool {
        self.owned_slices()
            .unwrap_or_default()
            .iter()
            .flat_map(|s| s.polygons.iter())
            .all(SlicePolygon::is_closed)
    }

    /// Part path the writer uses when `uses_slice_ref` is set
    ///
    /// Stacks of the root part get `/2D/2dmodel_<id>.model`; stacks of any other part
    /// are prefixed with that part's flattened path, so equal IDs in different parts
    /// never share a slice part.
    pub fn slice_ref_path(&self, owner_part: &str) -> String {
        if owner_part == ROOT_MODEL_PART {
            return format!("/2D/2dmodel_{}.model", self.id);
        }
        let owner = owner_part.trim_start_matches('/');
        let owner = owner.strip_suffix(".model").unwrap_or(owner).replace('/', "_");
        format!("/2D/{}_2dmodel_{}.model", owner, self.id)
    }
}
