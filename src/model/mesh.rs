//! Triangle mesh geometry

use crate::error::{Error, Result};
use crate::mesh_info::{FaceProperties, MeshInformation};

use super::beam_lattice::BeamLattice;
use super::core::{Triangle, Vertex};

/// Vertices, triangles and the property overlay of a mesh object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    /// Vertices
    pub vertices: Vec<Vertex>,
    /// Triangles indexing into `vertices`
    pub triangles: Vec<Triangle>,
    /// Optional beam lattice over the same vertices
    pub beam_lattice: Option<BeamLattice>,
    /// Per-triangle property channels
    pub information: MeshInformation,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with preallocated capacity
    pub fn with_capacity(vertices: usize, triangles: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            triangles: Vec::with_capacity(triangles),
            ..Self::default()
        }
    }

    /// Append a vertex and return its index
    ///
    /// Triangles address vertices with `u32` indices, so a mesh holds at most
    /// `u32::MAX + 1` vertices. Past that limit the vertex is still stored but the
    /// returned index saturates at `u32::MAX`; [`Mesh::try_add_vertex`] refuses instead.
    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        let index = vertex_index(self.vertices.len()).unwrap_or(u32::MAX);
        self.vertices.push(vertex);
        index
    }

    /// Append a vertex unless the mesh already holds as many as `u32` can address
    pub fn try_add_vertex(&mut self, vertex: Vertex) -> Result<u32> {
        let index = vertex_index(self.vertices.len())?;
        self.vertices.push(vertex);
        Ok(index)
    }

    /// Append a triangle and return its face index
    pub fn add_triangle(&mut self, triangle: Triangle) -> usize {
        self.triangles.push(triangle);
        self.triangles.len() - 1
    }

    /// Property assignment of a face, falling back to the object default
    pub fn triangle_properties(&self, face: usize) -> Option<FaceProperties> {
        self.information
            .properties()
            .and_then(|channel| channel.resolved_face_data(face))
    }

    /// Properties recorded on the face itself, ignoring the object default
    pub fn assigned_triangle_properties(&self, face: usize) -> Option<FaceProperties> {
        let record = self.information.properties()?.face_data(face);
        record.has_data().then_some(record)
    }

    /// Assign properties to a face
    pub fn set_triangle_properties(&mut self, face: usize, data: FaceProperties) {
        self.information.properties_mut().set_face_data(face, data);
    }

    /// Object-level default property
    pub fn default_properties(&self) -> Option<FaceProperties> {
        self.information
            .properties()
            .and_then(|channel| channel.default_data())
    }
}

fn vertex_index(count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| {
        Error::InvalidModel(format!(
            "Mesh cannot hold more than {} vertices",
            u64::from(u32::MAX) + 1
        ))
    })
}
