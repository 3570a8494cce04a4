//! Data structures representing 3MF models

mod beam_lattice;
mod config;
mod core;
mod material;
mod mesh;
mod object;
mod resource;
mod slice;
mod store;

pub use beam_lattice::{Ball, BallMode, Beam, BeamCapMode, BeamLattice, BeamSet};

pub use config::{DEFAULT_MAX_WARNINGS, ParserConfig, ProgressCallback};

pub use core::{
    Attachment, Build, BuildItem, BuildItemHandle, Extension, MAX_COORDINATE_VALUE, MetadataEntry,
    TRANSFORM_MATRIX_SIZE, Transform, Triangle, Unit, Vertex, XML_NAMESPACE,
};

pub use material::{
    BaseMaterial, BaseMaterialGroup, BlendMethod, Color, ColorGroup, Composite,
    CompositeMaterials, FilterMode, Multi, MultiProperties, Tex2Coord, Texture2D, Texture2DGroup,
    TileStyle,
};

pub use mesh::Mesh;

pub use object::{
    Component, ComponentsObject, MeshObject, MeshResolution, ObjectInfo, ObjectRef, ObjectType,
};

pub use resource::{
    MAX_RESOURCE_INDEX, PackageResourceId, PropertyGroup, PropertyId, Resource, ResourceId,
    ResourceKey,
};

pub use slice::{
    Slice, SlicePolygon, SliceReference, SliceSegment, SliceStack, SliceStackContent, Vertex2D,
};

pub use store::{DEFAULT_LANGUAGE, Model, ROOT_MODEL_PART};
