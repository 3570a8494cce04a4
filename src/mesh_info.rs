//! Sparse per-triangle property overlay
//!
//! Geometry stays in [`crate::model::Mesh`]; properties live beside it in typed
//! channels. A channel stores one [`FaceProperties`] record per triangle, but only
//! as far as faces have actually been written: reading past the end yields the
//! empty record, and writing past the end grows the list. Each channel also has an
//! optional default record, the per-object `pid`/`pindex`, which applies to every
//! face without its own data.
//!
//! Resource handle 0 and property ID 0 both mean "unassigned".

use std::fmt;

use crate::error::{Error, Result};
use crate::model::{PackageResourceId, PropertyId};

/// Kind of data a channel carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    /// Unified `pid`/`p1..p3` assignments as read from triangles
    Properties,
    /// Per-corner colors
    Colors,
    /// Per-corner texture coordinates
    TextureCoordinates,
    /// Per-face base materials
    BaseMaterials,
    /// Per-corner multi-property tuples
    MultiProperties,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelKind::Properties => "properties",
            ChannelKind::Colors => "colors",
            ChannelKind::TextureCoordinates => "texture coordinates",
            ChannelKind::BaseMaterials => "base materials",
            ChannelKind::MultiProperties => "multi properties",
        };
        f.write_str(name)
    }
}

/// Property assignment of one triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaceProperties {
    /// Raw package resource handle, 0 when unassigned
    pub resource: u32,
    /// Property ID per corner
    pub property_ids: [PropertyId; 3],
}

impl FaceProperties {
    /// Record without data
    pub const EMPTY: FaceProperties = FaceProperties {
        resource: 0,
        property_ids: [0; 3],
    };

    /// Same property on all three corners
    pub fn flat(resource: PackageResourceId, property_id: PropertyId) -> Self {
        Self::per_vertex(resource, [property_id; 3])
    }

    /// One property per corner
    pub fn per_vertex(resource: PackageResourceId, property_ids: [PropertyId; 3]) -> Self {
        Self {
            resource: resource.unique_id(),
            property_ids,
        }
    }

    /// True when a resource is assigned
    pub fn has_data(&self) -> bool {
        self.resource != 0
    }

    /// Assigned resource handle
    pub fn resource(&self) -> Option<PackageResourceId> {
        PackageResourceId::from_raw(self.resource)
    }

    /// True when all corners carry the same property
    pub fn is_flat(&self) -> bool {
        let [a, b, c] = self.property_ids;
        a == b && b == c
    }
}

/// One typed, sparse, per-face property array
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChannel {
    index: u32,
    kind: ChannelKind,
    faces: Vec<FaceProperties>,
    default: Option<FaceProperties>,
}

impl PropertyChannel {
    /// Create an empty channel
    pub fn new(index: u32, kind: ChannelKind) -> Self {
        Self {
            index,
            kind,
            faces: Vec::new(),
            default: None,
        }
    }

    /// Channel index, distinguishing channels of the same kind
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Channel kind
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Number of stored records, which may be less than the face count
    pub fn record_count(&self) -> usize {
        self.faces.len()
    }

    /// Stored record of a face, the empty record past the end
    pub fn face_data(&self, face: usize) -> FaceProperties {
        self.faces.get(face).copied().unwrap_or_default()
    }

    /// Record of a face for editing, growing the list if needed
    pub fn face_data_mut(&mut self, face: usize) -> &mut FaceProperties {
        if face >= self.faces.len() {
            self.faces.resize(face + 1, FaceProperties::EMPTY);
        }
        &mut self.faces[face]
    }

    /// Replace the record of a face
    pub fn set_face_data(&mut self, face: usize, data: FaceProperties) {
        *self.face_data_mut(face) = data;
    }

    /// Clear the record of a face
    pub fn invalidate_face(&mut self, face: usize) {
        if let Some(record) = self.faces.get_mut(face) {
            *record = FaceProperties::EMPTY;
        }
    }

    /// True when the face holds its own data
    pub fn has_face_data(&self, face: usize) -> bool {
        self.face_data(face).has_data()
    }

    /// Fallback record for faces without data
    pub fn default_data(&self) -> Option<FaceProperties> {
        self.default
    }

    /// Set the fallback record
    pub fn set_default_data(&mut self, data: FaceProperties) {
        self.default = data.has_data().then_some(data);
    }

    /// Remove the fallback record
    pub fn clear_default_data(&mut self) {
        self.default = None;
    }

    /// Face record if it has data, otherwise the default
    pub fn resolved_face_data(&self, face: usize) -> Option<FaceProperties> {
        let record = self.face_data(face);
        if record.has_data() {
            Some(record)
        } else {
            self.default
        }
    }

    /// Faces holding their own data
    pub fn assigned_faces(&self) -> impl Iterator<Item = (usize, &FaceProperties)> {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, record)| record.has_data())
    }

    /// Reorder the corners of a face: corner `i` takes the old corner `permutation[i]`
    pub fn permute_face(&mut self, face: usize, permutation: [usize; 3]) -> Result<()> {
        check_permutation(permutation)?;
        if let Some(record) = self.faces.get_mut(face) {
            let old = record.property_ids;
            record.property_ids = permutation.map(|corner| old[corner]);
        }
        Ok(())
    }
}

fn check_permutation(permutation: [usize; 3]) -> Result<()> {
    let mut seen = [false; 3];
    for corner in permutation {
        if corner > 2 || seen[corner] {
            return Err(Error::InvalidModel(format!(
                "Invalid corner permutation {:?}",
                permutation
            )));
        }
        seen[corner] = true;
    }
    Ok(())
}

/// Set of property channels attached to one mesh
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshInformation {
    channels: Vec<PropertyChannel>,
}

impl MeshInformation {
    /// Create a handler without channels
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing channel
    pub fn channel(&self, index: u32, kind: ChannelKind) -> Option<&PropertyChannel> {
        self.channels
            .iter()
            .find(|c| c.index == index && c.kind == kind)
    }

    /// Existing channel for editing
    pub fn channel_mut(&mut self, index: u32, kind: ChannelKind) -> Option<&mut PropertyChannel> {
        self.channels
            .iter_mut()
            .find(|c| c.index == index && c.kind == kind)
    }

    /// Add a channel; (index, kind) must be new
    pub fn add_channel(&mut self, channel: PropertyChannel) -> Result<&mut PropertyChannel> {
        if self.channel(channel.index, channel.kind).is_some() {
            return Err(Error::DuplicateChannel(format!(
                "{} #{}",
                channel.kind, channel.index
            )));
        }
        let pos = self.channels.len();
        self.channels.push(channel);
        Ok(&mut self.channels[pos])
    }

    /// Remove a channel
    pub fn remove_channel(&mut self, index: u32, kind: ChannelKind) -> Option<PropertyChannel> {
        let pos = self
            .channels
            .iter()
            .position(|c| c.index == index && c.kind == kind)?;
        Some(self.channels.remove(pos))
    }

    /// All channels in creation order
    pub fn channels(&self) -> &[PropertyChannel] {
        &self.channels
    }

    /// True when no channel exists
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// The unified properties channel filled by the reader
    pub fn properties(&self) -> Option<&PropertyChannel> {
        self.channel(0, ChannelKind::Properties)
    }

    /// The unified properties channel, created on first use
    pub fn properties_mut(&mut self) -> &mut PropertyChannel {
        let pos = match self
            .channels
            .iter()
            .position(|c| c.index == 0 && c.kind == ChannelKind::Properties)
        {
            Some(pos) => pos,
            None => {
                self.channels
                    .push(PropertyChannel::new(0, ChannelKind::Properties));
                self.channels.len() - 1
            }
        };
        &mut self.channels[pos]
    }

    /// Clear a face in every channel
    pub fn reset_face(&mut self, face: usize) {
        for channel in &mut self.channels {
            channel.invalidate_face(face);
        }
    }

    /// Reorder a face's corners in every channel
    pub fn permute_face(&mut self, face: usize, permutation: [usize; 3]) -> Result<()> {
        check_permutation(permutation)?;
        for channel in &mut self.channels {
            channel.permute_face(face, permutation)?;
        }
        Ok(())
    }

    /// Copy a face's records from another mesh's channels of the same (index, kind)
    pub fn clone_face_from(&mut self, face: usize, other: &MeshInformation, other_face: usize) {
        for channel in &mut self.channels {
            if let Some(source) = other.channel(channel.index, channel.kind) {
                let data = source.face_data(other_face);
                if data.has_data() || channel.has_face_data(face) {
                    channel.set_face_data(face, data);
                }
            }
        }
    }
}
