//! The model: resource arena, build plan, attachments and document settings

use std::collections::HashMap;

use log::trace;

use crate::error::{Error, Result};

use super::core::{Attachment, Build, BuildItem, BuildItemHandle, Extension, MetadataEntry, Unit};
use super::object::{ComponentsObject, MeshObject, ObjectRef};
use super::resource::{PackageResourceId, Resource, ResourceId, ResourceKey};
use super::slice::{Slice, SliceStackContent};

/// Path of the root model part
pub const ROOT_MODEL_PART: &str = "/3D/3dmodel.model";

/// Language used when a document declares none
pub const DEFAULT_LANGUAGE: &str = "und";

#[derive(Debug, Clone)]
struct ResourceEntry {
    key: ResourceKey,
    resource: Resource,
}

/// A 3MF model spread over one or more package parts
///
/// Resources are stored once, in insertion order, and addressed either by their
/// (part, ID) pair as written in the document or by the model-wide
/// [`PackageResourceId`] handle returned on insertion.
#[derive(Debug, Clone)]
pub struct Model {
    /// Unit of measurement
    pub unit: Unit,
    /// Language tag (`xml:lang`)
    pub language: String,
    /// Model metadata in document order
    pub metadata: Vec<MetadataEntry>,
    /// Build plan
    pub build: Build,
    /// Package thumbnail path declared on `<model>`
    pub thumbnail: Option<String>,
    /// Extensions a consumer must support to use the model
    pub required_extensions: Vec<Extension>,
    /// Extensions a consumer should support
    pub recommended_extensions: Vec<Extension>,
    entries: Vec<ResourceEntry>,
    by_part: HashMap<String, HashMap<ResourceId, PackageResourceId>>,
    parts: Vec<String>,
    attachments: Vec<Attachment>,
    root_part: String,
    current_part: String,
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self {
            unit: Unit::Millimeter,
            language: DEFAULT_LANGUAGE.to_string(),
            metadata: Vec::new(),
            build: Build::new(),
            thumbnail: None,
            required_extensions: Vec::new(),
            recommended_extensions: Vec::new(),
            entries: Vec::new(),
            by_part: HashMap::new(),
            parts: Vec::new(),
            attachments: Vec::new(),
            root_part: ROOT_MODEL_PART.to_string(),
            current_part: ROOT_MODEL_PART.to_string(),
        }
    }

    /// Path of the root model part
    pub fn root_part(&self) -> &str {
        &self.root_part
    }

    /// Change the root part path; the current part follows
    pub fn set_root_part(&mut self, path: impl Into<String>) {
        self.root_part = path.into();
        self.current_part = self.root_part.clone();
    }

    /// Part new resources are added to
    pub fn current_part(&self) -> &str {
        &self.current_part
    }

    /// Select the part new resources are added to
    pub fn set_current_part(&mut self, path: impl Into<String>) {
        self.current_part = path.into();
    }

    /// Add a resource to the current part
    pub fn add_resource(&mut self, resource: impl Into<Resource>) -> Result<PackageResourceId> {
        let part = self.current_part.clone();
        self.add_resource_to_part(&part, resource)
    }

    /// Add a resource to an explicit part
    ///
    /// Fails with [`Error::DuplicateResourceId`] when the part already holds the ID.
    pub fn add_resource_to_part(
        &mut self,
        part: &str,
        resource: impl Into<Resource>,
    ) -> Result<PackageResourceId> {
        let resource = resource.into();
        let id = resource.id();
        if self.find_package_resource_id(part, id).is_some() {
            return Err(Error::DuplicateResourceId {
                part: part.to_string(),
                id,
            });
        }

        let raw = u32::try_from(self.entries.len() + 1)
            .map_err(|_| Error::InvalidModel("Too many resources".to_string()))?;
        let handle = PackageResourceId::from_raw(raw)
            .ok_or_else(|| Error::InvalidModel("Invalid resource handle".to_string()))?;

        trace!(part, id, kind = resource.kind_name(); "add resource");
        if !self.by_part.contains_key(part) {
            self.parts.push(part.to_string());
        }
        self.by_part
            .entry(part.to_string())
            .or_default()
            .insert(id, handle);
        self.entries.push(ResourceEntry {
            key: ResourceKey::new(part, id),
            resource,
        });
        Ok(handle)
    }

    /// Handle of the resource with this ID in a part
    pub fn find_package_resource_id(&self, part: &str, id: ResourceId) -> Option<PackageResourceId> {
        self.by_part.get(part)?.get(&id).copied()
    }

    /// Resource by (part, ID)
    pub fn find_resource(&self, part: &str, id: ResourceId) -> Option<&Resource> {
        self.find_package_resource_id(part, id)
            .and_then(|handle| self.resource(handle))
    }

    /// Resource by (part, ID) for editing
    pub fn find_resource_mut(&mut self, part: &str, id: ResourceId) -> Option<&mut Resource> {
        let handle = self.find_package_resource_id(part, id)?;
        self.resource_mut(handle)
    }

    /// Resource by handle
    pub fn resource(&self, handle: PackageResourceId) -> Option<&Resource> {
        self.entries
            .get(handle.unique_id() as usize - 1)
            .map(|e| &e.resource)
    }

    /// Resource by handle for editing
    pub fn resource_mut(&mut self, handle: PackageResourceId) -> Option<&mut Resource> {
        self.entries
            .get_mut(handle.unique_id() as usize - 1)
            .map(|e| &mut e.resource)
    }

    /// (part, ID) of a handle
    pub fn resource_key(&self, handle: PackageResourceId) -> Option<&ResourceKey> {
        self.entries
            .get(handle.unique_id() as usize - 1)
            .map(|e| &e.key)
    }

    /// True when the resource lives outside the root part
    pub fn is_linked(&self, handle: PackageResourceId) -> bool {
        self.resource_key(handle)
            .is_some_and(|key| key.part != self.root_part)
    }

    /// Object by (part, ID)
    pub fn find_object(&self, part: &str, id: ResourceId) -> Result<ObjectRef<'_>> {
        match self.find_resource(part, id) {
            Some(Resource::Mesh(o)) => Ok(ObjectRef::Mesh(o)),
            Some(Resource::Components(o)) => Ok(ObjectRef::Components(o)),
            Some(other) => Err(Error::type_mismatch(id, "object", other.kind_name())),
            None => Err(Error::resource_not_found(part, id, "object lookup")),
        }
    }

    /// Mesh object by (part, ID)
    pub fn find_mesh_object(&self, part: &str, id: ResourceId) -> Result<&MeshObject> {
        match self.find_resource(part, id) {
            Some(Resource::Mesh(o)) => Ok(o),
            Some(other) => Err(Error::type_mismatch(id, "mesh object", other.kind_name())),
            None => Err(Error::resource_not_found(part, id, "mesh object lookup")),
        }
    }

    /// Mesh object by (part, ID) for editing
    pub fn find_mesh_object_mut(&mut self, part: &str, id: ResourceId) -> Result<&mut MeshObject> {
        match self.find_resource_mut(part, id) {
            Some(Resource::Mesh(o)) => Ok(o),
            Some(other) => Err(Error::type_mismatch(id, "mesh object", other.kind_name())),
            None => Err(Error::resource_not_found(part, id, "mesh object lookup")),
        }
    }

    /// Components object by (part, ID)
    pub fn find_components_object(&self, part: &str, id: ResourceId) -> Result<&ComponentsObject> {
        match self.find_resource(part, id) {
            Some(Resource::Components(o)) => Ok(o),
            Some(other) => Err(Error::type_mismatch(
                id,
                "components object",
                other.kind_name(),
            )),
            None => Err(Error::resource_not_found(
                part,
                id,
                "components object lookup",
            )),
        }
    }

    /// Highest ID used in the part plus one
    pub fn generate_resource_id(&self, part: &str) -> ResourceId {
        self.by_part
            .get(part)
            .and_then(|ids| ids.keys().max())
            .map_or(1, |max| max + 1)
    }

    /// All resources in insertion order
    pub fn resources(&self) -> impl Iterator<Item = (PackageResourceId, &ResourceKey, &Resource)> {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            PackageResourceId::from_raw(i as u32 + 1).map(|h| (h, &e.key, &e.resource))
        })
    }

    /// Resources of one part in insertion order
    pub fn resources_in_part<'a>(
        &'a self,
        part: &'a str,
    ) -> impl Iterator<Item = (PackageResourceId, &'a Resource)> + 'a {
        self.resources()
            .filter(move |(_, key, _)| key.part == part)
            .map(|(h, _, r)| (h, r))
    }

    /// Parts holding resources, in order of first use
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Number of resources over all parts
    pub fn resource_count(&self) -> usize {
        self.entries.len()
    }

    /// Append a build item
    pub fn add_build_item(&mut self, item: BuildItem) -> BuildItemHandle {
        self.build.add_item(item)
    }

    /// Build items in build order
    pub fn build_items(&self) -> &[BuildItem] {
        self.build.items()
    }

    /// Build item by handle
    pub fn build_item(&self, handle: BuildItemHandle) -> Option<&BuildItem> {
        self.build.item(handle)
    }

    /// Remove a build item
    pub fn remove_build_item(&mut self, handle: BuildItemHandle) -> Option<BuildItem> {
        self.build.remove_item(handle)
    }

    /// Add an attachment, replacing one with the same path
    pub fn add_attachment(&mut self, attachment: Attachment) -> Option<Attachment> {
        match self
            .attachments
            .iter_mut()
            .find(|a| a.path == attachment.path)
        {
            Some(existing) => Some(std::mem::replace(existing, attachment)),
            None => {
                self.attachments.push(attachment);
                None
            }
        }
    }

    /// Attachment by path
    pub fn find_attachment(&self, path: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.path == path)
    }

    /// Attachment by path for editing
    pub fn find_attachment_mut(&mut self, path: &str) -> Option<&mut Attachment> {
        self.attachments.iter_mut().find(|a| a.path == path)
    }

    /// All attachments in insertion order
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Remove an attachment
    pub fn remove_attachment(&mut self, path: &str) -> Option<Attachment> {
        let pos = self.attachments.iter().position(|a| a.path == path)?;
        Some(self.attachments.remove(pos))
    }

    /// Value of a model metadata entry
    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value.as_str())
    }

    /// Slices of a stack, following a slice reference to the owning stack
    pub fn slices(&self, handle: PackageResourceId) -> Result<&[Slice]> {
        let key = self
            .resource_key(handle)
            .ok_or_else(|| Error::InvalidModel("Unknown resource handle".to_string()))?;
        let stack = match self.resource(handle) {
            Some(Resource::SliceStack(s)) => s,
            Some(other) => return Err(Error::type_mismatch(key.id, "slicestack", other.kind_name())),
            None => return Err(Error::resource_not_found(&key.part, key.id, "slice lookup")),
        };

        match &stack.content {
            SliceStackContent::Owned(slices) => Ok(slices),
            SliceStackContent::Referenced(reference) => {
                match self.find_resource(&reference.path, reference.stack_id) {
                    Some(Resource::SliceStack(target)) => target.owned_slices().ok_or_else(|| {
                        Error::InvalidModel(format!(
                            "Slice stack {} references stack {} which is itself a reference",
                            stack.id, reference.stack_id
                        ))
                    }),
                    Some(other) => Err(Error::type_mismatch(
                        reference.stack_id,
                        "slicestack",
                        other.kind_name(),
                    )),
                    None => Err(Error::resource_not_found(
                        &reference.path,
                        reference.stack_id,
                        format!("sliceref of slicestack {}", stack.id),
                    )),
                }
            }
        }
    }

    /// Forget memoized component depths, e.g. after editing components
    pub fn clear_depth_cache(&self) {
        for entry in &self.entries {
            if let Some(info) = entry.resource.object_info() {
                info.clear_depth();
            }
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}
