//! Shared reading state and deferred cross-reference resolution

use std::collections::HashSet;

use log::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::mesh_info::FaceProperties;
use crate::model::{
    Attachment, Model, PackageResourceId, ParserConfig, PropertyId, Resource, ResourceId,
    ResourceKey, SliceStackContent,
};
use crate::opc::{PackageReader, TEXTURE_REL_TYPE};

use super::{ProgressControl, ProgressStage, Warning, WarningCode, read_part_string};

/// Whether a model part is the package's root part or was pulled in by reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PartRole {
    Root,
    Linked,
}

/// Work to do once the target of a reference exists
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Deferred {
    /// Per-triangle `(face, [p1, p2, p3])` group indices of one mesh object
    FaceProperties {
        object: PackageResourceId,
        faces: Vec<(usize, [u32; 3])>,
    },
    /// Object `pid`/`pindex`
    ObjectDefault {
        object: PackageResourceId,
        index: u32,
    },
    ComponentTarget,
    TextureOfGroup,
    /// `matid` of a composite group, with its `matindices`
    CompositeBase { indices: Vec<u32> },
    MultiLayer,
    ObjectSliceStack,
    SliceRefStack,
}

/// A reference whose target may not have been read yet
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingReference {
    pub target: ResourceKey,
    pub referenced_by: String,
    pub action: Deferred,
}

/// State shared by every node handler during one read
pub(crate) struct ReadContext<'a> {
    pub model: &'a mut Model,
    pub config: &'a ParserConfig,
    /// Part being read
    pub part: String,
    warnings: &'a mut Vec<Warning>,
    package: Option<&'a mut dyn PackageReader>,
    pending: Vec<PendingReference>,
    loaded_parts: HashSet<String>,
    loading_parts: Vec<String>,
}

impl<'a> ReadContext<'a> {
    pub(crate) fn new(
        model: &'a mut Model,
        config: &'a ParserConfig,
        warnings: &'a mut Vec<Warning>,
        package: Option<&'a mut dyn PackageReader>,
    ) -> Self {
        let part = model.root_part().to_string();
        Self {
            model,
            config,
            loading_parts: vec![part.clone()],
            part,
            warnings,
            package,
            pending: Vec::new(),
            loaded_parts: HashSet::new(),
        }
    }

    /// Record a recoverable problem; fails in strict mode
    pub(crate) fn warn(&mut self, code: WarningCode, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        warn!(code:% = code, part = self.part.as_str(); "{}", message);

        if self.warnings.len() < self.config.max_warnings() {
            self.warnings.push(Warning {
                code,
                level: code.level(),
                message: message.clone(),
            });
        }

        if self.config.strict_mode() {
            return Err(Error::StrictModeWarning { code, message });
        }
        Ok(())
    }

    pub(crate) fn has_package(&self) -> bool {
        self.package.is_some()
    }

    /// Run the progress callback
    pub(crate) fn check_progress(&self, stage: ProgressStage) -> Result<()> {
        if let Some(callback) = self.config.progress_callback()
            && callback(stage) == ProgressControl::Abort
        {
            debug!(stage:? = stage; "Read aborted by progress callback");
            return Err(Error::UserAborted);
        }
        Ok(())
    }

    /// Run the progress callback when `count` reaches a multiple of `stride`
    pub(crate) fn tick(&self, stage: ProgressStage, count: usize, stride: usize) -> Result<()> {
        if count > 0 && count % stride == 0 {
            self.check_progress(stage)?;
        }
        Ok(())
    }

    /// Key of `id` in `path`, or in the part being read
    pub(crate) fn key(&self, path: Option<&str>, id: ResourceId) -> ResourceKey {
        ResourceKey::new(path.unwrap_or(&self.part), id)
    }

    /// Add a resource to the part being read
    pub(crate) fn add_resource(&mut self, resource: impl Into<Resource>) -> Result<PackageResourceId> {
        let resource = resource.into();
        trace!(part = self.part.as_str(), id = resource.id(), kind = resource.kind_name(); "Adding resource");
        self.model.add_resource_to_part(&self.part, resource)
    }

    /// Apply `action` now if the target exists, otherwise queue it
    pub(crate) fn reference(
        &mut self,
        target: ResourceKey,
        referenced_by: impl Into<String>,
        action: Deferred,
    ) -> Result<()> {
        let referenced_by = referenced_by.into();
        match self.model.find_package_resource_id(&target.part, target.id) {
            Some(handle) => apply(self.model, handle, &target, &referenced_by, action),
            None => {
                self.pending.push(PendingReference {
                    target,
                    referenced_by,
                    action,
                });
                Ok(())
            }
        }
    }

    /// Resolve every queued reference
    ///
    /// References into other parts load those parts first. Whatever is still missing
    /// afterwards is an error.
    pub(crate) fn resolve_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.check_progress(ProgressStage::ResolveReferences)?;

        let pending = std::mem::take(&mut self.pending);
        debug!(part = self.part.as_str(), count = pending.len(); "Resolving references");

        for reference in pending {
            let PendingReference {
                target,
                referenced_by,
                action,
            } = reference;

            let missing = self
                .model
                .find_package_resource_id(&target.part, target.id)
                .is_none();
            if missing && target.part != self.part {
                if self.package.is_none() || !self.config.linked_parts() {
                    debug!(target = target.part.as_str(), id = target.id; "Leaving reference into unloaded part");
                    continue;
                }
                self.load_part(&target.part)?;
            }

            let handle = self
                .model
                .find_package_resource_id(&target.part, target.id)
                .ok_or_else(|| Error::resource_not_found(&target.part, target.id, referenced_by.clone()))?;
            apply(self.model, handle, &target, &referenced_by, action)?;
        }
        Ok(())
    }

    /// Read a linked model part once
    pub(crate) fn load_part(&mut self, path: &str) -> Result<()> {
        if self.loaded_parts.contains(path) {
            return Ok(());
        }
        if self.loading_parts.iter().any(|p| p == path) {
            return Err(Error::CircularReference(format!(
                "Model part {} references itself while loading",
                path
            )));
        }
        if self.package.is_none() {
            return Err(Error::MissingFile(path.to_string()));
        }

        self.check_progress(ProgressStage::ReadLinkedPart)?;
        let Some(package) = self.package.as_deref_mut() else {
            return Err(Error::MissingFile(path.to_string()));
        };
        let xml = read_part_string(package, path)?;
        debug!(part = path; "Reading linked model part");

        let saved_part = std::mem::replace(&mut self.part, path.to_string());
        let saved_pending = std::mem::take(&mut self.pending);
        self.loading_parts.push(path.to_string());

        let result = super::core::read_document(self, &xml, PartRole::Linked);

        self.loading_parts.pop();
        self.part = saved_part;
        self.pending = saved_pending;
        self.loaded_parts.insert(path.to_string());
        result
    }

    /// Warn about textures whose image part is missing, loading the ones that exist but
    /// were not reached through a relationship
    pub(crate) fn check_texture_attachments(&mut self) -> Result<()> {
        let paths: Vec<String> = self
            .model
            .resources()
            .filter_map(|(_, _, resource)| match resource {
                Resource::Texture2D(texture) => Some(texture.path.clone()),
                _ => None,
            })
            .collect();

        for path in paths {
            if self.model.find_attachment(&path).is_some() {
                continue;
            }
            let Some(package) = self.package.as_deref_mut() else {
                return Ok(());
            };
            if !package.has_part(&path) {
                self.warn(
                    WarningCode::MissingAttachment,
                    format!("Texture part {} is missing from the package", path),
                )?;
                continue;
            }
            let attachment = if self.config.lazy_attachments() {
                Attachment::deferred(path, TEXTURE_REL_TYPE)
            } else {
                let data = package.read_part(&path)?;
                Attachment::new(path, TEXTURE_REL_TYPE, data)
            };
            self.model.add_attachment(attachment);
        }
        Ok(())
    }
}

fn apply(
    model: &mut Model,
    handle: PackageResourceId,
    target: &ResourceKey,
    referenced_by: &str,
    action: Deferred,
) -> Result<()> {
    let resource = model
        .resource(handle)
        .ok_or_else(|| Error::resource_not_found(&target.part, target.id, referenced_by))?;

    match action {
        Deferred::FaceProperties { object, faces } => {
            let translated = faces
                .into_iter()
                .map(|(face, indices)| {
                    let mut ids: [PropertyId; 3] = [0; 3];
                    for (slot, index) in ids.iter_mut().zip(indices) {
                        *slot = translate_index(resource, target.id, index)?;
                    }
                    Ok((face, ids))
                })
                .collect::<Result<Vec<_>>>()?;
            let mesh = mesh_of(model, object)?;
            for (face, ids) in translated {
                mesh.set_triangle_properties(face, FaceProperties::per_vertex(handle, ids));
            }
        }
        Deferred::ObjectDefault { object, index } => {
            let property_id = translate_index(resource, target.id, index)?;
            let mesh = mesh_of(model, object)?;
            mesh.information
                .properties_mut()
                .set_default_data(FaceProperties::flat(handle, property_id));
        }
        Deferred::ComponentTarget => {
            if !resource.is_object() {
                return Err(Error::type_mismatch(target.id, "object", resource.kind_name()));
            }
        }
        Deferred::TextureOfGroup => {
            if !matches!(resource, Resource::Texture2D(_)) {
                return Err(Error::type_mismatch(target.id, "texture2d", resource.kind_name()));
            }
        }
        Deferred::CompositeBase { indices } => {
            if !matches!(resource, Resource::BaseMaterials(_)) {
                return Err(Error::type_mismatch(
                    target.id,
                    "basematerials",
                    resource.kind_name(),
                ));
            }
            for index in indices {
                translate_index(resource, target.id, index)?;
            }
        }
        Deferred::MultiLayer => {
            if !matches!(
                resource,
                Resource::BaseMaterials(_)
                    | Resource::Colors(_)
                    | Resource::Texture2DGroup(_)
                    | Resource::CompositeMaterials(_)
            ) {
                return Err(Error::type_mismatch(
                    target.id,
                    "basematerials, colorgroup, texture2dgroup or compositematerials",
                    resource.kind_name(),
                ));
            }
        }
        Deferred::ObjectSliceStack => {
            if !matches!(resource, Resource::SliceStack(_)) {
                return Err(Error::type_mismatch(target.id, "slicestack", resource.kind_name()));
            }
        }
        Deferred::SliceRefStack => match resource {
            Resource::SliceStack(stack) if matches!(stack.content, SliceStackContent::Owned(_)) => {}
            Resource::SliceStack(_) => {
                return Err(Error::InvalidModel(format!(
                    "Slice stack {} in {} is itself a reference and cannot be the target of {}",
                    target.id, target.part, referenced_by
                )));
            }
            other => {
                return Err(Error::type_mismatch(target.id, "slicestack", other.kind_name()));
            }
        },
    }
    Ok(())
}

fn translate_index(resource: &Resource, group: ResourceId, index: u32) -> Result<PropertyId> {
    let count = resource
        .property_count()
        .ok_or_else(|| Error::type_mismatch(group, "property group", resource.kind_name()))?;
    resource
        .property_id_at(index as usize)
        .ok_or(Error::PropertyIndexOutOfRange { group, index, count })
}

fn mesh_of(model: &mut Model, object: PackageResourceId) -> Result<&mut crate::model::Mesh> {
    match model.resource_mut(object) {
        Some(Resource::Mesh(mesh_object)) => Ok(&mut mesh_object.mesh),
        Some(other) => Err(Error::type_mismatch(other.id(), "mesh object", other.kind_name())),
        None => Err(Error::InvalidModel(format!(
            "Object handle {} is not in the model",
            object.unique_id()
        ))),
    }
}
