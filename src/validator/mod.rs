//! Reference resolution and validity queries over a populated model
//!
//! [`resolve_model`] runs after every read. It walks the component graph, rejecting
//! cycles and pathological nesting, and checks the cross-resource rules that can only be
//! decided once every part is loaded:
//! - build items place existing objects whose type is not `other`
//! - multi-property layers combine allowed property groups
//! - composite and multi indices stay inside their groups
//!
//! Validity of individual objects (orientation, manifoldness) is a query, never a read
//! failure: see [`is_valid_object`] and [`is_valid_for_slices`].

mod core;
mod material;
mod slice;

pub use core::{is_oriented_manifold, is_valid_for_slices, is_valid_object};
pub use material::{validate_composite_materials, validate_multi_properties};
pub use slice::validate_slice_stack;

use log::debug;

use crate::error::{Error, Result};
use crate::model::{Component, Model, PackageResourceId, Resource};

/// Deepest component nesting accepted before a graph is considered pathological
pub const MAX_COMPONENT_DEPTH: u32 = 64;

/// Post-read pass over the whole model
pub fn resolve_model(model: &Model) -> Result<()> {
    let mut assemblies = 0usize;
    for (handle, _, resource) in model.resources() {
        match resource {
            Resource::Components(_) => {
                calculate_component_depth_level(model, handle)?;
                assemblies += 1;
            }
            Resource::CompositeMaterials(group) => validate_composite_materials(model, handle, group)?,
            Resource::MultiProperties(group) => validate_multi_properties(model, handle, group)?,
            _ => {}
        }
    }

    core::validate_build_items(model)?;

    debug!(
        resources = model.resource_count(),
        assemblies,
        build_items = model.build_items().len();
        "Model resolved"
    );
    Ok(())
}

/// Nesting depth of an object: 0 for a mesh, 1 + the deepest child for an assembly
///
/// Depths are memoized in each object's [`crate::model::ObjectInfo`]; call
/// [`Model::clear_depth_cache`] after editing components.
///
/// # Errors
///
/// - [`Error::CircularReference`] when the object is reachable from itself
/// - [`Error::ExcessiveNestingDepth`] past [`MAX_COMPONENT_DEPTH`]
/// - [`Error::ResourceNotFound`] / [`Error::ResourceTypeMismatch`] for dangling components
pub fn calculate_component_depth_level(model: &Model, handle: PackageResourceId) -> Result<u32> {
    let mut active = Vec::new();
    depth_of(model, handle, &mut active)
}

fn depth_of(
    model: &Model,
    handle: PackageResourceId,
    active: &mut Vec<PackageResourceId>,
) -> Result<u32> {
    let key = model
        .resource_key(handle)
        .ok_or_else(|| Error::InvalidModel(format!("Unknown resource handle {}", handle.unique_id())))?;
    let assembly = match model.resource(handle) {
        Some(Resource::Mesh(_)) => return Ok(0),
        Some(Resource::Components(assembly)) => assembly,
        Some(other) => return Err(Error::type_mismatch(key.id, "object", other.kind_name())),
        None => return Err(Error::resource_not_found(&key.part, key.id, "depth calculation")),
    };

    if let Some(depth) = assembly.info.cached_depth() {
        return Ok(depth);
    }
    if active.contains(&handle) {
        return Err(Error::CircularReference(format!(
            "Object {} in {} contains itself through its components",
            key.id, key.part
        )));
    }
    if active.len() as u32 >= MAX_COMPONENT_DEPTH {
        return Err(Error::ExcessiveNestingDepth {
            object: key.id,
            limit: MAX_COMPONENT_DEPTH,
        });
    }

    active.push(handle);
    let mut deepest = 0;
    for component in &assembly.components {
        if let Some(child) = component_target(model, &key.part, component)? {
            deepest = deepest.max(depth_of(model, child, active)?);
        }
    }
    active.pop();

    let depth = deepest + 1;
    if depth > MAX_COMPONENT_DEPTH {
        return Err(Error::ExcessiveNestingDepth {
            object: key.id,
            limit: MAX_COMPONENT_DEPTH,
        });
    }
    assembly.info.cache_depth(depth);
    Ok(depth)
}

/// Handle of the object a component places
///
/// `None` when the component points into a part that was never loaded, which happens
/// when a single part is read without its package.
pub(crate) fn component_target(
    model: &Model,
    owner_part: &str,
    component: &Component,
) -> Result<Option<PackageResourceId>> {
    let part = component.path.as_deref().unwrap_or(owner_part);
    if let Some(handle) = model.find_package_resource_id(part, component.object_id) {
        return Ok(Some(handle));
    }
    if part != owner_part && !is_part_loaded(model, part) {
        return Ok(None);
    }
    Err(Error::resource_not_found(
        part,
        component.object_id,
        "component",
    ))
}

pub(crate) fn is_part_loaded(model: &Model, part: &str) -> bool {
    part == model.root_part() || model.parts().iter().any(|p| p == part)
}
