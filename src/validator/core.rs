//! Object validity and build plan checks

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{Mesh, Model, ObjectType, PackageResourceId, Resource};

use super::{calculate_component_depth_level, component_target, is_part_loaded};

/// True when every directed edge of the mesh appears exactly once and its reverse
/// appears exactly once
///
/// A mesh with fewer than three triangles cannot enclose a volume and is rejected.
pub fn is_oriented_manifold(mesh: &Mesh) -> bool {
    if mesh.triangles.len() < 3 {
        return false;
    }

    let mut edges: HashMap<(u32, u32), u32> = HashMap::with_capacity(mesh.triangles.len() * 3);
    for triangle in &mesh.triangles {
        let [a, b, c] = triangle.indices();
        for edge in [(a, b), (b, c), (c, a)] {
            *edges.entry(edge).or_insert(0) += 1;
        }
    }

    edges
        .iter()
        .all(|(&(from, to), &count)| count == 1 && edges.get(&(to, from)) == Some(&1))
}

/// Whether an object may be printed as described
///
/// - `model` and `solidsupport` meshes must be oriented and manifold
/// - `support` meshes are always valid
/// - `other` meshes never are
/// - an assembly needs at least one component, and every child must be valid
///
/// Components pointing into a part that was not loaded make the assembly invalid,
/// since their target cannot be checked. The component graph is bounded by
/// [`calculate_component_depth_level`] first, and each shared sub-assembly is checked
/// once.
pub fn is_valid_object(model: &Model, handle: PackageResourceId) -> Result<bool> {
    calculate_component_depth_level(model, handle)?;
    let mut verdicts = HashMap::new();
    valid_object(model, handle, &mut verdicts)
}

fn valid_object(
    model: &Model,
    handle: PackageResourceId,
    verdicts: &mut HashMap<PackageResourceId, bool>,
) -> Result<bool> {
    if let Some(&valid) = verdicts.get(&handle) {
        return Ok(valid);
    }
    let key = model
        .resource_key(handle)
        .ok_or_else(|| Error::InvalidModel(format!("Unknown resource handle {}", handle.unique_id())))?;

    let valid = match model.resource(handle) {
        Some(Resource::Mesh(object)) => match object.info.object_type {
            ObjectType::Model | ObjectType::SolidSupport => is_oriented_manifold(&object.mesh),
            ObjectType::Support => true,
            ObjectType::Other => false,
        },
        Some(Resource::Components(assembly)) => {
            // Provisional verdict, so a stale depth cache cannot loop forever
            verdicts.insert(handle, false);
            let mut valid = !assembly.components.is_empty();
            for component in &assembly.components {
                valid = match component_target(model, &key.part, component)? {
                    Some(child) => valid_object(model, child, verdicts)?,
                    None => false,
                };
                if !valid {
                    break;
                }
            }
            valid
        }
        Some(other) => return Err(Error::type_mismatch(key.id, "object", other.kind_name())),
        None => return Err(Error::resource_not_found(&key.part, key.id, "validity check")),
    };
    verdicts.insert(handle, valid);
    Ok(valid)
}

/// Whether every component transform below the object is planar, as objects carrying
/// slice stacks require
pub fn is_valid_for_slices(model: &Model, handle: PackageResourceId) -> Result<bool> {
    calculate_component_depth_level(model, handle)?;
    let mut verdicts = HashMap::new();
    planar_tree(model, handle, &mut verdicts)
}

fn planar_tree(
    model: &Model,
    handle: PackageResourceId,
    verdicts: &mut HashMap<PackageResourceId, bool>,
) -> Result<bool> {
    if let Some(&planar) = verdicts.get(&handle) {
        return Ok(planar);
    }
    let key = model
        .resource_key(handle)
        .ok_or_else(|| Error::InvalidModel(format!("Unknown resource handle {}", handle.unique_id())))?;

    let assembly = match model.resource(handle) {
        Some(Resource::Mesh(_)) => return Ok(true),
        Some(Resource::Components(assembly)) => assembly,
        Some(other) => return Err(Error::type_mismatch(key.id, "object", other.kind_name())),
        None => return Err(Error::resource_not_found(&key.part, key.id, "slice check")),
    };

    verdicts.insert(handle, false);
    let mut planar = true;
    for component in &assembly.components {
        if !component.transform.is_planar() {
            planar = false;
            break;
        }
        if let Some(child) = component_target(model, &key.part, component)?
            && !planar_tree(model, child, verdicts)?
        {
            planar = false;
            break;
        }
    }
    verdicts.insert(handle, planar);
    Ok(planar)
}

/// Every build item must place an existing object of a printable type
pub(super) fn validate_build_items(model: &Model) -> Result<()> {
    for item in model.build_items() {
        let part = item.path.as_deref().unwrap_or(model.root_part());
        if !is_part_loaded(model, part) {
            continue;
        }

        let handle = model
            .find_package_resource_id(part, item.object_id)
            .ok_or_else(|| Error::resource_not_found(part, item.object_id, "build item"))?;
        let object = model.find_object(part, item.object_id)?;
        if object.info().object_type == ObjectType::Other {
            return Err(Error::InvalidModel(format!(
                "Build item references object {} of type 'other', which cannot be printed",
                item.object_id
            )));
        }
        if object.info().slice_stack_id.is_some() && !is_valid_for_slices(model, handle)? {
            return Err(Error::InvalidModel(format!(
                "Object {} has a slice stack but its components are not planar",
                item.object_id
            )));
        }
        if let Some(transform) = &item.transform
            && object.info().slice_stack_id.is_some()
            && !transform.is_planar()
        {
            return Err(Error::InvalidModel(format!(
                "Build item for sliced object {} has a non-planar transform",
                item.object_id
            )));
        }
    }
    Ok(())
}
