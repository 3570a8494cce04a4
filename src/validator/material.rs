//! Composite and multi-property group rules

use crate::error::{Error, Result};
use crate::model::{CompositeMaterials, Model, MultiProperties, PackageResourceId, Resource};

fn owner_part(model: &Model, handle: PackageResourceId) -> Result<&str> {
    model
        .resource_key(handle)
        .map(|key| key.part.as_str())
        .ok_or_else(|| Error::InvalidModel(format!("Unknown resource handle {}", handle.unique_id())))
}

/// Composites reference a base material group by index and mix at most one ratio per
/// referenced material
pub fn validate_composite_materials(
    model: &Model,
    handle: PackageResourceId,
    group: &CompositeMaterials,
) -> Result<()> {
    let part = owner_part(model, handle)?;
    let base = match model.find_resource(part, group.base_material_id) {
        Some(Resource::BaseMaterials(base)) => base,
        Some(other) => {
            return Err(Error::type_mismatch(
                group.base_material_id,
                "basematerials",
                other.kind_name(),
            ));
        }
        None => {
            return Err(Error::resource_not_found(
                part,
                group.base_material_id,
                format!("compositematerials {}", group.id),
            ));
        }
    };

    let count = base.materials.len();
    if let Some(&index) = group.material_indices.iter().find(|&&i| i as usize >= count) {
        return Err(Error::PropertyIndexOutOfRange {
            group: group.base_material_id,
            index,
            count,
        });
    }

    for (_, composite) in group.composites.iter() {
        if composite.values.len() > group.material_indices.len() {
            return Err(Error::InvalidModel(format!(
                "Composite group {} mixes {} values over {} materials",
                group.id,
                composite.values.len(),
                group.material_indices.len()
            )));
        }
        if composite.values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::InvalidModel(format!(
                "Composite group {} has a negative or non-finite mix ratio",
                group.id
            )));
        }
    }
    Ok(())
}

/// Layer rules of a multi-property group
///
/// Layers must be base material, composite, color or texture coordinate groups; at most
/// one layer may be a material (base or composite) and at most one a color group. Each
/// multi's indices must lie within the group of its layer.
pub fn validate_multi_properties(
    model: &Model,
    handle: PackageResourceId,
    group: &MultiProperties,
) -> Result<()> {
    let part = owner_part(model, handle)?;

    let mut materials = 0;
    let mut colors = 0;
    let mut layer_sizes = Vec::with_capacity(group.layers.len());
    for &layer in &group.layers {
        let resource = model.find_resource(part, layer).ok_or_else(|| {
            Error::resource_not_found(part, layer, format!("multiproperties {}", group.id))
        })?;
        match resource {
            Resource::BaseMaterials(_) | Resource::CompositeMaterials(_) => materials += 1,
            Resource::Colors(_) => colors += 1,
            Resource::Texture2DGroup(_) => {}
            other => {
                return Err(Error::type_mismatch(
                    layer,
                    "basematerials, colorgroup, texture2dgroup or compositematerials",
                    other.kind_name(),
                ));
            }
        }
        layer_sizes.push((layer, resource.property_count().unwrap_or(0)));
    }

    if materials > 1 {
        return Err(Error::InvalidModel(format!(
            "Multi-property group {} layers more than one material group",
            group.id
        )));
    }
    if colors > 1 {
        return Err(Error::InvalidModel(format!(
            "Multi-property group {} layers more than one color group",
            group.id
        )));
    }

    for (_, multi) in group.multis.iter() {
        if multi.indices.len() > group.layers.len() {
            return Err(Error::InvalidModel(format!(
                "Multi in group {} has {} indices for {} layers",
                group.id,
                multi.indices.len(),
                group.layers.len()
            )));
        }
        for (layer, &(layer_id, count)) in layer_sizes.iter().enumerate() {
            let index = multi.index_for_layer(layer);
            if layer >= multi.indices.len() && count == 0 {
                return Err(Error::InvalidModel(format!(
                    "Multi in group {} omits the index for layer {}, and group {} is empty",
                    group.id, layer, layer_id
                )));
            }
            if index as usize >= count {
                return Err(Error::PropertyIndexOutOfRange {
                    group: layer_id,
                    index,
                    count,
                });
            }
        }
    }
    Ok(())
}
