//! Slice stack validation

use crate::error::{Error, Result};
use crate::model::{SliceStack, SliceStackContent};

/// Check the geometry of an owned stack
///
/// Slices must be ordered upwards from the bottom of the stack, every polygon index
/// must fall inside its slice's vertex pool, and every polygon must be closed. A
/// referencing stack has nothing to check locally.
pub fn validate_slice_stack(stack: &SliceStack) -> Result<()> {
    let SliceStackContent::Owned(slices) = &stack.content else {
        return Ok(());
    };

    let mut previous_top = stack.bottom_z;
    for (slice_index, slice) in slices.iter().enumerate() {
        if slice.ztop < previous_top {
            return Err(Error::InvalidModel(format!(
                "Slice stack {}: slice {} has ztop {} below {}",
                stack.id, slice_index, slice.ztop, previous_top
            )));
        }
        previous_top = slice.ztop;

        for (polygon_index, polygon) in slice.polygons.iter().enumerate() {
            if let Some(index) = polygon
                .indices()
                .find(|&i| i as usize >= slice.vertices.len())
            {
                return Err(Error::InvalidModel(format!(
                    "Slice stack {}: polygon {} of slice {} uses vertex {} but the slice has {} vertices",
                    stack.id,
                    polygon_index,
                    slice_index,
                    index,
                    slice.vertices.len()
                )));
            }
        }
    }

    if !stack.all_polygons_closed() {
        return Err(Error::InvalidModel(format!(
            "Slice stack {} contains open polygons",
            stack.id
        )));
    }
    Ok(())
}
