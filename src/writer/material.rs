//! Property resources: base materials and the materials extension groups

use std::io::Write as IoWrite;

use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use crate::error::Result;
use crate::model::{
    BaseMaterialGroup, BlendMethod, ColorGroup, CompositeMaterials, FilterMode, MultiProperties,
    Texture2D, Texture2DGroup, TileStyle,
};

use super::{close, emit};

fn join<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write a `<basematerials>` group
pub(super) fn write_base_materials<W: IoWrite>(
    writer: &mut Writer<W>,
    group: &BaseMaterialGroup,
) -> Result<()> {
    let mut elem = BytesStart::new("basematerials");
    elem.push_attribute(("id", group.id.to_string().as_str()));
    emit(writer, Event::Start(elem), "basematerials")?;

    for material in group.materials.values() {
        let mut base = BytesStart::new("base");
        base.push_attribute(("name", material.name.as_str()));
        base.push_attribute(("displaycolor", material.display_color.to_string().as_str()));
        emit(writer, Event::Empty(base), "base")?;
    }
    close(writer, "basematerials")
}

/// Write an `<m:colorgroup>`
pub(super) fn write_color_group<W: IoWrite>(writer: &mut Writer<W>, group: &ColorGroup) -> Result<()> {
    let mut elem = BytesStart::new("m:colorgroup");
    elem.push_attribute(("id", group.id.to_string().as_str()));
    emit(writer, Event::Start(elem), "colorgroup")?;

    for color in group.colors.values() {
        let mut entry = BytesStart::new("m:color");
        entry.push_attribute(("color", color.to_string().as_str()));
        emit(writer, Event::Empty(entry), "color")?;
    }
    close(writer, "m:colorgroup")
}

/// Write an `<m:texture2d>`; defaults are left implicit
pub(super) fn write_texture2d<W: IoWrite>(writer: &mut Writer<W>, texture: &Texture2D) -> Result<()> {
    let mut elem = BytesStart::new("m:texture2d");
    elem.push_attribute(("id", texture.id.to_string().as_str()));
    elem.push_attribute(("path", texture.path.as_str()));
    elem.push_attribute(("contenttype", texture.content_type.as_str()));
    if texture.tile_style_u != TileStyle::default() {
        elem.push_attribute(("tilestyleu", texture.tile_style_u.as_str()));
    }
    if texture.tile_style_v != TileStyle::default() {
        elem.push_attribute(("tilestylev", texture.tile_style_v.as_str()));
    }
    if texture.filter != FilterMode::default() {
        elem.push_attribute(("filter", texture.filter.as_str()));
    }
    emit(writer, Event::Empty(elem), "texture2d")
}

/// Write an `<m:texture2dgroup>`
pub(super) fn write_texture2d_group<W: IoWrite>(
    writer: &mut Writer<W>,
    group: &Texture2DGroup,
) -> Result<()> {
    let mut elem = BytesStart::new("m:texture2dgroup");
    elem.push_attribute(("id", group.id.to_string().as_str()));
    elem.push_attribute(("texid", group.texture_id.to_string().as_str()));
    emit(writer, Event::Start(elem), "texture2dgroup")?;

    for coord in group.coords.values() {
        let mut entry = BytesStart::new("m:tex2coord");
        entry.push_attribute(("u", coord.u.to_string().as_str()));
        entry.push_attribute(("v", coord.v.to_string().as_str()));
        emit(writer, Event::Empty(entry), "tex2coord")?;
    }
    close(writer, "m:texture2dgroup")
}

/// Write an `<m:compositematerials>`
pub(super) fn write_composite_materials<W: IoWrite>(
    writer: &mut Writer<W>,
    group: &CompositeMaterials,
) -> Result<()> {
    let mut elem = BytesStart::new("m:compositematerials");
    elem.push_attribute(("id", group.id.to_string().as_str()));
    elem.push_attribute(("matid", group.base_material_id.to_string().as_str()));
    elem.push_attribute(("matindices", join(&group.material_indices).as_str()));
    emit(writer, Event::Start(elem), "compositematerials")?;

    for composite in group.composites.values() {
        let mut entry = BytesStart::new("m:composite");
        entry.push_attribute(("values", join(&composite.values).as_str()));
        emit(writer, Event::Empty(entry), "composite")?;
    }
    close(writer, "m:compositematerials")
}

/// Write an `<m:multiproperties>`
///
/// `blendmethods` is omitted when every layer mixes.
pub(super) fn write_multi_properties<W: IoWrite>(
    writer: &mut Writer<W>,
    group: &MultiProperties,
) -> Result<()> {
    let mut elem = BytesStart::new("m:multiproperties");
    elem.push_attribute(("id", group.id.to_string().as_str()));
    elem.push_attribute(("pids", join(&group.layers).as_str()));
    if group.blend_methods.iter().any(|m| *m != BlendMethod::Mix) {
        let methods = group
            .blend_methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        elem.push_attribute(("blendmethods", methods.as_str()));
    }
    emit(writer, Event::Start(elem), "multiproperties")?;

    for multi in group.multis.values() {
        let mut entry = BytesStart::new("m:multi");
        entry.push_attribute(("pindices", join(&multi.indices).as_str()));
        emit(writer, Event::Empty(entry), "multi")?;
    }
    close(writer, "m:multiproperties")
}
