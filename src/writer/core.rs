//! Objects, meshes, components and the build

use std::io::Write as IoWrite;

use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::mesh_info::FaceProperties;
use crate::model::{
    Build, BuildItem, Component, ComponentsObject, MeshObject, MeshResolution, Model, ObjectInfo,
    ResourceId,
};

use super::beam_lattice::write_beam_lattice;
use super::{close, emit, write_metadata_group};

/// Group ID and 0-based indices of a face record, as written to XML
fn property_reference(
    model: &Model,
    part: &str,
    object_id: ResourceId,
    record: &FaceProperties,
) -> Result<(ResourceId, [usize; 3])> {
    let handle = record.resource().ok_or_else(|| {
        Error::xml_write(format!("Object {} has a property record without a group", object_id))
    })?;
    let key = model.resource_key(handle).ok_or_else(|| {
        Error::xml_write(format!(
            "Object {} references unknown resource handle {}",
            object_id,
            handle.unique_id()
        ))
    })?;
    if key.part != part {
        return Err(Error::xml_write(format!(
            "Object {} in {} uses property group {} from another part {}",
            object_id, part, key.id, key.part
        )));
    }
    let resource = model
        .resource(handle)
        .ok_or_else(|| Error::resource_not_found(part, key.id, format!("object {}", object_id)))?;

    let mut indices = [0usize; 3];
    for (slot, property_id) in record.property_ids.iter().enumerate() {
        indices[slot] = resource.index_of_property(*property_id).ok_or_else(|| {
            Error::xml_write(format!(
                "Object {}: property {} no longer exists in group {}",
                object_id, property_id, key.id
            ))
        })?;
    }
    Ok((key.id, indices))
}

fn object_start<'a>(id: ResourceId, info: &'a ObjectInfo) -> BytesStart<'a> {
    let mut elem = BytesStart::new("object");
    elem.push_attribute(("id", id.to_string().as_str()));
    elem.push_attribute(("type", info.object_type.as_str()));
    if let Some(name) = &info.name {
        elem.push_attribute(("name", name.as_str()));
    }
    if let Some(part_number) = &info.part_number {
        elem.push_attribute(("partnumber", part_number.as_str()));
    }
    if let Some(thumbnail) = &info.thumbnail {
        elem.push_attribute(("thumbnail", thumbnail.as_str()));
    }
    if let Some(uuid) = &info.uuid {
        elem.push_attribute(("p:UUID", uuid.as_str()));
    }
    if let Some(stack) = info.slice_stack_id {
        elem.push_attribute(("s:slicestackid", stack.to_string().as_str()));
    }
    if info.mesh_resolution == MeshResolution::LowRes {
        elem.push_attribute(("s:meshresolution", info.mesh_resolution.as_str()));
    }
    elem
}

/// Write a mesh object
///
/// The object-level `pid`/`pindex` is written only for an explicit default record, so
/// faces without properties stay unassigned when the document is read back.
pub(super) fn write_mesh_object<W: IoWrite>(
    writer: &mut Writer<W>,
    model: &Model,
    part: &str,
    object: &MeshObject,
) -> Result<()> {
    let mesh = &object.mesh;
    let channel = mesh.information.properties();
    let default = channel.and_then(|c| c.default_data());

    let mut elem = object_start(object.id, &object.info);
    if let Some(record) = &default {
        let (pid, indices) = property_reference(model, part, object.id, record)?;
        elem.push_attribute(("pid", pid.to_string().as_str()));
        elem.push_attribute(("pindex", indices[0].to_string().as_str()));
    }
    emit(writer, Event::Start(elem), "object")?;
    write_metadata_group(writer, &object.info.metadata)?;

    emit(writer, Event::Start(BytesStart::new("mesh")), "mesh")?;

    emit(writer, Event::Start(BytesStart::new("vertices")), "vertices")?;
    for vertex in &mesh.vertices {
        let mut elem = BytesStart::new("vertex");
        elem.push_attribute(("x", vertex.x.to_string().as_str()));
        elem.push_attribute(("y", vertex.y.to_string().as_str()));
        elem.push_attribute(("z", vertex.z.to_string().as_str()));
        emit(writer, Event::Empty(elem), "vertex")?;
    }
    close(writer, "vertices")?;

    emit(writer, Event::Start(BytesStart::new("triangles")), "triangles")?;
    for (face, triangle) in mesh.triangles.iter().enumerate() {
        let [v1, v2, v3] = triangle.indices();
        let mut elem = BytesStart::new("triangle");
        elem.push_attribute(("v1", v1.to_string().as_str()));
        elem.push_attribute(("v2", v2.to_string().as_str()));
        elem.push_attribute(("v3", v3.to_string().as_str()));

        if let Some(channel) = channel
            && channel.has_face_data(face)
        {
            let record = channel.face_data(face);
            let (pid, [p1, p2, p3]) = property_reference(model, part, object.id, &record)?;
            elem.push_attribute(("pid", pid.to_string().as_str()));
            elem.push_attribute(("p1", p1.to_string().as_str()));
            if !(p1 == p2 && p2 == p3) {
                elem.push_attribute(("p2", p2.to_string().as_str()));
                elem.push_attribute(("p3", p3.to_string().as_str()));
            }
        }
        emit(writer, Event::Empty(elem), "triangle")?;
    }
    close(writer, "triangles")?;

    if let Some(lattice) = &mesh.beam_lattice {
        write_beam_lattice(writer, lattice)?;
    }

    close(writer, "mesh")?;
    close(writer, "object")
}

/// Write an assembly
pub(super) fn write_components_object<W: IoWrite>(
    writer: &mut Writer<W>,
    object: &ComponentsObject,
) -> Result<()> {
    emit(writer, Event::Start(object_start(object.id, &object.info)), "object")?;
    write_metadata_group(writer, &object.info.metadata)?;

    if object.components.is_empty() {
        emit(writer, Event::Empty(BytesStart::new("components")), "components")?;
    } else {
        emit(writer, Event::Start(BytesStart::new("components")), "components")?;
        for component in &object.components {
            write_component(writer, component)?;
        }
        close(writer, "components")?;
    }
    close(writer, "object")
}

fn write_component<W: IoWrite>(writer: &mut Writer<W>, component: &Component) -> Result<()> {
    let mut elem = BytesStart::new("component");
    elem.push_attribute(("objectid", component.object_id.to_string().as_str()));
    if !component.transform.is_identity() {
        elem.push_attribute(("transform", component.transform.to_attribute().as_str()));
    }
    if let Some(uuid) = &component.uuid {
        elem.push_attribute(("p:UUID", uuid.as_str()));
    }
    if let Some(path) = &component.path {
        elem.push_attribute(("p:path", path.as_str()));
    }
    emit(writer, Event::Empty(elem), "component")
}

/// Write the build section
pub(super) fn write_build<W: IoWrite>(writer: &mut Writer<W>, build: &Build) -> Result<()> {
    let mut elem = BytesStart::new("build");
    if let Some(uuid) = &build.uuid {
        elem.push_attribute(("p:UUID", uuid.as_str()));
    }
    if build.is_empty() {
        return emit(writer, Event::Empty(elem), "build");
    }

    emit(writer, Event::Start(elem), "build")?;
    for item in build.items() {
        write_build_item(writer, item)?;
    }
    close(writer, "build")
}

fn write_build_item<W: IoWrite>(writer: &mut Writer<W>, item: &BuildItem) -> Result<()> {
    let mut elem = BytesStart::new("item");
    elem.push_attribute(("objectid", item.object_id.to_string().as_str()));
    if let Some(transform) = &item.transform {
        elem.push_attribute(("transform", transform.to_attribute().as_str()));
    }
    if let Some(part_number) = &item.part_number {
        elem.push_attribute(("partnumber", part_number.as_str()));
    }
    if let Some(uuid) = &item.uuid {
        elem.push_attribute(("p:UUID", uuid.as_str()));
    }
    if let Some(path) = &item.path {
        elem.push_attribute(("p:path", path.as_str()));
    }

    if item.metadata.is_empty() {
        return emit(writer, Event::Empty(elem), "item");
    }
    emit(writer, Event::Start(elem), "item")?;
    write_metadata_group(writer, &item.metadata)?;
    close(writer, "item")
}
