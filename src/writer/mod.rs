//! XML and package writing for 3MF models
//!
//! Output is deterministic: resources are written in insertion order, only the
//! namespaces a part actually uses are declared, and floating-point values use Rust's
//! shortest round-trip representation. Writing the same model twice yields identical
//! bytes.

mod beam_lattice;
mod core;
mod material;
mod slice;

use std::collections::BTreeSet;
use std::io::Write as IoWrite;

use log::debug;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{Error, Result};
use crate::model::{Extension, MetadataEntry, Model, Resource, SliceStackContent};
use crate::opc::{
    MODEL_CONTENT_TYPE, MODEL_REL_TYPE, PACKAGE_SOURCE, PackageWriter, Relationship,
    THUMBNAIL_REL_TYPE,
};

/// Write one XML event, naming the element in the error
pub(crate) fn emit<W: IoWrite>(writer: &mut Writer<W>, event: Event<'_>, element: &str) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::xml_write(format!("Failed to write {} element: {}", element, e)))
}

/// Close an element
pub(crate) fn close<W: IoWrite>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    emit(writer, Event::End(BytesEnd::new(name)), name)
}

/// Where a part's slices go when a stack is written by reference
#[derive(Debug, Clone, PartialEq, Eq)]
struct SliceRefPart {
    owner: String,
    path: String,
    stack_id: u32,
}

/// Write the root model part as XML
pub fn write_model_xml<W: IoWrite>(model: &Model, writer: W) -> Result<()> {
    write_part_xml(model, model.root_part(), writer)
}

/// Write one model part as XML
///
/// The root part carries the model settings, metadata and build; other parts only
/// carry resources.
pub fn write_part_xml<W: IoWrite>(model: &Model, part: &str, writer: W) -> Result<()> {
    let mut xml = Writer::new_with_indent(writer, b' ', 2);
    emit(
        &mut xml,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        "XML declaration",
    )?;

    let is_root = part == model.root_part();
    let extensions = used_extensions(model, part);

    let mut root = BytesStart::new("model");
    root.push_attribute(("unit", model.unit.as_str()));
    root.push_attribute(("xml:lang", model.language.as_str()));
    root.push_attribute(("xmlns", Extension::Core.namespace()));
    for ext in &extensions {
        root.push_attribute((format!("xmlns:{}", ext.prefix()).as_str(), ext.namespace()));
    }
    if is_root {
        let required = prefix_list(&model.required_extensions);
        if !required.is_empty() {
            root.push_attribute(("requiredextensions", required.as_str()));
        }
        let recommended = prefix_list(&model.recommended_extensions);
        if !recommended.is_empty() {
            root.push_attribute(("recommendedextensions", recommended.as_str()));
        }
        if let Some(thumbnail) = &model.thumbnail {
            root.push_attribute(("thumbnail", thumbnail.as_str()));
        }
    }
    emit(&mut xml, Event::Start(root), "model")?;

    if is_root {
        for entry in &model.metadata {
            write_metadata(&mut xml, entry)?;
        }
    }

    emit(&mut xml, Event::Start(BytesStart::new("resources")), "resources")?;
    for (_, resource) in model.resources_in_part(part) {
        match resource {
            Resource::Mesh(object) => core::write_mesh_object(&mut xml, model, part, object)?,
            Resource::Components(object) => core::write_components_object(&mut xml, object)?,
            Resource::BaseMaterials(group) => material::write_base_materials(&mut xml, group)?,
            Resource::Colors(group) => material::write_color_group(&mut xml, group)?,
            Resource::Texture2D(texture) => material::write_texture2d(&mut xml, texture)?,
            Resource::Texture2DGroup(group) => material::write_texture2d_group(&mut xml, group)?,
            Resource::CompositeMaterials(group) => {
                material::write_composite_materials(&mut xml, group)?
            }
            Resource::MultiProperties(group) => material::write_multi_properties(&mut xml, group)?,
            Resource::SliceStack(stack) => slice::write_slice_stack(&mut xml, part, stack)?,
        }
    }
    close(&mut xml, "resources")?;

    if is_root {
        core::write_build(&mut xml, &model.build)?;
    }
    close(&mut xml, "model")
}

/// Write the slices of a stack flagged `uses_slice_ref` as a standalone part
fn write_slice_ref_part<W: IoWrite>(model: &Model, target: &SliceRefPart, writer: W) -> Result<()> {
    let Some(Resource::SliceStack(stack)) = model.find_resource(&target.owner, target.stack_id) else {
        return Err(Error::resource_not_found(&target.owner, target.stack_id, "slice ref part"));
    };

    let mut xml = Writer::new_with_indent(writer, b' ', 2);
    emit(
        &mut xml,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        "XML declaration",
    )?;
    let mut root = BytesStart::new("model");
    root.push_attribute(("unit", model.unit.as_str()));
    root.push_attribute(("xml:lang", model.language.as_str()));
    root.push_attribute(("xmlns", Extension::Core.namespace()));
    root.push_attribute(("xmlns:s", Extension::Slice.namespace()));
    emit(&mut xml, Event::Start(root), "model")?;
    emit(&mut xml, Event::Start(BytesStart::new("resources")), "resources")?;
    slice::write_owned_slice_stack(&mut xml, stack)?;
    close(&mut xml, "resources")?;
    close(&mut xml, "model")
}

/// Write the model and its attachments into a package
///
/// Parts written:
/// - the root model part, with a package relationship
/// - every other part holding resources, related from the root part
/// - one part per slice stack flagged `uses_slice_ref`
/// - every attachment; object thumbnails and textures are related from the root
///   part, any other thumbnail from the package
pub fn write_package(model: &Model, package: &mut dyn PackageWriter) -> Result<()> {
    let root = model.root_part().to_string();
    let mut root_rels = Vec::new();

    let mut root_xml = Vec::new();
    write_model_xml(model, &mut root_xml)?;
    package.write_part(&root, MODEL_CONTENT_TYPE, &root_xml)?;
    package.add_relationship(PACKAGE_SOURCE, Relationship::new("rel0", &root, MODEL_REL_TYPE))?;

    for part in model.parts().iter().filter(|p| **p != root) {
        let mut xml = Vec::new();
        write_part_xml(model, part, &mut xml)?;
        package.write_part(part, MODEL_CONTENT_TYPE, &xml)?;
        root_rels.push((part.clone(), MODEL_REL_TYPE.to_string()));
    }

    for target in slice_ref_parts(model) {
        let mut xml = Vec::new();
        write_slice_ref_part(model, &target, &mut xml)?;
        package.write_part(&target.path, MODEL_CONTENT_TYPE, &xml)?;
        root_rels.push((target.path, MODEL_REL_TYPE.to_string()));
    }

    let mut package_rel_count = 1;
    for attachment in model.attachments() {
        let data = attachment.data().ok_or_else(|| {
            Error::xml_write(format!(
                "Attachment {} was never loaded and cannot be written",
                attachment.path
            ))
        })?;
        package.write_part(&attachment.path, &attachment_content_type(model, &attachment.path), data)?;

        if attachment.relationship_type == THUMBNAIL_REL_TYPE
            && !is_object_thumbnail(model, &attachment.path)
        {
            package.add_relationship(
                PACKAGE_SOURCE,
                Relationship::new(
                    format!("rel{}", package_rel_count),
                    &attachment.path,
                    THUMBNAIL_REL_TYPE,
                ),
            )?;
            package_rel_count += 1;
        } else {
            root_rels.push((attachment.path.clone(), attachment.relationship_type.clone()));
        }
    }

    for (index, (target, rel_type)) in root_rels.into_iter().enumerate() {
        package.add_relationship(
            &root,
            Relationship::new(format!("rel{}", index), target, rel_type),
        )?;
    }

    debug!(
        parts = model.parts().len(),
        attachments = model.attachments().len();
        "Wrote package"
    );
    Ok(())
}

fn slice_ref_parts(model: &Model) -> Vec<SliceRefPart> {
    model
        .resources()
        .filter_map(|(_, key, resource)| match resource {
            Resource::SliceStack(stack)
                if stack.uses_slice_ref
                    && matches!(stack.content, SliceStackContent::Owned(_)) =>
            {
                Some(SliceRefPart {
                    owner: key.part.clone(),
                    path: stack.slice_ref_path(&key.part),
                    stack_id: stack.id,
                })
            }
            _ => None,
        })
        .collect()
}

/// True when an object names `path` as its thumbnail
fn is_object_thumbnail(model: &Model, path: &str) -> bool {
    model.resources().any(|(_, _, resource)| {
        resource
            .object_info()
            .is_some_and(|info| info.thumbnail.as_deref() == Some(path))
    })
}

fn attachment_content_type(model: &Model, path: &str) -> String {
    let declared = model.resources().find_map(|(_, _, resource)| match resource {
        Resource::Texture2D(texture) if texture.path == path => Some(texture.content_type.clone()),
        _ => None,
    });
    declared.unwrap_or_else(|| {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".png") {
            "image/png".to_string()
        } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            "image/jpeg".to_string()
        } else {
            "application/octet-stream".to_string()
        }
    })
}

fn prefix_list(extensions: &[Extension]) -> String {
    extensions
        .iter()
        .filter(|e| **e != Extension::Core)
        .map(|e| e.prefix())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extensions whose namespace a part needs, in declaration order
fn used_extensions(model: &Model, part: &str) -> BTreeSet<Extension> {
    let mut used = BTreeSet::new();
    if part == model.root_part() {
        used.extend(model.required_extensions.iter().copied());
        used.extend(model.recommended_extensions.iter().copied());
        if model.build.uuid.is_some()
            || model
                .build_items()
                .iter()
                .any(|item| item.uuid.is_some() || item.path.is_some())
        {
            used.insert(Extension::Production);
        }
    }

    for (_, resource) in model.resources_in_part(part) {
        match resource {
            Resource::Mesh(object) => {
                if let Some(lattice) = &object.mesh.beam_lattice {
                    used.insert(Extension::BeamLattice);
                    if lattice.uses_balls() || lattice.ball_radius.is_some() {
                        used.insert(Extension::BeamLatticeBalls);
                    }
                }
            }
            Resource::Components(object) => {
                if object
                    .components
                    .iter()
                    .any(|c| c.uuid.is_some() || c.path.is_some())
                {
                    used.insert(Extension::Production);
                }
            }
            Resource::Colors(_)
            | Resource::Texture2D(_)
            | Resource::Texture2DGroup(_)
            | Resource::CompositeMaterials(_)
            | Resource::MultiProperties(_) => {
                used.insert(Extension::Material);
            }
            Resource::SliceStack(_) => {
                used.insert(Extension::Slice);
            }
            Resource::BaseMaterials(_) => {}
        }
        if let Some(info) = resource.object_info() {
            if info.uuid.is_some() {
                used.insert(Extension::Production);
            }
            if info.slice_stack_id.is_some() {
                used.insert(Extension::Slice);
            }
        }
    }

    used.remove(&Extension::Core);
    used
}

/// Write a metadata entry
pub(crate) fn write_metadata<W: IoWrite>(writer: &mut Writer<W>, entry: &MetadataEntry) -> Result<()> {
    let mut elem = BytesStart::new("metadata");
    elem.push_attribute(("name", entry.name.as_str()));
    if let Some(preserve) = entry.preserve {
        elem.push_attribute(("preserve", if preserve { "1" } else { "0" }));
    }
    if let Some(metadata_type) = &entry.metadata_type {
        elem.push_attribute(("type", metadata_type.as_str()));
    }

    if entry.value.is_empty() {
        return emit(writer, Event::Empty(elem), "metadata");
    }
    emit(writer, Event::Start(elem), "metadata")?;
    emit(writer, Event::Text(BytesText::new(&entry.value)), "metadata")?;
    close(writer, "metadata")
}

/// Write metadata entries wrapped in a `<metadatagroup>`
pub(crate) fn write_metadata_group<W: IoWrite>(
    writer: &mut Writer<W>,
    entries: &[MetadataEntry],
) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    emit(writer, Event::Start(BytesStart::new("metadatagroup")), "metadatagroup")?;
    for entry in entries {
        write_metadata(writer, entry)?;
    }
    close(writer, "metadatagroup")
}
