//! Core specification elements: model, metadata, resources, objects, meshes,
//! components and the build

use std::collections::{BTreeMap, HashSet};

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::model::{
    BuildItem, Component, ComponentsObject, Extension, MAX_COORDINATE_VALUE, Mesh, MeshObject,
    MetadataEntry, ObjectInfo, ObjectType, ResourceId, ResourceKey, Transform, Triangle, Unit,
    Vertex,
};
use crate::opc::normalize_part_name;

use super::context::{Deferred, PartRole, ReadContext};
use super::node::{AttributeScope, Element, Node, NodeKind, Token, XmlTokens};
use super::{
    PROGRESS_FACE_STRIDE, ProgressStage, WarningCode, beam_lattice, material, parse_bool,
    parse_f64, parse_index, parse_resource_id, slice,
};

/// Per-triangle property assignment: face, group ID, `[p1, p2, p3]`
///
/// The group is `None` when neither the triangle nor its object names a `pid`.
pub(super) type FaceAssignment = (usize, Option<ResourceId>, [u32; 3]);

/// Read one model part and resolve the references it makes
pub(super) fn read_document(ctx: &mut ReadContext<'_>, xml: &str, role: PartRole) -> Result<()> {
    ctx.check_progress(ProgressStage::ReadModel)?;
    let mut tokens = XmlTokens::new(xml);

    loop {
        match tokens.next_token()? {
            Token::Start(element) => {
                if element.name != "model"
                    || Extension::from_namespace(&element.namespace) != Some(Extension::Core)
                {
                    return Err(Error::InvalidXml(format!(
                        "Root element must be <model> in the 3MF core namespace, found <{}> in '{}'",
                        element.name, element.namespace
                    )));
                }
                return read_model(ctx, &mut tokens, element, role);
            }
            Token::Text(_) => {}
            Token::End | Token::Eof => {
                return Err(Error::InvalidXml(format!(
                    "Model part {} has no <model> element",
                    ctx.part
                )));
            }
        }
    }
}

fn read_model(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    role: PartRole,
) -> Result<()> {
    let mut node = Node::new(NodeKind::Model, element);
    let mut unit = None;
    let mut language = None;
    let mut required = None;
    let mut recommended = None;
    let mut thumbnail = None;

    node.parse_attributes(ctx, |ctx, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "unit") => match attr.value.parse::<Unit>() {
                Ok(u) => unit = Some(u),
                Err(_) => ctx.warn(
                    WarningCode::InvalidUnit,
                    format!("Invalid unit '{}', using millimeter", attr.value),
                )?,
            },
            (AttributeScope::Local, "requiredextensions") => required = Some(attr.value.clone()),
            (AttributeScope::Local, "recommendedextensions") => {
                recommended = Some(attr.value.clone())
            }
            (AttributeScope::Local, "thumbnail") => {
                thumbnail = Some(normalize_part_name(&attr.value))
            }
            (AttributeScope::Xml, "lang") => language = Some(attr.value.clone()),
            (AttributeScope::Xml, "space") => {
                return Err(Error::invalid_xml_element(
                    "model",
                    "Attribute 'xml:space' is not allowed on the model element",
                ));
            }
            (AttributeScope::Xml, _) => {}
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    let required = match required {
        Some(list) => resolve_extension_prefixes(ctx, tokens, &list, true)?,
        None => Vec::new(),
    };
    let recommended = match recommended {
        Some(list) => resolve_extension_prefixes(ctx, tokens, &list, false)?,
        None => Vec::new(),
    };

    if role == PartRole::Root {
        ctx.model.unit = unit.unwrap_or_default();
        if let Some(language) = language {
            ctx.model.language = language;
        }
        ctx.model.required_extensions = required;
        ctx.model.recommended_extensions = recommended;
        ctx.model.thumbnail = thumbnail;
    }

    let mut seen_resources = false;
    let mut seen_build = false;
    let mut metadata_names = HashSet::new();

    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        match kind {
            NodeKind::Metadata => {
                let entry = read_metadata(ctx, tokens, child)?;
                if !metadata_names.insert(entry.name.clone()) {
                    ctx.warn(
                        WarningCode::DuplicateMetadata,
                        format!("Metadata '{}' is defined more than once", entry.name),
                    )?;
                } else if role == PartRole::Root {
                    ctx.model.metadata.push(entry);
                }
            }
            NodeKind::Resources => {
                if seen_resources {
                    return Err(Error::invalid_xml_element(
                        "model",
                        "Model contains more than one <resources> element",
                    ));
                }
                seen_resources = true;
                read_resources(ctx, tokens, child)?;
            }
            NodeKind::Build => {
                if seen_build {
                    return Err(Error::invalid_xml_element(
                        "model",
                        "Model contains more than one <build> element",
                    ));
                }
                seen_build = true;
                read_build(ctx, tokens, child, role)?;
            }
            _ => tokens.skip_element()?,
        }
        Ok(())
    })?;
    node.finish()?;

    if role == PartRole::Root {
        if !seen_resources {
            return Err(Error::invalid_xml_element(
                "model",
                "Missing required <resources> element",
            ));
        }
        if !seen_build {
            return Err(Error::invalid_xml_element("model", "Missing required <build> element"));
        }
    }
    Ok(())
}

/// Map a space-separated prefix list onto extensions
///
/// Every prefix must be declared. Unknown namespaces are dropped; for required
/// extensions that is a warning.
fn resolve_extension_prefixes(
    ctx: &mut ReadContext<'_>,
    tokens: &XmlTokens<'_>,
    list: &str,
    required: bool,
) -> Result<Vec<Extension>> {
    let mut extensions = Vec::new();
    for prefix in list.split_whitespace() {
        let namespace = tokens.lookup_prefix(prefix).ok_or_else(|| {
            Error::invalid_xml_element(
                "model",
                &format!("Extension prefix '{}' is not declared", prefix),
            )
        })?;
        match Extension::from_namespace(namespace).filter(|ext| ctx.config.supports(ext)) {
            Some(extension) => {
                if !extensions.contains(&extension) {
                    extensions.push(extension);
                }
            }
            None if required => {
                let message = format!("Required extension '{}' is not supported", namespace);
                ctx.warn(WarningCode::UnsupportedRequiredExtension, message)?;
            }
            None => {
                debug!(namespace; "Ignoring unsupported recommended extension");
            }
        }
    }
    Ok(extensions)
}

fn read_metadata(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<MetadataEntry> {
    let mut node = Node::new(NodeKind::Metadata, element);
    let mut name = None;
    let mut preserve = None;
    let mut metadata_type = None;

    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "name") => name = Some(attr.value.clone()),
            (AttributeScope::Local, "preserve") => preserve = Some(parse_bool("metadata", attr)?),
            (AttributeScope::Local, "type") => metadata_type = Some(attr.value.clone()),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    let name = name.ok_or_else(|| Error::missing_attribute("metadata", "name"))?;

    if let Some((prefix, _)) = name.split_once(':')
        && tokens.lookup_prefix(prefix).is_none()
    {
        ctx.warn(
            WarningCode::InvalidMetadataName,
            format!("Metadata name '{}' uses undeclared prefix '{}'", name, prefix),
        )?;
    }

    let value = node.parse_text(ctx, tokens)?;
    node.finish()?;

    Ok(MetadataEntry {
        name,
        value,
        preserve,
        metadata_type,
    })
}

fn read_metadata_group(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<Vec<MetadataEntry>> {
    let mut node = Node::new(NodeKind::MetadataGroup, element);
    node.parse_attributes(ctx, |_, _| Ok(false))?;

    let mut entries: Vec<MetadataEntry> = Vec::new();
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Metadata {
            return tokens.skip_element();
        }
        let entry = read_metadata(ctx, tokens, child)?;
        if entries.iter().any(|e| e.name == entry.name) {
            ctx.warn(
                WarningCode::DuplicateMetadata,
                format!("Metadata '{}' is defined more than once in a group", entry.name),
            )?;
        } else {
            entries.push(entry);
        }
        Ok(())
    })?;
    node.finish()?;
    Ok(entries)
}

fn read_resources(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<()> {
    ctx.check_progress(ProgressStage::ReadResources)?;
    let mut node = Node::new(NodeKind::Resources, element);
    node.parse_attributes(ctx, |_, _| Ok(false))?;

    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| match kind {
        NodeKind::Object => read_object(ctx, tokens, child),
        NodeKind::BaseMaterials => material::read_base_materials(ctx, tokens, child),
        NodeKind::ColorGroup => material::read_color_group(ctx, tokens, child),
        NodeKind::Texture2D => material::read_texture2d(ctx, tokens, child),
        NodeKind::Texture2DGroup => material::read_texture2d_group(ctx, tokens, child),
        NodeKind::CompositeMaterials => material::read_composite_materials(ctx, tokens, child),
        NodeKind::MultiProperties => material::read_multi_properties(ctx, tokens, child),
        NodeKind::SliceStack => slice::read_slice_stack(ctx, tokens, child),
        _ => tokens.skip_element(),
    })?;
    node.finish()?;

    ctx.resolve_pending()
}

fn read_object(ctx: &mut ReadContext<'_>, tokens: &mut XmlTokens<'_>, element: Element) -> Result<()> {
    let mut node = Node::new(NodeKind::Object, element);
    let mut id = None;
    let mut info = ObjectInfo::default();
    let mut pid = None;
    let mut pindex = None;

    node.parse_attributes(ctx, |ctx, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "id") => id = Some(parse_resource_id("object", attr)?),
            (AttributeScope::Local, "name") => info.name = Some(attr.value.clone()),
            (AttributeScope::Local, "type") => match attr.value.parse::<ObjectType>() {
                Ok(object_type) => info.object_type = object_type,
                Err(_) => ctx.warn(
                    WarningCode::InvalidObjectType,
                    format!("Invalid object type '{}', using model", attr.value),
                )?,
            },
            (AttributeScope::Local, "pid") => pid = Some(parse_resource_id("object", attr)?),
            (AttributeScope::Local, "pindex") => pindex = Some(parse_index("object", attr)?),
            (AttributeScope::Local, "partnumber") => info.part_number = Some(attr.value.clone()),
            (AttributeScope::Local, "thumbnail") => {
                info.thumbnail = Some(normalize_part_name(&attr.value))
            }
            (AttributeScope::Extension(Extension::Production), "UUID") => {
                info.uuid = Some(attr.value.clone())
            }
            (AttributeScope::Extension(Extension::Slice), "slicestackid") => {
                info.slice_stack_id = Some(parse_resource_id("object", attr)?)
            }
            (AttributeScope::Extension(Extension::Slice), "meshresolution") => {
                match attr.value.parse() {
                    Ok(resolution) => info.mesh_resolution = resolution,
                    Err(_) => ctx.warn(
                        WarningCode::InvalidOptionalValue,
                        format!("Invalid mesh resolution '{}', using fullres", attr.value),
                    )?,
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    let id = id.ok_or_else(|| Error::missing_attribute("object", "id"))?;
    trace!(id; "Reading object");

    let mut mesh = None;
    let mut components = None;
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        match kind {
            NodeKind::Mesh => {
                if mesh.is_some() {
                    return Err(Error::invalid_xml_element("object", "More than one <mesh> element"));
                }
                mesh = Some(read_mesh(ctx, tokens, child, pid)?);
            }
            NodeKind::Components => {
                if components.is_some() {
                    return Err(Error::invalid_xml_element(
                        "object",
                        "More than one <components> element",
                    ));
                }
                components = Some(read_components(ctx, tokens, child)?);
            }
            NodeKind::MetadataGroup => info.metadata = read_metadata_group(ctx, tokens, child)?,
            _ => tokens.skip_element()?,
        }
        Ok(())
    })?;
    node.finish()?;

    let referenced_by = format!("object {}", id);
    let slice_stack_id = info.slice_stack_id;

    match (mesh, components) {
        (Some(_), Some(_)) => {
            return Err(Error::InvalidModel(format!(
                "Object {} contains both a mesh and components",
                id
            )));
        }
        (None, None) => {
            return Err(Error::InvalidModel(format!(
                "Object {} contains neither a mesh nor components",
                id
            )));
        }
        (Some((mesh, assignments)), None) => {
            let mut object = MeshObject::new(id, mesh);
            object.info = info;
            let handle = ctx.add_resource(object)?;

            // Without an object pid, triangles giving only p1 borrow the first pid a
            // triangle names; triangles without p1 stay unassigned
            let inferred = assignments.iter().find_map(|&(_, group, _)| group);
            if pid.is_none() && !assignments.is_empty() {
                let message = match inferred {
                    Some(group) => format!(
                        "Object {} assigns triangle properties without a default pid, using group {}",
                        id, group
                    ),
                    None => format!(
                        "Object {} assigns triangle properties without any pid, ignoring them",
                        id
                    ),
                };
                ctx.warn(WarningCode::MissingDefaultProperty, message)?;
            }

            let mut by_group: BTreeMap<ResourceId, Vec<(usize, [u32; 3])>> = BTreeMap::new();
            for (face, group, indices) in assignments {
                if let Some(group) = group.or(inferred) {
                    by_group.entry(group).or_default().push((face, indices));
                }
            }
            for (group, faces) in by_group {
                let target = ctx.key(None, group);
                ctx.reference(
                    target,
                    referenced_by.clone(),
                    Deferred::FaceProperties {
                        object: handle,
                        faces,
                    },
                )?;
            }
            if let Some(group) = pid {
                let index = pindex.unwrap_or(0);
                let target = ctx.key(None, group);
                ctx.reference(
                    target,
                    referenced_by.clone(),
                    Deferred::ObjectDefault {
                        object: handle,
                        index,
                    },
                )?;
            }
        }
        (None, Some(components)) => {
            let targets: Vec<ResourceKey> = components
                .iter()
                .map(|c: &Component| ctx.key(c.path.as_deref(), c.object_id))
                .collect();
            let mut object = ComponentsObject::new(id);
            object.info = info;
            object.components = components;
            ctx.add_resource(object)?;
            for target in targets {
                ctx.reference(target, referenced_by.clone(), Deferred::ComponentTarget)?;
            }
        }
    }

    if let Some(stack) = slice_stack_id {
        let target = ctx.key(None, stack);
        ctx.reference(target, referenced_by, Deferred::ObjectSliceStack)?;
    }
    Ok(())
}

fn read_mesh(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    object_pid: Option<ResourceId>,
) -> Result<(Mesh, Vec<FaceAssignment>)> {
    ctx.check_progress(ProgressStage::ReadMesh)?;
    let mut node = Node::new(NodeKind::Mesh, element);
    node.parse_attributes(ctx, |_, _| Ok(false))?;

    let mut mesh = Mesh::new();
    let mut assignments = Vec::new();
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| match kind {
        NodeKind::Vertices => read_vertices(ctx, tokens, child, &mut mesh),
        NodeKind::Triangles => {
            read_triangles(ctx, tokens, child, &mut mesh, object_pid, &mut assignments)
        }
        NodeKind::BeamLattice => {
            let lattice =
                beam_lattice::read_beam_lattice(ctx, tokens, child, mesh.vertices.len())?;
            mesh.beam_lattice = Some(lattice);
            Ok(())
        }
        _ => tokens.skip_element(),
    })?;
    node.finish()?;

    Ok((mesh, assignments))
}

fn read_vertices(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    mesh: &mut Mesh,
) -> Result<()> {
    let mut node = Node::new(NodeKind::Vertices, element);
    node.parse_attributes(ctx, |_, _| Ok(false))?;
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Vertex {
            return tokens.skip_element();
        }
        let vertex = read_vertex(ctx, tokens, child)?;
        mesh.try_add_vertex(vertex)?;
        ctx.tick(ProgressStage::ReadMesh, mesh.vertices.len(), PROGRESS_FACE_STRIDE)
    })?;
    node.finish()
}

fn read_vertex(ctx: &mut ReadContext<'_>, tokens: &mut XmlTokens<'_>, element: Element) -> Result<Vertex> {
    let mut node = Node::new(NodeKind::Vertex, element);
    let mut coords = [None; 3];

    node.parse_attributes(ctx, |_, attr| {
        let slot = match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "x") => 0,
            (AttributeScope::Local, "y") => 1,
            (AttributeScope::Local, "z") => 2,
            _ => return Ok(false),
        };
        let value = parse_f64("vertex", attr)?;
        if value.abs() > MAX_COORDINATE_VALUE {
            return Err(Error::invalid_xml_element(
                "vertex",
                &format!(
                    "Coordinate {} = {} exceeds the maximum magnitude {}",
                    attr.name, value, MAX_COORDINATE_VALUE
                ),
            ));
        }
        coords[slot] = Some(value);
        Ok(true)
    })?;
    node.parse_content(ctx, tokens, |_, tokens, _, _| tokens.skip_element())?;
    node.finish()?;

    let [Some(x), Some(y), Some(z)] = coords else {
        let missing = ["x", "y", "z"][coords.iter().position(Option::is_none).unwrap_or(0)];
        return Err(Error::missing_attribute("vertex", missing));
    };
    Ok(Vertex::new(x, y, z))
}

fn read_triangles(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    mesh: &mut Mesh,
    object_pid: Option<ResourceId>,
    assignments: &mut Vec<FaceAssignment>,
) -> Result<()> {
    let mut node = Node::new(NodeKind::Triangles, element);
    node.parse_attributes(ctx, |_, _| Ok(false))?;
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Triangle {
            return tokens.skip_element();
        }
        let (triangle, pid, indices) = read_triangle(ctx, tokens, child, mesh.vertices.len())?;
        if triangle.is_degenerate() {
            ctx.warn(
                WarningCode::DegenerateTriangle,
                format!(
                    "Skipping degenerate triangle ({}, {}, {})",
                    triangle.v1, triangle.v2, triangle.v3
                ),
            )?;
            return Ok(());
        }

        let face = mesh.add_triangle(triangle);
        // A triangle carries properties only with at least p1
        if let Some(p1) = indices[0] {
            let pid = pid.or(object_pid);
            let p2 = indices[1].unwrap_or(p1);
            let p3 = indices[2].unwrap_or(p1);
            assignments.push((face, pid, [p1, p2, p3]));
        }
        ctx.tick(ProgressStage::ReadMesh, mesh.triangles.len(), PROGRESS_FACE_STRIDE)
    })?;
    node.finish()
}

type TriangleRecord = (Triangle, Option<ResourceId>, [Option<u32>; 3]);

fn read_triangle(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    vertex_count: usize,
) -> Result<TriangleRecord> {
    let mut node = Node::new(NodeKind::Triangle, element);
    let mut vertices = [None; 3];
    let mut properties = [None; 3];
    let mut pid = None;

    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, name @ ("v1" | "v2" | "v3")) => {
                let slot = usize::from(name.as_bytes()[1] - b'1');
                let index = parse_index("triangle", attr)?;
                if index as usize >= vertex_count {
                    return Err(Error::invalid_xml_element(
                        "triangle",
                        &format!(
                            "Vertex index {} = {} is out of range (mesh has {} vertices)",
                            name, index, vertex_count
                        ),
                    ));
                }
                vertices[slot] = Some(index);
            }
            (AttributeScope::Local, name @ ("p1" | "p2" | "p3")) => {
                let slot = usize::from(name.as_bytes()[1] - b'1');
                properties[slot] = Some(parse_index("triangle", attr)?);
            }
            (AttributeScope::Local, "pid") => pid = Some(parse_resource_id("triangle", attr)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    node.parse_content(ctx, tokens, |_, tokens, _, _| tokens.skip_element())?;
    node.finish()?;

    let [Some(v1), Some(v2), Some(v3)] = vertices else {
        let missing = ["v1", "v2", "v3"][vertices.iter().position(Option::is_none).unwrap_or(0)];
        return Err(Error::missing_attribute("triangle", missing));
    };
    Ok((Triangle::new(v1, v2, v3), pid, properties))
}

fn read_components(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<Vec<Component>> {
    let mut node = Node::new(NodeKind::Components, element);
    node.parse_attributes(ctx, |_, _| Ok(false))?;

    let mut components = Vec::new();
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Component {
            return tokens.skip_element();
        }
        components.push(read_component(ctx, tokens, child)?);
        Ok(())
    })?;
    node.finish()?;
    Ok(components)
}

fn read_component(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<Component> {
    let mut node = Node::new(NodeKind::Component, element);
    let mut object_id = None;
    let mut transform = Transform::IDENTITY;
    let mut uuid = None;
    let mut path = None;

    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "objectid") => {
                object_id = Some(parse_resource_id("component", attr)?)
            }
            (AttributeScope::Local, "transform") => transform = Transform::parse(&attr.value)?,
            (AttributeScope::Extension(Extension::Production), "UUID") => {
                uuid = Some(attr.value.clone())
            }
            (AttributeScope::Extension(Extension::Production), "path") => {
                path = Some(normalize_part_name(&attr.value))
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    node.parse_content(ctx, tokens, |_, tokens, _, _| tokens.skip_element())?;
    node.finish()?;

    let object_id = object_id.ok_or_else(|| Error::missing_attribute("component", "objectid"))?;
    Ok(Component {
        object_id,
        path,
        transform,
        uuid,
    })
}

fn read_build(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    role: PartRole,
) -> Result<()> {
    ctx.check_progress(ProgressStage::ReadBuild)?;
    let mut node = Node::new(NodeKind::Build, element);
    let mut uuid = None;

    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Extension(Extension::Production), "UUID") => {
                uuid = Some(attr.value.clone())
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Item {
            return tokens.skip_element();
        }
        let item = read_item(ctx, tokens, child)?;
        if role == PartRole::Linked {
            return Err(Error::InvalidModel(format!(
                "Model part {} is not the root part and must not contain build items",
                ctx.part
            )));
        }

        if let Some(path) = item.path.clone()
            && path != ctx.part
            && ctx.config.linked_parts()
            && ctx.model.find_package_resource_id(&path, item.object_id).is_none()
            && ctx.has_package()
        {
            ctx.load_part(&path)?;
        }
        ctx.model.add_build_item(item);
        Ok(())
    })?;
    node.finish()?;

    if role == PartRole::Root {
        ctx.model.build.uuid = uuid;
    }
    Ok(())
}

fn read_item(ctx: &mut ReadContext<'_>, tokens: &mut XmlTokens<'_>, element: Element) -> Result<BuildItem> {
    let mut node = Node::new(NodeKind::Item, element);
    let mut object_id = None;
    let mut transform = None;
    let mut part_number = None;
    let mut uuid = None;
    let mut path = None;

    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "objectid") => object_id = Some(parse_resource_id("item", attr)?),
            (AttributeScope::Local, "transform") => transform = Some(Transform::parse(&attr.value)?),
            (AttributeScope::Local, "partnumber") => part_number = Some(attr.value.clone()),
            (AttributeScope::Extension(Extension::Production), "UUID") => {
                uuid = Some(attr.value.clone())
            }
            (AttributeScope::Extension(Extension::Production), "path") => {
                path = Some(normalize_part_name(&attr.value))
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    let mut metadata = Vec::new();
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind == NodeKind::MetadataGroup {
            metadata = read_metadata_group(ctx, tokens, child)?;
            Ok(())
        } else {
            tokens.skip_element()
        }
    })?;
    node.finish()?;

    let object_id = object_id.ok_or_else(|| Error::missing_attribute("item", "objectid"))?;
    let mut item = BuildItem::new(object_id);
    item.transform = transform;
    item.part_number = part_number;
    item.uuid = uuid;
    item.path = path;
    item.metadata = metadata;
    Ok(item)
}
