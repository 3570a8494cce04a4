//! Slice extension: slice stacks, slices and slice references

use crate::error::{Error, Result};
use crate::model::{Slice, SlicePolygon, SliceReference, SliceSegment, SliceStack, Vertex2D};
use crate::opc::normalize_part_name;

use super::context::{Deferred, ReadContext};
use super::node::{AttributeScope, Element, Node, NodeKind, XmlTokens};
use super::{PROGRESS_SLICE_STRIDE, ProgressStage, parse_f64, parse_index, parse_resource_id};

pub(super) fn read_slice_stack(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<()> {
    ctx.check_progress(ProgressStage::ReadSlices)?;
    let mut node = Node::new(NodeKind::SliceStack, element);
    let mut id = None;
    let mut bottom_z = 0.0;
    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "id") => id = Some(parse_resource_id("slicestack", attr)?),
            (AttributeScope::Local, "zbottom") => bottom_z = parse_f64("slicestack", attr)?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    let id = id.ok_or_else(|| Error::missing_attribute("slicestack", "id"))?;

    let mut stack = SliceStack::new(id, bottom_z);
    let mut slice_count = 0;
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| match kind {
        NodeKind::Slice => {
            let slice = read_slice(ctx, tokens, child)?;
            stack.add_slice(slice)?;
            slice_count += 1;
            ctx.tick(ProgressStage::ReadSlices, slice_count, PROGRESS_SLICE_STRIDE)
        }
        NodeKind::SliceRef => {
            let reference = read_slice_ref(ctx, tokens, child)?;
            stack.set_reference(reference)
        }
        _ => tokens.skip_element(),
    })?;
    node.finish()?;

    let reference = stack.reference().cloned();
    ctx.add_resource(stack)?;

    if let Some(reference) = reference {
        let target = ctx.key(Some(&reference.path), reference.stack_id);
        ctx.reference(target, format!("slicestack {}", id), Deferred::SliceRefStack)?;
    }
    Ok(())
}

fn read_slice(ctx: &mut ReadContext<'_>, tokens: &mut XmlTokens<'_>, element: Element) -> Result<Slice> {
    let mut node = Node::new(NodeKind::Slice, element);
    let mut ztop = None;
    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "ztop") => ztop = Some(parse_f64("slice", attr)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    let ztop = ztop.ok_or_else(|| Error::missing_attribute("slice", "ztop"))?;

    let mut slice = Slice::new(ztop);
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| match kind {
        NodeKind::SliceVertices => read_slice_vertices(ctx, tokens, child, &mut slice.vertices),
        NodeKind::Polygon => {
            let polygon = read_polygon(ctx, tokens, child, slice.vertices.len())?;
            slice.polygons.push(polygon);
            Ok(())
        }
        _ => tokens.skip_element(),
    })?;
    node.finish()?;
    Ok(slice)
}

fn read_slice_vertices(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    vertices: &mut Vec<Vertex2D>,
) -> Result<()> {
    let mut node = Node::new(NodeKind::SliceVertices, element);
    node.parse_attributes(ctx, |_, _| Ok(false))?;
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::SliceVertex {
            return tokens.skip_element();
        }
        let mut vertex = Node::new(NodeKind::SliceVertex, child);
        let mut x = None;
        let mut y = None;
        vertex.parse_attributes(ctx, |_, attr| {
            match (attr.scope(), attr.name.as_str()) {
                (AttributeScope::Local, "x") => x = Some(parse_f64("vertex", attr)?),
                (AttributeScope::Local, "y") => y = Some(parse_f64("vertex", attr)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        vertex.parse_content(ctx, tokens, |_, tokens, _, _| tokens.skip_element())?;
        vertex.finish()?;

        let x = x.ok_or_else(|| Error::missing_attribute("vertex", "x"))?;
        let y = y.ok_or_else(|| Error::missing_attribute("vertex", "y"))?;
        vertices.push(Vertex2D::new(x, y));
        Ok(())
    })?;
    node.finish()
}

fn check_slice_index(index: u32, vertex_count: usize) -> Result<()> {
    if index as usize >= vertex_count {
        return Err(Error::invalid_xml_element(
            "polygon",
            &format!(
                "Slice vertex index {} out of range ({} vertices)",
                index, vertex_count
            ),
        ));
    }
    Ok(())
}

fn read_polygon(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    vertex_count: usize,
) -> Result<SlicePolygon> {
    let mut node = Node::new(NodeKind::Polygon, element);
    let mut start = None;
    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "startv") => start = Some(parse_index("polygon", attr)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    let start = start.ok_or_else(|| Error::missing_attribute("polygon", "startv"))?;
    check_slice_index(start, vertex_count)?;

    let mut polygon = SlicePolygon::new(start);
    let mut previous = start;
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Segment {
            return tokens.skip_element();
        }
        let mut segment = Node::new(NodeKind::Segment, child);
        let mut v2 = None;
        segment.parse_attributes(ctx, |_, attr| {
            match (attr.scope(), attr.name.as_str()) {
                (AttributeScope::Local, "v2") => v2 = Some(parse_index("segment", attr)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        segment.parse_content(ctx, tokens, |_, tokens, _, _| tokens.skip_element())?;
        segment.finish()?;

        let v2 = v2.ok_or_else(|| Error::missing_attribute("segment", "v2"))?;
        check_slice_index(v2, vertex_count)?;
        if v2 == previous {
            return Err(Error::invalid_xml_element(
                "segment",
                &format!("Segment repeats vertex {}", v2),
            ));
        }
        previous = v2;
        polygon.segments.push(SliceSegment::new(v2));
        Ok(())
    })?;
    node.finish()?;
    Ok(polygon)
}

fn read_slice_ref(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<SliceReference> {
    let mut node = Node::new(NodeKind::SliceRef, element);
    let mut stack_id = None;
    let mut path = None;
    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "slicestackid") => {
                stack_id = Some(parse_resource_id("sliceref", attr)?)
            }
            (AttributeScope::Local, "slicepath") => path = Some(normalize_part_name(&attr.value)),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    node.parse_content(ctx, tokens, |_, tokens, _, _| tokens.skip_element())?;
    node.finish()?;

    let stack_id = stack_id.ok_or_else(|| Error::missing_attribute("sliceref", "slicestackid"))?;
    let path = path.ok_or_else(|| Error::missing_attribute("sliceref", "slicepath"))?;
    Ok(SliceReference::new(path, stack_id))
}
