//! Beam Lattice extension (with the balls addendum)

use crate::error::{Error, Result};
use crate::model::{Ball, BallMode, Beam, BeamCapMode, BeamLattice, BeamSet, Extension};

use super::context::ReadContext;
use super::node::{Attribute, AttributeScope, Element, Node, NodeKind, XmlTokens};
use super::{WarningCode, parse_f64, parse_index, parse_resource_id};

fn parse_radius(element: &str, attr: &Attribute) -> Result<f64> {
    let value = parse_f64(element, attr)?;
    if value <= 0.0 {
        return Err(Error::invalid_xml_element(
            element,
            &format!("Attribute '{}' must be positive, got {}", attr.name, value),
        ));
    }
    Ok(value)
}

fn check_vertex(element: &str, index: u32, vertex_count: usize) -> Result<()> {
    if index as usize >= vertex_count {
        return Err(Error::invalid_xml_element(
            element,
            &format!(
                "Vertex index {} out of range (mesh has {} vertices)",
                index, vertex_count
            ),
        ));
    }
    Ok(())
}

/// Cap modes warn and fall back to the default instead of failing the read
fn parse_cap(ctx: &mut ReadContext<'_>, attr: &Attribute) -> Result<Option<BeamCapMode>> {
    match attr.value.parse::<BeamCapMode>() {
        Ok(cap) => Ok(Some(cap)),
        Err(_) => {
            ctx.warn(
                WarningCode::InvalidOptionalValue,
                format!("Invalid beam cap mode '{}'", attr.value),
            )?;
            Ok(None)
        }
    }
}

/// True for lattice attributes that may appear unprefixed or in the balls namespace
fn is_balls_attribute(attr: &Attribute) -> bool {
    matches!(
        attr.scope(),
        AttributeScope::Local | AttributeScope::Extension(Extension::BeamLatticeBalls)
    )
}

pub(super) fn read_beam_lattice(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    vertex_count: usize,
) -> Result<BeamLattice> {
    let mut node = Node::new(NodeKind::BeamLattice, element);
    let mut radius = None;
    let mut min_length = None;
    let mut cap_mode = None;
    let mut ball_mode = BallMode::default();
    let mut ball_radius = None;
    let mut clipping_mode = None;
    let mut clipping_mesh_id = None;
    let mut representation_mesh_id = None;
    let mut pid = None;
    let mut pindex = None;

    node.parse_attributes(ctx, |ctx, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "radius") => radius = Some(parse_radius("beamlattice", attr)?),
            (AttributeScope::Local, "minlength") => {
                min_length = Some(parse_radius("beamlattice", attr)?)
            }
            (AttributeScope::Local, "cap") => cap_mode = parse_cap(ctx, attr)?,
            (AttributeScope::Local, "clippingmode") => match attr.value.as_str() {
                "none" | "inside" | "outside" => clipping_mode = Some(attr.value.clone()),
                other => ctx.warn(
                    WarningCode::InvalidOptionalValue,
                    format!("Invalid clipping mode '{}'", other),
                )?,
            },
            (AttributeScope::Local, "clippingmesh") => {
                clipping_mesh_id = Some(parse_resource_id("beamlattice", attr)?)
            }
            (AttributeScope::Local, "representationmesh") => {
                representation_mesh_id = Some(parse_resource_id("beamlattice", attr)?)
            }
            (AttributeScope::Local, "pid") => pid = Some(parse_resource_id("beamlattice", attr)?),
            (AttributeScope::Local, "pindex") => pindex = Some(parse_index("beamlattice", attr)?),
            (_, "ballmode") if is_balls_attribute(attr) => match attr.value.parse::<BallMode>() {
                Ok(mode) => ball_mode = mode,
                Err(_) => ctx.warn(
                    WarningCode::InvalidOptionalValue,
                    format!("Invalid ball mode '{}', using none", attr.value),
                )?,
            },
            (_, "ballradius") if is_balls_attribute(attr) => {
                ball_radius = Some(parse_radius("beamlattice", attr)?)
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    let radius = radius.ok_or_else(|| Error::missing_attribute("beamlattice", "radius"))?;
    let min_length =
        min_length.ok_or_else(|| Error::missing_attribute("beamlattice", "minlength"))?;

    let mut lattice = BeamLattice::new(radius, min_length);
    lattice.cap_mode = cap_mode.unwrap_or_default();
    lattice.ball_mode = ball_mode;
    lattice.ball_radius = ball_radius;
    lattice.clipping_mode = clipping_mode;
    lattice.clipping_mesh_id = clipping_mesh_id;
    lattice.representation_mesh_id = representation_mesh_id;
    lattice.pid = pid;
    lattice.pindex = pindex;

    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| match kind {
        NodeKind::Beams => read_beams(ctx, tokens, child, vertex_count, &mut lattice.beams),
        NodeKind::Balls => read_balls(ctx, tokens, child, vertex_count, &mut lattice.balls),
        NodeKind::BeamSets => read_beam_sets(ctx, tokens, child, &mut lattice.beam_sets),
        _ => tokens.skip_element(),
    })?;
    node.finish()?;

    for set in &lattice.beam_sets {
        if let Some(index) = set.beam_refs.iter().find(|&&i| i as usize >= lattice.beams.len()) {
            return Err(Error::invalid_xml_element(
                "ref",
                &format!("Beam index {} out of range ({} beams)", index, lattice.beams.len()),
            ));
        }
        if let Some(index) = set.ball_refs.iter().find(|&&i| i as usize >= lattice.balls.len()) {
            return Err(Error::invalid_xml_element(
                "ballref",
                &format!("Ball index {} out of range ({} balls)", index, lattice.balls.len()),
            ));
        }
    }

    Ok(lattice)
}

fn read_beams(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    vertex_count: usize,
    beams: &mut Vec<Beam>,
) -> Result<()> {
    let mut node = Node::new(NodeKind::Beams, element);
    node.parse_attributes(ctx, |_, _| Ok(false))?;
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Beam {
            return tokens.skip_element();
        }
        beams.push(read_beam(ctx, tokens, child, vertex_count)?);
        Ok(())
    })?;
    node.finish()
}

fn read_beam(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    vertex_count: usize,
) -> Result<Beam> {
    let mut node = Node::new(NodeKind::Beam, element);
    let mut v1 = None;
    let mut v2 = None;
    let mut r1 = None;
    let mut r2 = None;
    let mut cap1 = None;
    let mut cap2 = None;
    node.parse_attributes(ctx, |ctx, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "v1") => v1 = Some(parse_index("beam", attr)?),
            (AttributeScope::Local, "v2") => v2 = Some(parse_index("beam", attr)?),
            (AttributeScope::Local, "r1") => r1 = Some(parse_radius("beam", attr)?),
            (AttributeScope::Local, "r2") => r2 = Some(parse_radius("beam", attr)?),
            (AttributeScope::Local, "cap1") => cap1 = parse_cap(ctx, attr)?,
            (AttributeScope::Local, "cap2") => cap2 = parse_cap(ctx, attr)?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    node.parse_content(ctx, tokens, |_, tokens, _, _| tokens.skip_element())?;
    node.finish()?;

    let v1 = v1.ok_or_else(|| Error::missing_attribute("beam", "v1"))?;
    let v2 = v2.ok_or_else(|| Error::missing_attribute("beam", "v2"))?;
    check_vertex("beam", v1, vertex_count)?;
    check_vertex("beam", v2, vertex_count)?;
    if v1 == v2 {
        return Err(Error::invalid_xml_element(
            "beam",
            &format!("Beam connects vertex {} to itself", v1),
        ));
    }

    Ok(Beam {
        r1,
        r2,
        cap1,
        cap2,
        ..Beam::new(v1, v2)
    })
}

fn read_balls(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    vertex_count: usize,
    balls: &mut Vec<Ball>,
) -> Result<()> {
    let mut node = Node::new(NodeKind::Balls, element);
    node.parse_attributes(ctx, |_, _| Ok(false))?;
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Ball {
            return tokens.skip_element();
        }
        let mut ball = Node::new(NodeKind::Ball, child);
        let mut vindex = None;
        let mut radius = None;
        ball.parse_attributes(ctx, |_, attr| {
            match (attr.scope(), attr.name.as_str()) {
                (AttributeScope::Local, "vindex") => vindex = Some(parse_index("ball", attr)?),
                (AttributeScope::Local, "r") => radius = Some(parse_radius("ball", attr)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        ball.parse_content(ctx, tokens, |_, tokens, _, _| tokens.skip_element())?;
        ball.finish()?;

        let vindex = vindex.ok_or_else(|| Error::missing_attribute("ball", "vindex"))?;
        check_vertex("ball", vindex, vertex_count)?;
        balls.push(Ball {
            vindex,
            radius,
        });
        Ok(())
    })?;
    node.finish()
}

fn read_beam_sets(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
    sets: &mut Vec<BeamSet>,
) -> Result<()> {
    let mut node = Node::new(NodeKind::BeamSets, element);
    node.parse_attributes(ctx, |_, _| Ok(false))?;
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::BeamSet {
            return tokens.skip_element();
        }
        let mut set_node = Node::new(NodeKind::BeamSet, child);
        let mut set = BeamSet::default();
        set_node.parse_attributes(ctx, |_, attr| {
            match (attr.scope(), attr.name.as_str()) {
                (AttributeScope::Local, "name") => set.name = Some(attr.value.clone()),
                (AttributeScope::Local, "identifier") => set.identifier = Some(attr.value.clone()),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        set_node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
            let tag = if kind == NodeKind::BeamRef { "ref" } else { "ballref" };
            if !matches!(kind, NodeKind::BeamRef | NodeKind::BallRef) {
                return tokens.skip_element();
            }
            let mut reference = Node::new(kind, child);
            let mut index = None;
            reference.parse_attributes(ctx, |_, attr| {
                match (attr.scope(), attr.name.as_str()) {
                    (AttributeScope::Local, "index") => index = Some(parse_index(tag, attr)?),
                    _ => return Ok(false),
                }
                Ok(true)
            })?;
            reference.parse_content(ctx, tokens, |_, tokens, _, _| tokens.skip_element())?;
            reference.finish()?;

            let index = index.ok_or_else(|| Error::missing_attribute(tag, "index"))?;
            if kind == NodeKind::BeamRef {
                set.beam_refs.push(index);
            } else {
                set.ball_refs.push(index);
            }
            Ok(())
        })?;
        set_node.finish()?;
        sets.push(set);
        Ok(())
    })?;
    node.finish()
}
