//! Materials and Properties extension elements, plus the core `basematerials` group

use crate::error::{Error, Result};
use crate::model::{
    BaseMaterial, BaseMaterialGroup, BlendMethod, Color, ColorGroup, Composite,
    CompositeMaterials, FilterMode, Multi, MultiProperties, Tex2Coord, Texture2D,
    Texture2DGroup, TileStyle,
};
use crate::opc::normalize_part_name;

use super::context::{Deferred, ReadContext};
use super::node::{Attribute, AttributeScope, Element, Node, NodeKind, XmlTokens};
use super::{WarningCode, parse_f64, parse_f64_list, parse_resource_id, parse_u32_list};

fn parse_color(element: &str, attr: &Attribute) -> Result<Color> {
    attr.value.trim().parse::<Color>().map_err(|_| {
        Error::parse_error_with_context(
            &format!("{}@{}", element, attr.name),
            &attr.value,
            "sRGB color #RRGGBB or #RRGGBBAA",
        )
    })
}

/// Reads an element whose only content is ignored (leaf entries of a group)
fn finish_leaf(node: &mut Node, ctx: &mut ReadContext<'_>, tokens: &mut XmlTokens<'_>) -> Result<()> {
    node.parse_content(ctx, tokens, |_, tokens, _, _| tokens.skip_element())?;
    node.finish()
}

pub(super) fn read_base_materials(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<()> {
    let mut node = Node::new(NodeKind::BaseMaterials, element);
    let mut id = None;
    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "id") => id = Some(parse_resource_id("basematerials", attr)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    let id = id.ok_or_else(|| Error::missing_attribute("basematerials", "id"))?;

    let mut group = BaseMaterialGroup::new(id);
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Base {
            return tokens.skip_element();
        }
        let mut base = Node::new(NodeKind::Base, child);
        let mut name = None;
        let mut color = None;
        base.parse_attributes(ctx, |_, attr| {
            match (attr.scope(), attr.name.as_str()) {
                (AttributeScope::Local, "name") => name = Some(attr.value.clone()),
                (AttributeScope::Local, "displaycolor") => color = Some(parse_color("base", attr)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        finish_leaf(&mut base, ctx, tokens)?;

        let name = name.ok_or_else(|| Error::missing_attribute("base", "name"))?;
        let color = color.ok_or_else(|| Error::missing_attribute("base", "displaycolor"))?;
        group.materials.add(BaseMaterial::new(name, color));
        Ok(())
    })?;
    node.finish()?;

    ctx.add_resource(group)?;
    Ok(())
}

pub(super) fn read_color_group(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<()> {
    let mut node = Node::new(NodeKind::ColorGroup, element);
    let mut id = None;
    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "id") => id = Some(parse_resource_id("colorgroup", attr)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    let id = id.ok_or_else(|| Error::missing_attribute("colorgroup", "id"))?;

    let mut group = ColorGroup::new(id);
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Color {
            return tokens.skip_element();
        }
        let mut entry = Node::new(NodeKind::Color, child);
        let mut color = None;
        entry.parse_attributes(ctx, |_, attr| {
            match (attr.scope(), attr.name.as_str()) {
                (AttributeScope::Local, "color") => color = Some(parse_color("color", attr)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        finish_leaf(&mut entry, ctx, tokens)?;

        let color = color.ok_or_else(|| Error::missing_attribute("color", "color"))?;
        group.colors.add(color);
        Ok(())
    })?;
    node.finish()?;

    ctx.add_resource(group)?;
    Ok(())
}

pub(super) fn read_texture2d(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<()> {
    let mut node = Node::new(NodeKind::Texture2D, element);
    let mut id = None;
    let mut path = None;
    let mut content_type = None;
    let mut tile_u = TileStyle::default();
    let mut tile_v = TileStyle::default();
    let mut filter = FilterMode::default();

    node.parse_attributes(ctx, |ctx, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "id") => id = Some(parse_resource_id("texture2d", attr)?),
            (AttributeScope::Local, "path") => path = Some(normalize_part_name(&attr.value)),
            (AttributeScope::Local, "contenttype") => content_type = Some(attr.value.clone()),
            (AttributeScope::Local, name @ ("tilestyleu" | "tilestylev")) => {
                match attr.value.parse::<TileStyle>() {
                    Ok(style) if name == "tilestyleu" => tile_u = style,
                    Ok(style) => tile_v = style,
                    Err(_) => ctx.warn(
                        WarningCode::InvalidOptionalValue,
                        format!("Invalid {} '{}', using wrap", name, attr.value),
                    )?,
                }
            }
            (AttributeScope::Local, "filter") => match attr.value.parse::<FilterMode>() {
                Ok(mode) => filter = mode,
                Err(_) => ctx.warn(
                    WarningCode::InvalidOptionalValue,
                    format!("Invalid texture filter '{}', using auto", attr.value),
                )?,
            },
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    finish_leaf(&mut node, ctx, tokens)?;

    let id = id.ok_or_else(|| Error::missing_attribute("texture2d", "id"))?;
    let path = path.ok_or_else(|| Error::missing_attribute("texture2d", "path"))?;
    let content_type =
        content_type.ok_or_else(|| Error::missing_attribute("texture2d", "contenttype"))?;

    let mut texture = Texture2D::new(id, path, content_type);
    texture.tile_style_u = tile_u;
    texture.tile_style_v = tile_v;
    texture.filter = filter;
    ctx.add_resource(texture)?;
    Ok(())
}

pub(super) fn read_texture2d_group(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<()> {
    let mut node = Node::new(NodeKind::Texture2DGroup, element);
    let mut id = None;
    let mut texture_id = None;
    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "id") => id = Some(parse_resource_id("texture2dgroup", attr)?),
            (AttributeScope::Local, "texid") => {
                texture_id = Some(parse_resource_id("texture2dgroup", attr)?)
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    let id = id.ok_or_else(|| Error::missing_attribute("texture2dgroup", "id"))?;
    let texture_id = texture_id.ok_or_else(|| Error::missing_attribute("texture2dgroup", "texid"))?;

    let mut group = Texture2DGroup::new(id, texture_id);
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Tex2Coord {
            return tokens.skip_element();
        }
        let mut coord = Node::new(NodeKind::Tex2Coord, child);
        let mut u = None;
        let mut v = None;
        coord.parse_attributes(ctx, |_, attr| {
            match (attr.scope(), attr.name.as_str()) {
                (AttributeScope::Local, "u") => u = Some(parse_f64("tex2coord", attr)?),
                (AttributeScope::Local, "v") => v = Some(parse_f64("tex2coord", attr)?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        finish_leaf(&mut coord, ctx, tokens)?;

        let u = u.ok_or_else(|| Error::missing_attribute("tex2coord", "u"))?;
        let v = v.ok_or_else(|| Error::missing_attribute("tex2coord", "v"))?;
        group.coords.add(Tex2Coord::new(u, v));
        Ok(())
    })?;
    node.finish()?;

    ctx.add_resource(group)?;
    let target = ctx.key(None, texture_id);
    ctx.reference(target, format!("texture2dgroup {}", id), Deferred::TextureOfGroup)
}

pub(super) fn read_composite_materials(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<()> {
    let mut node = Node::new(NodeKind::CompositeMaterials, element);
    let mut id = None;
    let mut base_id = None;
    let mut indices = None;
    node.parse_attributes(ctx, |_, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "id") => {
                id = Some(parse_resource_id("compositematerials", attr)?)
            }
            (AttributeScope::Local, "matid") => {
                base_id = Some(parse_resource_id("compositematerials", attr)?)
            }
            (AttributeScope::Local, "matindices") => {
                indices = Some(parse_u32_list("compositematerials", attr)?)
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    let id = id.ok_or_else(|| Error::missing_attribute("compositematerials", "id"))?;
    let base_id = base_id.ok_or_else(|| Error::missing_attribute("compositematerials", "matid"))?;
    let indices =
        indices.ok_or_else(|| Error::missing_attribute("compositematerials", "matindices"))?;

    let mut group = CompositeMaterials::new(id, base_id, indices.clone());
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Composite {
            return tokens.skip_element();
        }
        let mut composite = Node::new(NodeKind::Composite, child);
        let mut values = None;
        composite.parse_attributes(ctx, |_, attr| {
            match (attr.scope(), attr.name.as_str()) {
                (AttributeScope::Local, "values") => {
                    values = Some(parse_f64_list("composite", attr)?)
                }
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        finish_leaf(&mut composite, ctx, tokens)?;

        let values = values.ok_or_else(|| Error::missing_attribute("composite", "values"))?;
        group.composites.add(Composite::new(values));
        Ok(())
    })?;
    node.finish()?;

    ctx.add_resource(group)?;
    let target = ctx.key(None, base_id);
    ctx.reference(
        target,
        format!("compositematerials {}", id),
        Deferred::CompositeBase { indices },
    )
}

pub(super) fn read_multi_properties(
    ctx: &mut ReadContext<'_>,
    tokens: &mut XmlTokens<'_>,
    element: Element,
) -> Result<()> {
    let mut node = Node::new(NodeKind::MultiProperties, element);
    let mut id = None;
    let mut layers = None;
    let mut blend_methods = Vec::new();
    node.parse_attributes(ctx, |ctx, attr| {
        match (attr.scope(), attr.name.as_str()) {
            (AttributeScope::Local, "id") => id = Some(parse_resource_id("multiproperties", attr)?),
            (AttributeScope::Local, "pids") => {
                layers = Some(parse_u32_list("multiproperties", attr)?)
            }
            (AttributeScope::Local, "blendmethods") => {
                for method in attr.value.split_whitespace() {
                    match method.parse::<BlendMethod>() {
                        Ok(m) => blend_methods.push(m),
                        Err(_) => {
                            ctx.warn(
                                WarningCode::InvalidOptionalValue,
                                format!("Invalid blend method '{}', using mix", method),
                            )?;
                            blend_methods.push(BlendMethod::Mix);
                        }
                    }
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    let id = id.ok_or_else(|| Error::missing_attribute("multiproperties", "id"))?;
    let layers = layers.ok_or_else(|| Error::missing_attribute("multiproperties", "pids"))?;
    if layers.is_empty() || layers.contains(&0) {
        return Err(Error::invalid_xml_element(
            "multiproperties",
            "Attribute 'pids' must list at least one positive resource ID",
        ));
    }

    let mut group = MultiProperties::new(id, layers.clone());
    group.blend_methods = blend_methods;
    node.parse_content(ctx, tokens, |ctx, tokens, kind, child| {
        if kind != NodeKind::Multi {
            return tokens.skip_element();
        }
        let mut multi = Node::new(NodeKind::Multi, child);
        let mut indices = Vec::new();
        multi.parse_attributes(ctx, |_, attr| {
            match (attr.scope(), attr.name.as_str()) {
                (AttributeScope::Local, "pindices") => indices = parse_u32_list("multi", attr)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        finish_leaf(&mut multi, ctx, tokens)?;
        group.multis.add(Multi::new(indices));
        Ok(())
    })?;
    node.finish()?;

    ctx.add_resource(group)?;
    for layer in layers {
        let target = ctx.key(None, layer);
        ctx.reference(target, format!("multiproperties {}", id), Deferred::MultiLayer)?;
    }
    Ok(())
}
