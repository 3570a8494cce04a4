//! Material extension types
//!
//! Every group stores its entries in a [`PropertyGroup`], so entries are addressable
//! both by 0-based index (as in the XML) and by property ID (as in face records).

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::resource::{PropertyGroup, ResourceId};

/// sRGB color with alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha, 255 is opaque
    pub a: u8,
}

impl Color {
    /// Opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color with alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parse `#RRGGBB` or `#RRGGBBAA`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::parse_error_with_context("color", s, "#RRGGBB or #RRGGBBAA hex literal")
        };
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());

        let r = channel(0)?;
        let g = channel(2)?;
        let b = channel(4)?;
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Color { r, g, b, a })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

/// Individual base material within a base material group
#[derive(Debug, Clone, PartialEq)]
pub struct BaseMaterial {
    /// Material name
    pub name: String,
    /// Display color
    pub display_color: Color,
}

impl BaseMaterial {
    /// Create a new base material
    pub fn new(name: impl Into<String>, display_color: Color) -> Self {
        Self {
            name: name.into(),
            display_color,
        }
    }
}

/// `<basematerials>` group
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseMaterialGroup {
    /// Resource ID
    pub id: ResourceId,
    /// Materials in index order
    pub materials: PropertyGroup<BaseMaterial>,
}

impl BaseMaterialGroup {
    /// Create a new base material group
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            materials: PropertyGroup::new(),
        }
    }
}

/// `<m:colorgroup>`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorGroup {
    /// Resource ID
    pub id: ResourceId,
    /// Colors in index order
    pub colors: PropertyGroup<Color>,
}

impl ColorGroup {
    /// Create a new color group
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            colors: PropertyGroup::new(),
        }
    }
}

/// Texture tiling along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileStyle {
    /// Repeat
    #[default]
    Wrap,
    /// Repeat mirrored
    Mirror,
    /// Clamp to edge
    Clamp,
    /// No tiling outside [0, 1]
    None,
}

impl TileStyle {
    /// Attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            TileStyle::Wrap => "wrap",
            TileStyle::Mirror => "mirror",
            TileStyle::Clamp => "clamp",
            TileStyle::None => "none",
        }
    }
}

impl FromStr for TileStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wrap" => Ok(TileStyle::Wrap),
            "mirror" => Ok(TileStyle::Mirror),
            "clamp" => Ok(TileStyle::Clamp),
            "none" => Ok(TileStyle::None),
            _ => Err(Error::parse_error_with_context(
                "tilestyle",
                s,
                "one of wrap, mirror, clamp, none",
            )),
        }
    }
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Consumer's choice
    #[default]
    Auto,
    /// Bilinear
    Linear,
    /// Nearest neighbour
    Nearest,
}

impl FilterMode {
    /// Attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Auto => "auto",
            FilterMode::Linear => "linear",
            FilterMode::Nearest => "nearest",
        }
    }
}

impl FromStr for FilterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(FilterMode::Auto),
            "linear" => Ok(FilterMode::Linear),
            "nearest" => Ok(FilterMode::Nearest),
            _ => Err(Error::parse_error_with_context(
                "filter",
                s,
                "one of auto, linear, nearest",
            )),
        }
    }
}

/// Texture2D resource from materials extension
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2D {
    /// Resource ID
    pub id: ResourceId,
    /// Path of the image attachment
    pub path: String,
    /// Content type (image/jpeg or image/png)
    pub content_type: String,
    /// Tile style for u axis
    pub tile_style_u: TileStyle,
    /// Tile style for v axis
    pub tile_style_v: TileStyle,
    /// Texture filter mode
    pub filter: FilterMode,
}

impl Texture2D {
    /// Create a new Texture2D resource
    pub fn new(id: ResourceId, path: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            content_type: content_type.into(),
            tile_style_u: TileStyle::Wrap,
            tile_style_v: TileStyle::Wrap,
            filter: FilterMode::Auto,
        }
    }
}

/// Texture 2D coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tex2Coord {
    /// U coordinate (horizontal, from left)
    pub u: f64,
    /// V coordinate (vertical, from bottom)
    pub v: f64,
}

impl Tex2Coord {
    /// Create a new texture coordinate
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

/// `<m:texture2dgroup>`
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2DGroup {
    /// Resource ID
    pub id: ResourceId,
    /// ID of the [`Texture2D`] sampled by the coordinates
    pub texture_id: ResourceId,
    /// Coordinates in index order
    pub coords: PropertyGroup<Tex2Coord>,
}

impl Texture2DGroup {
    /// Create a new texture2d group
    pub fn new(id: ResourceId, texture_id: ResourceId) -> Self {
        Self {
            id,
            texture_id,
            coords: PropertyGroup::new(),
        }
    }
}

/// Mix of base materials
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    /// Proportion per entry of the group's `material_indices`
    pub values: Vec<f64>,
}

impl Composite {
    /// Create a new composite material
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// `<m:compositematerials>`
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeMaterials {
    /// Resource ID
    pub id: ResourceId,
    /// ID of the mixed [`BaseMaterialGroup`]
    pub base_material_id: ResourceId,
    /// Indices into the base material group
    pub material_indices: Vec<u32>,
    /// Composites in index order
    pub composites: PropertyGroup<Composite>,
}

impl CompositeMaterials {
    /// Create a new composite materials group
    pub fn new(id: ResourceId, base_material_id: ResourceId, material_indices: Vec<u32>) -> Self {
        Self {
            id,
            base_material_id,
            material_indices,
            composites: PropertyGroup::new(),
        }
    }
}

/// Blend method between multi-property layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMethod {
    /// Linear mix interpolation
    #[default]
    Mix,
    /// Multiplicative blending
    Multiply,
}

impl BlendMethod {
    /// Attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            BlendMethod::Mix => "mix",
            BlendMethod::Multiply => "multiply",
        }
    }
}

impl FromStr for BlendMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mix" => Ok(BlendMethod::Mix),
            "multiply" => Ok(BlendMethod::Multiply),
            _ => Err(Error::parse_error_with_context(
                "blendmethods",
                s,
                "mix or multiply",
            )),
        }
    }
}

/// One `<m:multi>` tuple
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Multi {
    /// Index into each layer's group; missing trailing entries mean index 0
    pub indices: Vec<u32>,
}

impl Multi {
    /// Create a new multi element
    pub fn new(indices: Vec<u32>) -> Self {
        Self { indices }
    }

    /// Index used for a layer
    pub fn index_for_layer(&self, layer: usize) -> u32 {
        self.indices.get(layer).copied().unwrap_or(0)
    }
}

/// `<m:multiproperties>`
#[derive(Debug, Clone, PartialEq)]
pub struct MultiProperties {
    /// Resource ID
    pub id: ResourceId,
    /// Property group per layer (`pids`)
    pub layers: Vec<ResourceId>,
    /// Blend method between consecutive layers
    pub blend_methods: Vec<BlendMethod>,
    /// Tuples in index order
    pub multis: PropertyGroup<Multi>,
}

impl MultiProperties {
    /// Create a new multi-properties group
    pub fn new(id: ResourceId, layers: Vec<ResourceId>) -> Self {
        Self {
            id,
            layers,
            blend_methods: Vec::new(),
            multis: PropertyGroup::new(),
        }
    }

    /// Blend method applied on top of a layer; layer 0 has none
    pub fn blend_method(&self, layer: usize) -> Option<BlendMethod> {
        if layer == 0 || layer >= self.layers.len() {
            return None;
        }
        Some(
            self.blend_methods
                .get(layer - 1)
                .copied()
                .unwrap_or_default(),
        )
    }
}
