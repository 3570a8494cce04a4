//! Beam Lattice extension types

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::resource::{PropertyId, ResourceId};

/// Cap mode for beam ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeamCapMode {
    /// Sphere cap (rounded ends)
    #[default]
    Sphere,
    /// Hemisphere cap (half sphere at end)
    Hemisphere,
    /// Butt cap (flat ends)
    Butt,
}

impl fmt::Display for BeamCapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeamCapMode::Sphere => write!(f, "sphere"),
            BeamCapMode::Hemisphere => write!(f, "hemisphere"),
            BeamCapMode::Butt => write!(f, "butt"),
        }
    }
}

impl FromStr for BeamCapMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sphere" => Ok(BeamCapMode::Sphere),
            "hemisphere" => Ok(BeamCapMode::Hemisphere),
            "butt" => Ok(BeamCapMode::Butt),
            _ => Err(Error::parse_error_with_context(
                "cap",
                s,
                "one of sphere, hemisphere, butt",
            )),
        }
    }
}

/// Where balls are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BallMode {
    /// No implicit balls
    #[default]
    None,
    /// Balls at every vertex where beams meet
    Mixed,
    /// Balls at every beam vertex
    All,
}

impl fmt::Display for BallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BallMode::None => write!(f, "none"),
            BallMode::Mixed => write!(f, "mixed"),
            BallMode::All => write!(f, "all"),
        }
    }
}

impl FromStr for BallMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(BallMode::None),
            "mixed" => Ok(BallMode::Mixed),
            "all" => Ok(BallMode::All),
            _ => Err(Error::parse_error_with_context(
                "ballmode",
                s,
                "one of none, mixed, all",
            )),
        }
    }
}

/// A single beam between two mesh vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    /// Index of first vertex
    pub v1: u32,
    /// Index of second vertex
    pub v2: u32,
    /// Radius at first vertex, lattice default when unset
    pub r1: Option<f64>,
    /// Radius at second vertex, `r1` when unset
    pub r2: Option<f64>,
    /// Cap mode at first vertex
    pub cap1: Option<BeamCapMode>,
    /// Cap mode at second vertex
    pub cap2: Option<BeamCapMode>,
}

impl Beam {
    /// Create a new beam between two vertices
    pub fn new(v1: u32, v2: u32) -> Self {
        Self {
            v1,
            v2,
            r1: None,
            r2: None,
            cap1: None,
            cap2: None,
        }
    }

    /// Create a new beam with different radii at both ends
    pub fn with_radii(v1: u32, v2: u32, r1: f64, r2: f64) -> Self {
        Self {
            r1: Some(r1),
            r2: Some(r2),
            ..Self::new(v1, v2)
        }
    }
}

/// A sphere centred on a beam vertex
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    /// Vertex index
    pub vindex: u32,
    /// Radius, lattice ball radius when unset
    pub radius: Option<f64>,
}

impl Ball {
    /// Create a new ball at the given vertex index
    pub fn new(vindex: u32) -> Self {
        Self {
            vindex,
            radius: None,
        }
    }
}

/// Named selection of beams and balls
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeamSet {
    /// Name
    pub name: Option<String>,
    /// Identifier
    pub identifier: Option<String>,
    /// Indices into the lattice's beams
    pub beam_refs: Vec<u32>,
    /// Indices into the lattice's balls
    pub ball_refs: Vec<u32>,
}

/// `<b:beamlattice>` attached to a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct BeamLattice {
    /// Default beam radius
    pub radius: f64,
    /// Beams shorter than this may be dropped by consumers
    pub min_length: f64,
    /// Default cap mode
    pub cap_mode: BeamCapMode,
    /// Implicit ball placement
    pub ball_mode: BallMode,
    /// Default ball radius
    pub ball_radius: Option<f64>,
    /// How the lattice is clipped by `clipping_mesh_id` (`none`, `inside`, `outside`)
    pub clipping_mode: Option<String>,
    /// Mesh object clipping the lattice
    pub clipping_mesh_id: Option<ResourceId>,
    /// Mesh object representing the lattice for consumers without lattice support
    pub representation_mesh_id: Option<ResourceId>,
    /// Lattice-wide property group
    pub pid: Option<ResourceId>,
    /// Property within `pid`
    pub pindex: Option<PropertyId>,
    /// Beams
    pub beams: Vec<Beam>,
    /// Balls
    pub balls: Vec<Ball>,
    /// Beam sets
    pub beam_sets: Vec<BeamSet>,
}

impl BeamLattice {
    /// Create an empty lattice
    pub fn new(radius: f64, min_length: f64) -> Self {
        Self {
            radius,
            min_length,
            cap_mode: BeamCapMode::Sphere,
            ball_mode: BallMode::None,
            ball_radius: None,
            clipping_mode: None,
            clipping_mesh_id: None,
            representation_mesh_id: None,
            pid: None,
            pindex: None,
            beams: Vec::new(),
            balls: Vec::new(),
            beam_sets: Vec::new(),
        }
    }

    /// True when the lattice uses the balls addendum
    pub fn uses_balls(&self) -> bool {
        !self.balls.is_empty() || self.ball_mode != BallMode::None
    }
}
