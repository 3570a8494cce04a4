//! Beam lattices and the balls addendum

use std::io::Write as IoWrite;

use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use crate::error::Result;
use crate::model::{BallMode, BeamCapMode, BeamLattice, BeamSet};

use super::{close, emit};

/// Write a `<b:beamlattice>` inside its mesh
pub(super) fn write_beam_lattice<W: IoWrite>(
    writer: &mut Writer<W>,
    lattice: &BeamLattice,
) -> Result<()> {
    let mut elem = BytesStart::new("b:beamlattice");
    elem.push_attribute(("radius", lattice.radius.to_string().as_str()));
    elem.push_attribute(("minlength", lattice.min_length.to_string().as_str()));
    if lattice.cap_mode != BeamCapMode::Sphere {
        elem.push_attribute(("cap", lattice.cap_mode.to_string().as_str()));
    }
    if let Some(mode) = &lattice.clipping_mode {
        elem.push_attribute(("clippingmode", mode.as_str()));
    }
    if let Some(id) = lattice.clipping_mesh_id {
        elem.push_attribute(("clippingmesh", id.to_string().as_str()));
    }
    if let Some(id) = lattice.representation_mesh_id {
        elem.push_attribute(("representationmesh", id.to_string().as_str()));
    }
    if let Some(pid) = lattice.pid {
        elem.push_attribute(("pid", pid.to_string().as_str()));
    }
    if let Some(pindex) = lattice.pindex {
        elem.push_attribute(("pindex", pindex.to_string().as_str()));
    }
    if lattice.ball_mode != BallMode::None {
        elem.push_attribute(("b2:ballmode", lattice.ball_mode.to_string().as_str()));
    }
    if let Some(radius) = lattice.ball_radius {
        elem.push_attribute(("b2:ballradius", radius.to_string().as_str()));
    }
    emit(writer, Event::Start(elem), "beamlattice")?;

    emit(writer, Event::Start(BytesStart::new("b:beams")), "beams")?;
    for beam in &lattice.beams {
        let mut elem = BytesStart::new("b:beam");
        elem.push_attribute(("v1", beam.v1.to_string().as_str()));
        elem.push_attribute(("v2", beam.v2.to_string().as_str()));
        if let Some(r1) = beam.r1 {
            elem.push_attribute(("r1", r1.to_string().as_str()));
        }
        if let Some(r2) = beam.r2 {
            elem.push_attribute(("r2", r2.to_string().as_str()));
        }
        if let Some(cap) = beam.cap1 {
            elem.push_attribute(("cap1", cap.to_string().as_str()));
        }
        if let Some(cap) = beam.cap2 {
            elem.push_attribute(("cap2", cap.to_string().as_str()));
        }
        emit(writer, Event::Empty(elem), "beam")?;
    }
    close(writer, "b:beams")?;

    if !lattice.balls.is_empty() {
        emit(writer, Event::Start(BytesStart::new("b2:balls")), "balls")?;
        for ball in &lattice.balls {
            let mut elem = BytesStart::new("b2:ball");
            elem.push_attribute(("vindex", ball.vindex.to_string().as_str()));
            if let Some(radius) = ball.radius {
                elem.push_attribute(("r", radius.to_string().as_str()));
            }
            emit(writer, Event::Empty(elem), "ball")?;
        }
        close(writer, "b2:balls")?;
    }

    if !lattice.beam_sets.is_empty() {
        emit(writer, Event::Start(BytesStart::new("b:beamsets")), "beamsets")?;
        for set in &lattice.beam_sets {
            write_beam_set(writer, set)?;
        }
        close(writer, "b:beamsets")?;
    }

    close(writer, "b:beamlattice")
}

fn write_beam_set<W: IoWrite>(writer: &mut Writer<W>, set: &BeamSet) -> Result<()> {
    let mut elem = BytesStart::new("b:beamset");
    if let Some(name) = &set.name {
        elem.push_attribute(("name", name.as_str()));
    }
    if let Some(identifier) = &set.identifier {
        elem.push_attribute(("identifier", identifier.as_str()));
    }
    if set.beam_refs.is_empty() && set.ball_refs.is_empty() {
        return emit(writer, Event::Empty(elem), "beamset");
    }
    emit(writer, Event::Start(elem), "beamset")?;

    for index in &set.beam_refs {
        let mut elem = BytesStart::new("b:ref");
        elem.push_attribute(("index", index.to_string().as_str()));
        emit(writer, Event::Empty(elem), "ref")?;
    }
    for index in &set.ball_refs {
        let mut elem = BytesStart::new("b2:ballref");
        elem.push_attribute(("index", index.to_string().as_str()));
        emit(writer, Event::Empty(elem), "ballref")?;
    }
    close(writer, "b:beamset")
}
