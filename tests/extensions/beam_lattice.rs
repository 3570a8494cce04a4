//! Beam Lattice extension and the balls addendum

use std::io::Cursor;

use lib3mf_core::model::BallMode;
use lib3mf_core::{BeamCapMode, Error, Extension, Model, ParserConfig};

use crate::common::{BALLS_NS, BEAM_NS, PackageBuilder, model_xml, read_package, read_xml};

fn lattice_model() -> String {
    model_xml(
        &[("b", BEAM_NS), ("b2", BALLS_NS)],
        r#"<resources>
    <object id="1" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="10" y="10" z="0"/>
          <vertex x="0" y="10" z="10"/>
        </vertices>
        <triangles/>
        <b:beamlattice radius="1" minlength="0.1" cap="hemisphere" b2:ballmode="all" b2:ballradius="1.5">
          <b:beams>
            <b:beam v1="0" v2="1"/>
            <b:beam v1="1" v2="2" r1="0.8" r2="1.2"/>
            <b:beam v1="2" v2="3" cap1="butt"/>
          </b:beams>
          <b2:balls>
            <b2:ball vindex="1"/>
            <b2:ball vindex="2" r="2"/>
          </b2:balls>
          <b:beamsets>
            <b:beamset name="outer" identifier="set-1">
              <b:ref index="0"/>
              <b:ref index="2"/>
              <b2:ballref index="1"/>
            </b:beamset>
          </b:beamsets>
        </b:beamlattice>
      </mesh>
    </object>
  </resources>
  <build><item objectid="1"/></build>"#,
    )
}

#[test]
fn test_read_lattice_from_package() {
    let data = PackageBuilder::new(&lattice_model()).build();
    let (model, warnings) = read_package(data, ParserConfig::default());
    let model = model.unwrap();
    assert!(warnings.is_empty());

    let mesh = &model.find_mesh_object(model.root_part(), 1).unwrap().mesh;
    assert!(mesh.triangles.is_empty());
    let lattice = mesh.beam_lattice.as_ref().unwrap();
    assert_eq!(lattice.radius, 1.0);
    assert_eq!(lattice.min_length, 0.1);
    assert_eq!(lattice.cap_mode, BeamCapMode::Hemisphere);
    assert_eq!(lattice.beams.len(), 3);
    assert_eq!(lattice.beams[1].r2, Some(1.2));
    assert_eq!(lattice.beams[2].cap1, Some(BeamCapMode::Butt));

    assert_eq!(lattice.ball_mode, BallMode::All);
    assert_eq!(lattice.ball_radius, Some(1.5));
    assert_eq!(lattice.balls.len(), 2);
    assert!(lattice.uses_balls());

    let set = &lattice.beam_sets[0];
    assert_eq!(set.name.as_deref(), Some("outer"));
    assert_eq!(set.identifier.as_deref(), Some("set-1"));
    assert_eq!(set.beam_refs, vec![0, 2]);
    assert_eq!(set.ball_refs, vec![1]);
}

#[test]
fn test_balls_skipped_without_addendum() {
    let config = ParserConfig::new().with_extension(Extension::BeamLattice);
    let (model, warnings) = read_xml(&lattice_model(), config);
    let model = model.unwrap();
    assert!(warnings.is_empty());

    let lattice = model
        .find_mesh_object(model.root_part(), 1)
        .unwrap()
        .mesh
        .beam_lattice
        .clone()
        .unwrap();
    assert_eq!(lattice.beams.len(), 3);
    assert!(lattice.balls.is_empty());
    assert_eq!(lattice.ball_mode, BallMode::None);
    assert!(lattice.beam_sets[0].ball_refs.is_empty());
}

#[test]
fn test_lattice_skipped_without_extension() {
    let (model, _) = read_xml(&lattice_model(), ParserConfig::new());
    let model = model.unwrap();
    assert!(model.find_mesh_object(model.root_part(), 1).unwrap().mesh.beam_lattice.is_none());
}

#[test]
fn test_ball_on_missing_vertex() {
    let xml = lattice_model().replace("<b2:ball vindex=\"1\"/>", "<b2:ball vindex=\"9\"/>");
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::InvalidXml(_))));
}

#[test]
fn test_beam_set_refers_to_missing_beam() {
    let xml = lattice_model().replace("<b:ref index=\"2\"/>", "<b:ref index=\"3\"/>");
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::InvalidXml(_))));
}

#[test]
fn test_non_positive_radius() {
    let xml = lattice_model().replace("r1=\"0.8\"", "r1=\"-0.8\"");
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(model.is_err());
}

#[test]
fn test_lattice_survives_rewrite() {
    let data = PackageBuilder::new(&lattice_model()).build();
    let model = Model::from_reader(Cursor::new(data)).unwrap();
    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let reread = Model::from_reader(Cursor::new(bytes)).unwrap();

    let before = &model.find_mesh_object(model.root_part(), 1).unwrap().mesh.beam_lattice;
    let after = &reread.find_mesh_object(reread.root_part(), 1).unwrap().mesh.beam_lattice;
    assert_eq!(before, after);
}
