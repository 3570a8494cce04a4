//! Production extension: UUIDs and cross-part references

use std::io::Cursor;

use lib3mf_core::writer::write_model_xml;
use lib3mf_core::{Error, Model, ParserConfig};

use crate::common::{
    MODEL_REL, PRODUCTION_NS, PackageBuilder, TETRAHEDRON, model_xml, read_package, read_xml,
};

const OBJECT_UUID: &str = "3b7b6e1e-2c1d-4e9a-9f6a-0a1b2c3d4e5f";
const BUILD_UUID: &str = "c9d8e7f6-a5b4-4c3d-8e2f-1a0b9c8d7e6f";
const ITEM_UUID: &str = "11223344-5566-4778-8990-aabbccddeeff";
const COMPONENT_UUID: &str = "ffeeddcc-bbaa-4998-8776-655443322110";

fn gear_part() -> String {
    model_xml(
        &[("p", PRODUCTION_NS)],
        &format!(
            r#"<resources>
    <object id="5" type="model" p:UUID="{}">
      {}
    </object>
  </resources>
  <build/>"#,
            OBJECT_UUID, TETRAHEDRON
        ),
    )
}

fn production_root() -> String {
    model_xml(
        &[("p", PRODUCTION_NS)],
        &format!(
            r#"<resources>
    <object id="1" type="model">
      <components>
        <component objectid="5" p:path="/3D/gear.model" p:UUID="{component}"/>
      </components>
    </object>
  </resources>
  <build p:UUID="{build}">
    <item objectid="1" p:UUID="{item}"/>
    <item objectid="5" p:path="/3D/gear.model" transform="1 0 0 0 1 0 0 0 1 40 0 0"/>
  </build>"#,
            component = COMPONENT_UUID,
            build = BUILD_UUID,
            item = ITEM_UUID
        ),
    )
}

fn production_package() -> Vec<u8> {
    PackageBuilder::new(&production_root())
        .part("/3D/gear.model", gear_part())
        .root_relationship("/3D/gear.model", MODEL_REL)
        .build()
}

#[test]
fn test_read_uuids_and_paths() {
    let (model, warnings) = read_package(production_package(), ParserConfig::default());
    let model = model.unwrap();
    assert!(warnings.is_empty());

    assert_eq!(model.build.uuid.as_deref(), Some(BUILD_UUID));
    let items = model.build_items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].uuid.as_deref(), Some(ITEM_UUID));
    assert_eq!(items[1].path.as_deref(), Some("/3D/gear.model"));

    let assembly = model.find_components_object(model.root_part(), 1).unwrap();
    assert_eq!(assembly.components[0].uuid.as_deref(), Some(COMPONENT_UUID));
    assert_eq!(assembly.components[0].path.as_deref(), Some("/3D/gear.model"));

    let gear = model.find_mesh_object("/3D/gear.model", 5).unwrap();
    assert_eq!(gear.info.uuid.as_deref(), Some(OBJECT_UUID));
}

#[test]
fn test_linked_resources() {
    let (model, _) = read_package(production_package(), ParserConfig::default());
    let model = model.unwrap();

    let gear = model.find_package_resource_id("/3D/gear.model", 5).unwrap();
    let assembly = model.find_package_resource_id(model.root_part(), 1).unwrap();
    assert!(model.is_linked(gear));
    assert!(!model.is_linked(assembly));
    assert!(model.find_package_resource_id(model.root_part(), 5).is_none());
}

#[test]
fn test_build_items_in_linked_part_rejected() {
    let linked = gear_part().replace("<build/>", "<build><item objectid=\"5\"/></build>");
    let data = PackageBuilder::new(&production_root())
        .part("/3D/gear.model", linked)
        .root_relationship("/3D/gear.model", MODEL_REL)
        .build();
    let (model, _) = read_package(data, ParserConfig::default());
    assert!(matches!(model, Err(Error::InvalidModel(_))));
}

#[test]
fn test_path_to_missing_part() {
    let data = PackageBuilder::new(&production_root()).build();
    let (model, _) = read_package(data, ParserConfig::default());
    assert!(matches!(model, Err(Error::MissingFile(_))));
}

#[test]
fn test_production_attributes_ignored_without_extension() {
    let xml = model_xml(
        &[("p", PRODUCTION_NS)],
        &format!(
            r#"<resources>
    <object id="1" type="model" p:UUID="{}">
      {}
    </object>
  </resources>
  <build p:UUID="{}"><item objectid="1" p:UUID="{}"/></build>"#,
            OBJECT_UUID, TETRAHEDRON, BUILD_UUID, ITEM_UUID
        ),
    );
    let (model, warnings) = read_xml(&xml, ParserConfig::new());
    let model = model.unwrap();
    assert!(warnings.is_empty());
    assert_eq!(model.build.uuid, None);
    assert_eq!(model.build_items()[0].uuid, None);
    assert_eq!(model.find_mesh_object(model.root_part(), 1).unwrap().info.uuid, None);
}

#[test]
fn test_production_namespace_declared_when_used() {
    let model = Model::from_reader(Cursor::new(production_package())).unwrap();
    let mut xml = Vec::new();
    write_model_xml(&model, &mut xml).unwrap();
    let xml = String::from_utf8(xml).unwrap();

    assert!(xml.contains(&format!("xmlns:p=\"{}\"", PRODUCTION_NS)));
    assert!(xml.contains(&format!("p:UUID=\"{}\"", BUILD_UUID)));
    assert!(xml.contains("p:path=\"/3D/gear.model\""));
}

#[test]
fn test_production_package_survives_rewrite() {
    let model = Model::from_reader(Cursor::new(production_package())).unwrap();
    let bytes = model
        .to_writer(Cursor::new(Vec::new()))
        .unwrap()
        .into_inner();
    let reread = Model::from_reader(Cursor::new(bytes)).unwrap();

    assert_eq!(reread.build_items(), model.build_items());
    assert_eq!(reread.build.uuid, model.build.uuid);
    assert_eq!(
        reread.find_mesh_object("/3D/gear.model", 5).unwrap().info.uuid.as_deref(),
        Some(OBJECT_UUID)
    );
}
