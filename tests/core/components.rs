//! Assemblies, cross-part references and the component graph

use std::io::Cursor;

use lib3mf_core::validator::{
    MAX_COMPONENT_DEPTH, calculate_component_depth_level, is_valid_for_slices, is_valid_object,
};
use lib3mf_core::{Error, Model, ParserConfig, Transform};

use crate::common::{
    MODEL_REL, PRODUCTION_NS, PackageBuilder, TETRAHEDRON, model_xml, read_package, read_xml,
};

fn assembly_model() -> String {
    model_xml(
        &[],
        &format!(
            r#"<resources>
    <object id="1" type="model">
      {}
    </object>
    <object id="2" type="model">
      <components>
        <component objectid="1"/>
        <component objectid="1" transform="1 0 0 0 1 0 0 0 1 20 0 0"/>
        <component objectid="1" transform="1 0 0 0 1 0 0 0 1 0 20 0"/>
      </components>
    </object>
    <object id="3" type="model">
      <components>
        <component objectid="2" transform="2 0 0 0 2 0 0 0 2 0 0 0"/>
      </components>
    </object>
  </resources>
  <build>
    <item objectid="3"/>
  </build>"#,
            TETRAHEDRON
        ),
    )
}

#[test]
fn test_parse_assembly_from_package() {
    let data = PackageBuilder::new(&assembly_model()).build();
    let model = Model::from_reader(Cursor::new(data)).unwrap();

    let assembly = model.find_components_object(model.root_part(), 2).unwrap();
    assert_eq!(assembly.components.len(), 3);
    assert!(assembly.components[0].transform.is_identity());
    assert_eq!(assembly.components[1].transform, Transform::translation(20.0, 0.0, 0.0));
    assert_eq!(assembly.components[2].transform, Transform::translation(0.0, 20.0, 0.0));
    assert_eq!(model.build_items()[0].object_id, 3);
}

#[test]
fn test_depth_and_validity_after_reading() {
    let (model, _) = read_xml(&assembly_model(), ParserConfig::default());
    let model = model.unwrap();
    let handle = |id| model.find_package_resource_id(model.root_part(), id).unwrap();

    assert_eq!(calculate_component_depth_level(&model, handle(1)).unwrap(), 0);
    assert_eq!(calculate_component_depth_level(&model, handle(2)).unwrap(), 1);
    assert_eq!(calculate_component_depth_level(&model, handle(3)).unwrap(), 2);
    assert!(is_valid_object(&model, handle(3)).unwrap());
}

#[test]
fn test_circular_components_rejected() {
    let xml = model_xml(
        &[],
        r#"<resources>
    <object id="1"><components><component objectid="2"/></components></object>
    <object id="2"><components><component objectid="3"/></components></object>
    <object id="3"><components><component objectid="1"/></components></object>
  </resources>
  <build><item objectid="1"/></build>"#,
    );
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::CircularReference(_))));
}

#[test]
fn test_deep_nesting_rejected() {
    let mut resources = format!(r#"<object id="1">{}</object>"#, TETRAHEDRON);
    for id in 2..=(MAX_COMPONENT_DEPTH + 2) {
        resources.push_str(&format!(
            r#"<object id="{}"><components><component objectid="{}"/></components></object>"#,
            id,
            id - 1
        ));
    }
    let xml = model_xml(&[], &format!("<resources>{}</resources><build/>", resources));
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::ExcessiveNestingDepth { .. })));
}

#[test]
fn test_validity_of_reused_sub_assemblies() {
    // Every level places the level below twice, so the tree has 2^39 leaves
    let levels = 39;
    let mut resources = format!(r#"<object id="1">{}</object>"#, TETRAHEDRON);
    for id in 2..=levels + 1 {
        resources.push_str(&format!(
            r#"<object id="{id}"><components><component objectid="{child}"/><component objectid="{child}" transform="1 0 0 0 1 0 0 0 1 10 0 0"/></components></object>"#,
            id = id,
            child = id - 1
        ));
    }
    let xml = model_xml(
        &[],
        &format!(
            r#"<resources>{}</resources><build><item objectid="{}"/></build>"#,
            resources,
            levels + 1
        ),
    );
    let (model, _) = read_xml(&xml, ParserConfig::default());
    let model = model.unwrap();
    let top = model.find_package_resource_id(model.root_part(), levels + 1).unwrap();

    assert_eq!(calculate_component_depth_level(&model, top).unwrap(), levels);
    assert!(is_valid_object(&model, top).unwrap());
    assert!(is_valid_for_slices(&model, top).unwrap());
}

#[test]
fn test_build_item_for_missing_object() {
    let xml = model_xml(&[], "<resources/><build><item objectid=\"4\"/></build>");
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::ResourceNotFound { id: 4, .. })));
}

#[test]
fn test_build_item_for_object_of_type_other() {
    let xml = model_xml(
        &[],
        &format!(
            r#"<resources><object id="1" type="other">{}</object></resources>
  <build><item objectid="1"/></build>"#,
            TETRAHEDRON
        ),
    );
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::InvalidModel(_))));
}

const LINKED_PART: &str = "/3D/parts/wheel.model";

fn linked_root() -> String {
    model_xml(
        &[("p", PRODUCTION_NS)],
        r#"<resources>
    <object id="1" type="model">
      <components>
        <component objectid="7" p:path="/3D/parts/wheel.model"/>
        <component objectid="7" p:path="/3D/parts/wheel.model" transform="1 0 0 0 1 0 0 0 1 30 0 0"/>
      </components>
    </object>
  </resources>
  <build>
    <item objectid="1"/>
    <item objectid="7" p:path="/3D/parts/wheel.model"/>
  </build>"#,
    )
}

fn linked_part() -> String {
    model_xml(
        &[],
        &format!(
            r#"<resources><object id="7" type="model">{}</object></resources><build/>"#,
            TETRAHEDRON
        ),
    )
}

#[test]
fn test_components_in_linked_part() {
    let data = PackageBuilder::new(&linked_root())
        .part(LINKED_PART, linked_part())
        .root_relationship(LINKED_PART, MODEL_REL)
        .build();
    let (model, warnings) = read_package(data, ParserConfig::default());
    let model = model.unwrap();
    assert!(warnings.is_empty());

    assert!(model.parts().iter().any(|p| p == LINKED_PART));
    let wheel = model.find_package_resource_id(LINKED_PART, 7).unwrap();
    assert!(model.is_linked(wheel));
    assert!(model.find_mesh_object(LINKED_PART, 7).is_ok());
    assert!(model.find_resource(model.root_part(), 7).is_none());

    let top = model.find_package_resource_id(model.root_part(), 1).unwrap();
    assert_eq!(calculate_component_depth_level(&model, top).unwrap(), 1);
    assert!(is_valid_object(&model, top).unwrap());
}

#[test]
fn test_linked_part_missing_from_package() {
    let data = PackageBuilder::new(&linked_root()).build();
    let (model, _) = read_package(data, ParserConfig::default());
    assert!(matches!(model, Err(Error::MissingFile(_))));
}

#[test]
fn test_linked_parts_disabled_leaves_references_open() {
    let data = PackageBuilder::new(&linked_root()).build();
    let (model, _) = read_package(data, ParserConfig::default().with_linked_parts(false));
    let model = model.unwrap();
    assert!(model.parts().iter().all(|p| p != LINKED_PART));

    let top = model.find_package_resource_id(model.root_part(), 1).unwrap();
    assert!(!is_valid_object(&model, top).unwrap());
}

#[test]
fn test_linked_part_with_build_items() {
    let part = linked_part().replace("<build/>", "<build><item objectid=\"7\"/></build>");
    let data = PackageBuilder::new(&linked_root())
        .part(LINKED_PART, part)
        .build();
    let (model, _) = read_package(data, ParserConfig::default());
    assert!(matches!(model, Err(Error::InvalidModel(_))));
}

#[test]
fn test_same_id_in_two_parts() {
    let part = linked_part().replace("id=\"7\"", "id=\"1\"");
    let root = linked_root().replace("objectid=\"7\"", "objectid=\"1\"");
    let data = PackageBuilder::new(&root).part(LINKED_PART, part).build();
    let (model, _) = read_package(data, ParserConfig::default());
    let model = model.unwrap();

    let local = model.find_package_resource_id(model.root_part(), 1).unwrap();
    let linked = model.find_package_resource_id(LINKED_PART, 1).unwrap();
    assert_ne!(local, linked);
    assert!(model.find_components_object(model.root_part(), 1).is_ok());
    assert!(model.find_mesh_object(LINKED_PART, 1).is_ok());
}
