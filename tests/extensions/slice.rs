//! Slice extension

use std::io::Cursor;

use lib3mf_core::model::MeshResolution;
use lib3mf_core::validator::{is_valid_for_slices, validate_slice_stack};
use lib3mf_core::{Error, Model, ParserConfig, Resource, SliceStack};

use crate::common::{
    MODEL_REL, PRODUCTION_NS, PackageBuilder, SLICE_NS, TETRAHEDRON, model_xml, read_package,
    read_xml,
};

const TRIANGLE: &str = r#"<s:vertices>
          <s:vertex x="0" y="0"/>
          <s:vertex x="10" y="0"/>
          <s:vertex x="0" y="10"/>
        </s:vertices>
        <s:polygon startv="0">
          <s:segment v2="1"/>
          <s:segment v2="2"/>
          <s:segment v2="0"/>
        </s:polygon>"#;

fn sliced_model(item_transform: &str) -> String {
    model_xml(
        &[("s", SLICE_NS)],
        &format!(
            r#"<resources>
    <s:slicestack id="1" zbottom="0">
      <s:slice ztop="0.1">{triangle}</s:slice>
      <s:slice ztop="0.2">{triangle}</s:slice>
    </s:slicestack>
    <object id="2" type="model" s:slicestackid="1" s:meshresolution="lowres">
      {mesh}
    </object>
  </resources>
  <build><item objectid="2"{item_transform}/></build>"#,
            triangle = TRIANGLE,
            mesh = TETRAHEDRON,
            item_transform = item_transform
        ),
    )
}

fn stack<'a>(model: &'a Model, part: &str, id: u32) -> &'a SliceStack {
    match model.find_resource(part, id) {
        Some(Resource::SliceStack(stack)) => stack,
        other => panic!("expected a slice stack, found {:?}", other),
    }
}

#[test]
fn test_read_slice_stack() {
    let (model, warnings) = read_xml(&sliced_model(""), ParserConfig::default());
    let model = model.unwrap();
    assert!(warnings.is_empty());

    let stack = stack(&model, model.root_part(), 1);
    let slices = stack.owned_slices().unwrap();
    assert_eq!(slices.len(), 2);
    assert_eq!(slices[1].ztop, 0.2);
    assert_eq!(slices[0].polygons[0].segments.len(), 3);
    assert!(stack.all_polygons_closed());
    assert!(validate_slice_stack(stack).is_ok());

    let object = model.find_mesh_object(model.root_part(), 2).unwrap();
    assert_eq!(object.info.slice_stack_id, Some(1));
    assert_eq!(object.info.mesh_resolution, MeshResolution::LowRes);
}

#[test]
fn test_slices_must_rise() {
    let xml = sliced_model("").replace("ztop=\"0.2\"", "ztop=\"0.05\"");
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::InvalidModel(_))));
}

#[test]
fn test_polygon_index_out_of_range() {
    let xml = sliced_model("").replacen("<s:segment v2=\"2\"/>", "<s:segment v2=\"7\"/>", 1);
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::InvalidXml(_))));
}

#[test]
fn test_open_polygon_fails_validation() {
    let xml = sliced_model("").replace("<s:segment v2=\"0\"/>", "");
    let (model, _) = read_xml(&xml, ParserConfig::default());
    let model = model.unwrap();
    let stack = stack(&model, model.root_part(), 1);
    assert!(!stack.all_polygons_closed());
    assert!(validate_slice_stack(stack).is_err());
}

#[test]
fn test_slices_and_sliceref_cannot_mix() {
    let xml = sliced_model("").replace(
        "</s:slicestack>",
        "<s:sliceref slicestackid=\"5\" slicepath=\"/2D/other.model\"/></s:slicestack>",
    );
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(model.is_err());
}

#[test]
fn test_sliced_object_needs_planar_placement() {
    let (model, _) = read_xml(
        &sliced_model(" transform=\"1 0 0 0 1 0 0 0 1 5 5 0\""),
        ParserConfig::default(),
    );
    assert!(model.is_ok());

    let (model, _) = read_xml(
        &sliced_model(" transform=\"1 0 0 0 0 1 0 1 0 0 0 0\""),
        ParserConfig::default(),
    );
    assert!(matches!(model, Err(Error::InvalidModel(_))));
}

#[test]
fn test_sliced_assembly_with_tilted_component() {
    let xml = sliced_model("")
        .replace(
            "<build><item objectid=\"2\"/></build>",
            "<build><item objectid=\"3\"/></build>",
        )
        .replace(
            "</resources>",
            r#"<object id="3" type="model" s:slicestackid="1">
      <components><component objectid="2" transform="1 0 0 0 0.7 0.7 0 -0.7 0.7 0 0 0"/></components>
    </object>
  </resources>"#,
        );
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(model, Err(Error::InvalidModel(_))));

    let flat = xml.replace("1 0 0 0 0.7 0.7 0 -0.7 0.7 0 0 0", "2 0 0 0 2 0 0 0 1 0 0 0");
    let (model, _) = read_xml(&flat, ParserConfig::default());
    let model = model.unwrap();
    let assembly = model.find_package_resource_id(model.root_part(), 3).unwrap();
    assert!(is_valid_for_slices(&model, assembly).unwrap());
}

#[test]
fn test_slice_stack_referenced_from_another_part() {
    let root = model_xml(
        &[("s", SLICE_NS), ("p", PRODUCTION_NS)],
        &format!(
            r#"<resources>
    <s:slicestack id="1" zbottom="0">
      <s:sliceref slicestackid="4" slicepath="/2D/layers.model"/>
    </s:slicestack>
    <object id="2" type="model" s:slicestackid="1">
      {}
    </object>
  </resources>
  <build><item objectid="2"/></build>"#,
            TETRAHEDRON
        ),
    );
    let layers = model_xml(
        &[("s", SLICE_NS)],
        &format!(
            r#"<resources>
    <s:slicestack id="4" zbottom="0">
      <s:slice ztop="0.1">{}</s:slice>
    </s:slicestack>
  </resources>"#,
            TRIANGLE
        ),
    );
    let data = PackageBuilder::new(&root)
        .part("/2D/layers.model", layers)
        .root_relationship("/2D/layers.model", MODEL_REL)
        .build();
    let (model, _) = read_package(data, ParserConfig::default());
    let model = model.unwrap();

    let handle = model.find_package_resource_id(model.root_part(), 1).unwrap();
    assert_eq!(model.slices(handle).unwrap().len(), 1);
    assert!(stack(&model, model.root_part(), 1).owned_slices().is_none());
}

#[test]
fn test_sliceref_to_missing_part() {
    let xml = model_xml(
        &[("s", SLICE_NS)],
        r#"<resources>
    <s:slicestack id="1" zbottom="0">
      <s:sliceref slicestackid="4" slicepath="/2D/missing.model"/>
    </s:slicestack>
  </resources>
  <build/>"#,
    );
    let (model, _) = read_package(PackageBuilder::new(&xml).build(), ParserConfig::default());
    assert!(matches!(model, Err(Error::MissingFile(_))));
}

#[test]
fn test_uses_slice_ref_writes_separate_part() {
    let (model, _) = read_xml(&sliced_model(""), ParserConfig::default());
    let mut model = model.unwrap();
    let root = model.root_part().to_string();
    if let Some(Resource::SliceStack(stack)) = model.find_resource_mut(&root, 1) {
        stack.uses_slice_ref = true;
    }

    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let reread = Model::from_reader(Cursor::new(bytes)).unwrap();

    assert!(reread.parts().iter().any(|p| p == "/2D/2dmodel_1.model"));
    let handle = reread.find_package_resource_id(reread.root_part(), 1).unwrap();
    let slices = reread.slices(handle).unwrap();
    assert_eq!(slices.len(), 2);
    assert_eq!(slices[0].vertices.len(), 3);
}

#[test]
fn test_slice_elements_skipped_without_extension() {
    let xml = sliced_model("");
    let (model, warnings) = read_xml(&xml, ParserConfig::new());
    let model = model.unwrap();
    assert_eq!(model.resource_count(), 1);
    assert!(warnings.is_empty());
    let object = model.find_mesh_object(model.root_part(), 2).unwrap();
    assert_eq!(object.info.slice_stack_id, None);
}
