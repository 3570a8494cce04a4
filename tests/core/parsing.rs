//! Reading model parts from packages

use std::io::Cursor;

use lib3mf_core::{
    Error, Extension, Model, ParserConfig, Resource, Unit, WarningCode, WarningLevel,
};

use crate::common::{
    MATERIAL_NS, PackageBuilder, TETRAHEDRON, model_xml, read_package, read_xml,
    tetrahedron_model,
};

#[test]
fn test_parse_tetrahedron_package() {
    let data = PackageBuilder::new(&tetrahedron_model()).build();
    let model = Model::from_reader(Cursor::new(data)).unwrap();

    assert_eq!(model.unit, Unit::Millimeter);
    assert_eq!(model.language, "en-US");
    assert_eq!(model.resource_count(), 1);

    let object = model.find_mesh_object(model.root_part(), 1).unwrap();
    assert_eq!(object.mesh.vertices.len(), 4);
    assert_eq!(object.mesh.triangles.len(), 4);
    assert_eq!(object.mesh.vertices[1].x, 10.0);

    assert_eq!(model.build_items().len(), 1);
    assert_eq!(model.build_items()[0].object_id, 1);
}

#[test]
fn test_package_with_renamed_root_part() {
    let data = PackageBuilder::with_root("/models/main.model", &tetrahedron_model()).build();
    let model = Model::from_reader(Cursor::new(data)).unwrap();
    assert_eq!(model.root_part(), "/models/main.model");
    assert!(model.find_mesh_object("/models/main.model", 1).is_ok());
}

#[test]
fn test_default_unit_and_language() {
    let xml = format!(
        r#"<model xmlns="{}"><resources/><build/></model>"#,
        crate::common::CORE_NS
    );
    let (model, warnings) = read_xml(&xml, ParserConfig::default());
    let model = model.unwrap();
    assert_eq!(model.unit, Unit::Millimeter);
    assert_eq!(model.language, "und");
    assert!(warnings.is_empty());
}

#[test]
fn test_every_unit_is_accepted() {
    for (name, unit) in [
        ("micron", Unit::Micron),
        ("millimeter", Unit::Millimeter),
        ("centimeter", Unit::Centimeter),
        ("inch", Unit::Inch),
        ("foot", Unit::Foot),
        ("meter", Unit::Meter),
    ] {
        let xml = tetrahedron_model().replace("millimeter", name);
        let (model, warnings) = read_xml(&xml, ParserConfig::default());
        assert_eq!(model.unwrap().unit, unit);
        assert!(warnings.is_empty(), "unit {}", name);
    }
}

#[test]
fn test_invalid_unit_warns_then_fails_in_strict_mode() {
    let xml = tetrahedron_model().replace("millimeter", "furlong");

    let (model, warnings) = read_xml(&xml, ParserConfig::default());
    assert_eq!(model.unwrap().unit, Unit::Millimeter);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, WarningCode::InvalidUnit);

    let (model, warnings) = read_xml(&xml, ParserConfig::default().with_strict_mode(true));
    assert!(matches!(
        model,
        Err(Error::StrictModeWarning {
            code: WarningCode::InvalidUnit,
            ..
        })
    ));
    assert_eq!(warnings.len(), 1);
}

#[test]
fn test_foreign_namespace_content_is_skipped() {
    let xml = model_xml(
        &[("v", "http://vendor.example/2024/extras")],
        &format!(
            r#"<resources>
    <v:annotation v:color="red"><v:note>ignored</v:note></v:annotation>
    <object id="1" v:tag="x">
      {}
    </object>
  </resources>
  <build><item objectid="1"/></build>"#,
            TETRAHEDRON
        ),
    );
    let (model, warnings) = read_xml(&xml, ParserConfig::default());
    assert_eq!(model.unwrap().resource_count(), 1);
    assert!(warnings.is_empty());
}

#[test]
fn test_unknown_core_attribute_is_informational() {
    let xml = tetrahedron_model().replace("type=\"model\"", "type=\"model\" colour=\"red\"");
    let (model, warnings) = read_xml(&xml, ParserConfig::default());
    assert!(model.is_ok());
    assert_eq!(warnings[0].code, WarningCode::NamespaceInvalidAttribute);
    assert_eq!(warnings[0].level, WarningLevel::Info);
}

#[test]
fn test_undeclared_prefix_is_fatal() {
    let xml = tetrahedron_model().replace("<object id=\"1\"", "<object q:flag=\"1\" id=\"1\"");
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(model.is_err());
}

#[test]
fn test_not_a_model_document() {
    let (model, _) = read_xml("<html><body/></html>", ParserConfig::default());
    assert!(matches!(model, Err(Error::InvalidXml(_))));
}

const COLORED: &str = r##"<resources>
    <m:colorgroup id="1">
      <m:color color="#FF0000"/>
      <m:color color="#00FF00"/>
      <m:color color="#0000FF"/>
    </m:colorgroup>
    <object id="2" type="model" pid="1" pindex="2">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
          <vertex x="0" y="0" z="10"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="2" v3="1" pid="1" p1="0"/>
          <triangle v1="0" v2="1" v3="3" pid="1" p1="0" p2="1" p3="2"/>
          <triangle v1="1" v2="2" v3="3"/>
          <triangle v1="2" v2="0" v3="3" p1="1"/>
        </triangles>
      </mesh>
    </object>
  </resources>
  <build><item objectid="2"/></build>"##;

#[test]
fn test_triangle_properties_overlay() {
    let xml = model_xml(&[("m", MATERIAL_NS)], COLORED);
    let (model, warnings) = read_xml(&xml, ParserConfig::default());
    let model = model.unwrap();
    assert!(warnings.is_empty());

    let group = model.find_package_resource_id(model.root_part(), 1).unwrap();
    let Some(Resource::Colors(colors)) = model.resource(group) else {
        panic!("expected a color group");
    };
    let id_at = |index: usize| colors.colors.property_id_at(index).unwrap();

    let mesh = &model.find_mesh_object(model.root_part(), 2).unwrap().mesh;

    let flat = mesh.triangle_properties(0).unwrap();
    assert!(flat.is_flat());
    assert_eq!(flat.resource(), Some(group));
    assert_eq!(flat.property_ids[0], id_at(0));

    let gradient = mesh.triangle_properties(1).unwrap();
    assert!(!gradient.is_flat());
    assert_eq!(gradient.property_ids, [id_at(0), id_at(1), id_at(2)]);

    let fallback = mesh.triangle_properties(2).unwrap();
    assert_eq!(fallback.property_ids, [id_at(2); 3]);
    assert!(!mesh.information.properties().unwrap().has_face_data(2));

    let inherited_group = mesh.triangle_properties(3).unwrap();
    assert_eq!(inherited_group.resource(), Some(group));
    assert_eq!(inherited_group.property_ids[0], id_at(1));
}

#[test]
fn test_property_index_out_of_range() {
    let xml = model_xml(&[("m", MATERIAL_NS)], &COLORED.replace("p1=\"1\"/>", "p1=\"3\"/>"));
    let (model, _) = read_xml(&xml, ParserConfig::default());
    assert!(matches!(
        model,
        Err(Error::PropertyIndexOutOfRange {
            group: 1,
            index: 3,
            count: 3
        })
    ));
}

#[test]
fn test_triangle_properties_without_default_pid() {
    let xml = model_xml(
        &[("m", MATERIAL_NS)],
        &COLORED
            .replace(" pid=\"1\" pindex=\"2\"", "")
            .replace(" p1=\"1\"/>", "/>"),
    );
    let (model, warnings) = read_xml(&xml, ParserConfig::default());
    let model = model.unwrap();
    assert_eq!(warnings[0].code, WarningCode::MissingDefaultProperty);
    assert_eq!(warnings[0].level, WarningLevel::Severe);

    let mesh = &model.find_mesh_object(model.root_part(), 2).unwrap().mesh;
    assert!(mesh.default_properties().is_none());
    assert!(mesh.triangle_properties(0).is_some());
    assert_eq!(mesh.triangle_properties(2), None);
    assert_eq!(mesh.triangle_properties(3), None);
}

#[test]
fn test_p1_without_any_pid_borrows_first_triangle_pid() {
    let xml = model_xml(
        &[("m", MATERIAL_NS)],
        &COLORED.replace(" pid=\"1\" pindex=\"2\"", ""),
    );
    let (model, warnings) = read_xml(&xml, ParserConfig::default());
    let model = model.unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, WarningCode::MissingDefaultProperty);

    let group = model.find_package_resource_id(model.root_part(), 1).unwrap();
    let mesh = &model.find_mesh_object(model.root_part(), 2).unwrap().mesh;
    assert_eq!(mesh.triangle_properties(3).unwrap().resource(), Some(group));
    assert_eq!(mesh.triangle_properties(2), None);
}

#[test]
fn test_disabled_extension_is_skipped_silently() {
    let xml = model_xml(
        &[("m", MATERIAL_NS)],
        &format!(
            r##"<resources>
    <m:colorgroup id="1"><m:color color="#FF0000"/></m:colorgroup>
    <object id="2">
      {}
    </object>
  </resources>
  <build><item objectid="2"/></build>"##,
            TETRAHEDRON
        ),
    );
    let data = PackageBuilder::new(&xml).build();

    let (model, warnings) = read_package(data.clone(), ParserConfig::new());
    let model = model.unwrap();
    assert!(warnings.is_empty());
    assert_eq!(model.resource_count(), 1);

    let (model, _) = read_package(data, ParserConfig::default());
    assert_eq!(model.unwrap().resource_count(), 2);
}

#[test]
fn test_reference_into_disabled_extension_fails() {
    let xml = model_xml(&[("m", MATERIAL_NS)], COLORED);
    let (model, _) = read_xml(&xml, ParserConfig::new());
    assert!(matches!(model, Err(Error::ResourceNotFound { id: 1, .. })));
}

#[test]
fn test_required_extension_not_enabled() {
    let xml = tetrahedron_model().replace(
        "<model ",
        &format!("<model requiredextensions=\"m\" xmlns:m=\"{}\" ", MATERIAL_NS),
    );
    let (model, warnings) = read_xml(&xml, ParserConfig::new());
    assert!(model.is_ok());
    assert_eq!(warnings[0].code, WarningCode::UnsupportedRequiredExtension);
    assert_eq!(warnings[0].level, WarningLevel::Severe);

    let (model, warnings) = read_xml(&xml, ParserConfig::default());
    assert_eq!(model.unwrap().required_extensions, vec![Extension::Material]);
    assert!(warnings.is_empty());
}

#[test]
fn test_warning_cap_keeps_reading() {
    let triangles: String = (0..20)
        .map(|_| "<triangle v1=\"1\" v2=\"1\" v3=\"2\"/>")
        .collect();
    let xml = tetrahedron_model().replace("</triangles>", &format!("{}</triangles>", triangles));
    let (model, warnings) = read_xml(&xml, ParserConfig::default().with_max_warnings(5));
    assert_eq!(
        model
            .unwrap()
            .find_mesh_object("/3D/3dmodel.model", 1)
            .unwrap()
            .mesh
            .triangles
            .len(),
        4
    );
    assert_eq!(warnings.len(), 5);
    assert!(warnings.iter().all(|w| w.code == WarningCode::DegenerateTriangle));
}
