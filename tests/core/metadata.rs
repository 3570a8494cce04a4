//! Model, object and build item metadata

use std::io::Cursor;

use lib3mf_core::{Model, ParserConfig, WarningCode};

use crate::common::{PRODUCTION_NS, PackageBuilder, TETRAHEDRON, model_xml, read_xml};

fn annotated_model() -> String {
    model_xml(
        &[("p", PRODUCTION_NS)],
        &format!(
            r#"<metadata name="Title">Bracket</metadata>
  <metadata name="Designer" preserve="1">R&amp;D</metadata>
  <metadata name="CreationDate" type="xs:date">2024-05-01</metadata>
  <metadata name="Description"></metadata>
  <resources>
    <object id="1" type="model" name="bracket" partnumber="BR-1">
      <metadatagroup>
        <metadata name="Material">PLA</metadata>
      </metadatagroup>
      {}
    </object>
  </resources>
  <build>
    <item objectid="1" partnumber="item-1">
      <metadatagroup>
        <metadata name="Color" preserve="0">grey</metadata>
      </metadatagroup>
    </item>
  </build>"#,
            TETRAHEDRON
        ),
    )
}

#[test]
fn test_model_metadata() {
    let data = PackageBuilder::new(&annotated_model()).build();
    let model = Model::from_reader(Cursor::new(data)).unwrap();

    assert_eq!(model.metadata.len(), 4);
    assert_eq!(model.metadata_value("Title"), Some("Bracket"));
    assert_eq!(model.metadata_value("Designer"), Some("R&D"));
    assert_eq!(model.metadata_value("Description"), Some(""));
    assert_eq!(model.metadata_value("Copyright"), None);

    assert_eq!(model.metadata[1].preserve, Some(true));
    assert_eq!(model.metadata[0].preserve, None);
    assert_eq!(model.metadata[2].metadata_type.as_deref(), Some("xs:date"));
}

#[test]
fn test_object_and_item_metadata() {
    let (model, warnings) = read_xml(&annotated_model(), ParserConfig::default());
    let model = model.unwrap();
    assert!(warnings.is_empty());

    let object = model.find_mesh_object(model.root_part(), 1).unwrap();
    assert_eq!(object.info.name.as_deref(), Some("bracket"));
    assert_eq!(object.info.part_number.as_deref(), Some("BR-1"));
    assert_eq!(object.info.metadata.len(), 1);
    assert_eq!(object.info.metadata[0].value, "PLA");

    let item = &model.build_items()[0];
    assert_eq!(item.part_number.as_deref(), Some("item-1"));
    assert_eq!(item.metadata[0].name, "Color");
    assert_eq!(item.metadata[0].preserve, Some(false));
}

#[test]
fn test_duplicate_metadata_keeps_first() {
    let xml = annotated_model().replace(
        "<metadata name=\"Description\"></metadata>",
        "<metadata name=\"Title\">Other</metadata>",
    );
    let (model, warnings) = read_xml(&xml, ParserConfig::default());
    let model = model.unwrap();
    assert_eq!(model.metadata_value("Title"), Some("Bracket"));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, WarningCode::DuplicateMetadata);
}

#[test]
fn test_metadata_survives_rewrite() {
    let (model, _) = read_xml(&annotated_model(), ParserConfig::default());
    let model = model.unwrap();

    let bytes = model.to_writer(Cursor::new(Vec::new())).unwrap().into_inner();
    let reread = Model::from_reader(Cursor::new(bytes)).unwrap();

    assert_eq!(reread.metadata, model.metadata);
    assert_eq!(reread.build_items()[0].metadata, model.build_items()[0].metadata);
    let object = reread.find_mesh_object(reread.root_part(), 1).unwrap();
    assert_eq!(object.info.metadata[0].name, "Material");
}
