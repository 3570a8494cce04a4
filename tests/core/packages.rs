//! OPC package structure, relationships and attachments

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use lib3mf_core::opc::RelationshipFilter;
use lib3mf_core::{
    Error, Model, ParserConfig, ProgressControl, ProgressStage, WarningCode,
};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::common::{
    MATERIAL_NS, PackageBuilder, TETRAHEDRON, TEXTURE_REL, THUMBNAIL_REL, model_xml, read_package,
    tetrahedron_model,
};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn textured_model() -> String {
    model_xml(
        &[("m", MATERIAL_NS)],
        &format!(
            r#"<resources>
    <m:texture2d id="1" path="/3D/Textures/wood.png" contenttype="image/png"/>
    <object id="2" type="model">
      {}
    </object>
  </resources>
  <build><item objectid="2"/></build>"#,
            TETRAHEDRON
        ),
    )
}

#[test]
fn test_missing_content_types() {
    let mut buffer = Vec::new();
    let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
    zip.start_file("3D/3dmodel.model", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(tetrahedron_model().as_bytes()).unwrap();
    zip.finish().unwrap();

    let result = Model::from_reader(Cursor::new(buffer));
    assert!(matches!(result, Err(Error::InvalidFormat(_))));
}

#[test]
fn test_not_a_zip_archive() {
    let result = Model::from_reader(Cursor::new(b"solid cube\nendsolid cube\n".to_vec()));
    assert!(matches!(result, Err(Error::Zip(_))));
}

#[test]
fn test_package_relationship_to_missing_part() {
    let data = PackageBuilder::new(&tetrahedron_model())
        .package_relationship("/Metadata/thumbnail.png", THUMBNAIL_REL)
        .build();
    let result = Model::from_reader(Cursor::new(data));
    assert!(matches!(result, Err(Error::InvalidFormat(_))));
}

#[test]
fn test_read_thumbnail() {
    let data = PackageBuilder::new(&tetrahedron_model())
        .part("/Metadata/thumbnail.png", PNG)
        .package_relationship("/Metadata/thumbnail.png", THUMBNAIL_REL)
        .build();

    let thumbnail = Model::read_thumbnail(Cursor::new(data.clone())).unwrap();
    assert_eq!(thumbnail.as_deref(), Some(PNG));

    let model = Model::from_reader(Cursor::new(data)).unwrap();
    let attachment = model.find_attachment("/Metadata/thumbnail.png").unwrap();
    assert_eq!(attachment.relationship_type, THUMBNAIL_REL);
    assert_eq!(attachment.data(), Some(PNG));
}

#[test]
fn test_no_thumbnail() {
    let data = PackageBuilder::new(&tetrahedron_model()).build();
    assert_eq!(Model::read_thumbnail(Cursor::new(data)).unwrap(), None);
}

#[test]
fn test_texture_attachment_loaded_from_relationship() {
    let data = PackageBuilder::new(&textured_model())
        .part("/3D/Textures/wood.png", PNG)
        .root_relationship("/3D/Textures/wood.png", TEXTURE_REL)
        .build();
    let (model, warnings) = read_package(data, ParserConfig::default());
    let model = model.unwrap();
    assert!(warnings.is_empty());

    let attachment = model.find_attachment("/3D/Textures/wood.png").unwrap();
    assert_eq!(attachment.relationship_type, TEXTURE_REL);
    assert_eq!(attachment.data(), Some(PNG));
}

#[test]
fn test_texture_without_relationship_is_still_loaded() {
    let data = PackageBuilder::new(&textured_model())
        .part("/3D/Textures/wood.png", PNG)
        .build();
    let (model, warnings) = read_package(data, ParserConfig::default());
    assert!(warnings.is_empty());
    assert!(model.unwrap().find_attachment("/3D/Textures/wood.png").is_some());
}

#[test]
fn test_missing_texture_part_warns() {
    let data = PackageBuilder::new(&textured_model()).build();
    let (model, warnings) = read_package(data.clone(), ParserConfig::default());
    assert!(model.unwrap().attachments().is_empty());
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, WarningCode::MissingAttachment);

    let (model, _) = read_package(data, ParserConfig::default().with_strict_mode(true));
    assert!(matches!(model, Err(Error::StrictModeWarning { .. })));
}

#[test]
fn test_lazy_attachments() {
    let data = PackageBuilder::new(&tetrahedron_model())
        .part("/Metadata/thumbnail.png", PNG)
        .package_relationship("/Metadata/thumbnail.png", THUMBNAIL_REL)
        .build();
    let (model, _) = read_package(data, ParserConfig::default().with_lazy_attachments(true));
    let model = model.unwrap();

    let attachment = model.find_attachment("/Metadata/thumbnail.png").unwrap();
    assert!(!attachment.is_loaded());
    assert_eq!(attachment.data(), None);
}

#[test]
fn test_relationship_filter_drops_attachments() {
    let data = PackageBuilder::new(&tetrahedron_model())
        .part("/Metadata/thumbnail.png", PNG)
        .part("/Metadata/notes.txt", b"hello")
        .package_relationship("/Metadata/thumbnail.png", THUMBNAIL_REL)
        .root_relationship("/Metadata/notes.txt", "http://vendor.example/notes")
        .build();

    let (model, _) = read_package(data.clone(), ParserConfig::default());
    assert_eq!(model.unwrap().attachments().len(), 2);

    let filter = RelationshipFilter::new().exclude(THUMBNAIL_REL);
    let (model, _) = read_package(data.clone(), ParserConfig::default().with_relationship_filter(filter));
    let model = model.unwrap();
    assert_eq!(model.attachments().len(), 1);
    assert!(model.find_attachment("/Metadata/notes.txt").is_some());

    let filter = RelationshipFilter::new().include(THUMBNAIL_REL);
    let (model, _) = read_package(data, ParserConfig::default().with_relationship_filter(filter));
    let model = model.unwrap();
    assert_eq!(model.attachments().len(), 1);
    assert!(model.find_attachment("/Metadata/thumbnail.png").is_some());
}

#[test]
fn test_percent_encoded_part_name() {
    let data = PackageBuilder::with_root("/3D/my%20model.model", &tetrahedron_model()).build();
    let model = Model::from_reader(Cursor::new(data)).unwrap();
    assert_eq!(model.root_part(), "/3D/my model.model");
    assert_eq!(model.resource_count(), 1);
}

#[test]
fn test_progress_callback_sees_stages() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&stages);
    let config = ParserConfig::default().with_progress_callback(Arc::new(move |stage: ProgressStage| {
        recorded.lock().unwrap().push(stage);
        ProgressControl::Continue
    }));

    let data = PackageBuilder::new(&tetrahedron_model()).build();
    let (model, _) = read_package(data, config);
    assert!(model.is_ok());

    let stages = stages.lock().unwrap();
    assert!(stages.contains(&ProgressStage::ReadModel));
    assert!(stages.contains(&ProgressStage::ReadResources));
    assert!(stages.contains(&ProgressStage::ReadBuild));
}

#[test]
fn test_progress_callback_aborts() {
    let config = ParserConfig::default().with_progress_callback(Arc::new(|stage: ProgressStage| {
        if stage == ProgressStage::ReadBuild {
            ProgressControl::Abort
        } else {
            ProgressControl::Continue
        }
    }));
    let data = PackageBuilder::new(&tetrahedron_model()).build();
    let (model, _) = read_package(data, config);
    assert!(matches!(model, Err(Error::UserAborted)));
}
