//! Shared fixtures for the integration tests
//!
//! Packages are assembled with `zip` directly so the tests exercise the reader on
//! archives that were not produced by this crate's writer.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use lib3mf_core::{Extension, Model, ModelReader, ParserConfig, Result, Warning};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const CORE_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";
pub const MATERIAL_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/material/2015/02";
pub const PRODUCTION_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/production/2015/06";
pub const SLICE_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/slice/2015/07";
pub const BEAM_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02";
pub const BALLS_NS: &str = "http://schemas.microsoft.com/3dmanufacturing/beamlattice/balls/2020/07";

pub const MODEL_REL: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel";
pub const TEXTURE_REL: &str = "http://schemas.microsoft.com/3dmanufacturing/2013/01/3dtexture";
pub const THUMBNAIL_REL: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/thumbnail";

/// Closed, outward-facing tetrahedron
pub const TETRAHEDRON: &str = r#"<mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="10" y="0" z="0"/>
          <vertex x="0" y="10" z="0"/>
          <vertex x="0" y="0" z="10"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="2" v3="1"/>
          <triangle v1="0" v2="1" v3="3"/>
          <triangle v1="1" v2="2" v3="3"/>
          <triangle v1="2" v2="0" v3="3"/>
        </triangles>
      </mesh>"#;

/// Model document declaring the given prefixed namespaces
pub fn model_xml(namespaces: &[(&str, &str)], body: &str) -> String {
    let declarations: String = namespaces
        .iter()
        .map(|(prefix, uri)| format!(" xmlns:{}=\"{}\"", prefix, uri))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="{}"{}>
{}
</model>"#,
        CORE_NS, declarations, body
    )
}

/// A tetrahedron object placed once on the build
pub fn tetrahedron_model() -> String {
    model_xml(
        &[],
        &format!(
            r#"<resources>
    <object id="1" type="model">
      {}
    </object>
  </resources>
  <build>
    <item objectid="1"/>
  </build>"#,
            TETRAHEDRON
        ),
    )
}

/// Assembles a 3MF archive in memory
pub struct PackageBuilder {
    root: String,
    parts: Vec<(String, Vec<u8>)>,
    package_rels: Vec<(String, String)>,
    root_rels: Vec<(String, String)>,
}

impl PackageBuilder {
    /// Package whose root model part is `/3D/3dmodel.model`
    pub fn new(model_xml: &str) -> Self {
        Self::with_root("/3D/3dmodel.model", model_xml)
    }

    pub fn with_root(root: &str, model_xml: &str) -> Self {
        Self {
            root: root.to_string(),
            parts: vec![(root.to_string(), model_xml.as_bytes().to_vec())],
            package_rels: vec![(root.to_string(), MODEL_REL.to_string())],
            root_rels: Vec::new(),
        }
    }

    pub fn part(mut self, path: &str, data: impl AsRef<[u8]>) -> Self {
        self.parts.push((path.to_string(), data.as_ref().to_vec()));
        self
    }

    pub fn package_relationship(mut self, target: &str, rel_type: &str) -> Self {
        self.package_rels.push((target.to_string(), rel_type.to_string()));
        self
    }

    pub fn root_relationship(mut self, target: &str, rel_type: &str) -> Self {
        self.root_rels.push((target.to_string(), rel_type.to_string()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut buffer = Vec::new();
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = SimpleFileOptions::default();

        let content_types = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
  <Default Extension="png" ContentType="image/png"/>
</Types>"#;
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(content_types.as_bytes()).unwrap();

        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(relationships_xml(&self.package_rels).as_bytes())
            .unwrap();

        if !self.root_rels.is_empty() {
            let (dir, file) = self.root.rsplit_once('/').unwrap();
            let name = format!("{}/_rels/{}.rels", dir.trim_start_matches('/'), file);
            zip.start_file(name, options).unwrap();
            zip.write_all(relationships_xml(&self.root_rels).as_bytes())
                .unwrap();
        }

        for (path, data) in &self.parts {
            zip.start_file(path.trim_start_matches('/'), options).unwrap();
            zip.write_all(data).unwrap();
        }

        zip.finish().unwrap();
        buffer
    }
}

fn relationships_xml(rels: &[(String, String)]) -> String {
    let entries: String = rels
        .iter()
        .enumerate()
        .map(|(i, (target, rel_type))| {
            format!(
                "\n  <Relationship Id=\"rel{}\" Target=\"{}\" Type=\"{}\"/>",
                i, target, rel_type
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}
</Relationships>"#,
        entries
    )
}

/// Read a package, returning the outcome together with the warnings
pub fn read_package(data: Vec<u8>, config: ParserConfig) -> (Result<Model>, Vec<Warning>) {
    let mut reader = ModelReader::new(config);
    let result = reader.read(Cursor::new(data));
    (result, reader.warnings().to_vec())
}

/// Read a standalone model part, returning the outcome together with the warnings
pub fn read_xml(xml: &str, config: ParserConfig) -> (Result<Model>, Vec<Warning>) {
    let mut reader = ModelReader::new(config);
    let result = reader.read_from_str(xml);
    (result, reader.warnings().to_vec())
}

/// Parser configuration for a conformance suite directory
pub fn suite_config(suite: &str) -> ParserConfig {
    match suite {
        "core" => ParserConfig::new(),
        "materials" => ParserConfig::new().with_extension(Extension::Material),
        "production" => ParserConfig::new().with_extension(Extension::Production),
        "slice" => ParserConfig::new()
            .with_extension(Extension::Slice)
            .with_extension(Extension::Production),
        "beam_lattice" => ParserConfig::new()
            .with_extension(Extension::BeamLattice)
            .with_extension(Extension::BeamLatticeBalls),
        _ => ParserConfig::default(),
    }
}
