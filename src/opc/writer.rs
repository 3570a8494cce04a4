//! Package writing over a ZIP archive

use std::collections::BTreeMap;
use std::io::{Seek, Write};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime};

use crate::error::{Error, Result};

use super::content_types::ContentTypes;
use super::relationships::{relationships_part_for, write_relationships};
use super::validation::{normalize_part_name, validate_part_name, zip_entry_name};
use super::{CONTENT_TYPES_PATH, PackageWriter, Relationship};

/// Writes a 3MF package (ZIP archive)
///
/// Parts are buffered and written on [`ZipPackageWriter::finish`]: first
/// `[Content_Types].xml`, then every relationship part, then the parts in the order
/// they were added. Entry timestamps are fixed, so equal input produces
/// byte-identical archives.
pub struct ZipPackageWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    content_types: ContentTypes,
    parts: Vec<(String, Vec<u8>)>,
    relationships: BTreeMap<String, Vec<Relationship>>,
}

impl<W: Write + Seek> ZipPackageWriter<W> {
    /// Create a writer
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            content_types: ContentTypes::new(),
            parts: Vec::new(),
            relationships: BTreeMap::new(),
        }
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
    }

    fn write_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.zip
            .start_file(zip_entry_name(name), Self::options())
            .map_err(|e| Error::xml_write(format!("Failed to create {}: {}", name, e)))?;
        self.zip
            .write_all(data)
            .map_err(|e| Error::xml_write(format!("Failed to write {}: {}", name, e)))?;
        Ok(())
    }

    /// Write every buffered part and return the underlying writer
    pub fn finish(mut self) -> Result<W> {
        let content_types = self.content_types.to_xml()?;
        self.write_entry(CONTENT_TYPES_PATH, &content_types)?;

        let relationships = std::mem::take(&mut self.relationships);
        for (source, rels) in &relationships {
            let xml = write_relationships(rels)?;
            self.write_entry(&relationships_part_for(source), &xml)?;
        }

        let parts = std::mem::take(&mut self.parts);
        for (path, data) in &parts {
            self.write_entry(path, data)?;
        }

        self.zip
            .finish()
            .map_err(|e| Error::xml_write(format!("Failed to finalize ZIP archive: {}", e)))
    }
}

impl<W: Write + Seek> PackageWriter for ZipPackageWriter<W> {
    fn write_part(&mut self, path: &str, content_type: &str, data: &[u8]) -> Result<()> {
        let path = normalize_part_name(path);
        validate_part_name(&path)?;
        if self.parts.iter().any(|(p, _)| *p == path) {
            return Err(Error::xml_write(format!("Part {} written twice", path)));
        }
        self.content_types.register(&path, content_type);
        self.parts.push((path, data.to_vec()));
        Ok(())
    }

    fn add_relationship(&mut self, source_part: &str, relationship: Relationship) -> Result<()> {
        self.relationships
            .entry(normalize_part_name(source_part))
            .or_default()
            .push(relationship);
        Ok(())
    }
}
