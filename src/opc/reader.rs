//! Package reading and validation over a ZIP archive

use std::io::{Read, Seek};

use log::debug;
use urlencoding::{decode, encode};
use zip::ZipArchive;

use crate::error::{Error, Result};

use super::content_types::ContentTypes;
use super::relationships::{parse_relationships, relationships_part_for};
use super::validation::zip_entry_name;
use super::{CONTENT_TYPES_PATH, PACKAGE_SOURCE, PackageReader, RELS_PATH, Relationship};

/// A 3MF package (ZIP archive) opened for reading
pub struct ZipPackage<R: Read + Seek> {
    archive: ZipArchive<R>,
    content_types: ContentTypes,
}

impl<R: Read + Seek> ZipPackage<R> {
    /// Open a 3MF package from a reader
    ///
    /// Validates the OPC structure: the content types part and the package
    /// relationships must exist, the model relationship must be present and every
    /// package relationship must point at an existing part.
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        let mut package = Self {
            archive,
            content_types: ContentTypes::default(),
        };

        if !package.has_entry(CONTENT_TYPES_PATH) {
            return Err(Error::InvalidFormat(format!(
                "Missing required file: {}",
                CONTENT_TYPES_PATH
            )));
        }
        if !package.has_entry(RELS_PATH) {
            return Err(Error::InvalidFormat(format!(
                "Missing required file: {}",
                RELS_PATH
            )));
        }

        let content_types = package.read_entry_string(CONTENT_TYPES_PATH)?;
        package.content_types = ContentTypes::parse(&content_types)?;

        let relationships = package.relationships(PACKAGE_SOURCE)?;
        for rel in &relationships {
            if !package.has_part(&rel.target) {
                return Err(Error::InvalidFormat(format!(
                    "Relationship points to non-existent file: {}",
                    rel.target
                )));
            }
        }
        let model_path = package.root_model_path()?;
        debug!(model_path, entries = package.len(); "Opened 3MF package");

        Ok(package)
    }

    /// Content type table
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Number of entries in the archive
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// True when the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Entry names in archive order
    pub fn file_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Archive entry for a part name, trying the percent-decoded and percent-encoded
    /// forms as well
    fn entry_name(&mut self, path: &str) -> Option<String> {
        let name = zip_entry_name(path);
        if self.has_entry(name) {
            return Some(name.to_string());
        }
        let decoded = decode(name).ok()?;
        if self.has_entry(&decoded) {
            return Some(decoded.into_owned());
        }
        let encoded = decoded
            .split('/')
            .map(|segment| encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        self.has_entry(&encoded).then_some(encoded)
    }

    fn has_entry(&mut self, name: &str) -> bool {
        self.archive.by_name(name).is_ok()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| Error::MissingFile(name.to_string()))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }

    fn read_entry_string(&mut self, name: &str) -> Result<String> {
        String::from_utf8(self.read_entry(name)?)
            .map_err(|e| Error::InvalidFormat(format!("{} is not valid UTF-8: {}", name, e)))
    }
}

impl<R: Read + Seek> PackageReader for ZipPackage<R> {
    fn read_part(&mut self, path: &str) -> Result<Vec<u8>> {
        let name = self
            .entry_name(path)
            .ok_or_else(|| Error::MissingFile(path.to_string()))?;
        self.read_entry(&name)
    }

    fn has_part(&mut self, path: &str) -> bool {
        self.entry_name(path).is_some()
    }

    fn relationships(&mut self, source_part: &str) -> Result<Vec<Relationship>> {
        let rels_part = relationships_part_for(source_part);
        let Some(name) = self.entry_name(&rels_part) else {
            return Ok(Vec::new());
        };
        let xml = self.read_entry_string(&name)?;
        parse_relationships(&xml, source_part)
    }
}
