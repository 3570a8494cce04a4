//! `[Content_Types].xml` parsing and generation

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use crate::error::{Error, Result};

use super::validation::normalize_part_name;
use super::{MODEL_CONTENT_TYPE, RELS_CONTENT_TYPE};

const CONTENT_TYPES_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

/// Content type table of a package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    /// Table with the `rels` and `model` defaults every 3MF package declares
    pub fn new() -> Self {
        let mut table = Self::default();
        table
            .defaults
            .insert("rels".to_string(), RELS_CONTENT_TYPE.to_string());
        table
            .defaults
            .insert("model".to_string(), MODEL_CONTENT_TYPE.to_string());
        table
    }

    /// Parse and validate `[Content_Types].xml`
    ///
    /// The table must map `rels` to the relationships type and declare the 3D model type
    /// either as a `model` default or as an override.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();
        let mut table = Self::default();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    let name_str = std::str::from_utf8(name.as_ref())
                        .map_err(|e| Error::InvalidXml(e.to_string()))?;
                    let is_default = name_str.ends_with("Default");
                    let is_override = name_str.ends_with("Override");
                    let mut key_value = None;
                    let mut content_type = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        let key = std::str::from_utf8(attr.key.as_ref())
                            .map_err(|e| Error::InvalidXml(e.to_string()))?;
                        let value = std::str::from_utf8(&attr.value)
                            .map_err(|e| Error::InvalidXml(e.to_string()))?;
                        match key {
                            "Extension" | "PartName" => key_value = Some(value.to_string()),
                            "ContentType" => content_type = Some(value.to_string()),
                            _ => {}
                        }
                    }

                    if let (Some(k), Some(ct)) = (key_value, content_type)
                        && (is_default || is_override)
                    {
                        if is_default {
                            if ct == MODEL_CONTENT_TYPE && !k.eq_ignore_ascii_case("model") {
                                return Err(Error::InvalidFormat(format!(
                                    "Content type '{}' must use Extension='model', not Extension='{}'",
                                    ct, k
                                )));
                            }
                            table.defaults.insert(k.to_ascii_lowercase(), ct);
                        } else {
                            table.overrides.insert(normalize_part_name(&k), ct);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        if table.defaults.get("rels").map(String::as_str) != Some(RELS_CONTENT_TYPE) {
            return Err(Error::InvalidFormat(
                "Content Types missing required 'rels' extension definition".to_string(),
            ));
        }
        let declares_model = table.defaults.values().any(|ct| ct == MODEL_CONTENT_TYPE)
            || table.overrides.values().any(|ct| ct == MODEL_CONTENT_TYPE);
        if !declares_model {
            return Err(Error::InvalidFormat(
                "Content Types missing required model content type (Default or Override)"
                    .to_string(),
            ));
        }

        Ok(table)
    }

    /// Content type of a part: override first, then extension default
    pub fn content_type(&self, path: &str) -> Option<&str> {
        if let Some(ct) = self.overrides.get(&normalize_part_name(path)) {
            return Some(ct);
        }
        let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
        self.defaults.get(&extension).map(String::as_str)
    }

    /// Register a part, adding a default for a new extension or an override when
    /// the extension already maps to another type
    pub fn register(&mut self, path: &str, content_type: &str) {
        if self.content_type(path) == Some(content_type) {
            return;
        }
        match path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
            Some(ext) if !ext.contains('/') && !self.defaults.contains_key(&ext) => {
                self.defaults.insert(ext, content_type.to_string());
            }
            _ => {
                self.overrides
                    .insert(normalize_part_name(path), content_type.to_string());
            }
        }
    }

    /// Serialize the table
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

        let mut root = BytesStart::new("Types");
        root.push_attribute(("xmlns", CONTENT_TYPES_NAMESPACE));
        writer
            .write_event(Event::Start(root))
            .map_err(|e| Error::xml_write(format!("Failed to write Types element: {}", e)))?;

        for (ext, ct) in &self.defaults {
            let mut elem = BytesStart::new("Default");
            elem.push_attribute(("Extension", ext.as_str()));
            elem.push_attribute(("ContentType", ct.as_str()));
            writer
                .write_event(Event::Empty(elem))
                .map_err(|e| Error::xml_write(format!("Failed to write Default: {}", e)))?;
        }
        for (part, ct) in &self.overrides {
            let mut elem = BytesStart::new("Override");
            elem.push_attribute(("PartName", part.as_str()));
            elem.push_attribute(("ContentType", ct.as_str()));
            writer
                .write_event(Event::Empty(elem))
                .map_err(|e| Error::xml_write(format!("Failed to write Override: {}", e)))?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("Types")))
            .map_err(|e| Error::xml_write(format!("Failed to close Types element: {}", e)))?;

        Ok(writer.into_inner())
    }
}
