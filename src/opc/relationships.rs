//! Relationship parts (`_rels/*.rels`)

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use urlencoding::decode;

use crate::error::{Error, Result};

use super::validation::validate_part_name;
use super::{PACKAGE_SOURCE, Relationship};

const RELATIONSHIPS_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Absolute name of the relationship part for a source part
///
/// `/` maps to `/_rels/.rels`, `/3D/3dmodel.model` to `/3D/_rels/3dmodel.model.rels`.
pub fn relationships_part_for(source_part: &str) -> String {
    if source_part == PACKAGE_SOURCE || source_part.is_empty() {
        return "/_rels/.rels".to_string();
    }
    let source = source_part.strip_prefix('/').unwrap_or(source_part);
    match source.rsplit_once('/') {
        Some((dir, file)) => format!("/{}/_rels/{}.rels", dir, file),
        None => format!("/_rels/{}.rels", source),
    }
}

/// Resolve a relationship target against its source part
///
/// Absolute targets are returned as-is; relative ones are joined with the source's
/// directory. Percent-encoded characters are decoded.
pub fn resolve_target(source_part: &str, target: &str) -> Result<String> {
    let decoded = decode(target)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| target.to_string());

    if decoded.starts_with('/') {
        return Ok(decoded);
    }

    let base = if source_part == PACKAGE_SOURCE {
        ""
    } else {
        source_part
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    };
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in decoded.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::InvalidFormat(format!(
                        "Relationship target escapes the package root: {}",
                        target
                    )));
                }
            }
            other => segments.push(other),
        }
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Parse a relationship part
pub fn parse_relationships(xml: &str, source_part: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::InvalidXml(e.to_string()))?;

                if name_str.ends_with("Relationship") {
                    let mut id = None;
                    let mut target = None;
                    let mut rel_type = None;

                    for attr in e.attributes() {
                        let attr = attr?;
                        let key = std::str::from_utf8(attr.key.as_ref())
                            .map_err(|e| Error::InvalidXml(e.to_string()))?;
                        let raw = std::str::from_utf8(&attr.value)
                            .map_err(|e| Error::InvalidXml(e.to_string()))?;
                        let value = unescape(raw)
                            .map_err(|e| Error::InvalidXml(e.to_string()))?
                            .into_owned();

                        match key {
                            "Id" => id = Some(value),
                            "Target" => target = Some(value),
                            "Type" => rel_type = Some(value),
                            _ => {}
                        }
                    }

                    let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) else {
                        return Err(Error::InvalidFormat(
                            "Relationship requires Id, Target and Type attributes".to_string(),
                        ));
                    };

                    if rel_type.contains('?') || rel_type.contains('#') {
                        return Err(Error::InvalidFormat(format!(
                            "Relationship Type cannot contain query string or fragment: {}",
                            rel_type
                        )));
                    }

                    let target = resolve_target(source_part, &target)?;
                    validate_part_name(&target)?;
                    relationships.push(Relationship {
                        id,
                        target,
                        rel_type,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Serialize a relationship part
pub fn write_relationships(relationships: &[Relationship]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| Error::xml_write(format!("Failed to write XML declaration: {}", e)))?;

    let mut root = BytesStart::new("Relationships");
    root.push_attribute(("xmlns", RELATIONSHIPS_NAMESPACE));
    writer
        .write_event(Event::Start(root))
        .map_err(|e| Error::xml_write(format!("Failed to write Relationships element: {}", e)))?;

    for rel in relationships {
        let mut elem = BytesStart::new("Relationship");
        elem.push_attribute(("Target", rel.target.as_str()));
        elem.push_attribute(("Id", rel.id.as_str()));
        elem.push_attribute(("Type", rel.rel_type.as_str()));
        writer
            .write_event(Event::Empty(elem))
            .map_err(|e| Error::xml_write(format!("Failed to write Relationship: {}", e)))?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("Relationships")))
        .map_err(|e| Error::xml_write(format!("Failed to close Relationships element: {}", e)))?;

    Ok(writer.into_inner())
}
