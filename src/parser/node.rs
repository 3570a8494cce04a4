//! XML tokenization and the per-element node state machine
//!
//! [`XmlTokens`] turns quick-xml events into namespace-resolved [`Token`]s. A [`Node`]
//! wraps one start tag and walks it through
//! `Idle -> AttributesParsed -> ContentParsed -> Done`. Child elements are dispatched
//! through [`CHILD_TABLE`].

use log::trace;
use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::model::{Extension, XML_NAMESPACE};

use super::WarningCode;
use super::context::ReadContext;

/// A namespace-resolved attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Namespace URI, `None` for unprefixed attributes
    pub namespace: Option<String>,
    /// Local name
    pub name: String,
    /// Unescaped value
    pub value: String,
}

/// Where an attribute belongs, as seen by element handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeScope {
    /// Unprefixed, or prefixed with the core namespace
    Local,
    /// `xml:` attribute
    Xml,
    /// Attribute of an extension namespace
    Extension(Extension),
    /// Any other namespace
    Foreign,
}

impl Attribute {
    /// Namespace the attribute belongs to
    pub fn scope(&self) -> AttributeScope {
        match self.namespace.as_deref() {
            None => AttributeScope::Local,
            Some(XML_NAMESPACE) => AttributeScope::Xml,
            Some(namespace) => match Extension::from_namespace(namespace) {
                Some(Extension::Core) => AttributeScope::Local,
                Some(extension) => AttributeScope::Extension(extension),
                None => AttributeScope::Foreign,
            },
        }
    }
}

/// A namespace-resolved start tag
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Namespace URI, empty when the element is in no namespace
    pub namespace: String,
    /// Local name
    pub name: String,
    /// Attributes other than namespace declarations
    pub attributes: Vec<Attribute>,
    /// `(prefix, uri)` pairs declared on this element; the default namespace has an
    /// empty prefix
    pub namespace_declarations: Vec<(String, String)>,
}

/// One step of the document
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Start tag (empty elements produce a start followed by an end)
    Start(Element),
    /// Character data
    Text(String),
    /// End tag
    End,
    /// End of document
    Eof,
}

/// Namespace-aware token stream over a quick-xml reader
pub struct XmlTokens<'a> {
    reader: Reader<&'a [u8]>,
    scopes: Vec<Vec<(String, String)>>,
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::InvalidXml(e.to_string()))
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

impl<'a> XmlTokens<'a> {
    /// Tokenize a model document
    pub fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().expand_empty_elements = true;
        Self {
            reader,
            scopes: Vec::new(),
        }
    }

    /// Resolve a prefix against the declarations currently in scope
    pub fn lookup_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn resolve_prefix(&self, prefix: &str, qname: &str) -> Result<String> {
        self.lookup_prefix(prefix).map(str::to_string).ok_or_else(|| {
            Error::InvalidXml(format!(
                "Namespace prefix '{}' used by '{}' is not declared",
                prefix, qname
            ))
        })
    }

    fn start_element(&mut self, start: &BytesStart<'_>) -> Result<Element> {
        let mut declarations = Vec::new();
        let mut raw_attributes = Vec::new();

        for attr in start.attributes() {
            let attr = attr?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let raw = utf8(&attr.value)?;
            let value = unescape(raw)
                .map_err(|e| Error::InvalidXml(e.to_string()))?
                .into_owned();

            if key == "xmlns" {
                declarations.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push((prefix.to_string(), value));
            } else {
                raw_attributes.push((key, value));
            }
        }
        self.scopes.push(declarations.clone());

        let qname = utf8(start.name().as_ref())?.to_string();
        let (prefix, local) = split_qname(&qname);
        let namespace = match prefix {
            Some(prefix) => self.resolve_prefix(prefix, &qname)?,
            None => self.lookup_prefix("").unwrap_or_default().to_string(),
        };

        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (key, value) in raw_attributes {
            let (prefix, name) = split_qname(&key);
            let namespace = match prefix {
                Some(prefix) => Some(self.resolve_prefix(prefix, &key)?),
                None => None,
            };
            attributes.push(Attribute {
                namespace,
                name: name.to_string(),
                value,
            });
        }

        Ok(Element {
            namespace,
            name: local.to_string(),
            attributes,
            namespace_declarations: declarations,
        })
    }

    /// Next token, with comments, processing instructions and the declaration skipped
    pub fn next_token(&mut self) -> Result<Token> {
        loop {
            match self.reader.read_event()? {
                Event::Start(start) => return Ok(Token::Start(self.start_element(&start)?)),
                Event::End(_) => {
                    self.scopes.pop();
                    return Ok(Token::End);
                }
                Event::Text(text) => {
                    let text = text
                        .decode()
                        .map_err(|e| Error::InvalidXml(e.to_string()))?;
                    return Ok(Token::Text(text.into_owned()));
                }
                Event::CData(data) => {
                    return Ok(Token::Text(utf8(&data)?.to_string()));
                }
                Event::GeneralRef(reference) => {
                    if let Some(ch) = reference
                        .resolve_char_ref()
                        .map_err(|e| Error::InvalidXml(e.to_string()))?
                    {
                        return Ok(Token::Text(ch.to_string()));
                    }
                    let name = utf8(&reference)?;
                    let resolved = resolve_predefined_entity(name).ok_or_else(|| {
                        Error::InvalidXml(format!("Undefined entity reference '&{};'", name))
                    })?;
                    return Ok(Token::Text(resolved.to_string()));
                }
                Event::DocType(_) => {
                    return Err(Error::InvalidXml(
                        "Document type declarations are not allowed in 3MF model parts"
                            .to_string(),
                    ));
                }
                Event::Eof => return Ok(Token::Eof),
                _ => {}
            }
        }
    }

    /// Consume everything up to and including the end tag of the element whose start
    /// tag was just read
    pub fn skip_element(&mut self) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.next_token()? {
                Token::Start(_) => depth += 1,
                Token::End => depth -= 1,
                Token::Text(_) => {}
                Token::Eof => {
                    return Err(Error::InvalidXml(
                        "Unexpected end of document inside an element".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Every element the reader understands
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Model,
    Metadata,
    MetadataGroup,
    Resources,
    Object,
    Mesh,
    Vertices,
    Vertex,
    Triangles,
    Triangle,
    Components,
    Component,
    BaseMaterials,
    Base,
    Build,
    Item,
    ColorGroup,
    Color,
    Texture2D,
    Texture2DGroup,
    Tex2Coord,
    CompositeMaterials,
    Composite,
    MultiProperties,
    Multi,
    SliceStack,
    Slice,
    SliceVertices,
    SliceVertex,
    Polygon,
    Segment,
    SliceRef,
    BeamLattice,
    Beams,
    Beam,
    BeamSets,
    BeamSet,
    BeamRef,
    Balls,
    Ball,
    BallRef,
}

impl NodeKind {
    /// Tag name of the element
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Model => "model",
            NodeKind::Metadata => "metadata",
            NodeKind::MetadataGroup => "metadatagroup",
            NodeKind::Resources => "resources",
            NodeKind::Object => "object",
            NodeKind::Mesh => "mesh",
            NodeKind::Vertices | NodeKind::SliceVertices => "vertices",
            NodeKind::Vertex | NodeKind::SliceVertex => "vertex",
            NodeKind::Triangles => "triangles",
            NodeKind::Triangle => "triangle",
            NodeKind::Components => "components",
            NodeKind::Component => "component",
            NodeKind::BaseMaterials => "basematerials",
            NodeKind::Base => "base",
            NodeKind::Build => "build",
            NodeKind::Item => "item",
            NodeKind::ColorGroup => "colorgroup",
            NodeKind::Color => "color",
            NodeKind::Texture2D => "texture2d",
            NodeKind::Texture2DGroup => "texture2dgroup",
            NodeKind::Tex2Coord => "tex2coord",
            NodeKind::CompositeMaterials => "compositematerials",
            NodeKind::Composite => "composite",
            NodeKind::MultiProperties => "multiproperties",
            NodeKind::Multi => "multi",
            NodeKind::SliceStack => "slicestack",
            NodeKind::Slice => "slice",
            NodeKind::Polygon => "polygon",
            NodeKind::Segment => "segment",
            NodeKind::SliceRef => "sliceref",
            NodeKind::BeamLattice => "beamlattice",
            NodeKind::Beams => "beams",
            NodeKind::Beam => "beam",
            NodeKind::BeamSets => "beamsets",
            NodeKind::BeamSet => "beamset",
            NodeKind::BeamRef => "ref",
            NodeKind::Balls => "balls",
            NodeKind::Ball => "ball",
            NodeKind::BallRef => "ballref",
        }
    }
}

/// `(parent, namespace of the child, child tag) -> child kind`
pub const CHILD_TABLE: &[(NodeKind, Extension, &str, NodeKind)] = &[
    (NodeKind::Model, Extension::Core, "metadata", NodeKind::Metadata),
    (NodeKind::Model, Extension::Core, "resources", NodeKind::Resources),
    (NodeKind::Model, Extension::Core, "build", NodeKind::Build),
    (NodeKind::Resources, Extension::Core, "object", NodeKind::Object),
    (NodeKind::Resources, Extension::Core, "basematerials", NodeKind::BaseMaterials),
    (NodeKind::Resources, Extension::Material, "colorgroup", NodeKind::ColorGroup),
    (NodeKind::Resources, Extension::Material, "texture2d", NodeKind::Texture2D),
    (NodeKind::Resources, Extension::Material, "texture2dgroup", NodeKind::Texture2DGroup),
    (NodeKind::Resources, Extension::Material, "compositematerials", NodeKind::CompositeMaterials),
    (NodeKind::Resources, Extension::Material, "multiproperties", NodeKind::MultiProperties),
    (NodeKind::Resources, Extension::Slice, "slicestack", NodeKind::SliceStack),
    (NodeKind::Object, Extension::Core, "mesh", NodeKind::Mesh),
    (NodeKind::Object, Extension::Core, "components", NodeKind::Components),
    (NodeKind::Object, Extension::Core, "metadatagroup", NodeKind::MetadataGroup),
    (NodeKind::MetadataGroup, Extension::Core, "metadata", NodeKind::Metadata),
    (NodeKind::Mesh, Extension::Core, "vertices", NodeKind::Vertices),
    (NodeKind::Mesh, Extension::Core, "triangles", NodeKind::Triangles),
    (NodeKind::Mesh, Extension::BeamLattice, "beamlattice", NodeKind::BeamLattice),
    (NodeKind::Vertices, Extension::Core, "vertex", NodeKind::Vertex),
    (NodeKind::Triangles, Extension::Core, "triangle", NodeKind::Triangle),
    (NodeKind::Components, Extension::Core, "component", NodeKind::Component),
    (NodeKind::BaseMaterials, Extension::Core, "base", NodeKind::Base),
    (NodeKind::Build, Extension::Core, "item", NodeKind::Item),
    (NodeKind::Item, Extension::Core, "metadatagroup", NodeKind::MetadataGroup),
    (NodeKind::ColorGroup, Extension::Material, "color", NodeKind::Color),
    (NodeKind::Texture2DGroup, Extension::Material, "tex2coord", NodeKind::Tex2Coord),
    (NodeKind::CompositeMaterials, Extension::Material, "composite", NodeKind::Composite),
    (NodeKind::MultiProperties, Extension::Material, "multi", NodeKind::Multi),
    (NodeKind::SliceStack, Extension::Slice, "slice", NodeKind::Slice),
    (NodeKind::SliceStack, Extension::Slice, "sliceref", NodeKind::SliceRef),
    (NodeKind::Slice, Extension::Slice, "vertices", NodeKind::SliceVertices),
    (NodeKind::Slice, Extension::Slice, "polygon", NodeKind::Polygon),
    (NodeKind::SliceVertices, Extension::Slice, "vertex", NodeKind::SliceVertex),
    (NodeKind::Polygon, Extension::Slice, "segment", NodeKind::Segment),
    (NodeKind::BeamLattice, Extension::BeamLattice, "beams", NodeKind::Beams),
    (NodeKind::BeamLattice, Extension::BeamLattice, "beamsets", NodeKind::BeamSets),
    (NodeKind::BeamLattice, Extension::BeamLatticeBalls, "balls", NodeKind::Balls),
    (NodeKind::Beams, Extension::BeamLattice, "beam", NodeKind::Beam),
    (NodeKind::BeamSets, Extension::BeamLattice, "beamset", NodeKind::BeamSet),
    (NodeKind::BeamSet, Extension::BeamLattice, "ref", NodeKind::BeamRef),
    (NodeKind::BeamSet, Extension::BeamLatticeBalls, "ballref", NodeKind::BallRef),
    (NodeKind::Balls, Extension::BeamLatticeBalls, "ball", NodeKind::Ball),
];

/// Look up the kind of a child element
pub fn child_kind(parent: NodeKind, extension: Extension, tag: &str) -> Option<NodeKind> {
    CHILD_TABLE
        .iter()
        .find(|(p, ext, t, _)| *p == parent && *ext == extension && *t == tag)
        .map(|(_, _, _, kind)| *kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Idle,
    AttributesParsed,
    ContentParsed,
    Done,
}

/// One element being read
pub(crate) struct Node {
    kind: NodeKind,
    state: NodeState,
    element: Element,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, element: Element) -> Self {
        trace!(tag = kind.tag(), namespace = element.namespace.as_str(); "Entering node");
        Self {
            kind,
            state: NodeState::Idle,
            element,
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.kind
    }

    pub(crate) fn element(&self) -> &Element {
        &self.element
    }

    fn invalid_state(&self, message: &str) -> Error {
        Error::InvalidNodeState {
            element: self.kind.tag().to_string(),
            message: message.to_string(),
        }
    }

    fn own_extension(&self) -> Option<Extension> {
        Extension::from_namespace(&self.element.namespace)
    }

    /// Feed every attribute in a handled namespace to `handler`
    ///
    /// The handler returns `false` for attributes it does not know; those produce a
    /// `NamespaceInvalidAttribute` warning.
    pub(crate) fn parse_attributes<'a, F>(
        &mut self,
        ctx: &mut ReadContext<'a>,
        mut handler: F,
    ) -> Result<()>
    where
        F: FnMut(&mut ReadContext<'a>, &Attribute) -> Result<bool>,
    {
        if self.state != NodeState::Idle {
            return Err(self.invalid_state("attributes parsed twice"));
        }

        for attr in &self.element.attributes {
            let handled = match attr.namespace.as_deref() {
                None | Some(XML_NAMESPACE) => true,
                Some(namespace) => {
                    Extension::from_namespace(namespace).is_some_and(|ext| ctx.config.supports(&ext))
                }
            };
            if !handled {
                continue;
            }
            if !handler(ctx, attr)? {
                ctx.warn(
                    WarningCode::NamespaceInvalidAttribute,
                    format!(
                        "Unknown attribute '{}' on element '<{}>'",
                        attr.name,
                        self.kind.tag()
                    ),
                )?;
            }
        }

        self.state = NodeState::AttributesParsed;
        Ok(())
    }

    /// Read children up to the matching end tag
    ///
    /// Known children are handed to `on_child`, which must consume them completely.
    pub(crate) fn parse_content<'a, 'x, F>(
        &mut self,
        ctx: &mut ReadContext<'a>,
        tokens: &mut XmlTokens<'x>,
        mut on_child: F,
    ) -> Result<()>
    where
        F: FnMut(&mut ReadContext<'a>, &mut XmlTokens<'x>, NodeKind, Element) -> Result<()>,
    {
        if self.state != NodeState::AttributesParsed {
            return Err(self.invalid_state("content parsed before attributes"));
        }

        loop {
            match tokens.next_token()? {
                Token::Start(child) => {
                    let extension = Extension::from_namespace(&child.namespace)
                        .filter(|ext| ctx.config.supports(ext));
                    let kind = extension.and_then(|ext| child_kind(self.kind, ext, &child.name));
                    match (kind, extension) {
                        (Some(kind), _) => on_child(ctx, tokens, kind, child)?,
                        (None, Some(_)) => {
                            ctx.warn(
                                WarningCode::NamespaceInvalidElement,
                                format!(
                                    "Unexpected element '<{}>' inside '<{}>'",
                                    child.name,
                                    self.kind.tag()
                                ),
                            )?;
                            tokens.skip_element()?;
                        }
                        (None, None) => {
                            trace!(element = child.name.as_str(), namespace = child.namespace.as_str(); "Skipping foreign element");
                            tokens.skip_element()?;
                        }
                    }
                }
                Token::Text(_) => {}
                Token::End => break,
                Token::Eof => {
                    return Err(Error::invalid_xml_element(
                        self.kind.tag(),
                        "Unexpected end of document before closing tag",
                    ));
                }
            }
        }

        self.state = NodeState::ContentParsed;
        Ok(())
    }

    /// Read character content up to the matching end tag; child elements are skipped
    pub(crate) fn parse_text(
        &mut self,
        ctx: &mut ReadContext<'_>,
        tokens: &mut XmlTokens<'_>,
    ) -> Result<String> {
        if self.state != NodeState::AttributesParsed {
            return Err(self.invalid_state("content parsed before attributes"));
        }

        let mut text = String::new();
        loop {
            match tokens.next_token()? {
                Token::Text(t) => text.push_str(&t),
                Token::Start(child) => {
                    if self.own_extension().is_some() {
                        ctx.warn(
                            WarningCode::NamespaceInvalidElement,
                            format!(
                                "Unexpected element '<{}>' inside '<{}>'",
                                child.name,
                                self.kind.tag()
                            ),
                        )?;
                    }
                    tokens.skip_element()?;
                }
                Token::End => break,
                Token::Eof => {
                    return Err(Error::invalid_xml_element(
                        self.kind.tag(),
                        "Unexpected end of document before closing tag",
                    ));
                }
            }
        }

        self.state = NodeState::ContentParsed;
        Ok(text)
    }

    /// Mark the node complete
    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.state != NodeState::ContentParsed {
            return Err(self.invalid_state("node finished before its content was parsed"));
        }
        self.state = NodeState::Done;
        Ok(())
    }
}
