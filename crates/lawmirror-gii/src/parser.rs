//! GII XML parser using quick-xml
//!
//! Builds an owned element tree from the markup, then derives the two
//! outputs from it: the whole document as JSON (attribute keys prefixed
//! with `@`, text under `#text`, repeated siblings as arrays) and the list
//! of `§` paragraphs.

use std::collections::HashSet;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Structural unit of a law
const NORM: &str = "norm";
const METADATA: &str = "metadaten";
const DESIGNATION: &str = "enbez";
const TITLE: &str = "titel";
const PARAGRAPH_BLOCK: &str = "P";

/// `§`, optional whitespace, then digits with an optional alphanumeric suffix.
static PARAGRAPH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^§\s*([0-9]+[A-Za-z0-9]*)").expect("valid regex"));

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed markup at byte {position}: {message}")]
    MalformedMarkup { position: u64, message: String },
}

impl ParseError {
    fn malformed(position: u64, message: impl ToString) -> Self {
        Self::MalformedMarkup {
            position,
            message: message.to_string(),
        }
    }
}

/// Child of an element: nested element or a run of character data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// Owned markup element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// All descendant text, concatenated in document order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Text directly inside this element (not inside children).
    fn own_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Descendants named `name` in document order, including `self`.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        if self.name == name {
            found.push(self);
        }
        for child in self.elements() {
            child.collect_named(name, found);
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }
}

/// One `§` unit of a law
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub id: String,
    pub heading: String,
    pub text: String,
}

/// Both outputs of one markup payload
#[derive(Debug)]
pub struct Extracted {
    pub document: Value,
    pub paragraphs: Vec<Paragraph>,
}

/// Parse markup and derive the document and its paragraphs.
pub fn extract(xml: &[u8]) -> Result<Extracted, ParseError> {
    let root = parse_tree(xml)?;
    Ok(Extracted {
        document: to_value(&root),
        paragraphs: extract_paragraphs(&root),
    })
}

/// Parse markup into an element tree.
///
/// Comments, processing instructions and the doctype are dropped.
pub fn parse_tree(xml: &[u8]) -> Result<Element, ParseError> {
    let mut reader = Reader::from_reader(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ParseError::malformed(position, e))?;

        match event {
            Event::Start(e) => stack.push(open_element(&e, position)?),
            Event::Empty(e) => {
                let element = open_element(&e, position)?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::End(e) => {
                let element = stack.pop().ok_or_else(|| {
                    ParseError::malformed(
                        position,
                        format!(
                            "unexpected closing tag </{}>",
                            String::from_utf8_lossy(e.name().as_ref())
                        ),
                    )
                })?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|e| ParseError::malformed(position, e))?;
                append_text(&mut stack, &text, position)?;
            }
            Event::CData(e) => {
                let text = std::str::from_utf8(&e)
                    .map_err(|e| ParseError::malformed(position, e))?
                    .to_string();
                append_text(&mut stack, &text, position)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::malformed(
            reader.buffer_position() as u64,
            format!("unclosed element <{}>", open.name),
        ));
    }
    root.ok_or_else(|| ParseError::malformed(0, "no root element"))
}

fn open_element(start: &BytesStart<'_>, position: u64) -> Result<Element, ParseError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| ParseError::malformed(position, e))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::malformed(position, e))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| ParseError::malformed(position, e))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::malformed(position, e))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    position: u64,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        Ok(())
    } else if root.is_some() {
        Err(ParseError::malformed(
            position,
            format!("second root element <{}>", element.name),
        ))
    } else {
        *root = Some(element);
        Ok(())
    }
}

fn append_text(stack: &mut [Element], text: &str, position: u64) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_text(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(ParseError::malformed(position, "text outside root element")),
    }
}

/// Convert the tree to its JSON form, keyed by the root element's name.
///
/// - an element without attributes or child elements becomes its trimmed
///   text, or `null` when empty
/// - otherwise an object: `@attr` keys first, then child elements by name
///   in order of first appearance, then `#text` if there is direct text
/// - a name occurring more than once among siblings becomes an array in
///   document order; a name occurring once stays a single value
pub fn to_value(root: &Element) -> Value {
    let mut doc = Map::new();
    doc.insert(root.name.clone(), element_value(root));
    Value::Object(doc)
}

fn element_value(element: &Element) -> Value {
    let text = element.own_text();
    let text = text.trim();
    let has_children = element.elements().next().is_some();

    if element.attributes.is_empty() && !has_children {
        return if text.is_empty() {
            Value::Null
        } else {
            Value::String(text.to_string())
        };
    }

    let mut map = Map::new();
    for (key, value) in &element.attributes {
        map.insert(format!("@{key}"), Value::String(value.clone()));
    }
    for child in element.elements() {
        let value = element_value(child);
        match map.get_mut(&child.name) {
            None => {
                map.insert(child.name.clone(), value);
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    if !text.is_empty() {
        map.insert("#text".to_string(), Value::String(text.to_string()));
    }
    Value::Object(map)
}

/// Identifier from a designation such as `"§ 242"` or `"§90a"`.
pub fn paragraph_id(designation: &str) -> Option<String> {
    PARAGRAPH_ID
        .captures(designation.trim())
        .map(|caps| caps[1].to_string())
}

/// Collect `§` paragraphs from every `norm` element.
///
/// Norms without a `§` designation (articles, annexes, headings) are
/// skipped. A repeated identifier keeps its first occurrence.
pub fn extract_paragraphs(root: &Element) -> Vec<Paragraph> {
    let mut seen = HashSet::new();
    let mut paragraphs = Vec::new();

    for norm in root.find_all(NORM) {
        let Some(paragraph) = norm_paragraph(norm) else {
            continue;
        };
        if !seen.insert(paragraph.id.clone()) {
            log::debug!("duplicate paragraph id {}, keeping first", paragraph.id);
            continue;
        }
        paragraphs.push(paragraph);
    }

    paragraphs
}

fn norm_paragraph(norm: &Element) -> Option<Paragraph> {
    let metadata = norm.child(METADATA)?;
    let id = paragraph_id(&metadata.child(DESIGNATION)?.text())?;

    let heading = metadata
        .child(TITLE)
        .map(|t| t.text().trim().to_string())
        .unwrap_or_default();

    let text = norm
        .find_all(PARAGRAPH_BLOCK)
        .iter()
        .map(|p| p.text())
        .filter_map(|t| {
            let t = t.trim();
            (!t.is_empty()).then(|| t.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(Paragraph { id, heading, text })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE dokumente SYSTEM "http://www.gesetze-im-internet.de/dtd/1.01/gii-norm.dtd">
<dokumente builddate="20240101" doknr="BJNR001950896">
  <norm builddate="20240101" doknr="BJNR001950896">
    <metadaten>
      <jurabk>BGB</jurabk>
      <langue>Bürgerliches Gesetzbuch</langue>
    </metadaten>
  </norm>
  <norm builddate="20240101" doknr="BJNR001950896BJNE000102377">
    <metadaten>
      <jurabk>BGB</jurabk>
      <enbez>§ 1</enbez>
      <titel format="parat">Beginn der Rechtsfähigkeit</titel>
    </metadaten>
    <textdaten>
      <text format="XML">
        <Content>
          <P>Die Rechtsfähigkeit des Menschen beginnt mit der Vollendung der Geburt.</P>
        </Content>
      </text>
    </textdaten>
  </norm>
  <norm builddate="20240101" doknr="BJNR001950896BJNE009802377">
    <metadaten>
      <jurabk>BGB</jurabk>
      <enbez>§ 90a</enbez>
      <titel format="parat">Tiere</titel>
    </metadaten>
    <textdaten>
      <text format="XML">
        <Content>
          <P>(1) Tiere sind keine Sachen.</P>
          <P>   </P>
          <P>(2) Sie werden durch <B>besondere</B> Gesetze geschützt.</P>
        </Content>
      </text>
    </textdaten>
  </norm>
  <norm builddate="20240101" doknr="BJNR001950896BJNG000102377">
    <metadaten>
      <jurabk>BGB</jurabk>
      <enbez>Art. 5</enbez>
      <titel>Übergangsvorschrift</titel>
    </metadaten>
    <textdaten><text><Content><P>Nicht zählen.</P></Content></text></textdaten>
  </norm>
</dokumente>"#;

    #[test]
    fn paragraph_id_patterns() {
        assert_eq!(paragraph_id("§ 242").as_deref(), Some("242"));
        assert_eq!(paragraph_id("§90a").as_deref(), Some("90a"));
        assert_eq!(paragraph_id("§ 1 Abs. 1").as_deref(), Some("1"));
        assert_eq!(paragraph_id("  § 623b2 ").as_deref(), Some("623b2"));
    }

    #[test]
    fn paragraph_id_rejects_other_designations() {
        assert_eq!(paragraph_id("Art. 5"), None);
        assert_eq!(paragraph_id("Anlage 1"), None);
        assert_eq!(paragraph_id("§§ 1 bis 3"), None);
        assert_eq!(paragraph_id("§ a"), None);
        assert_eq!(paragraph_id(""), None);
    }

    #[test]
    fn extracts_section_paragraphs_only() {
        let root = parse_tree(SAMPLE_XML.as_bytes()).unwrap();
        let paragraphs = extract_paragraphs(&root);

        let ids: Vec<_> = paragraphs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "90a"]);
        assert_eq!(paragraphs[0].heading, "Beginn der Rechtsfähigkeit");
        assert_eq!(
            paragraphs[0].text,
            "Die Rechtsfähigkeit des Menschen beginnt mit der Vollendung der Geburt."
        );
    }

    #[test]
    fn body_joins_blocks_and_skips_blank_ones() {
        let root = parse_tree(SAMPLE_XML.as_bytes()).unwrap();
        let paragraphs = extract_paragraphs(&root);
        assert_eq!(
            paragraphs[1].text,
            "(1) Tiere sind keine Sachen.\n(2) Sie werden durch besondere Gesetze geschützt."
        );
    }

    #[test]
    fn missing_title_and_body_give_empty_strings() {
        let xml = "<dokumente><norm><metadaten><enbez>§ 7</enbez></metadaten></norm></dokumente>";
        let paragraphs = extract_paragraphs(&parse_tree(xml.as_bytes()).unwrap());
        assert_eq!(
            paragraphs,
            vec![Paragraph {
                id: "7".into(),
                heading: String::new(),
                text: String::new(),
            }]
        );
    }

    #[test]
    fn norm_without_metadata_or_designation_skipped() {
        let xml = "<dokumente><norm><textdaten><P>x</P></textdaten></norm>\
                   <norm><metadaten><titel>Inhalt</titel></metadaten></norm></dokumente>";
        assert!(extract_paragraphs(&parse_tree(xml.as_bytes()).unwrap()).is_empty());
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let xml = "<d><norm><metadaten><enbez>§ 1</enbez><titel>A</titel></metadaten></norm>\
                   <norm><metadaten><enbez>§ 1</enbez><titel>B</titel></metadaten></norm></d>";
        let paragraphs = extract_paragraphs(&parse_tree(xml.as_bytes()).unwrap());
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].heading, "A");
    }

    #[test]
    fn scenario_norm_serializes_compactly() {
        let xml = "<dokumente><norm><metadaten><enbez>§ 1</enbez><titel>Zweck</titel></metadaten>\
                   <textdaten><text><P>Hello</P></text></textdaten></norm></dokumente>";
        let extracted = extract(xml.as_bytes()).unwrap();
        assert_eq!(
            serde_json::to_string(&extracted.paragraphs[0]).unwrap(),
            r#"{"id":"1","heading":"Zweck","text":"Hello"}"#
        );
    }

    #[test]
    fn document_value_follows_conventions() {
        let xml = r#"<dokumente doknr="X"><norm><metadaten><enbez>§ 1</enbez><titel format="parat">Zweck</titel></metadaten></norm><norm><metadaten><enbez/></metadaten></norm></dokumente>"#;
        let value = to_value(&parse_tree(xml.as_bytes()).unwrap());
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r##"{"dokumente":{"@doknr":"X","norm":[{"metadaten":{"enbez":"§ 1","titel":{"@format":"parat","#text":"Zweck"}}},{"metadaten":{"enbez":null}}]}}"##
        );
    }

    #[test]
    fn single_and_repeated_siblings() {
        let xml = "<r><a>1</a><b>x</b><a>2</a><a>3</a></r>";
        let value = to_value(&parse_tree(xml.as_bytes()).unwrap());
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"r":{"a":["1","2","3"],"b":"x"}}"#
        );
    }

    #[test]
    fn mixed_content_keeps_children_and_text() {
        let xml = "<P>Sie werden <B>besonders</B> geschützt.</P>";
        let value = to_value(&parse_tree(xml.as_bytes()).unwrap());
        assert_eq!(value["P"]["B"], "besonders");
        assert_eq!(value["P"]["#text"], "Sie werden  geschützt.");
    }

    #[test]
    fn entities_and_cdata_are_decoded() {
        let xml = r#"<r a="x &amp; y"><t>&lt;§&gt;</t><c><![CDATA[1 < 2]]></c></r>"#;
        let value = to_value(&parse_tree(xml.as_bytes()).unwrap());
        assert_eq!(value["r"]["@a"], "x & y");
        assert_eq!(value["r"]["t"], "<§>");
        assert_eq!(value["r"]["c"], "1 < 2");
    }

    #[test]
    fn serialization_is_deterministic() {
        let extracted = extract(SAMPLE_XML.as_bytes()).unwrap();
        let first = serde_json::to_vec(&extracted.document).unwrap();
        let second = serde_json::to_vec(&extracted.document).unwrap();
        let again = extract(SAMPLE_XML.as_bytes()).unwrap().document;
        let reparsed = serde_json::to_vec(&again).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, reparsed);
    }

    #[test]
    fn whole_document_keeps_text_and_attributes() {
        let value = extract(SAMPLE_XML.as_bytes()).unwrap().document;
        let norms = value["dokumente"]["norm"].as_array().unwrap();
        assert_eq!(norms.len(), 4);
        assert_eq!(value["dokumente"]["@doknr"], "BJNR001950896");
        assert_eq!(norms[0]["metadaten"]["langue"], "Bürgerliches Gesetzbuch");
        let blocks = &norms[2]["textdaten"]["text"]["Content"]["P"];
        assert_eq!(blocks[0], "(1) Tiere sind keine Sachen.");
        assert_eq!(blocks[1], Value::Null);
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        let err = parse_tree(b"<dokumente><norm></dokumente>").unwrap_err();
        assert!(matches!(err, ParseError::MalformedMarkup { .. }));
    }

    #[test]
    fn unclosed_root_is_malformed() {
        let err = parse_tree(b"<dokumente><norm/>").unwrap_err();
        assert!(matches!(err, ParseError::MalformedMarkup { .. }));
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(parse_tree(b"").is_err());
        assert!(parse_tree(b"  \n ").is_err());
    }

    #[test]
    fn second_root_is_malformed() {
        assert!(parse_tree(b"<a/><b/>").is_err());
    }

    #[test]
    fn stray_text_is_malformed() {
        assert!(parse_tree(b"Service Unavailable").is_err());
    }
}
