//! Reading markup and running transforms.
//!
//! Sources are markup text or an already parsed tree; targets are a new tree
//! or a writer. Every transform drives the same [`Rewriter`]:
//!
//! ```text
//! markup ─ quick-xml ─┐
//!                     ├─ Rewriter(style) ─┬─ TreeSink              → Document
//! NodeRef::visit ─────┘                   └─ [HtmlValidator] ─ Serializer → Write
//! ```

use super::ComponentError;
use super::attributes::Attributes;
use super::node::{Declaration, Document, NodeRef, TreeSink};
use super::rewrite::Rewriter;
use super::serialize::Serializer;
use super::sink::EventSink;
use super::style::Style;
use super::validate::HtmlValidator;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Serialization flavor of the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// `<!DOCTYPE html>`, void elements, and element validation.
    #[default]
    Html,
    /// Declaration preserved, empty elements self-closed.
    Xml,
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn element(start: &BytesStart<'_>) -> Result<(String, Attributes), ComponentError> {
    let name = decode(start.name().as_ref());
    let mut attributes = Attributes::new();
    for attribute in start.attributes() {
        let attribute = attribute?;
        let value = attribute.unescape_value()?;
        attributes.insert(decode(attribute.key.as_ref()), value.into_owned());
    }
    Ok((name, attributes))
}

fn declaration(decl: &BytesDecl<'_>) -> Result<Declaration, ComponentError> {
    let version = decode(&decl.version()?);
    let encoding = decl.encoding().transpose()?.map(|e| decode(&e));
    Ok(Declaration { version, encoding })
}

/// Tokenize `markup` and feed it to `sink` as one document.
///
/// Character data outside the root element, comments, and processing
/// instructions are dropped.
pub fn read<S: EventSink + ?Sized>(markup: &str, sink: &mut S) -> Result<(), ComponentError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);

    let mut open: Vec<String> = Vec::new();
    sink.start_document()?;
    loop {
        match reader.read_event()? {
            Event::Decl(decl) => {
                if open.is_empty() {
                    sink.declaration(&declaration(&decl)?)?;
                }
            }
            Event::Start(start) => {
                let (name, attributes) = element(&start)?;
                sink.start_element(&name, &attributes)?;
                open.push(name);
            }
            Event::Empty(start) => {
                let (name, attributes) = element(&start)?;
                sink.start_element(&name, &attributes)?;
                sink.end_element(&name)?;
            }
            Event::End(end) => {
                let Some(name) = open.pop() else {
                    return Err(ComponentError::Malformed(format!(
                        "unexpected end tag </{}>",
                        decode(end.name().as_ref())
                    )));
                };
                sink.end_element(&name)?;
            }
            Event::Text(text) => {
                if !open.is_empty() {
                    sink.characters(&text.unescape()?)?;
                }
            }
            Event::CData(data) => {
                if !open.is_empty() {
                    sink.characters(&decode(&data))?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if let Some(name) = open.last() {
        return Err(ComponentError::Malformed(format!(
            "element <{name}> is never closed"
        )));
    }
    sink.end_document()
}

/// Parse `markup` into a new document.
pub fn parse(markup: &str) -> Result<Document, ComponentError> {
    let mut sink = TreeSink::new();
    read(markup, &mut sink)?;
    sink.finish()
}

/// Expand `style` over `source` into a new document.
pub fn transform(source: NodeRef<'_>, style: &Style) -> Result<Document, ComponentError> {
    let mut sink = TreeSink::new();
    source.visit(&mut Rewriter::new(style, &mut sink))?;
    sink.finish()
}

/// Expand `style` over markup text into a new document.
pub fn transform_markup(markup: &str, style: &Style) -> Result<Document, ComponentError> {
    let mut sink = TreeSink::new();
    read(markup, &mut Rewriter::new(style, &mut sink))?;
    sink.finish()
}

/// Expand `style` over `source` and serialize the result to `writer`.
pub fn render<W: Write>(
    source: NodeRef<'_>,
    writer: W,
    kind: OutputKind,
    style: &Style,
) -> Result<(), ComponentError> {
    match kind {
        OutputKind::Html => {
            let mut sink = HtmlValidator::new(Serializer::new(writer, kind));
            source.visit(&mut Rewriter::new(style, &mut sink))
        }
        OutputKind::Xml => {
            let mut sink = Serializer::new(writer, kind);
            source.visit(&mut Rewriter::new(style, &mut sink))
        }
    }
}

/// Expand `style` over markup text and serialize the result to `writer`.
pub fn render_markup<W: Write>(
    markup: &str,
    writer: W,
    kind: OutputKind,
    style: &Style,
) -> Result<(), ComponentError> {
    match kind {
        OutputKind::Html => {
            let mut sink = HtmlValidator::new(Serializer::new(writer, kind));
            read(markup, &mut Rewriter::new(style, &mut sink))
        }
        OutputKind::Xml => {
            let mut sink = Serializer::new(writer, kind);
            read(markup, &mut Rewriter::new(style, &mut sink))
        }
    }
}

/// Serialize `node` without expansion.
pub fn to_string(node: NodeRef<'_>, kind: OutputKind) -> Result<String, ComponentError> {
    let mut out = Vec::new();
    render(node, &mut out, kind, &Style::empty())?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// [`render_markup`] into a string.
pub fn transform_markup_to_string(
    markup: &str,
    style: &Style,
    kind: OutputKind,
) -> Result<String, ComponentError> {
    let mut out = Vec::new();
    render_markup(markup, &mut out, kind, style)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
