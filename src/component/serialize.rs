//! Writing an event stream as markup text.
//!
//! Start tags are written lazily so an element with no content can be
//! closed in the same tag: `<br/>` in XML, `<br>` for HTML void elements.
//! HTML output starts with `<!DOCTYPE html>` and never self-closes a
//! non-void element.

use super::ComponentError;
use super::attributes::Attributes;
use super::node::Declaration;
use super::sink::EventSink;
use super::xml::OutputKind;
use quick_xml::escape::{escape, partial_escape};
use std::io::Write;

/// Elements HTML writes without an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content HTML writes unescaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

pub struct Serializer<W: Write> {
    writer: W,
    kind: OutputKind,
    /// A start tag is written up to its attributes, `>` still pending.
    open_tag: bool,
    raw_text: usize,
}

impl<W: Write> Serializer<W> {
    pub fn new(writer: W, kind: OutputKind) -> Self {
        Self {
            writer,
            kind,
            open_tag: false,
            raw_text: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn close_open_tag(&mut self) -> Result<(), ComponentError> {
        if self.open_tag {
            self.writer.write_all(b">")?;
            self.open_tag = false;
        }
        Ok(())
    }
}

impl<W: Write> EventSink for Serializer<W> {
    fn declaration(&mut self, declaration: &Declaration) -> Result<(), ComponentError> {
        if self.kind == OutputKind::Xml {
            write!(self.writer, r#"<?xml version="{}""#, escape(&declaration.version))?;
            if let Some(encoding) = &declaration.encoding {
                write!(self.writer, r#" encoding="{}""#, escape(encoding))?;
            }
            self.writer.write_all(b"?>\n")?;
        }
        Ok(())
    }

    fn start_document(&mut self) -> Result<(), ComponentError> {
        if self.kind == OutputKind::Html {
            self.writer.write_all(b"<!DOCTYPE html>\n")?;
        }
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), ComponentError> {
        self.close_open_tag()?;
        self.writer.flush()?;
        Ok(())
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), ComponentError> {
        self.close_open_tag()?;
        write!(self.writer, "<{name}")?;
        for (key, value) in attributes.iter() {
            write!(self.writer, r#" {key}="{}""#, escape(value))?;
        }
        self.open_tag = true;
        if self.kind == OutputKind::Html && is_raw_text(name) {
            self.raw_text += 1;
        }
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<(), ComponentError> {
        if text.is_empty() {
            return Ok(());
        }
        self.close_open_tag()?;
        if self.raw_text > 0 {
            self.writer.write_all(text.as_bytes())?;
        } else {
            self.writer.write_all(partial_escape(text).as_bytes())?;
        }
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<(), ComponentError> {
        if self.kind == OutputKind::Html && is_raw_text(name) {
            self.raw_text = self.raw_text.saturating_sub(1);
        }
        if self.open_tag {
            self.open_tag = false;
            match self.kind {
                OutputKind::Xml => self.writer.write_all(b"/>")?,
                OutputKind::Html if is_void(name) => self.writer.write_all(b">")?,
                OutputKind::Html => write!(self.writer, "></{name}>")?,
            }
            return Ok(());
        }
        write!(self.writer, "</{name}>")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_events(kind: OutputKind, f: impl FnOnce(&mut Serializer<Vec<u8>>)) -> String {
        let mut serializer = Serializer::new(Vec::new(), kind);
        f(&mut serializer);
        String::from_utf8(serializer.into_inner()).unwrap()
    }

    #[test]
    fn xml_self_closes_empty_elements() {
        let out = write_events(OutputKind::Xml, |s| {
            s.start_element("a", &Attributes::new()).unwrap();
            s.start_element("b", &Attributes::from([("x", "1")])).unwrap();
            s.end_element("b").unwrap();
            s.end_element("a").unwrap();
        });
        assert_eq!(out, r#"<a><b x="1"/></a>"#);
    }

    #[test]
    fn html_void_and_empty_elements() {
        let out = write_events(OutputKind::Html, |s| {
            s.start_element("p", &Attributes::new()).unwrap();
            s.start_element("br", &Attributes::new()).unwrap();
            s.end_element("br").unwrap();
            s.start_element("span", &Attributes::new()).unwrap();
            s.end_element("span").unwrap();
            s.end_element("p").unwrap();
        });
        assert_eq!(out, "<p><br><span></span></p>");
    }

    #[test]
    fn escapes_text_and_attributes() {
        let out = write_events(OutputKind::Xml, |s| {
            s.start_element("a", &Attributes::from([("t", r#"say "hi" & <go>"#)]))
                .unwrap();
            s.characters("1 < 2 & 3 > 2").unwrap();
            s.end_element("a").unwrap();
        });
        assert_eq!(
            out,
            r#"<a t="say &quot;hi&quot; &amp; &lt;go&gt;">1 &lt; 2 &amp; 3 &gt; 2</a>"#
        );
    }

    #[test]
    fn html_script_text_is_raw() {
        let out = write_events(OutputKind::Html, |s| {
            s.start_element("script", &Attributes::new()).unwrap();
            s.characters("if (a < b && c) {}").unwrap();
            s.end_element("script").unwrap();
        });
        assert_eq!(out, "<script>if (a < b && c) {}</script>");
    }

    #[test]
    fn declaration_and_doctype_by_kind() {
        let declaration = Declaration {
            version: "1.0".into(),
            encoding: Some("UTF-8".into()),
        };
        let xml = write_events(OutputKind::Xml, |s| {
            s.start_document().unwrap();
            s.declaration(&declaration).unwrap();
            s.end_document().unwrap();
        });
        assert_eq!(xml, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let html = write_events(OutputKind::Html, |s| {
            s.start_document().unwrap();
            s.declaration(&declaration).unwrap();
            s.end_document().unwrap();
        });
        assert_eq!(html, "<!DOCTYPE html>\n");
    }
}
