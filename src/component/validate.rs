//! HTML element validation.
//!
//! [`HtmlValidator`] forwards events unchanged and fails on the first
//! element whose name is outside the HTML vocabulary. It runs on the
//! rewritten stream, so a component tag that was never expanded (a typo in
//! the markup, a missing rule in the style) is reported instead of leaking
//! into the page.

use super::ComponentError;
use super::attributes::Attributes;
use super::node::Declaration;
use super::sink::EventSink;

const HTML_ELEMENTS: &[&str] = &[
    // document
    "html", "base", "head", "link", "meta", "style", "title", "body",
    // sections
    "address", "article", "aside", "footer", "header", "h1", "h2", "h3", "h4", "h5", "h6",
    "hgroup", "main", "nav", "section", "search",
    // grouping
    "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure", "hr", "li", "menu", "ol", "p",
    "pre", "ul",
    // text-level
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "dfn", "em", "i", "kbd", "mark",
    "q", "rp", "rt", "ruby", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u",
    "var", "wbr",
    // embedded
    "area", "audio", "img", "map", "track", "video", "embed", "fencedframe", "iframe", "object",
    "picture", "source", "svg", "math",
    // scripting and edits
    "canvas", "noscript", "script", "del", "ins",
    // tables
    "caption", "col", "colgroup", "table", "tbody", "td", "tfoot", "th", "thead", "tr",
    // forms
    "button", "datalist", "fieldset", "form", "input", "label", "legend", "meter", "optgroup",
    "option", "output", "progress", "select", "textarea",
    // interactive and components
    "details", "dialog", "summary", "slot", "template",
    // obsolete but still rendered
    "center", "tt",
];

/// Whether `name` is a known HTML element, ignoring ASCII case.
pub fn is_html_element(name: &str) -> bool {
    HTML_ELEMENTS.iter().any(|e| e.eq_ignore_ascii_case(name))
}

/// Rejects elements that are not HTML before they reach `inner`.
pub struct HtmlValidator<S> {
    inner: S,
}

impl<S: EventSink> HtmlValidator<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn check(name: &str) -> Result<(), ComponentError> {
        if is_html_element(name) {
            Ok(())
        } else {
            Err(ComponentError::InvalidElement(name.to_string()))
        }
    }
}

impl<S: EventSink> EventSink for HtmlValidator<S> {
    fn declaration(&mut self, declaration: &Declaration) -> Result<(), ComponentError> {
        self.inner.declaration(declaration)
    }

    fn start_document(&mut self) -> Result<(), ComponentError> {
        self.inner.start_document()
    }

    fn end_document(&mut self) -> Result<(), ComponentError> {
        self.inner.end_document()
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), ComponentError> {
        Self::check(name)?;
        self.inner.start_element(name, attributes)
    }

    fn characters(&mut self, text: &str) -> Result<(), ComponentError> {
        self.inner.characters(text)
    }

    fn end_element(&mut self, name: &str) -> Result<(), ComponentError> {
        Self::check(name)?;
        self.inner.end_element(name)
    }
}
