//! Tree model for parsed and synthesized markup.
//!
//! A [`Document`] owns every node it contains in a flat arena; nodes are
//! addressed by [`NodeId`] and read through the borrowed [`NodeRef`] handle.
//! There are no references between documents: content moves from one tree
//! into another only by replaying it ([`NodeRef::visit`]) into a
//! [`TreeSink`], so a capture can never alias the tree it was taken from.
//!
//! Mutation is limited to what the site needs: creating nodes, appending
//! them, and detaching a node from its parent. Structural misuse (attaching a
//! node twice, appending under a text node) is a programming error and
//! panics; lookups that depend on content return [`TreeError`].

use super::ComponentError;
use super::attributes::Attributes;
use super::sink::EventSink;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("node has no parent")]
    NoParent,
    #[error("no element named '{0}' found")]
    MissingElement(String),
}

static NO_ATTRIBUTES: Attributes = Attributes::new();
static NEXT_DOCUMENT: AtomicUsize = AtomicUsize::new(0);

/// Handle to a node inside one [`Document`].
///
/// The id remembers the document that created it. Using it with any other
/// document is a programming error, caught by debug assertions. A cloned
/// document accepts the ids of its original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    document: usize,
    index: usize,
}

/// `<?xml version=".." encoding=".."?>`, preserved from input to output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Element { name: String, attributes: Attributes },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An owning tree. The document node itself is always [`Document::root`].
#[derive(Debug, Clone)]
pub struct Document {
    id: usize,
    nodes: Vec<NodeData>,
    declaration: Option<Declaration>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            id: NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed),
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            declaration: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId {
            document: self.id,
            index: 0,
        }
    }

    pub fn node(&self) -> NodeRef<'_> {
        self.get(self.root())
    }

    pub fn get(&self, id: NodeId) -> NodeRef<'_> {
        self.check(id);
        NodeRef { doc: self, id }
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    pub fn set_declaration(&mut self, declaration: Option<Declaration>) {
        self.declaration = declaration;
    }

    /// Shorthand for `self.node().first_element()`.
    pub fn first_element(&self) -> Option<NodeRef<'_>> {
        self.node().first_element()
    }

    fn check(&self, id: NodeId) {
        debug_assert_eq!(
            id.document, self.id,
            "node {id:?} belongs to another document"
        );
    }

    fn data(&self, id: NodeId) -> &NodeData {
        self.check(id);
        &self.nodes[id.index]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.check(id);
        &mut self.nodes[id.index]
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId {
            document: self.id,
            index: self.nodes.len() - 1,
        }
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: impl Into<String>, attributes: Attributes) -> NodeId {
        self.push(NodeKind::Element {
            name: name.into(),
            attributes,
        })
    }

    /// Create a detached element and attach `children` to it, in order.
    pub fn create_element_with(
        &mut self,
        name: impl Into<String>,
        attributes: Attributes,
        children: impl IntoIterator<Item = NodeId>,
    ) -> NodeId {
        let element = self.create_element(name, attributes);
        for child in children {
            self.append_child(element, child);
        }
        element
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    /// Attach a detached node as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// If `child` already has a parent, is the document node, or if `parent`
    /// is a text node. In debug builds, also if either id comes from another
    /// document.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        assert!(
            !matches!(self.data(parent).kind, NodeKind::Text(_)),
            "cannot append under a text node"
        );
        assert!(child != self.root(), "cannot append the document node");
        assert!(
            self.data(child).parent.is_none(),
            "node {child:?} is already attached"
        );
        self.data_mut(child).parent = Some(parent);
        self.data_mut(parent).children.push(child);
    }

    /// Append character data to `parent`, merging with a trailing text child.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        if let Some(&last) = self.data(parent).children.last()
            && let NodeKind::Text(existing) = &mut self.data_mut(last).kind
        {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text);
        self.append_child(parent, node);
    }

    /// Create an element and attach it under `parent` in one step.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        attributes: Attributes,
    ) -> NodeId {
        let element = self.create_element(name, attributes);
        self.append_child(parent, element);
        element
    }

    /// Remove `node` from its parent. The node stays in the arena, detached,
    /// and may be attached again.
    pub fn detach(&mut self, node: NodeId) -> Result<(), TreeError> {
        let parent = self.data_mut(node).parent.take().ok_or(TreeError::NoParent)?;
        self.data_mut(parent).children.retain(|&c| c != node);
        Ok(())
    }
}

/// A borrowed view of one node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.doc.data(self.id).kind
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind(), NodeKind::Element { .. })
    }

    /// Element name; `None` for document and text nodes.
    pub fn name(&self) -> Option<&'a str> {
        match self.kind() {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Attributes of an element; empty for other kinds.
    pub fn attributes(&self) -> &'a Attributes {
        match self.kind() {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &NO_ATTRIBUTES,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes().get(name)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.doc.data(self.id).parent.map(|id| self.doc.get(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + use<'a> {
        let doc = self.doc;
        doc.data(self.id)
            .children
            .iter()
            .map(move |&id| doc.get(id))
    }

    /// Element children only.
    pub fn elements(&self) -> impl Iterator<Item = NodeRef<'a>> + use<'a> {
        self.children().filter(|n| n.is_element())
    }

    pub fn first_element(&self) -> Option<NodeRef<'a>> {
        self.elements().next()
    }

    /// All character data below this node, concatenated as written.
    pub fn whole_text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        match self.kind() {
            NodeKind::Text(t) => out.push_str(t),
            _ => self.children().for_each(|c| c.collect_text(out)),
        }
    }

    /// Character data below this node with whitespace runs collapsed to one
    /// space and the ends trimmed.
    pub fn text(&self) -> String {
        self.whole_text()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First element named `name` in this subtree, this node included,
    /// in document order.
    pub fn find(&self, name: &str) -> Option<NodeRef<'a>> {
        if self.name() == Some(name) {
            return Some(*self);
        }
        self.elements().find_map(|c| c.find(name))
    }

    /// Follow a chain of direct element children by name.
    pub fn path(&self, names: &[&str]) -> Result<NodeRef<'a>, TreeError> {
        let mut current = *self;
        for &name in names {
            current = current
                .elements()
                .find(|c| c.name() == Some(name))
                .ok_or_else(|| TreeError::MissingElement(name.to_string()))?;
        }
        Ok(current)
    }

    /// Replay this subtree as parse events.
    ///
    /// A document node yields the document bounds and its declaration; text
    /// directly under the document node is skipped.
    pub fn visit<S: EventSink + ?Sized>(&self, sink: &mut S) -> Result<(), ComponentError> {
        match self.kind() {
            NodeKind::Document => {
                sink.start_document()?;
                if let Some(declaration) = &self.doc.declaration {
                    sink.declaration(declaration)?;
                }
                for child in self.elements() {
                    child.visit(sink)?;
                }
                sink.end_document()
            }
            NodeKind::Element { name, attributes } => {
                sink.start_element(name, attributes)?;
                for child in self.children() {
                    child.visit(sink)?;
                }
                sink.end_element(name)
            }
            NodeKind::Text(text) => sink.characters(text),
        }
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Document => f
                .debug_list()
                .entries(self.children())
                .finish(),
            NodeKind::Element { name, attributes } => {
                write!(f, "<{name}")?;
                for (key, value) in attributes.iter() {
                    write!(f, " {key}={value:?}")?;
                }
                write!(f, ">")?;
                f.debug_list().entries(self.children()).finish()
            }
            NodeKind::Text(text) => write!(f, "{text:?}"),
        }
    }
}

/// An [`EventSink`] that materializes the events it receives into a new
/// [`Document`].
pub struct TreeSink {
    document: Document,
    open: Vec<NodeId>,
}

impl Default for TreeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSink {
    pub fn new() -> Self {
        let document = Document::new();
        let root = document.root();
        Self {
            document,
            open: vec![root],
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.document.root())
    }

    pub fn finish(self) -> Result<Document, ComponentError> {
        if self.open.len() > 1 {
            return Err(ComponentError::Malformed(format!(
                "{} element(s) left open",
                self.open.len() - 1
            )));
        }
        Ok(self.document)
    }
}

impl EventSink for TreeSink {
    fn declaration(&mut self, declaration: &Declaration) -> Result<(), ComponentError> {
        self.document.set_declaration(Some(declaration.clone()));
        Ok(())
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), ComponentError> {
        let parent = self.current();
        let element = self
            .document
            .append_element(parent, name, attributes.clone());
        self.open.push(element);
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<(), ComponentError> {
        let parent = self.current();
        self.document.append_text(parent, text);
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<(), ComponentError> {
        if self.open.len() <= 1 {
            return Err(ComponentError::Malformed(format!(
                "end tag </{name}> without a start tag"
            )));
        }
        self.open.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.append_element(root, "div", Attributes::from([("foo", "bar")]));
        let span = doc.append_element(div, "span", Attributes::new());
        doc.append_text(span, "hello ");
        doc.append_text(span, " world");
        (doc, div, span)
    }

    // =========================================================================
    // Construction
    // =========================================================================

    #[test]
    fn new_document_is_empty() {
        let doc = Document::new();
        let root = doc.node();
        assert!(root.attributes().is_empty());
        assert_eq!(root.children().count(), 0);
        assert!(root.first_element().is_none());
        assert_eq!(root.name(), None);
    }

    #[test]
    fn create_element_with_children() {
        let mut doc = Document::new();
        let child = doc.create_element("span", Attributes::new());
        let div = doc.create_element_with("div", Attributes::from([("foo", "bar")]), [child]);
        let root = doc.root();
        doc.append_child(root, div);

        let div = doc.first_element().unwrap();
        assert_eq!(div.name(), Some("div"));
        assert_eq!(div.attribute("foo"), Some("bar"));
        assert_eq!(div.first_element().unwrap().name(), Some("span"));
        assert_eq!(div.first_element().unwrap().parent().unwrap().id(), div.id());
    }

    #[test]
    fn append_text_merges_adjacent_text() {
        let (doc, _, span) = sample();
        let span = doc.get(span);
        assert_eq!(span.children().count(), 1);
        assert_eq!(span.whole_text(), "hello  world");
        assert_eq!(span.text(), "hello world");
    }

    #[test]
    #[should_panic(expected = "already attached")]
    fn append_attached_node_panics() {
        let (mut doc, div, span) = sample();
        doc.append_child(doc.root(), span);
        let _ = div;
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    #[test]
    fn find_searches_whole_subtree() {
        let (doc, div, span) = sample();
        assert_eq!(doc.node().find("span").unwrap().id(), span);
        assert_eq!(doc.node().find("div").unwrap().id(), div);
        assert!(doc.node().find("table").is_none());
    }

    #[test]
    fn path_follows_direct_children() {
        let (doc, _, span) = sample();
        assert_eq!(doc.node().path(&["div", "span"]).unwrap().id(), span);
        assert_eq!(
            doc.node().path(&["span"]).unwrap_err(),
            TreeError::MissingElement("span".into())
        );
    }

    #[test]
    fn detach_removes_from_parent() {
        let (mut doc, div, span) = sample();
        doc.detach(span).unwrap();
        assert_eq!(doc.get(div).children().count(), 0);
        assert_eq!(doc.detach(span), Err(TreeError::NoParent));
        assert_eq!(doc.detach(doc.root()), Err(TreeError::NoParent));
        // a detached node can be attached elsewhere
        doc.append_child(doc.root(), span);
        assert_eq!(doc.node().elements().count(), 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "belongs to another document")]
    fn append_node_from_another_document_panics() {
        let (mut doc, div, _) = sample();
        let mut other = Document::new();
        let stranger = other.create_element("p", Attributes::new());
        doc.append_child(div, stranger);
    }

    #[test]
    fn cloned_document_accepts_original_ids() {
        let (doc, div, span) = sample();
        let mut copy = doc.clone();
        copy.detach(span).unwrap();
        assert_eq!(copy.get(div).children().count(), 0);
        assert_eq!(doc.get(div).children().count(), 1);
    }

    // =========================================================================
    // Events
    // =========================================================================

    #[test]
    fn visit_into_tree_sink_rebuilds_tree() {
        let (mut doc, _, _) = sample();
        doc.set_declaration(Some(Declaration {
            version: "1.0".into(),
            encoding: Some("UTF-8".into()),
        }));
        let mut sink = TreeSink::new();
        doc.node().visit(&mut sink).unwrap();
        let copy = sink.finish().unwrap();
        assert_eq!(copy.declaration(), doc.declaration());
        assert_eq!(format!("{:?}", copy.node()), format!("{:?}", doc.node()));
    }

    #[test]
    fn tree_sink_rejects_unbalanced_events() {
        let mut sink = TreeSink::new();
        assert!(sink.end_element("div").is_err());

        let mut sink = TreeSink::new();
        sink.start_element("div", &Attributes::new()).unwrap();
        assert!(sink.finish().is_err());
    }
}
