//! The rewrite engine.
//!
//! [`Rewriter`] sits between an event producer (a parser or a tree visit)
//! and a downstream [`EventSink`]. Every start tag pushes one [`Action`]
//! describing what happens to that element; the matching end tag pops and
//! resolves it. Components write through a [`Builder`], whose content
//! re-enters the same engine, so tags produced by a component are expanded
//! too.
//!
//! ```text
//! <section title="A"><paragraph>x</paragraph></section>
//!
//!   start section   lookup → component → Ignore → emit("div") → Replace(div)
//!                   children callback: start h2 … end h2   (expanded)
//!   start paragraph lookup → component → Replace(div)
//!   text "x"        top is Replace → pass through
//!   end paragraph   pop Replace(div) → </div>
//!   end section     pop Replace(div) → </div>
//! ```
//!
//! Besides one frame per open source tag, builders push a transient
//! `Splice` frame while a component writes content in place of its
//! element; splices are always popped before the builder call returns.

use super::ComponentError;
use super::attributes::Attributes;
use super::builder::{Builder, CollectFn, ContentFn, spliced};
use super::node::{Declaration, Document, NodeId};
use super::sink::EventSink;
use super::style::Style;

/// What happens to one open element.
pub(crate) enum Action {
    /// Unmatched: tags and content pass through.
    Emit,
    /// Builder content written in place of a component's element.
    Splice,
    /// Suppressed with its whole subtree.
    Hide,
    /// Matched, and the component did not decide: the tags and own text are
    /// dropped, descendants are still expanded.
    Ignore { name: String, attributes: Attributes },
    /// Start tag replaced by `name`; children are expanded under it.
    Replace { name: String },
    /// Subtree being captured. Only the outermost frame of a capture owns
    /// the document and the continuation.
    Collect {
        node: NodeId,
        capture: Option<Box<Capture>>,
    },
    /// Children expanded as-is, then `post` runs before the close tag of
    /// `name`, if any.
    Around { post: ContentFn, name: Option<String> },
}

impl Action {
    fn label(&self) -> &'static str {
        match self {
            Action::Emit => "emit",
            Action::Splice => "splice",
            Action::Hide => "hide",
            Action::Ignore { .. } => "ignore",
            Action::Replace { .. } => "replace",
            Action::Collect { .. } => "collect",
            Action::Around { .. } => "around",
        }
    }
}

/// A captured subtree and what to do with it.
pub(crate) struct Capture {
    document: Document,
    node: NodeId,
    then: CollectFn,
}

impl Capture {
    pub(crate) fn new(name: String, attributes: Attributes, then: CollectFn) -> Self {
        let mut document = Document::new();
        let root = document.root();
        let node = document.append_element(root, name, attributes);
        Self {
            document,
            node,
            then,
        }
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }
}

/// The interface builders drive. Processed events go through
/// [`EventSink`]; `emit_*` bypass the style and write downstream directly.
pub(crate) trait Engine: EventSink {
    fn frames(&mut self) -> &mut Vec<Action>;

    fn emit_start(&mut self, name: &str, attributes: &Attributes) -> Result<(), ComponentError>;
}

/// Expands `style` over the events it receives and forwards the result to
/// `sink`.
pub struct Rewriter<'a, S: EventSink + ?Sized> {
    style: &'a Style,
    sink: &'a mut S,
    stack: Vec<Action>,
}

impl<'a, S: EventSink + ?Sized> Rewriter<'a, S> {
    pub fn new(style: &'a Style, sink: &'a mut S) -> Self {
        Self {
            style,
            sink,
            stack: Vec::new(),
        }
    }

    /// Number of frames currently open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The document receiving the capture in progress.
    fn capture_document(&mut self) -> Result<&mut Document, ComponentError> {
        self.stack
            .iter_mut()
            .rev()
            .find_map(|action| match action {
                Action::Collect {
                    capture: Some(capture),
                    ..
                } => Some(&mut capture.document),
                _ => None,
            })
            .ok_or_else(|| ComponentError::Malformed("capture frame without a document".into()))
    }
}

impl<S: EventSink + ?Sized> Engine for Rewriter<'_, S> {
    fn frames(&mut self) -> &mut Vec<Action> {
        &mut self.stack
    }

    fn emit_start(&mut self, name: &str, attributes: &Attributes) -> Result<(), ComponentError> {
        self.sink.start_element(name, attributes)
    }
}

impl<S: EventSink + ?Sized> EventSink for Rewriter<'_, S> {
    fn declaration(&mut self, declaration: &Declaration) -> Result<(), ComponentError> {
        self.sink.declaration(declaration)
    }

    fn start_document(&mut self) -> Result<(), ComponentError> {
        self.sink.start_document()
    }

    fn end_document(&mut self) -> Result<(), ComponentError> {
        if let Some(action) = self.stack.last() {
            return Err(ComponentError::Malformed(format!(
                "document ended with {} open frame(s), top is {}",
                self.stack.len(),
                action.label()
            )));
        }
        self.sink.end_document()
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), ComponentError> {
        match self.stack.last() {
            Some(Action::Hide) => {
                self.stack.push(Action::Hide);
                return Ok(());
            }
            Some(Action::Collect { node, .. }) => {
                let parent = *node;
                let child = self
                    .capture_document()?
                    .append_element(parent, name, attributes.clone());
                self.stack.push(Action::Collect {
                    node: child,
                    capture: None,
                });
                return Ok(());
            }
            _ => {}
        }

        let style = self.style;
        match style.lookup(name) {
            Some(component) => {
                tracing::trace!(element = name, attributes = %attributes, "expanding component");
                self.stack.push(Action::Ignore {
                    name: name.to_string(),
                    attributes: attributes.clone(),
                });
                let frame = self.stack.len() - 1;
                component.render(name, attributes, &mut Builder::component(self, frame))?;
                debug_assert_eq!(self.stack.len(), frame + 1, "component left frames open");
                Ok(())
            }
            None => {
                self.stack.push(Action::Emit);
                self.sink.start_element(name, attributes)
            }
        }
    }

    fn characters(&mut self, text: &str) -> Result<(), ComponentError> {
        match self.stack.last() {
            None
            | Some(Action::Emit)
            | Some(Action::Splice)
            | Some(Action::Replace { .. })
            | Some(Action::Around { .. }) => self.sink.characters(text),
            Some(Action::Hide) | Some(Action::Ignore { .. }) => Ok(()),
            Some(Action::Collect { node, .. }) => {
                let node = *node;
                self.capture_document()?.append_text(node, text);
                Ok(())
            }
        }
    }

    fn end_element(&mut self, name: &str) -> Result<(), ComponentError> {
        let action = self.stack.pop().ok_or_else(|| {
            ComponentError::Malformed(format!("end tag </{name}> without an open element"))
        })?;
        match action {
            Action::Emit => self.sink.end_element(name),
            Action::Hide | Action::Ignore { .. } => Ok(()),
            Action::Replace { name } => self.sink.end_element(&name),
            Action::Collect { capture: None, .. } => Ok(()),
            Action::Collect {
                capture: Some(capture),
                ..
            } => {
                let Capture {
                    document,
                    node,
                    then,
                } = *capture;
                spliced(self, |b| then(document.get(node), b))
            }
            Action::Around { post, name } => {
                spliced(self, post)?;
                match name {
                    Some(name) => self.sink.end_element(&name),
                    None => Ok(()),
                }
            }
            Action::Splice => Err(ComponentError::Malformed(format!(
                "end tag </{name}> closed a builder splice"
            ))),
        }
    }
}
