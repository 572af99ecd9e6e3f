//! The node builder protocol.
//!
//! A [`Builder`] is handed to a component for its single invocation and
//! describes what the matched element becomes. It comes in three scopes:
//!
//! | Scope | Given to | Decisions |
//! |-------|----------|-----------|
//! | component | `Component::render` | one of `emit`, `collect`, `fragment`, `hide`, `around` |
//! | children | the children callback of a component-level `emit` | `around` over the new tag |
//! | content | every other callback | none; plain content only |
//!
//! Content written through any builder is fed back through the engine, so
//! emitted tags are themselves expanded by the active style.

use super::ComponentError;
use super::attributes::Attributes;
use super::node::{NodeKind, NodeRef};
use super::rewrite::{Action, Capture, Engine};
use super::xml;

/// Deferred output for [`Builder::collect`], run at the matching close tag.
pub type CollectFn = Box<dyn FnOnce(NodeRef<'_>, &mut Builder<'_>) -> Result<(), ComponentError>>;

/// Deferred output for [`Builder::around`], run after the original children.
pub type ContentFn = Box<dyn FnOnce(&mut Builder<'_>) -> Result<(), ComponentError>>;

#[derive(Debug, Clone, Copy)]
enum Scope {
    Component { frame: usize },
    Children { frame: usize },
    Content,
}

pub struct Builder<'e> {
    engine: &'e mut dyn Engine,
    scope: Scope,
}

impl<'e> Builder<'e> {
    pub(crate) fn component(engine: &'e mut dyn Engine, frame: usize) -> Self {
        Self {
            engine,
            scope: Scope::Component { frame },
        }
    }

    pub(crate) fn content(engine: &'e mut dyn Engine) -> Self {
        Self {
            engine,
            scope: Scope::Content,
        }
    }

    fn nested(&mut self, scope: Scope) -> Builder<'_> {
        Builder {
            engine: &mut *self.engine,
            scope,
        }
    }

    /// The component frame, checked to still be undecided.
    fn undecided(&mut self, operation: &str) -> Result<usize, ComponentError> {
        let Scope::Component { frame } = self.scope else {
            return Err(usage(operation, "only a component can decide its element"));
        };
        match self.engine.frames().get(frame) {
            Some(Action::Ignore { .. }) => Ok(frame),
            Some(_) => Err(usage(operation, "the element was already decided")),
            None => Err(ComponentError::Malformed(format!(
                "{operation}: component frame {frame} is gone"
            ))),
        }
    }

    /// Replace the element by `name`. Shorthand for [`Builder::emit_with`]
    /// with no extra children.
    pub fn emit(&mut self, name: &str, attributes: Attributes) -> Result<(), ComponentError> {
        self.emit_with(name, attributes, |_| Ok(()))
    }

    /// Produce one `name` element.
    ///
    /// From a component, the new tag replaces the matched one: `children`
    /// writes content first, then the original children are expanded under
    /// the new tag. Elsewhere, `children` is the whole content of a new
    /// element, which is itself looked up in the style.
    pub fn emit_with<F>(
        &mut self,
        name: &str,
        attributes: Attributes,
        children: F,
    ) -> Result<(), ComponentError>
    where
        F: FnOnce(&mut Builder<'_>) -> Result<(), ComponentError>,
    {
        match self.scope {
            Scope::Component { .. } => {
                let frame = self.undecided("emit")?;
                self.engine.emit_start(name, &attributes)?;
                self.engine.frames()[frame] = Action::Replace {
                    name: name.to_string(),
                };
                children(&mut self.nested(Scope::Children { frame }))
            }
            Scope::Children { .. } | Scope::Content => {
                self.engine.start_element(name, &attributes)?;
                children(&mut self.nested(Scope::Content))?;
                self.engine.end_element(name)
            }
        }
    }

    /// Character data at this point.
    pub fn text(&mut self, text: &str) -> Result<(), ComponentError> {
        self.content_op(|b| b.engine.characters(text))
    }

    /// Parse `markup` and expand it at this point.
    pub fn include_markup(&mut self, markup: &str) -> Result<(), ComponentError> {
        let document = xml::parse(markup)?;
        self.include(document.node())
    }

    /// Expand an already parsed node at this point. A document node
    /// contributes its children.
    pub fn include(&mut self, node: NodeRef<'_>) -> Result<(), ComponentError> {
        self.content_op(|b| match node.kind() {
            NodeKind::Document => node
                .children()
                .try_for_each(|child| child.visit(&mut *b.engine)),
            _ => node.visit(&mut *b.engine),
        })
    }

    /// Capture the element's subtree into a new document, then call `then`
    /// with it at the close tag. The original subtree is not emitted.
    pub fn collect<F>(&mut self, then: F) -> Result<(), ComponentError>
    where
        F: FnOnce(NodeRef<'_>, &mut Builder<'_>) -> Result<(), ComponentError> + 'static,
    {
        let frame = self.undecided("collect")?;
        let frames = self.engine.frames();
        let Action::Ignore { name, attributes } = std::mem::replace(&mut frames[frame], Action::Hide)
        else {
            return Err(usage("collect", "the element was already decided"));
        };
        let capture = Capture::new(name, attributes, Box::new(then));
        frames[frame] = Action::Collect {
            node: capture.node(),
            capture: Some(Box::new(capture)),
        };
        Ok(())
    }

    /// Replace the element by whatever `f` writes, possibly several siblings.
    /// The original subtree is dropped.
    pub fn fragment<F>(&mut self, f: F) -> Result<(), ComponentError>
    where
        F: FnOnce(&mut Builder<'_>) -> Result<(), ComponentError>,
    {
        match self.scope {
            Scope::Component { .. } => {
                let frame = self.undecided("fragment")?;
                self.engine.frames()[frame] = Action::Hide;
                spliced(&mut *self.engine, f)
            }
            Scope::Children { .. } | Scope::Content => f(&mut self.nested(Scope::Content)),
        }
    }

    /// Drop the element and its whole subtree.
    pub fn hide(&mut self) -> Result<(), ComponentError> {
        let frame = self.undecided("hide")?;
        self.engine.frames()[frame] = Action::Hide;
        Ok(())
    }

    /// Keep the original children, with `pre` written before them and `post`
    /// after them.
    ///
    /// From a component the matched tags are dropped. From the children
    /// callback of a component-level `emit`, the wrap happens inside the new
    /// tag.
    pub fn around<P, Q>(&mut self, pre: P, post: Q) -> Result<(), ComponentError>
    where
        P: FnOnce(&mut Builder<'_>) -> Result<(), ComponentError>,
        Q: FnOnce(&mut Builder<'_>) -> Result<(), ComponentError> + 'static,
    {
        let post: ContentFn = Box::new(post);
        match self.scope {
            Scope::Component { .. } => {
                let frame = self.undecided("around")?;
                self.engine.frames()[frame] = Action::Around { post, name: None };
                spliced(&mut *self.engine, pre)
            }
            Scope::Children { frame } => {
                let frames = self.engine.frames();
                let name = match frames.get_mut(frame) {
                    Some(Action::Replace { name }) => std::mem::take(name),
                    _ => return Err(usage("around", "the new element is already wrapped")),
                };
                frames[frame] = Action::Around {
                    post,
                    name: Some(name),
                };
                pre(&mut self.nested(Scope::Content))
            }
            Scope::Content => Err(usage("around", "no element to wrap here")),
        }
    }

    fn content_op<F>(&mut self, f: F) -> Result<(), ComponentError>
    where
        F: FnOnce(&mut Builder<'_>) -> Result<(), ComponentError>,
    {
        match self.scope {
            Scope::Component { .. } => spliced(&mut *self.engine, f),
            Scope::Children { .. } | Scope::Content => f(self),
        }
    }
}

/// Run `f` with content passing through at the current level, regardless of
/// the frame on top of the stack.
pub(crate) fn spliced<F>(engine: &mut dyn Engine, f: F) -> Result<(), ComponentError>
where
    F: FnOnce(&mut Builder<'_>) -> Result<(), ComponentError>,
{
    engine.frames().push(Action::Splice);
    let depth = engine.frames().len();
    let result = f(&mut Builder::content(&mut *engine));
    debug_assert_eq!(engine.frames().len(), depth, "unbalanced frames in splice");
    match engine.frames().pop() {
        Some(Action::Splice) => result,
        _ => Err(ComponentError::Malformed(
            "splice frame lost during expansion".into(),
        )),
    }
}

fn usage(operation: &str, reason: &str) -> ComponentError {
    ComponentError::Usage(format!("{operation}: {reason}"))
}
