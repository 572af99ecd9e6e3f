//! Markup components: parse, expand, and serialize.
//!
//! | Piece | Type |
//! |---|---|
//! | **Tree model** | [`Document`], [`NodeRef`] |
//! | **Event stream** | [`EventSink`] |
//! | **Components** | [`Component`], [`Style`] |
//! | **Builder** | [`Builder`] |
//! | **Engine** | [`Rewriter`] |
//! | **I/O** | [`xml::parse`], [`xml::transform`], [`xml::render`] |
//!
//! Raw tokenizing is delegated to `quick-xml`; everything above the token
//! level (tree, expansion, validation, serialization) lives here.

pub mod attributes;
pub mod builder;
pub mod node;
pub mod rewrite;
pub mod serialize;
pub mod sink;
pub mod style;
pub mod validate;
pub mod xml;

pub use attributes::Attributes;
pub use builder::Builder;
pub use node::{Declaration, Document, NodeId, NodeKind, NodeRef, TreeError, TreeSink};
pub use rewrite::Rewriter;
pub use sink::EventSink;
pub use style::{Component, Rename, Style, component, discard, identity, ignore};
pub use xml::OutputKind;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("Malformed markup: {0}")]
    Malformed(String),
    #[error("Component usage error: {0}")]
    Usage(String),
    #[error("Element <{0}> is not allowed in HTML output")]
    InvalidElement(String),
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}
