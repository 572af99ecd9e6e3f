//! The parse-event vocabulary shared by readers, the rewrite engine, and
//! writers.

use super::ComponentError;
use super::attributes::Attributes;
use super::node::Declaration;

/// Receiver of a stream of markup events.
///
/// Start and end events are balanced by every producer in this crate.
/// Document bounds and the declaration are optional and default to no-ops.
pub trait EventSink {
    fn declaration(&mut self, _declaration: &Declaration) -> Result<(), ComponentError> {
        Ok(())
    }

    fn start_document(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), ComponentError>;

    fn characters(&mut self, text: &str) -> Result<(), ComponentError>;

    fn end_element(&mut self, name: &str) -> Result<(), ComponentError>;
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn declaration(&mut self, declaration: &Declaration) -> Result<(), ComponentError> {
        (**self).declaration(declaration)
    }

    fn start_document(&mut self) -> Result<(), ComponentError> {
        (**self).start_document()
    }

    fn end_document(&mut self) -> Result<(), ComponentError> {
        (**self).end_document()
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<(), ComponentError> {
        (**self).start_element(name, attributes)
    }

    fn characters(&mut self, text: &str) -> Result<(), ComponentError> {
        (**self).characters(text)
    }

    fn end_element(&mut self, name: &str) -> Result<(), ComponentError> {
        (**self).end_element(name)
    }
}
