//! Components and the style registry.
//!
//! A [`Component`] decides what one matched element becomes by driving a
//! [`Builder`]. A [`Style`] maps element names to components; styles compose
//! as an ordered list of rules evaluated until one matches, so a composed
//! style is still a pure function of the element name.
//!
//! ```text
//! Style::union([answers, file, body, decoration])
//!     lookup("bold") → answers? no → file? no → body? no → decoration: rename to "b"
//! ```

use super::ComponentError;
use super::attributes::Attributes;
use super::builder::Builder;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Rewrites one matched element.
///
/// Invoked exactly once per matched start tag with the element's name and
/// attributes. A component that never calls the builder drops the element's
/// tags and its own text; its descendants are still expanded.
pub trait Component: Send + Sync {
    fn render(
        &self,
        name: &str,
        attributes: &Attributes,
        builder: &mut Builder<'_>,
    ) -> Result<(), ComponentError>;
}

impl<F> Component for F
where
    F: Fn(&str, &Attributes, &mut Builder<'_>) -> Result<(), ComponentError> + Send + Sync,
{
    fn render(
        &self,
        name: &str,
        attributes: &Attributes,
        builder: &mut Builder<'_>,
    ) -> Result<(), ComponentError> {
        self(name, attributes, builder)
    }
}

/// Wrap a closure as a shareable component.
pub fn component<F>(f: F) -> Arc<dyn Component>
where
    F: Fn(&str, &Attributes, &mut Builder<'_>) -> Result<(), ComponentError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Re-emits the element unchanged: same name, same attributes, original
/// children expanded in place.
pub fn identity() -> Arc<dyn Component> {
    component(|name, attributes, b| b.emit(name, attributes.clone()))
}

/// Decides nothing: the element's tags and own text vanish, its descendants
/// are still expanded.
pub fn ignore() -> Arc<dyn Component> {
    component(|_, _, _| Ok(()))
}

/// Drops the element and its whole subtree.
pub fn discard() -> Arc<dyn Component> {
    component(|_, _, b| b.hide())
}

/// Renames the element, keeping its attributes and children.
#[derive(Debug, Clone)]
pub struct Rename {
    pub to: String,
}

impl Component for Rename {
    fn render(
        &self,
        _name: &str,
        attributes: &Attributes,
        builder: &mut Builder<'_>,
    ) -> Result<(), ComponentError> {
        builder.emit(&self.to, attributes.clone())
    }
}

#[derive(Clone)]
enum Rule {
    Table(Arc<HashMap<String, Arc<dyn Component>>>),
    Always(Arc<dyn Component>),
}

/// Immutable `name → component` lookup.
///
/// Cloning is cheap; tables are shared.
#[derive(Clone, Default)]
pub struct Style {
    rules: Vec<Rule>,
}

impl Style {
    /// A style that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn exact(name: impl Into<String>, component: Arc<dyn Component>) -> Self {
        Self::from_table([(name.into(), component)])
    }

    /// Several names sharing one component.
    pub fn names(names: &[&str], component: Arc<dyn Component>) -> Self {
        Self::from_table(names.iter().map(|n| (n.to_string(), Arc::clone(&component))))
    }

    pub fn from_table<K: Into<String>>(
        table: impl IntoIterator<Item = (K, Arc<dyn Component>)>,
    ) -> Self {
        let table: HashMap<String, Arc<dyn Component>> =
            table.into_iter().map(|(k, c)| (k.into(), c)).collect();
        Self {
            rules: vec![Rule::Table(Arc::new(table))],
        }
    }

    /// Matches every name.
    pub fn always(component: Arc<dyn Component>) -> Self {
        Self {
            rules: vec![Rule::Always(component)],
        }
    }

    /// `[(from, to), ...]`: each `from` element is re-emitted as `to`.
    pub fn rename(pairs: &[(&str, &str)]) -> Self {
        Self::from_table(pairs.iter().map(|&(from, to)| {
            let rename: Arc<dyn Component> = Arc::new(Rename { to: to.to_string() });
            (from.to_string(), rename)
        }))
    }

    /// First match wins, left to right.
    pub fn union(styles: impl IntoIterator<Item = Style>) -> Self {
        Self {
            rules: styles.into_iter().flat_map(|s| s.rules).collect(),
        }
    }

    /// Unwrap every element this style does not match, so only matched
    /// elements reach the output.
    pub fn or_discard(self) -> Self {
        Self::union([self, Self::always(ignore())])
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn Component> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::Table(table) => table.get(name).map(|c| c.as_ref()),
            Rule::Always(c) => Some(c.as_ref()),
        })
    }
}

impl fmt::Debug for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for rule in &self.rules {
            match rule {
                Rule::Table(table) => {
                    let mut names: Vec<&str> = table.keys().map(String::as_str).collect();
                    names.sort_unstable();
                    list.entry(&names);
                }
                Rule::Always(_) => {
                    list.entry(&"*");
                }
            }
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::xml::{OutputKind, transform_markup_to_string};
    use pretty_assertions::assert_eq;

    fn text_component(text: &'static str) -> Arc<dyn Component> {
        component(move |_, _, b| b.text(text))
    }

    fn render(markup: &str, style: &Style) -> String {
        transform_markup_to_string(markup, style, OutputKind::Xml).unwrap()
    }

    #[test]
    fn empty_style_matches_nothing() {
        assert!(Style::empty().lookup("foo").is_none());
    }

    #[test]
    fn union_first_match_wins() {
        let style = Style::union([
            Style::exact("foo", text_component("first")),
            Style::exact("foo", text_component("second")),
            Style::exact("bar", text_component("bar")),
        ]);
        assert_eq!(render("<foo/>", &style), "first");
        assert_eq!(render("<bar/>", &style), "bar");
        assert!(style.lookup("baz").is_none());
    }

    #[test]
    fn names_share_one_component() {
        let style = Style::names(&["leader", "member"], text_component("person"));
        assert!(style.lookup("leader").is_some());
        assert!(style.lookup("member").is_some());
        assert!(style.lookup("team").is_none());
    }

    #[test]
    fn always_matches_any_name() {
        let style = Style::always(identity());
        assert!(style.lookup("anything").is_some());
        assert_eq!(render(r#"<a x="1"><b>t</b></a>"#, &style), r#"<a x="1"><b>t</b></a>"#);
    }

    #[test]
    fn rename_keeps_attributes_and_children() {
        let style = Style::rename(&[("bold", "b"), ("link", "a")]);
        assert_eq!(
            render(r#"<bold><link href="x">go</link></bold>"#, &style),
            r#"<b><a href="x">go</a></b>"#
        );
    }

    #[test]
    fn or_discard_whitelists() {
        let style = Style::exact("keep", identity()).or_discard();
        assert_eq!(render("<keep>a<drop>b</drop></keep>", &style), "<keep>a</keep>");
        assert_eq!(
            render("<drop>x<keep>y</keep><drop><keep/></drop></drop>", &style),
            "<keep>y</keep><keep/>"
        );
    }

    #[test]
    fn discard_drops_known_descendants_too() {
        let style = Style::union([
            Style::exact("drop", discard()),
            Style::exact("keep", identity()),
        ]);
        assert_eq!(render("<r><drop><keep/></drop></r>", &style), "<r/>");
    }

    #[test]
    fn debug_lists_rules_in_order() {
        let style = Style::union([
            Style::rename(&[("b", "x"), ("a", "y")]),
            Style::always(identity()),
        ]);
        assert_eq!(format!("{style:?}"), r#"[["a", "b"], "*"]"#);
    }
}
