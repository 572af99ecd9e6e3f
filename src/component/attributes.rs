//! Ordered attribute maps.
//!
//! Attribute order is part of the output: a tag passes through the engine
//! with its attributes in source order, and components list theirs in the
//! order they want them written.

use std::fmt;

/// An ordered `name → value` map with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of `name`, or `default` when absent.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    /// Set `name` to `value`. An existing entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Attributes {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl fmt::Display for Attributes {
    /// `{a=1, b=2}`, used in debug logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_first_position() {
        let mut attrs = Attributes::from([("a", "1"), ("b", "2")]);
        attrs.insert("a", "3");
        let pairs: Vec<_> = attrs.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn from_iter_deduplicates() {
        let attrs: Attributes = vec![("x", "1"), ("x", "2")].into_iter().collect();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("x"), Some("2"));
    }

    #[test]
    fn get_or_falls_back() {
        let attrs = Attributes::from([("title", "Intro")]);
        assert_eq!(attrs.get_or("title", ""), "Intro");
        assert_eq!(attrs.get_or("width", "100%"), "100%");
    }

    #[test]
    fn remove_returns_value() {
        let mut attrs = Attributes::from([("a", "1"), ("b", "2")]);
        assert_eq!(attrs.remove("a").as_deref(), Some("1"));
        assert_eq!(attrs.remove("a"), None);
        assert!(!attrs.contains_key("a"));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn display_lists_pairs_in_order() {
        let attrs = Attributes::from([("b", "2"), ("a", "1")]);
        assert_eq!(attrs.to_string(), "{b=2, a=1}");
        assert_eq!(Attributes::new().to_string(), "{}");
    }
}
