//! Path expressions
//!
//! An object-shaped subset of XPath: a list of segments, each naming an
//! axis, an optional name test, attribute filters, a text test and a
//! custom node predicate. There are no positional predicates and no boolean
//! operators besides the implicit AND across attribute filters.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Relationship between consecutive matched elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Axis {
    /// Exactly one level below the previous match (`/`)
    #[default]
    Child,
    /// Any depth below the previous match (`//`)
    SelfOrDescendant,
}

/// How a [`StringMatch`] compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MatchStrategy {
    Any,
    #[default]
    Exact,
    Contains,
    StartsWith,
    EndsWith,
}

/// A string test.
///
/// Deserializes from a plain string (exact match, `"*"` matches anything)
/// or from `{"matchStrategy": "CONTAINS", "value": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "StringMatchRepr"))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StringMatch {
    pub match_strategy: MatchStrategy,
    pub value: String,
}

impl StringMatch {
    pub fn new(match_strategy: MatchStrategy, value: impl Into<String>) -> Self {
        StringMatch {
            match_strategy,
            value: value.into(),
        }
    }

    pub fn any() -> Self {
        Self::new(MatchStrategy::Any, "")
    }

    pub fn exact(value: impl Into<String>) -> Self {
        Self::new(MatchStrategy::Exact, value)
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::new(MatchStrategy::Contains, value)
    }

    pub fn starts_with(value: impl Into<String>) -> Self {
        Self::new(MatchStrategy::StartsWith, value)
    }

    pub fn ends_with(value: impl Into<String>) -> Self {
        Self::new(MatchStrategy::EndsWith, value)
    }

    /// Name test: `*` is the wildcard, anything else an exact name
    pub fn name(value: &str) -> Self {
        if value == "*" {
            Self::any()
        } else {
            Self::exact(value)
        }
    }

    /// True for the wildcard, which never needs to look at its input
    #[inline]
    pub fn is_any(&self) -> bool {
        self.match_strategy == MatchStrategy::Any
    }

    #[inline]
    pub fn matches(&self, candidate: &str) -> bool {
        match self.match_strategy {
            MatchStrategy::Any => true,
            MatchStrategy::Exact => candidate == self.value,
            MatchStrategy::Contains => candidate.contains(self.value.as_str()),
            MatchStrategy::StartsWith => candidate.starts_with(self.value.as_str()),
            MatchStrategy::EndsWith => candidate.ends_with(self.value.as_str()),
        }
    }
}

impl From<&str> for StringMatch {
    fn from(value: &str) -> Self {
        StringMatch::name(value)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(untagged)]
enum StringMatchRepr {
    Plain(String),
    #[serde(rename_all = "camelCase")]
    Full {
        match_strategy: MatchStrategy,
        #[serde(default)]
        value: String,
    },
}

#[cfg(feature = "serde")]
impl From<StringMatchRepr> for StringMatch {
    fn from(repr: StringMatchRepr) -> Self {
        match repr {
            StringMatchRepr::Plain(value) => StringMatch::name(&value),
            StringMatchRepr::Full {
                match_strategy,
                value,
            } => StringMatch::new(match_strategy, value),
        }
    }
}

/// Matches when at least one attribute of the element satisfies every
/// test that is set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AttributeFilter {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub local: Option<StringMatch>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub prefix: Option<StringMatch>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub value: Option<StringMatch>,
}

impl AttributeFilter {
    /// Filter on the attribute's local name
    pub fn named(local: impl Into<StringMatch>) -> Self {
        AttributeFilter {
            local: Some(local.into()),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<StringMatch>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_value(mut self, value: StringMatch) -> Self {
        self.value = Some(value);
        self
    }

    pub fn matches(&self, prefix: &str, local: &str, value: &str) -> bool {
        self.local.as_ref().map_or(true, |m| m.matches(local))
            && self.prefix.as_ref().map_or(true, |m| m.matches(prefix))
            && self.value.as_ref().map_or(true, |m| m.matches(value))
    }
}

/// Attribute of an element as handed to a [`NodePredicate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAttribute<'a> {
    pub prefix: Cow<'a, str>,
    pub local: Cow<'a, str>,
    pub value: Cow<'a, str>,
}

impl NodeAttribute<'_> {
    pub fn into_owned(self) -> NodeAttribute<'static> {
        NodeAttribute {
            prefix: Cow::Owned(self.prefix.into_owned()),
            local: Cow::Owned(self.local.into_owned()),
            value: Cow::Owned(self.value.into_owned()),
        }
    }
}

/// Element seen by a [`NodePredicate`]: its name, every attribute of its
/// start tag and the first text under it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeSnapshot<'a> {
    pub prefix: Cow<'a, str>,
    pub local: Cow<'a, str>,
    pub attributes: Vec<NodeAttribute<'a>>,
    /// `None` when the element closed without any text inside
    pub text: Option<Cow<'a, str>>,
}

impl NodeSnapshot<'_> {
    /// Value of the first attribute with this local name
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.local == local)
            .map(|a| a.value.as_ref())
    }
}

/// Custom element test, run once the element's snapshot is complete
#[derive(Clone)]
pub struct NodePredicate(Arc<dyn Fn(&NodeSnapshot<'_>) -> bool + Send + Sync>);

impl NodePredicate {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&NodeSnapshot<'_>) -> bool + Send + Sync + 'static,
    {
        NodePredicate(Arc::new(predicate))
    }

    #[inline]
    pub fn test(&self, node: &NodeSnapshot<'_>) -> bool {
        (self.0)(node)
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl fmt::Debug for NodePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodePredicate").field(&self.addr()).finish()
    }
}

// Predicates compare by identity
impl PartialEq for NodePredicate {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for NodePredicate {}

impl Hash for NodePredicate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

/// One step of a path expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PathSegment {
    pub axis: Axis,
    /// Local name test, any name when absent
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub local: Option<StringMatch>,
    /// Prefix test, any prefix when absent
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub prefix: Option<StringMatch>,
    /// All filters must be satisfied
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub attributes: Vec<AttributeFilter>,
    /// Test on the first text under the element
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub text: Option<StringMatch>,
    /// Code-only test, not part of the serialized form
    #[cfg_attr(feature = "serde", serde(skip))]
    pub predicate: Option<NodePredicate>,
}

impl PathSegment {
    pub fn new(axis: Axis, local: impl Into<StringMatch>) -> Self {
        PathSegment {
            axis,
            local: Some(local.into()),
            ..Default::default()
        }
    }

    /// `/local`
    pub fn child(local: impl Into<StringMatch>) -> Self {
        Self::new(Axis::Child, local)
    }

    /// `//local`
    pub fn descendant(local: impl Into<StringMatch>) -> Self {
        Self::new(Axis::SelfOrDescendant, local)
    }

    pub fn with_prefix(mut self, prefix: impl Into<StringMatch>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_attribute(mut self, filter: AttributeFilter) -> Self {
        self.attributes.push(filter);
        self
    }

    pub fn with_text(mut self, text: StringMatch) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&NodeSnapshot<'_>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(NodePredicate::new(predicate));
        self
    }

    /// Name part of the test, decidable from the start tag alone
    #[inline]
    pub fn matches_name(&self, prefix: &str, local: &str) -> bool {
        self.local.as_ref().map_or(true, |m| m.matches(local))
            && self.prefix.as_ref().map_or(true, |m| m.matches(prefix))
    }
}

/// A complete path expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SelectPath {
    pub segments: Vec<PathSegment>,
}

impl SelectPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        SelectPath { segments }
    }

    #[inline]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromIterator<PathSegment> for SelectPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        SelectPath::new(iter.into_iter().collect())
    }
}

impl From<Vec<PathSegment>> for SelectPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        SelectPath::new(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_match_strategies() {
        assert!(StringMatch::any().matches("anything"));
        assert!(StringMatch::exact("book").matches("book"));
        assert!(!StringMatch::exact("book").matches("books"));
        assert!(StringMatch::contains("Potter").matches("Harry Potter"));
        assert!(StringMatch::starts_with("Harry").matches("Harry Potter"));
        assert!(StringMatch::ends_with("Potter").matches("Harry Potter"));
        assert!(!StringMatch::ends_with("Harry").matches("Harry Potter"));
        assert_eq!(StringMatch::from("*"), StringMatch::any());
    }

    #[test]
    fn test_attribute_filter() {
        let filter = AttributeFilter::named("category").with_value(StringMatch::exact("WEB"));
        assert!(filter.matches("", "category", "WEB"));
        assert!(!filter.matches("", "category", "COOKING"));
        assert!(!filter.matches("", "lang", "WEB"));

        let any_value = AttributeFilter::named("lang");
        assert!(any_value.matches("xml", "lang", "en"));
        assert!(!any_value.clone().with_prefix("x").matches("xml", "lang", "en"));
    }

    #[test]
    fn test_segment_name_test() {
        let segment = PathSegment::descendant("node").with_prefix("test");
        assert!(segment.matches_name("test", "node"));
        assert!(!segment.matches_name("", "node"));

        let any_prefix = PathSegment::child("node");
        assert!(any_prefix.matches_name("test", "node"));
        assert!(any_prefix.matches_name("", "node"));
        assert!(PathSegment::child("*").matches_name("p", "whatever"));
    }

    #[test]
    fn test_node_predicate_identity() {
        let segment = PathSegment::child("a").with_predicate(|node| node.attribute("id").is_some());
        let copy = segment.clone();
        assert_eq!(segment, copy);
        assert_ne!(
            segment,
            PathSegment::child("a").with_predicate(|node| node.attribute("id").is_some())
        );

        let node = NodeSnapshot {
            local: "a".into(),
            attributes: vec![NodeAttribute {
                prefix: "".into(),
                local: "id".into(),
                value: "7".into(),
            }],
            ..Default::default()
        };
        assert!(copy.predicate.as_ref().is_some_and(|p| p.test(&node)));
        assert_eq!(node.attribute("id"), Some("7"));
        assert_eq!(node.attribute("x"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_path() {
        let json = r#"[
            {"axis": "child", "local": "bookstore"},
            {
                "axis": "self-or-descendant",
                "local": "book",
                "attributes": [{"local": "category", "value": "WEB"}]
            },
            {"local": "*", "text": {"matchStrategy": "CONTAINS", "value": "XML"}}
        ]"#;
        let path: SelectPath = serde_json::from_str(json).unwrap();
        assert_eq!(
            path,
            SelectPath::new(vec![
                PathSegment::child("bookstore"),
                PathSegment::descendant("book").with_attribute(
                    AttributeFilter::named("category").with_value(StringMatch::exact("WEB"))
                ),
                PathSegment::child("*").with_text(StringMatch::contains("XML")),
            ])
        );
    }
}
