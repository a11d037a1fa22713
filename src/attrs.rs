//! Operator attribute values.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// The kind of value an attribute holds.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Int,
    Float,
    String,
    Ints,
    Floats,
    Strings,
    Graph,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Ints => "ints",
            Self::Floats => "floats",
            Self::Strings => "strings",
            Self::Graph => "graph",
        };
        write!(f, "{}", name)
    }
}

/// Value of an operator attribute.
///
/// In JSON the value's kind is determined from its form: integers are `Int`,
/// other numbers are `Float`, arrays are `Ints`, `Floats` or `Strings`
/// depending on their elements and objects are subgraphs. Use
/// [`coerce_to`](AttributeValue::coerce_to) to convert a value to the kind
/// that an attribute declares.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Float(f32),
    String(String),
    Ints(Vec<i64>),
    Floats(Vec<f32>),
    Strings(Vec<String>),
    Graph(Arc<Graph>),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Int(_) => AttributeKind::Int,
            Self::Float(_) => AttributeKind::Float,
            Self::String(_) => AttributeKind::String,
            Self::Ints(_) => AttributeKind::Ints,
            Self::Floats(_) => AttributeKind::Floats,
            Self::Strings(_) => AttributeKind::Strings,
            Self::Graph(_) => AttributeKind::Graph,
        }
    }

    /// Convert this value to an attribute of kind `kind`.
    ///
    /// Values of the same kind are returned unchanged. Integers widen to
    /// floats, and an empty list converts to any list kind. Returns `None`
    /// if no conversion exists.
    pub fn coerce_to(&self, kind: AttributeKind) -> Option<AttributeValue> {
        if self.kind() == kind {
            return Some(self.clone());
        }
        let value = match (self, kind) {
            (Self::Int(x), AttributeKind::Float) => Self::Float(*x as f32),
            (Self::Ints(xs), AttributeKind::Floats) => {
                Self::Floats(xs.iter().map(|x| *x as f32).collect())
            }
            (Self::Ints(xs), AttributeKind::Strings) if xs.is_empty() => Self::Strings(Vec::new()),
            _ => return None,
        };
        Some(value)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Self::Ints(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Self::Floats(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::Strings(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_graph(&self) -> Option<&Graph> {
        match self {
            Self::Graph(g) => Some(g),
            _ => None,
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(x: i64) -> Self {
        Self::Int(x)
    }
}

impl From<f32> for AttributeValue {
    fn from(x: f32) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(xs: Vec<i64>) -> Self {
        Self::Ints(xs)
    }
}

impl From<Vec<f32>> for AttributeValue {
    fn from(xs: Vec<f32>) -> Self {
        Self::Floats(xs)
    }
}

impl From<Graph> for AttributeValue {
    fn from(g: Graph) -> Self {
        Self::Graph(Arc::new(g))
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(x) => write!(f, "{}", x),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "\"{}\"", s),
            Self::Ints(xs) => write!(f, "{:?}", xs),
            Self::Floats(xs) => write!(f, "{:?}", xs),
            Self::Strings(xs) => write!(f, "{:?}", xs),
            Self::Graph(g) => write!(f, "<graph \"{}\">", g.name),
        }
    }
}

/// Attributes of an operator node, by name.
///
/// The typed getters return `None` both when an attribute is missing and
/// when it has a different kind. Callers that need to distinguish these
/// should validate attributes against the operator's schema first, as the
/// graph inference driver does.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attrs(FxHashMap<String, AttributeValue>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute, returning the updated map.
    pub fn with(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace an attribute.
    pub fn insert(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.as_int())
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(|v| v.as_float())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| v.as_str())
    }

    pub fn get_ints(&self, name: &str) -> Option<&[i64]> {
        self.get(name).and_then(|v| v.as_ints())
    }

    pub fn get_floats(&self, name: &str) -> Option<&[f32]> {
        self.get(name).and_then(|v| v.as_floats())
    }

    pub fn get_graph(&self, name: &str) -> Option<&Graph> {
        self.get(name).and_then(|v| v.as_graph())
    }

    /// Iterate over attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        let mut attrs: Vec<_> = self.0.iter().map(|(k, v)| (k.as_str(), v)).collect();
        attrs.sort_by_key(|(name, _)| *name);
        attrs.into_iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>, V: Into<AttributeValue>> FromIterator<(S, V)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use nmdefs_testing::TestCases;

    use super::{AttributeKind, AttributeValue, Attrs};
    use crate::graph::Graph;

    #[test]
    fn test_typed_getters() {
        let attrs = Attrs::new()
            .with("direction", "reverse")
            .with("hidden_size", 16i64)
            .with("v_thresh", vec![0.5f32, 0.25]);

        assert_eq!(attrs.get_str("direction"), Some("reverse"));
        assert_eq!(attrs.get_int("hidden_size"), Some(16));
        assert_eq!(attrs.get_floats("v_thresh"), Some([0.5, 0.25].as_slice()));

        // Wrong kind or missing.
        assert_eq!(attrs.get_int("direction"), None);
        assert_eq!(attrs.get_str("missing"), None);
        assert!(attrs.contains("hidden_size"));
        assert_eq!(attrs.len(), 3);

        let names: Vec<_> = attrs.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["direction", "hidden_size", "v_thresh"]);
    }

    #[test]
    fn test_coerce_to() {
        #[derive(Debug)]
        struct Case {
            value: AttributeValue,
            kind: AttributeKind,
            expected: Option<AttributeValue>,
        }

        let cases = [
            Case {
                value: AttributeValue::Int(3),
                kind: AttributeKind::Int,
                expected: Some(AttributeValue::Int(3)),
            },
            Case {
                value: AttributeValue::Int(3),
                kind: AttributeKind::Float,
                expected: Some(AttributeValue::Float(3.0)),
            },
            Case {
                value: AttributeValue::Ints(vec![1, 2]),
                kind: AttributeKind::Floats,
                expected: Some(AttributeValue::Floats(vec![1.0, 2.0])),
            },
            Case {
                value: AttributeValue::Ints(vec![]),
                kind: AttributeKind::Strings,
                expected: Some(AttributeValue::Strings(vec![])),
            },
            Case {
                value: AttributeValue::Float(0.5),
                kind: AttributeKind::Int,
                expected: None,
            },
            Case {
                value: AttributeValue::String("forward".into()),
                kind: AttributeKind::Int,
                expected: None,
            },
        ];

        cases.test_each(|case| {
            assert_eq!(case.value.coerce_to(case.kind), case.expected);
        });
    }

    #[test]
    fn test_deserialize() {
        let attrs: Attrs = serde_json::from_str(
            r#"{
                "direction": "bidirectional",
                "hidden_size": 64,
                "activation_alpha": [0.5, 1.5],
                "v_reset": [0, 1],
                "body": {"name": "inner", "nodes": []}
            }"#,
        )
        .unwrap();

        assert_eq!(attrs.get_str("direction"), Some("bidirectional"));
        assert_eq!(attrs.get_int("hidden_size"), Some(64));
        assert_eq!(attrs.get_floats("activation_alpha"), Some([0.5, 1.5].as_slice()));
        assert_eq!(attrs.get_ints("v_reset"), Some([0, 1].as_slice()));
        assert_eq!(attrs.get_graph("body").map(|g| g.name.as_str()), Some("inner"));
    }

    #[test]
    fn test_display() {
        assert_eq!(AttributeValue::from("forward").to_string(), "\"forward\"");
        assert_eq!(AttributeValue::from(vec![1i64, 2]).to_string(), "[1, 2]");
        let graph = Graph {
            name: "body".into(),
            ..Default::default()
        };
        assert_eq!(AttributeValue::from(graph).to_string(), "<graph \"body\">");
        assert_eq!(AttributeKind::Floats.to_string(), "floats");
    }
}
