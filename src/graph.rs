//! Graph description and graph-level shape inference.
//!
//! A [`Graph`] is a list of operator [`Node`]s connected by named values.
//! [`infer_shapes`] walks the graph in dependency order, looks up each node's
//! [`SchemaDescriptor`](crate::SchemaDescriptor) in a
//! [`SchemaRegistry`](crate::SchemaRegistry), validates the node against it
//! and runs the schema's inference routine to obtain the types and shapes of
//! the node's outputs.

use serde::{Deserialize, Serialize};

use crate::attrs::{AttributeValue, Attrs};
use nmdefs_shape_inference::{ElementType, TensorShape, ValueInfo};

mod error;
mod infer;
mod planner;

pub use error::{GraphError, NodeError, NodeErrorKind};
pub use infer::{infer_shapes, ErrorPolicy, InferOptions, InferenceResult};

/// The opset version assumed for graphs which do not specify one.
pub const DEFAULT_OPSET_VERSION: u32 = 10;

fn default_opset_version() -> u32 {
    DEFAULT_OPSET_VERSION
}

/// A named graph input or output, with its declared type and shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphValue {
    pub name: String,

    #[serde(default, rename = "type")]
    pub elem_type: Option<ElementType>,

    #[serde(default)]
    pub shape: TensorShape,
}

impl GraphValue {
    pub fn new(name: &str, elem_type: Option<ElementType>, shape: TensorShape) -> Self {
        Self {
            name: name.to_string(),
            elem_type,
            shape,
        }
    }

    /// Return the declared type and shape of this value.
    pub fn info(&self) -> ValueInfo {
        ValueInfo::new(self.elem_type, self.shape.clone())
    }
}

/// An operator instance in a graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Debug name of the node.
    #[serde(default)]
    pub name: String,

    /// Operator name used to look up the node's schema.
    pub op_type: String,

    /// Operator domain. The empty string is the default domain.
    #[serde(default)]
    pub domain: String,

    /// Names of input values, by input slot. An empty name marks an optional
    /// input that is not supplied.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Names of output values, by output slot. An empty name marks an
    /// optional output that is not used.
    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub attrs: Attrs,
}

impl Node {
    pub fn new(op_type: &str) -> Self {
        Self {
            op_type: op_type.to_string(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_inputs<'a>(mut self, inputs: impl IntoIterator<Item = &'a str>) -> Self {
        self.inputs = inputs.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_outputs<'a>(mut self, outputs: impl IntoIterator<Item = &'a str>) -> Self {
        self.outputs = outputs.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attrs.insert(name, value);
        self
    }

    /// Iterate over the names of inputs which are supplied.
    pub fn present_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Iterate over the names of outputs which are used.
    pub fn present_outputs(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// A computation graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub name: String,

    /// Version of the default-domain operator set which the graph uses.
    #[serde(default = "default_opset_version")]
    pub opset_version: u32,

    /// Values supplied to the graph, with their declared types and shapes.
    #[serde(default)]
    pub inputs: Vec<GraphValue>,

    /// Values produced by the graph. Declared types and shapes are checked
    /// against inferred ones.
    #[serde(default)]
    pub outputs: Vec<GraphValue>,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            name: String::new(),
            opset_version: DEFAULT_OPSET_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            nodes: Vec::new(),
        }
    }
}

impl Graph {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Parse a graph from its JSON description.
    pub fn from_json(json: &str) -> Result<Graph, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn add_input(&mut self, name: &str, elem_type: Option<ElementType>, shape: TensorShape) {
        self.inputs.push(GraphValue::new(name, elem_type, shape));
    }

    pub fn add_output(&mut self, name: &str, elem_type: Option<ElementType>, shape: TensorShape) {
        self.outputs.push(GraphValue::new(name, elem_type, shape));
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Return a name for the index'th node for use in messages.
    ///
    /// This is the node's name if it has one, or its operator type and index
    /// otherwise.
    pub fn node_name(&self, index: usize) -> String {
        match self.nodes.get(index) {
            Some(node) if !node.name.is_empty() => node.name.clone(),
            Some(node) => format!("{}#{}", node.op_type, index),
            None => format!("#{}", index),
        }
    }
}
