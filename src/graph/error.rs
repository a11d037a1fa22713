use std::error::Error;
use std::fmt;

use crate::attrs::AttributeKind;
use nmdefs_shape_inference::{ElementType, InferShapesError};

/// Reason why inference failed for a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeErrorKind {
    /// No schema is registered for the operator at the graph's opset
    /// version.
    UnknownOperator { domain: String, opset: u32 },

    /// The node supplies more inputs than the operator accepts.
    TooManyInputs { max: usize, actual: usize },

    /// A required input is not supplied.
    MissingInput { index: usize, name: &'static str },

    /// The number of declared outputs is outside the operator's range.
    OutputCount {
        min: usize,
        max: usize,
        actual: usize,
    },

    /// The node has an attribute which the operator does not declare.
    UnknownAttribute(String),

    /// An attribute value has a kind which cannot be converted to the
    /// declared kind.
    AttributeKind {
        name: &'static str,
        expected: AttributeKind,
        actual: AttributeKind,
    },

    /// A required attribute is missing.
    MissingAttribute(&'static str),

    /// An input's element type is not allowed by its type constraint.
    TypeConstraint {
        input: usize,
        name: &'static str,
        type_param: &'static str,
        elem_type: ElementType,
    },

    /// Inputs which share a type parameter have different element types.
    TypeParamMismatch {
        type_param: &'static str,
        expected: ElementType,
        actual: ElementType,
    },

    /// The operator's inference routine failed.
    ShapeInference {
        error: InferShapesError,
        /// Name of the input slot the error refers to, if any.
        input: Option<&'static str>,
    },

    /// An inferred output conflicts with the graph's declaration of it.
    OutputConflict {
        output: String,
        error: InferShapesError,
    },
}

impl fmt::Display for NodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOperator { domain, opset } => {
                let domain = if domain.is_empty() { "ai.onnx" } else { domain };
                write!(f, "no schema in domain \"{}\" for opset {}", domain, opset)
            }
            Self::TooManyInputs { max, actual } => {
                write!(f, "expected at most {} inputs but got {}", max, actual)
            }
            Self::MissingInput { index, name } => {
                write!(f, "required input {} ({}) is missing", index, name)
            }
            Self::OutputCount { min, max, actual } => write!(
                f,
                "expected between {} and {} outputs but got {}",
                min, max, actual
            ),
            Self::UnknownAttribute(name) => write!(f, "unknown attribute \"{}\"", name),
            Self::AttributeKind {
                name,
                expected,
                actual,
            } => write!(
                f,
                "attribute \"{}\" should be {} but is {}",
                name, expected, actual
            ),
            Self::MissingAttribute(name) => write!(f, "required attribute \"{}\" is missing", name),
            Self::TypeConstraint {
                input,
                name,
                type_param,
                elem_type,
            } => write!(
                f,
                "input {} ({}) has type {} which is not allowed for {}",
                input,
                name,
                elem_type.tensor_type_str(),
                type_param
            ),
            Self::TypeParamMismatch {
                type_param,
                expected,
                actual,
            } => write!(
                f,
                "inputs bound to {} have different types ({} and {})",
                type_param, expected, actual
            ),
            Self::ShapeInference {
                error,
                input: Some(input),
            } => write!(f, "shape inference failed for input {}: {}", input, error),
            Self::ShapeInference { error, input: None } => {
                write!(f, "shape inference failed: {}", error)
            }
            Self::OutputConflict { output, error } => {
                write!(f, "output \"{}\" conflicts with graph output: {}", output, error)
            }
        }
    }
}

/// Error that occurred when inferring the outputs of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeError {
    /// Name of the node, or a generated name if it has none.
    pub node: String,
    pub op_type: String,
    pub kind: NodeErrorKind,
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node \"{}\" ({}): {}", self.node, self.op_type, self.kind)
    }
}

impl Error for NodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            NodeErrorKind::ShapeInference { error, .. } => Some(error),
            NodeErrorKind::OutputConflict { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Errors that prevent shape inference for a graph.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphError {
    /// More than one node or graph input produces the same value.
    DuplicateProducer { value: String },

    /// A node consumes a value which nothing produces.
    UndefinedValue { node: String, value: String },

    /// A graph output names a value which is neither a graph input nor
    /// produced by a node.
    UndefinedOutput { value: String },

    /// A graph output which is also a graph input has conflicting
    /// declarations.
    OutputConflict {
        output: String,
        error: InferShapesError,
    },

    /// The graph contains a cycle. Lists the nodes which could not be
    /// ordered.
    Cycle { nodes: Vec<String> },

    /// Inference failed for a node and the error policy is
    /// [`Abort`](super::ErrorPolicy::Abort).
    Node(NodeError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateProducer { value } => {
                write!(f, "value \"{}\" is produced more than once", value)
            }
            Self::UndefinedValue { node, value } => {
                write!(f, "node \"{}\" uses undefined value \"{}\"", node, value)
            }
            Self::UndefinedOutput { value } => {
                write!(f, "graph output \"{}\" is not produced by any node", value)
            }
            Self::OutputConflict { output, error } => write!(
                f,
                "graph output \"{}\" conflicts with graph input: {}",
                output, error
            ),
            Self::Cycle { nodes } => {
                write!(f, "graph contains a cycle involving {}", nodes.join(", "))
            }
            Self::Node(err) => write!(f, "{}", err),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Node(err) => Some(err),
            Self::OutputConflict { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<NodeError> for GraphError {
    fn from(err: NodeError) -> Self {
        Self::Node(err)
    }
}
