//! nmdefs provides operator schemas and static shape inference for
//! neuromorphic recurrent cell operators in ONNX-style graphs.
//!
//! An operator schema ([`SchemaDescriptor`]) describes an operator's inputs,
//! outputs, attributes and allowed element types, and carries a routine which
//! infers the element types and shapes of the operator's outputs from those
//! of its inputs. Inference never looks at tensor data, so shapes can be
//! checked and propagated through a whole graph before anything is run.
//!
//! # Operators
//!
//! The [`ops`] module defines the spiking neuron operators `LIFCell`,
//! `LIFLayer`, `LSNNCell`, `LSNNLayer`, `ADEXCell` and `ADEXLayer`. They
//! share the layout of the standard ONNX recurrent operators:
//!
//! - Input `X` has shape `[seq_length, batch_size, input_size]`.
//! - Output `Y` has shape `[seq_length, num_directions, batch_size, hidden_size]`.
//! - Output `Y_h` has shape `[num_directions, batch_size, hidden_size]`.
//!
//! Dimensions which cannot be determined, for example because `hidden_size`
//! is not specified, are inferred as unknown rather than reported as errors.
//!
//! # Inferring shapes for a graph
//!
//! 1. Describe the graph with [`Graph`], or load it from JSON using
//!    [`Graph::from_json`].
//! 2. Call [`infer_shapes`] with a [`SchemaRegistry`], such as the shared
//!    one returned by [`SchemaRegistry::global`].
//! 3. Read the inferred [`ValueInfo`] for each value from the
//!    [`InferenceResult`].
//!
//! ```
//! use nmdefs::{infer_shapes, Graph, InferOptions, SchemaRegistry};
//!
//! let graph = Graph::from_json(r#"{
//!     "inputs": [
//!         {"name": "x", "type": "float", "shape": ["seq", 32, 16]},
//!         {"name": "w"},
//!         {"name": "r"}
//!     ],
//!     "nodes": [{
//!         "op_type": "LIFLayer",
//!         "inputs": ["x", "w", "r"],
//!         "outputs": ["y", "y_h"],
//!         "attrs": {"direction": "bidirectional", "hidden_size": 64}
//!     }]
//! }"#).unwrap();
//!
//! let result = infer_shapes(&graph, SchemaRegistry::global(), &InferOptions::default()).unwrap();
//! assert_eq!(result.value("y").unwrap().to_string(), "f32 [seq, 2, 32, 64]");
//! assert_eq!(result.value("y_h").unwrap().to_string(), "f32 [2, 32, 64]");
//! ```
//!
//! ## Threading
//!
//! Nodes which do not depend on each other are inferred concurrently using a
//! Rayon thread pool sized to the number of physical cores. See
//! [`thread_pool`] and [`InferOptions`].

mod attrs;
mod env;
mod graph;
mod registry;
mod schema;
mod threading;

pub mod ops;

pub use attrs::{AttributeKind, AttributeValue, Attrs};
pub use env::{env_flag, str_as_bool};
pub use graph::{
    infer_shapes, ErrorPolicy, Graph, GraphError, GraphValue, InferOptions, InferenceResult, Node,
    NodeError, NodeErrorKind, DEFAULT_OPSET_VERSION,
};
pub use registry::SchemaRegistry;
pub use schema::{
    AttrDefault, AttributeDecl, FormalParameter, InferenceFn, ParamOption, SchemaDef,
    SchemaDescriptor, SchemaError, Side, TypeConstraint,
};
pub use threading::{thread_pool, ThreadPool};

pub use nmdefs_shape_inference::{
    Dimension, ElementType, InferShapes, InferShapesError, InferenceContext, TensorShape,
    ValueInfo,
};
