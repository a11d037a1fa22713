//! Shape and element type inference for neuromorphic operators.
//!
//! # About shape inference
//!
//! A model loader wants to know the shape and element type of every value in
//! a graph before any of the operators are executed. This lets it reject
//! graphs whose operators could never run (eg. because an input has the
//! wrong rank) and gives later stages, such as memory planning, the sizes
//! they need.
//!
//! Shape inference for a node takes the shapes and types of the node's
//! inputs, plus the node's attributes, and computes the shapes and types of
//! its outputs. It never looks at tensor _data_, which does not exist yet
//! when inference runs.
//!
//! As an example, a bidirectional recurrent cell with `hidden_size=64`
//! applied to an input of shape `[10, 32, 16]` produces:
//!
//! ```text
//! Y   = [10, 2, 32, 64] // [seq_length, num_directions, batch, hidden_size]
//! Y_h = [2, 32, 64]     // [num_directions, batch, hidden_size]
//! ```
//!
//! # Partial results
//!
//! Inference is best-effort. When an input shape or an attribute is missing,
//! the affected dimensions are reported as [`Dimension::Unknown`] rather than
//! failing. Only inputs that can never be valid, such as an input with the
//! wrong rank, produce an [`InferShapesError`].
//!
//! # Crate overview
//!
//! - [`Dimension`], [`TensorShape`], [`ElementType`] and [`ValueInfo`]
//!   describe tensors whose sizes may be only partly known.
//! - [`InferenceContext`] is the per-node view handed to an inference
//!   routine. It exposes the node's inputs and collects its outputs.
//! - [`InferShapes`] is implemented by typed operator configurations in
//!   [`ops`].

mod dimension;
mod elem_type;
mod infer_shapes;
pub mod ops;
mod shape;
mod value_info;

#[cfg(feature = "serde")]
mod impl_serialize;

pub use dimension::Dimension;
pub use elem_type::{ElementType, ParseElementTypeError};
pub use infer_shapes::{InferShapes, InferShapesError, InferenceContext};
pub use shape::TensorShape;
pub use value_info::ValueInfo;
