//! Shape inference trait, errors and the per-node inference context.

use std::error::Error;
use std::fmt;

use crate::dimension::Dimension;
use crate::elem_type::ElementType;
use crate::shape::TensorShape;
use crate::value_info::ValueInfo;

/// Errors reported by shape inference for a single node.
#[derive(Clone, Debug, PartialEq)]
pub enum InferShapesError {
    /// An input's rank does not match that expected by the operator.
    IncorrectRank {
        /// Index of the offending input.
        input: usize,
        expected: usize,
        actual: usize,
    },

    /// Two shapes that should describe the same value are incompatible.
    IncompatibleShapes,

    /// Two element types that should describe the same value differ.
    IncompatibleTypes {
        expected: ElementType,
        actual: ElementType,
    },

    /// An inference routine tried to write an output that the node does not
    /// declare.
    InvalidOutputIndex(usize),
}

impl fmt::Display for InferShapesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncorrectRank {
                input,
                expected,
                actual,
            } => write!(
                f,
                "input {} must have rank {} but has rank {}",
                input, expected, actual
            ),
            Self::IncompatibleShapes => write!(f, "incompatible shapes"),
            Self::IncompatibleTypes { expected, actual } => {
                write!(f, "expected element type {} but found {}", expected, actual)
            }
            Self::InvalidOutputIndex(index) => write!(f, "output {} is not declared", index),
        }
    }
}

impl Error for InferShapesError {}

/// Per-node view used by an inference routine.
///
/// A context is created for each evaluation of a node. It exposes the shapes
/// and types of the node's inputs and the number of outputs the node
/// declares, and collects the inferred output types and shapes. Inputs are
/// identified by slot index; optional inputs that are not supplied are
/// `None`.
pub struct InferenceContext<'a> {
    inputs: &'a [Option<ValueInfo>],
    outputs: Vec<Option<ValueInfo>>,
}

impl<'a> InferenceContext<'a> {
    /// Create a context for a node with the given inputs and `num_outputs`
    /// declared outputs.
    pub fn new(inputs: &'a [Option<ValueInfo>], num_outputs: usize) -> Self {
        Self {
            inputs,
            outputs: vec![None; num_outputs],
        }
    }

    /// Return the number of input slots supplied to the node, including
    /// absent optional inputs that precede present ones.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Return the index'th input, if present.
    pub fn input(&self, index: usize) -> Option<&ValueInfo> {
        self.inputs.get(index).and_then(|input| input.as_ref())
    }

    /// Return true if the index'th input is present and its rank is known.
    pub fn has_input_shape(&self, index: usize) -> bool {
        self.input_shape(index).is_some()
    }

    /// Return the dimensions of the index'th input, if it is present and its
    /// rank is known.
    pub fn input_shape(&self, index: usize) -> Option<&[Dimension]> {
        self.input(index).and_then(|input| input.shape.dims())
    }

    /// Return the element type of the index'th input, if known.
    pub fn input_elem_type(&self, index: usize) -> Option<ElementType> {
        self.input(index).and_then(|input| input.elem_type)
    }

    /// Return the number of outputs that the node declares.
    ///
    /// This can be less than the maximum number of outputs that the
    /// operator supports.
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Return the inferred information for the index'th output, if any has
    /// been recorded.
    pub fn output(&self, index: usize) -> Option<&ValueInfo> {
        self.outputs.get(index).and_then(|output| output.as_ref())
    }

    fn output_mut(&mut self, index: usize) -> Result<&mut ValueInfo, InferShapesError> {
        let output = self
            .outputs
            .get_mut(index)
            .ok_or(InferShapesError::InvalidOutputIndex(index))?;
        Ok(output.get_or_insert_with(ValueInfo::unknown))
    }

    /// Copy the element type of input `input` to output `output`.
    ///
    /// If the input is absent or its element type is unknown, the output's
    /// element type is left unchanged.
    pub fn propagate_elem_type(
        &mut self,
        input: usize,
        output: usize,
    ) -> Result<(), InferShapesError> {
        let elem_type = self.input_elem_type(input);
        let output = self.output_mut(output)?;
        if elem_type.is_some() {
            output.elem_type = elem_type;
        }
        Ok(())
    }

    /// Set the shape of the index'th output.
    pub fn update_output_shape(
        &mut self,
        index: usize,
        shape: TensorShape,
    ) -> Result<(), InferShapesError> {
        self.output_mut(index)?.shape = shape;
        Ok(())
    }

    /// Consume the context and return the recorded outputs.
    ///
    /// Outputs which the inference routine did not write are `None`.
    pub fn into_outputs(self) -> Vec<Option<ValueInfo>> {
        self.outputs
    }
}

/// Infer the types and shapes of an operator's outputs given its inputs.
///
/// Implementations are typed operator configurations, with attributes
/// already resolved. They must read only from the context and write only
/// through its output methods, so the same configuration can be evaluated
/// for many nodes concurrently.
pub trait InferShapes {
    /// Infer output types and shapes, recording them in `ctx`.
    ///
    /// On error, implementations should not have written any outputs.
    fn infer_shapes(&self, ctx: &mut InferenceContext<'_>) -> Result<(), InferShapesError>;
}

#[cfg(test)]
mod tests {
    use super::{InferShapesError, InferenceContext};
    use crate::shape::shape;
    use crate::{Dimension, ElementType, TensorShape, ValueInfo};

    #[test]
    fn test_context_inputs() {
        let inputs = [
            Some(ValueInfo::new(Some(ElementType::Float32), shape!(3, "batch"))),
            None,
            Some(ValueInfo::new(Some(ElementType::Int32), TensorShape::unknown())),
        ];
        let ctx = InferenceContext::new(&inputs, 2);

        assert_eq!(ctx.num_inputs(), 3);
        assert_eq!(ctx.num_outputs(), 2);

        assert!(ctx.has_input_shape(0));
        assert_eq!(
            ctx.input_shape(0),
            Some([Dimension::Fixed(3), Dimension::from("batch")].as_slice())
        );
        assert_eq!(ctx.input_elem_type(0), Some(ElementType::Float32));

        // Absent optional input.
        assert!(ctx.input(1).is_none());
        assert!(!ctx.has_input_shape(1));

        // Present input with unknown rank.
        assert!(!ctx.has_input_shape(2));
        assert_eq!(ctx.input_elem_type(2), Some(ElementType::Int32));

        // Out of range.
        assert!(!ctx.has_input_shape(5));
    }

    #[test]
    fn test_context_outputs() {
        let input = ValueInfo::new(Some(ElementType::Float16), shape!(1, 2, 3));
        let inputs = [Some(input)];
        let mut ctx = InferenceContext::new(&inputs, 2);

        ctx.propagate_elem_type(0, 0).unwrap();
        ctx.update_output_shape(0, shape!(4)).unwrap();
        assert_eq!(
            ctx.output(0),
            Some(&ValueInfo::new(Some(ElementType::Float16), shape!(4)))
        );
        assert_eq!(ctx.output(1), None);

        // Propagating from an absent input leaves the type unset.
        ctx.propagate_elem_type(3, 1).unwrap();
        assert_eq!(ctx.output(1), Some(&ValueInfo::unknown()));

        assert_eq!(
            ctx.update_output_shape(2, shape!(1)),
            Err(InferShapesError::InvalidOutputIndex(2))
        );
        assert_eq!(
            ctx.propagate_elem_type(0, 2),
            Err(InferShapesError::InvalidOutputIndex(2))
        );

        let outputs = ctx.into_outputs();
        assert_eq!(outputs.len(), 2);
    }

    #[test]
    fn test_error_display() {
        let err = InferShapesError::IncorrectRank {
            input: 0,
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "input 0 must have rank 3 but has rank 2");
    }
}
