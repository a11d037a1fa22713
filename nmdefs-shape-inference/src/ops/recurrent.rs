use crate::dimension::Dimension;
use crate::infer_shapes::{InferShapes, InferShapesError, InferenceContext};
use crate::shape::TensorShape;

/// Direction that a recurrent operator traverses the input sequence in.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
    Bidirectional,
}

impl Direction {
    /// Parse the value of a `direction` attribute.
    ///
    /// Returns `None` if the value is not one of "forward", "reverse" or
    /// "bidirectional".
    pub fn parse(value: &str) -> Option<Direction> {
        match value {
            "forward" => Some(Self::Forward),
            "reverse" => Some(Self::Reverse),
            "bidirectional" => Some(Self::Bidirectional),
            _ => None,
        }
    }

    /// Return the attribute value for this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reverse => "reverse",
            Self::Bidirectional => "bidirectional",
        }
    }

    /// Number of directions the sequence is traversed in.
    pub fn num_directions(self) -> usize {
        match self {
            Self::Forward | Self::Reverse => 1,
            Self::Bidirectional => 2,
        }
    }
}

/// Shape inference for recurrent cell and layer operators (LIF, LSNN, AdEx).
///
/// Input 0 (`X`) has shape `[seq_length, batch_size, input_size]`. The
/// outputs are:
///
/// - 0 (`Y`): `[seq_length, num_directions, batch_size, hidden_size]`
/// - 1 (`Y_h`): `[num_directions, batch_size, hidden_size]`
/// - 2 (`Y_c`): `[num_directions, batch_size, hidden_size]`, for gated
///   variants which produce a cell state
///
/// All outputs have the element type of `X`. Only the outputs that a node
/// declares are inferred.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecurrentCell {
    /// Traversal direction, or `None` if the `direction` attribute has an
    /// unrecognized value.
    pub direction: Option<Direction>,

    /// Size of the hidden state, if known and positive.
    pub hidden_size: Option<usize>,
}

impl RecurrentCell {
    /// Maximum number of outputs which this inference understands.
    pub const MAX_OUTPUTS: usize = 3;

    /// Return the number of directions as a dimension.
    pub fn num_directions(&self) -> Dimension {
        self.direction.map(|dir| dir.num_directions()).into()
    }

    /// Return the hidden size as a dimension.
    pub fn hidden_dim(&self) -> Dimension {
        self.hidden_size.into()
    }
}

impl InferShapes for RecurrentCell {
    fn infer_shapes(&self, ctx: &mut InferenceContext<'_>) -> Result<(), InferShapesError> {
        let num_directions = self.num_directions();
        let hidden_size = self.hidden_dim();

        let (seq_length, batch_size) = match ctx.input_shape(0) {
            Some([seq, batch, _input_size]) => (seq.clone(), batch.clone()),
            Some(dims) => {
                return Err(InferShapesError::IncorrectRank {
                    input: 0,
                    expected: 3,
                    actual: dims.len(),
                });
            }
            None => (Dimension::Unknown, Dimension::Unknown),
        };

        let state_shape = TensorShape::from_dims([
            num_directions.clone(),
            batch_size.clone(),
            hidden_size.clone(),
        ]);

        for output in 0..ctx.num_outputs().min(Self::MAX_OUTPUTS) {
            let shape = match output {
                0 => TensorShape::from_dims([
                    seq_length.clone(),
                    num_directions.clone(),
                    batch_size.clone(),
                    hidden_size.clone(),
                ]),
                _ => state_shape.clone(),
            };
            ctx.propagate_elem_type(0, output)?;
            ctx.update_output_shape(output, shape)?;
        }

        Ok(())
    }
}
