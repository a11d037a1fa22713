use std::fmt;

use crate::elem_type::ElementType;
use crate::infer_shapes::InferShapesError;
use crate::shape::TensorShape;

/// Statically known information about a tensor value: its element type and
/// shape, either of which may be unknown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueInfo {
    pub elem_type: Option<ElementType>,
    pub shape: TensorShape,
}

impl ValueInfo {
    pub fn new(elem_type: Option<ElementType>, shape: TensorShape) -> Self {
        Self { elem_type, shape }
    }

    /// Create a value whose type and shape are both unknown.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Combine two descriptions of the same value.
    ///
    /// Known element types must match. Shapes are combined with
    /// [`TensorShape::merge`].
    pub fn merge(&self, other: &ValueInfo) -> Result<ValueInfo, InferShapesError> {
        let elem_type = match (self.elem_type, other.elem_type) {
            (Some(a), Some(b)) if a != b => {
                return Err(InferShapesError::IncompatibleTypes {
                    expected: a,
                    actual: b,
                });
            }
            (a, b) => a.or(b),
        };
        let shape = self.shape.merge(&other.shape)?;
        Ok(Self { elem_type, shape })
    }
}

impl fmt::Display for ValueInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.elem_type {
            Some(ty) => write!(f, "{} {}", ty, self.shape),
            None => write!(f, "? {}", self.shape),
        }
    }
}
