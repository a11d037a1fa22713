use std::fmt;

use smallvec::SmallVec;

use crate::dimension::Dimension;
use crate::infer_shapes::InferShapesError;

/// Shape of a tensor whose rank and dimension sizes may be only partly known.
///
/// A shape is either of unknown rank, or is a sequence of [`Dimension`]s
/// each of which can be fixed, symbolic or unknown.
///
/// ```
/// use nmdefs_shape_inference::{Dimension, TensorShape};
///
/// let shape = TensorShape::from_dims(["seq".into(), 1.into(), Dimension::Unknown]);
/// assert_eq!(shape.ndim(), Some(3));
/// assert_eq!(shape.dim(0), Some(&Dimension::from("seq")));
/// assert_eq!(shape.to_string(), "[seq, 1, ?]");
///
/// let unknown = TensorShape::unknown();
/// assert_eq!(unknown.ndim(), None);
/// ```
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct TensorShape(Option<SmallVec<[Dimension; 4]>>);

impl TensorShape {
    /// Create a shape whose rank is unknown.
    pub fn unknown() -> Self {
        Self(None)
    }

    /// Create a shape with known rank from a sequence of dimensions.
    pub fn from_dims<I: IntoIterator<Item = Dimension>>(dims: I) -> Self {
        Self(Some(dims.into_iter().collect()))
    }

    /// Create a shape where every dimension has a fixed size.
    pub fn from_fixed(shape: &[usize]) -> Self {
        Self::from_dims(shape.iter().copied().map(Dimension::Fixed))
    }

    /// Create a shape with known rank `ndim` where every dimension is unknown.
    pub fn with_rank(ndim: usize) -> Self {
        Self::from_dims(std::iter::repeat_n(Dimension::Unknown, ndim))
    }

    /// Return the number of dimensions, if known.
    pub fn ndim(&self) -> Option<usize> {
        self.0.as_ref().map(|dims| dims.len())
    }

    /// Return the dimensions, or `None` if the rank is unknown.
    pub fn dims(&self) -> Option<&[Dimension]> {
        self.0.as_deref()
    }

    /// Return the index'th dimension.
    ///
    /// Returns `None` if the rank is unknown or the index is out of bounds.
    pub fn dim(&self, index: usize) -> Option<&Dimension> {
        self.dims().and_then(|dims| dims.get(index))
    }

    /// Return the sizes of all dimensions if they are all fixed.
    pub fn to_fixed(&self) -> Option<Vec<usize>> {
        self.dims()?.iter().map(|d| d.fixed()).collect()
    }

    /// Combine two descriptions of the same tensor's shape.
    ///
    /// If either rank is unknown, the other shape is returned. Otherwise the
    /// ranks must match and dimensions are merged using
    /// [`Dimension::merge`].
    pub fn merge(&self, other: &TensorShape) -> Result<TensorShape, InferShapesError> {
        let (Some(lhs), Some(rhs)) = (self.dims(), other.dims()) else {
            return Ok(if self.ndim().is_some() {
                self.clone()
            } else {
                other.clone()
            });
        };

        if lhs.len() != rhs.len() {
            return Err(InferShapesError::IncompatibleShapes);
        }

        let dims = lhs
            .iter()
            .zip(rhs)
            .map(|(a, b)| a.merge(b))
            .collect::<Result<SmallVec<[Dimension; 4]>, _>>()?;
        Ok(Self(Some(dims)))
    }
}

impl FromIterator<Dimension> for TensorShape {
    fn from_iter<I: IntoIterator<Item = Dimension>>(iter: I) -> Self {
        Self::from_dims(iter)
    }
}

impl From<Vec<Dimension>> for TensorShape {
    fn from(dims: Vec<Dimension>) -> Self {
        Self::from_dims(dims)
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(dims) = self.dims() else {
            return write!(f, "[...]");
        };
        write!(f, "[")?;
        for (i, dim) in dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
pub(crate) use tests::shape;
