use std::fmt;

use crate::infer_shapes::InferShapesError;

/// Size of a single dimension of a tensor whose rank is known.
#[derive(Clone, Default, Eq, Hash, PartialEq)]
pub enum Dimension {
    /// A dimension with a size that is known statically.
    Fixed(usize),

    /// A dimension whose size is only determined at runtime. The name
    /// identifies where different values share a size (eg. "batch").
    Symbolic(String),

    /// A dimension about which nothing is known.
    #[default]
    Unknown,
}

impl Dimension {
    /// Return the size of this dimension if it is fixed.
    pub fn fixed(&self) -> Option<usize> {
        match self {
            Self::Fixed(size) => Some(*size),
            _ => None,
        }
    }

    /// Combine two descriptions of the same dimension.
    ///
    /// Fixed sizes take precedence over symbolic or unknown sizes and a
    /// symbolic size takes precedence over an unknown one. If both sizes are
    /// fixed they must be equal. If both are symbolic, `self` is kept.
    pub fn merge(&self, other: &Dimension) -> Result<Dimension, InferShapesError> {
        let merged = match (self, other) {
            (Self::Fixed(a), Self::Fixed(b)) => {
                if a != b {
                    return Err(InferShapesError::IncompatibleShapes);
                }
                Self::Fixed(*a)
            }
            (Self::Fixed(size), _) | (_, Self::Fixed(size)) => Self::Fixed(*size),
            (Self::Symbolic(name), _) | (Self::Unknown, Self::Symbolic(name)) => {
                Self::Symbolic(name.clone())
            }
            (Self::Unknown, Self::Unknown) => Self::Unknown,
        };
        Ok(merged)
    }
}

impl From<usize> for Dimension {
    fn from(size: usize) -> Self {
        Self::Fixed(size)
    }
}

impl From<String> for Dimension {
    fn from(name: String) -> Self {
        Self::Symbolic(name)
    }
}

impl From<&str> for Dimension {
    fn from(name: &str) -> Self {
        Self::Symbolic(name.to_string())
    }
}

impl From<Option<usize>> for Dimension {
    fn from(size: Option<usize>) -> Self {
        size.map(Self::Fixed).unwrap_or(Self::Unknown)
    }
}

impl fmt::Debug for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(size) => write!(f, "{}", size),
            Self::Symbolic(name) => write!(f, "\"{}\"", name),
            Self::Unknown => write!(f, "?"),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(size) => write!(f, "{}", size),
            Self::Symbolic(name) => write!(f, "{}", name),
            Self::Unknown => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use nmdefs_testing::TestCases;

    use super::Dimension;
    use crate::InferShapesError;

    #[test]
    fn test_merge() {
        #[derive(Debug)]
        struct Case {
            lhs: Dimension,
            rhs: Dimension,
            expected: Result<Dimension, InferShapesError>,
        }

        let cases = [
            Case {
                lhs: 3.into(),
                rhs: 3.into(),
                expected: Ok(3.into()),
            },
            Case {
                lhs: 3.into(),
                rhs: 4.into(),
                expected: Err(InferShapesError::IncompatibleShapes),
            },
            Case {
                lhs: Dimension::Unknown,
                rhs: 5.into(),
                expected: Ok(5.into()),
            },
            Case {
                lhs: "batch".into(),
                rhs: 8.into(),
                expected: Ok(8.into()),
            },
            Case {
                lhs: 8.into(),
                rhs: "batch".into(),
                expected: Ok(8.into()),
            },
            Case {
                lhs: Dimension::Unknown,
                rhs: "batch".into(),
                expected: Ok("batch".into()),
            },
            Case {
                lhs: "seq".into(),
                rhs: "batch".into(),
                expected: Ok("seq".into()),
            },
            Case {
                lhs: Dimension::Unknown,
                rhs: Dimension::Unknown,
                expected: Ok(Dimension::Unknown),
            },
        ];

        cases.test_each(|case| {
            assert_eq!(case.lhs.merge(&case.rhs), case.expected);
        });
    }

    #[test]
    fn test_fixed() {
        assert_eq!(Dimension::Fixed(4).fixed(), Some(4));
        assert_eq!(Dimension::from("n").fixed(), None);
        assert_eq!(Dimension::Unknown.fixed(), None);
        assert_eq!(Dimension::from(None), Dimension::Unknown);
        assert_eq!(Dimension::from(Some(2)), Dimension::Fixed(2));
    }

    #[test]
    fn test_format() {
        assert_eq!(format!("{:?}", Dimension::from("batch")), "\"batch\"");
        assert_eq!(Dimension::from("batch").to_string(), "batch");
        assert_eq!(Dimension::Unknown.to_string(), "?");
        assert_eq!(Dimension::Fixed(7).to_string(), "7");
    }
}
