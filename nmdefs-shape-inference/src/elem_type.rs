use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// Element type of a tensor.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ElementType {
    Float16,
    Float32,
    Float64,
    Int8,
    UInt8,
    Int32,
    Int64,
    Bool,
}

impl ElementType {
    /// All element types, in declaration order.
    pub const ALL: [ElementType; 8] = [
        Self::Float16,
        Self::Float32,
        Self::Float64,
        Self::Int8,
        Self::UInt8,
        Self::Int32,
        Self::Int64,
        Self::Bool,
    ];

    /// Return the ONNX name of this type (eg. "float" for `Float32`).
    pub fn onnx_name(self) -> &'static str {
        match self {
            Self::Float16 => "float16",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Bool => "bool",
        }
    }

    /// Return the name of the Rust type corresponding to this element type
    /// (eg. "f32" for `Float32`).
    ///
    /// Half-precision floats have no primitive Rust type and use "f16".
    pub fn rust_name(self) -> &'static str {
        match self {
            Self::Float16 => "f16",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Int8 => "i8",
            Self::UInt8 => "u8",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::Bool => "bool",
        }
    }

    /// Return the ONNX type string for a tensor of this element type, as used
    /// in type constraints (eg. "tensor(float)").
    pub fn tensor_type_str(self) -> String {
        format!("tensor({})", self.onnx_name())
    }

    fn from_name(name: &str) -> Option<ElementType> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.onnx_name() == name || ty.rust_name() == name)
    }
}

impl fmt::Display for ElementType {
    /// Format this type in the style of the corresponding Rust type.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rust_name())
    }
}

/// Error returned when parsing an unrecognized element type name.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseElementTypeError {
    name: String,
}

impl fmt::Display for ParseElementTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized element type \"{}\"", self.name)
    }
}

impl Error for ParseElementTypeError {}

impl FromStr for ElementType {
    type Err = ParseElementTypeError;

    /// Parse an element type from an ONNX type string ("tensor(float)"), an
    /// ONNX type name ("float") or a Rust type name ("f32").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .strip_prefix("tensor(")
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(s);
        Self::from_name(name).ok_or_else(|| ParseElementTypeError {
            name: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use nmdefs_testing::TestCases;

    use super::ElementType;

    #[test]
    fn test_parse() {
        #[derive(Debug)]
        struct Case {
            text: &'static str,
            expected: Option<ElementType>,
        }

        let cases = [
            Case {
                text: "tensor(float)",
                expected: Some(ElementType::Float32),
            },
            Case {
                text: "tensor(float16)",
                expected: Some(ElementType::Float16),
            },
            Case {
                text: "double",
                expected: Some(ElementType::Float64),
            },
            Case {
                text: "i32",
                expected: Some(ElementType::Int32),
            },
            Case {
                text: "tensor(int64)",
                expected: Some(ElementType::Int64),
            },
            Case {
                text: "tensor(float",
                expected: None,
            },
            Case {
                text: "complex64",
                expected: None,
            },
        ];

        cases.test_each(|case| {
            assert_eq!(case.text.parse::<ElementType>().ok(), case.expected);
        });
    }

    #[test]
    fn test_names() {
        for ty in ElementType::ALL {
            assert_eq!(ty.tensor_type_str().parse::<ElementType>(), Ok(ty));
            assert_eq!(ty.to_string().parse::<ElementType>(), Ok(ty));
        }
        assert_eq!(ElementType::Float32.tensor_type_str(), "tensor(float)");
    }

    #[test]
    fn test_parse_error() {
        let err = "tensor(string)".parse::<ElementType>().err().unwrap();
        assert_eq!(err.to_string(), "unrecognized element type \"tensor(string)\"");
    }
}
