//! serde support.
//!
//! The serialized forms are chosen to be convenient to write by hand in JSON
//! graph descriptions:
//!
//! - A [`Dimension`] is a number (fixed), a string (symbolic) or `null`
//!   (unknown).
//! - A [`TensorShape`] is an array of dimensions, or `null` if the rank is
//!   unknown.
//! - An [`ElementType`] is its ONNX name, eg. `"float"`. Rust-style names
//!   (`"f32"`) and type strings (`"tensor(float)"`) are also accepted.
//! - A [`ValueInfo`] is an object with optional `type` and `shape` fields.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::{Dimension, ElementType, TensorShape, ValueInfo};

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Fixed(size) => serializer.serialize_u64(*size as u64),
            Self::Symbolic(name) => serializer.serialize_str(name),
            Self::Unknown => serializer.serialize_none(),
        }
    }
}

struct DimensionVisitor;

impl<'de> Visitor<'de> for DimensionVisitor {
    type Value = Dimension;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a non-negative integer, a symbol name or null")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Dimension, E> {
        usize::try_from(value)
            .map(Dimension::Fixed)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Dimension, E> {
        usize::try_from(value)
            .map(Dimension::Fixed)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Dimension, E> {
        Ok(Dimension::Symbolic(value.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Dimension, E> {
        Ok(Dimension::Unknown)
    }

    fn visit_none<E: de::Error>(self) -> Result<Dimension, E> {
        Ok(Dimension::Unknown)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Dimension, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DimensionVisitor)
    }
}

impl Serialize for TensorShape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.dims() {
            Some(dims) => serializer.collect_seq(dims),
            None => serializer.serialize_none(),
        }
    }
}

struct ShapeVisitor;

impl<'de> Visitor<'de> for ShapeVisitor {
    type Value = TensorShape;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an array of dimensions or null")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TensorShape, A::Error> {
        let mut dims = Vec::with_capacity(seq.size_hint().unwrap_or(4));
        while let Some(dim) = seq.next_element::<Dimension>()? {
            dims.push(dim);
        }
        Ok(TensorShape::from_dims(dims))
    }

    fn visit_unit<E: de::Error>(self) -> Result<TensorShape, E> {
        Ok(TensorShape::unknown())
    }

    fn visit_none<E: de::Error>(self) -> Result<TensorShape, E> {
        Ok(TensorShape::unknown())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<TensorShape, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Deserialize<'de> for TensorShape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ShapeVisitor)
    }
}

impl Serialize for ElementType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.onnx_name())
    }
}

impl<'de> Deserialize<'de> for ElementType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}

impl Serialize for ValueInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut info = serializer.serialize_struct("ValueInfo", 2)?;
        info.serialize_field("type", &self.elem_type)?;
        info.serialize_field("shape", &self.shape)?;
        info.end()
    }
}

struct ValueInfoVisitor;

impl<'de> Visitor<'de> for ValueInfoVisitor {
    type Value = ValueInfo;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "an object with optional \"type\" and \"shape\" fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ValueInfo, A::Error> {
        let mut elem_type: Option<Option<ElementType>> = None;
        let mut shape: Option<TensorShape> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "type" => {
                    if elem_type.is_some() {
                        return Err(de::Error::duplicate_field("type"));
                    }
                    elem_type = Some(map.next_value()?);
                }
                "shape" => {
                    if shape.is_some() {
                        return Err(de::Error::duplicate_field("shape"));
                    }
                    shape = Some(map.next_value()?);
                }
                _ => {
                    return Err(de::Error::unknown_field(&key, &["type", "shape"]));
                }
            }
        }

        Ok(ValueInfo::new(elem_type.flatten(), shape.unwrap_or_default()))
    }
}

impl<'de> Deserialize<'de> for ValueInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ValueInfoVisitor)
    }
}

#[cfg(test)]
mod tests {
    use crate::shape::shape;
    use crate::{Dimension, ElementType, TensorShape, ValueInfo};

    #[test]
    fn test_deserialize_shape() {
        let shape: TensorShape = serde_json::from_str(r#"[10, "batch", null]"#).unwrap();
        assert_eq!(
            shape,
            TensorShape::from_dims([10.into(), "batch".into(), Dimension::Unknown])
        );

        let shape: TensorShape = serde_json::from_str("null").unwrap();
        assert_eq!(shape, TensorShape::unknown());

        assert!(serde_json::from_str::<TensorShape>("[-1]").is_err());
        assert!(serde_json::from_str::<TensorShape>("[1.5]").is_err());
    }

    #[test]
    fn test_serialize_shape() {
        let json = serde_json::to_string(&shape!(2, "batch")).unwrap();
        assert_eq!(json, r#"[2,"batch"]"#);
        assert_eq!(serde_json::to_string(&TensorShape::unknown()).unwrap(), "null");
    }

    #[test]
    fn test_value_info() {
        let info: ValueInfo =
            serde_json::from_str(r#"{"type": "tensor(float)", "shape": [10, 32, 16]}"#).unwrap();
        assert_eq!(
            info,
            ValueInfo::new(Some(ElementType::Float32), shape!(10, 32, 16))
        );

        let info: ValueInfo = serde_json::from_str(r#"{"type": "double"}"#).unwrap();
        assert_eq!(
            info,
            ValueInfo::new(Some(ElementType::Float64), TensorShape::unknown())
        );

        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, r#"{"type":"double","shape":null}"#);

        assert!(serde_json::from_str::<ValueInfo>(r#"{"type": "complex"}"#).is_err());
        assert!(serde_json::from_str::<ValueInfo>(r#"{"dims": []}"#).is_err());
    }
}
