//! Operator schema descriptors.
//!
//! A [`SchemaDescriptor`] records the static contract of an operator: its
//! input and output slots, attributes and type constraints, plus the routine
//! which infers output types and shapes for an instance of the operator.
//!
//! Descriptors are built once from a declarative [`SchemaDef`] by
//! [`SchemaDescriptor::new`], which validates the definition, and are
//! immutable afterwards.

use std::error::Error;
use std::fmt;

use serde::Serialize;

use crate::attrs::{AttributeKind, AttributeValue, Attrs};
use nmdefs_shape_inference::{ElementType, InferShapesError, InferenceContext};

/// Signature of a shape inference routine.
///
/// The routine receives the node's attributes, with declared defaults
/// applied, and a context for the node's inputs and outputs.
pub type InferenceFn = fn(&Attrs, &mut InferenceContext<'_>) -> Result<(), InferShapesError>;

/// Whether a formal parameter must be supplied.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamOption {
    /// The parameter must be supplied.
    Single,
    /// The parameter may be omitted.
    Optional,
    /// The parameter can be supplied zero or more times. Only the last slot
    /// on each side may be variadic.
    Variadic,
}

/// Input or output slot of an operator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormalParameter {
    pub index: usize,
    pub name: &'static str,
    /// Name of the type constraint which governs this slot's element type.
    pub type_param: &'static str,
    pub option: ParamOption,
    pub description: &'static str,
}

impl FormalParameter {
    /// Create a required parameter.
    pub fn single(
        index: usize,
        name: &'static str,
        type_param: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            index,
            name,
            type_param,
            option: ParamOption::Single,
            description,
        }
    }

    /// Create an optional parameter.
    pub fn optional(
        index: usize,
        name: &'static str,
        type_param: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            option: ParamOption::Optional,
            ..Self::single(index, name, type_param, description)
        }
    }

    /// Create a variadic parameter.
    pub fn variadic(
        index: usize,
        name: &'static str,
        type_param: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            option: ParamOption::Variadic,
            ..Self::single(index, name, type_param, description)
        }
    }
}

/// Requirement or default for an attribute.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrDefault {
    /// The attribute must be specified.
    Required,
    /// The attribute may be omitted and has no default.
    Optional,
    /// The attribute takes this value if omitted.
    Value(AttributeValue),
}

/// Declaration of an operator attribute.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeDecl {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub default: AttrDefault,
    pub description: &'static str,
}

impl AttributeDecl {
    pub fn required(name: &'static str, kind: AttributeKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            default: AttrDefault::Required,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: AttributeKind, description: &'static str) -> Self {
        Self {
            default: AttrDefault::Optional,
            ..Self::required(name, kind, description)
        }
    }

    pub fn with_default(
        name: &'static str,
        value: impl Into<AttributeValue>,
        description: &'static str,
    ) -> Self {
        let value = value.into();
        Self {
            name,
            kind: value.kind(),
            default: AttrDefault::Value(value),
            description,
        }
    }
}

/// Set of element types allowed for slots that share a type parameter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeConstraint {
    pub type_param: &'static str,
    pub allowed: Vec<ElementType>,
    pub description: &'static str,
}

impl TypeConstraint {
    pub fn new(
        type_param: &'static str,
        allowed: impl Into<Vec<ElementType>>,
        description: &'static str,
    ) -> Self {
        Self {
            type_param,
            allowed: allowed.into(),
            description,
        }
    }

    pub fn allows(&self, elem_type: ElementType) -> bool {
        self.allowed.contains(&elem_type)
    }
}

/// Declarative definition of an operator schema.
///
/// Slots may be listed in any order. They are sorted by index when the
/// descriptor is built.
pub struct SchemaDef {
    pub name: &'static str,
    pub domain: &'static str,
    pub since_version: u32,
    pub doc: String,
    pub inputs: Vec<FormalParameter>,
    pub outputs: Vec<FormalParameter>,
    pub attributes: Vec<AttributeDecl>,
    pub type_constraints: Vec<TypeConstraint>,
    pub inference: InferenceFn,
}

/// Whether a slot is an input or output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    Input,
    Output,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Errors in a schema definition or registration.
///
/// These indicate a malformed operator definition rather than a problem with
/// a particular graph, and are fatal when they occur during startup.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaError {
    /// Two slots on the same side have the same index.
    DuplicateSlot { side: Side, index: usize },
    /// Slot indices are not contiguous from zero.
    MissingSlot { side: Side, index: usize },
    /// A variadic slot is not the last slot on its side.
    MisplacedVariadic { side: Side, name: &'static str },
    /// A slot uses a type parameter which has no constraint.
    UndeclaredTypeParam {
        side: Side,
        name: &'static str,
        type_param: &'static str,
    },
    /// A type constraint allows no types.
    EmptyTypeConstraint { type_param: &'static str },
    /// Two type constraints have the same parameter name.
    DuplicateTypeConstraint { type_param: &'static str },
    /// Two attributes have the same name.
    DuplicateAttribute { name: &'static str },
    /// An attribute's default value does not match its declared kind.
    DefaultKindMismatch {
        name: &'static str,
        expected: AttributeKind,
        actual: AttributeKind,
    },
    /// A schema with the same domain, name and version is already
    /// registered.
    DuplicateSchema {
        domain: String,
        name: String,
        since_version: u32,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSlot { side, index } => {
                write!(f, "{} index {} is declared more than once", side, index)
            }
            Self::MissingSlot { side, index } => {
                write!(f, "{} indices are not contiguous, {} is missing", side, index)
            }
            Self::MisplacedVariadic { side, name } => {
                write!(f, "variadic {} \"{}\" must be the last {}", side, name, side)
            }
            Self::UndeclaredTypeParam {
                side,
                name,
                type_param,
            } => write!(
                f,
                "{} \"{}\" uses undeclared type parameter \"{}\"",
                side, name, type_param
            ),
            Self::EmptyTypeConstraint { type_param } => {
                write!(f, "type constraint \"{}\" allows no types", type_param)
            }
            Self::DuplicateTypeConstraint { type_param } => {
                write!(f, "type constraint \"{}\" is declared more than once", type_param)
            }
            Self::DuplicateAttribute { name } => {
                write!(f, "attribute \"{}\" is declared more than once", name)
            }
            Self::DefaultKindMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "default for attribute \"{}\" has kind {} but the attribute is {}",
                name, actual, expected
            ),
            Self::DuplicateSchema {
                domain,
                name,
                since_version,
            } => write!(
                f,
                "schema {}-{} in domain \"{}\" is already registered",
                name, since_version, domain
            ),
        }
    }
}

impl Error for SchemaError {}

/// Immutable description of an operator.
#[derive(Clone, Debug, Serialize)]
pub struct SchemaDescriptor {
    name: &'static str,
    domain: &'static str,
    since_version: u32,
    doc: String,
    inputs: Vec<FormalParameter>,
    outputs: Vec<FormalParameter>,
    attributes: Vec<AttributeDecl>,
    type_constraints: Vec<TypeConstraint>,
    #[serde(skip)]
    inference: InferenceFn,
}

impl SchemaDescriptor {
    /// Validate a schema definition and build the descriptor.
    pub fn new(def: SchemaDef) -> Result<SchemaDescriptor, SchemaError> {
        let SchemaDef {
            name,
            domain,
            since_version,
            doc,
            mut inputs,
            mut outputs,
            attributes,
            type_constraints,
            inference,
        } = def;

        for (i, constraint) in type_constraints.iter().enumerate() {
            if constraint.allowed.is_empty() {
                return Err(SchemaError::EmptyTypeConstraint {
                    type_param: constraint.type_param,
                });
            }
            if type_constraints[..i]
                .iter()
                .any(|c| c.type_param == constraint.type_param)
            {
                return Err(SchemaError::DuplicateTypeConstraint {
                    type_param: constraint.type_param,
                });
            }
        }

        for (side, slots) in [(Side::Input, &mut inputs), (Side::Output, &mut outputs)] {
            check_slots(side, slots, &type_constraints)?;
        }

        for (i, attr) in attributes.iter().enumerate() {
            if attributes[..i].iter().any(|a| a.name == attr.name) {
                return Err(SchemaError::DuplicateAttribute { name: attr.name });
            }
            if let AttrDefault::Value(value) = &attr.default {
                if value.kind() != attr.kind {
                    return Err(SchemaError::DefaultKindMismatch {
                        name: attr.name,
                        expected: attr.kind,
                        actual: value.kind(),
                    });
                }
            }
        }

        Ok(SchemaDescriptor {
            name,
            domain,
            since_version,
            doc,
            inputs,
            outputs,
            attributes,
            type_constraints,
            inference,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }

    /// Operator set version in which this version of the operator was
    /// introduced.
    pub fn since_version(&self) -> u32 {
        self.since_version
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Input slots, in index order.
    pub fn inputs(&self) -> &[FormalParameter] {
        &self.inputs
    }

    /// Output slots, in index order.
    pub fn outputs(&self) -> &[FormalParameter] {
        &self.outputs
    }

    pub fn attributes(&self) -> &[AttributeDecl] {
        &self.attributes
    }

    pub fn type_constraints(&self) -> &[TypeConstraint] {
        &self.type_constraints
    }

    /// Return the slot which receives the index'th input.
    ///
    /// A trailing variadic slot receives all inputs at or after its index.
    pub fn input(&self, index: usize) -> Option<&FormalParameter> {
        slot(&self.inputs, index)
    }

    /// Return the slot which produces the index'th output.
    pub fn output(&self, index: usize) -> Option<&FormalParameter> {
        slot(&self.outputs, index)
    }

    pub fn min_inputs(&self) -> usize {
        min_count(&self.inputs)
    }

    pub fn max_inputs(&self) -> usize {
        max_count(&self.inputs)
    }

    pub fn min_outputs(&self) -> usize {
        min_count(&self.outputs)
    }

    pub fn max_outputs(&self) -> usize {
        max_count(&self.outputs)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn type_constraint(&self, type_param: &str) -> Option<&TypeConstraint> {
        self.type_constraints
            .iter()
            .find(|c| c.type_param == type_param)
    }

    /// Run this operator's inference routine.
    pub fn infer(
        &self,
        attrs: &Attrs,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<(), InferShapesError> {
        (self.inference)(attrs, ctx)
    }
}

/// Sort slots by index and check they are well formed.
fn check_slots(
    side: Side,
    slots: &mut [FormalParameter],
    type_constraints: &[TypeConstraint],
) -> Result<(), SchemaError> {
    slots.sort_by_key(|slot| slot.index);

    for (expected_index, slot) in slots.iter().enumerate() {
        if slot.index < expected_index {
            return Err(SchemaError::DuplicateSlot {
                side,
                index: slot.index,
            });
        }
        if slot.index > expected_index {
            return Err(SchemaError::MissingSlot {
                side,
                index: expected_index,
            });
        }
        if slot.option == ParamOption::Variadic && expected_index + 1 != slots.len() {
            return Err(SchemaError::MisplacedVariadic {
                side,
                name: slot.name,
            });
        }
        if !type_constraints
            .iter()
            .any(|c| c.type_param == slot.type_param)
        {
            return Err(SchemaError::UndeclaredTypeParam {
                side,
                name: slot.name,
                type_param: slot.type_param,
            });
        }
    }

    Ok(())
}

fn slot(slots: &[FormalParameter], index: usize) -> Option<&FormalParameter> {
    match slots.get(index) {
        Some(slot) => Some(slot),
        None => slots
            .last()
            .filter(|slot| slot.option == ParamOption::Variadic),
    }
}

/// Minimum number of slots that must be supplied. This is the position after
/// the last required slot.
fn min_count(slots: &[FormalParameter]) -> usize {
    slots
        .iter()
        .rposition(|slot| slot.option == ParamOption::Single)
        .map(|pos| pos + 1)
        .unwrap_or(0)
}

fn max_count(slots: &[FormalParameter]) -> usize {
    match slots.last() {
        Some(slot) if slot.option == ParamOption::Variadic => usize::MAX,
        _ => slots.len(),
    }
}

impl fmt::Display for SchemaDescriptor {
    /// Format a human-readable reference for this operator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.domain.is_empty() {
            writeln!(f, "{}-{}", self.name, self.since_version)?;
        } else {
            writeln!(f, "{}.{}-{}", self.domain, self.name, self.since_version)?;
        }

        let doc = self.doc.trim();
        if !doc.is_empty() {
            writeln!(f)?;
            for line in doc.lines() {
                writeln!(f, "  {}", line.trim_end())?;
            }
        }

        if !self.attributes.is_empty() {
            writeln!(f, "\nAttributes")?;
            for attr in &self.attributes {
                match &attr.default {
                    AttrDefault::Required => {
                        writeln!(f, "  {} : {} (required)", attr.name, attr.kind)?
                    }
                    AttrDefault::Optional => writeln!(f, "  {} : {}", attr.name, attr.kind)?,
                    AttrDefault::Value(value) => writeln!(
                        f,
                        "  {} : {} (default is {})",
                        attr.name, attr.kind, value
                    )?,
                }
                writeln!(f, "    {}", attr.description)?;
            }
        }

        for (title, slots, min, max) in [
            ("Inputs", &self.inputs, self.min_inputs(), self.max_inputs()),
            ("Outputs", &self.outputs, self.min_outputs(), self.max_outputs()),
        ] {
            match (min, max) {
                _ if min == max => writeln!(f, "\n{} ({})", title, min)?,
                (_, usize::MAX) => writeln!(f, "\n{} ({} - ∞)", title, min)?,
                _ => writeln!(f, "\n{} ({} - {})", title, min, max)?,
            }
            for slot in slots.iter() {
                let suffix = match slot.option {
                    ParamOption::Single => "",
                    ParamOption::Optional => " (optional)",
                    ParamOption::Variadic => " (variadic)",
                };
                writeln!(f, "  {} : {}{}", slot.name, slot.type_param, suffix)?;
                writeln!(f, "    {}", slot.description)?;
            }
        }

        if !self.type_constraints.is_empty() {
            writeln!(f, "\nType Constraints")?;
            for constraint in &self.type_constraints {
                let types: Vec<_> = constraint
                    .allowed
                    .iter()
                    .map(|ty| ty.tensor_type_str())
                    .collect();
                writeln!(f, "  {} in ({})", constraint.type_param, types.join(", "))?;
                writeln!(f, "    {}", constraint.description)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nmdefs_shape_inference::{ElementType, InferShapesError, InferenceContext};
    use nmdefs_testing::TestCases;

    use super::{
        AttributeDecl, FormalParameter, SchemaDef, SchemaDescriptor, SchemaError, Side,
        TypeConstraint,
    };
    use crate::attrs::{AttributeKind, AttributeValue, Attrs};

    fn no_inference(
        _attrs: &Attrs,
        _ctx: &mut InferenceContext<'_>,
    ) -> Result<(), InferShapesError> {
        Ok(())
    }

    fn float_constraint() -> TypeConstraint {
        TypeConstraint::new(
            "T",
            [ElementType::Float32, ElementType::Float64],
            "Float tensors.",
        )
    }

    fn schema_def() -> SchemaDef {
        SchemaDef {
            name: "Test",
            domain: "",
            since_version: 1,
            doc: "A test operator.".into(),
            inputs: vec![
                FormalParameter::optional(2, "C", "T", "Third input."),
                FormalParameter::single(0, "A", "T", "First input."),
                FormalParameter::single(1, "B", "T", "Second input."),
            ],
            outputs: vec![FormalParameter::single(0, "Y", "T", "Output.")],
            attributes: vec![
                AttributeDecl::with_default("mode", "fast", "Mode."),
                AttributeDecl::optional("size", AttributeKind::Int, "Size."),
            ],
            type_constraints: vec![float_constraint()],
            inference: no_inference,
        }
    }

    #[test]
    fn test_new_sorts_slots() {
        let schema = SchemaDescriptor::new(schema_def()).unwrap();
        let names: Vec<_> = schema.inputs().iter().map(|slot| slot.name).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(schema.min_inputs(), 2);
        assert_eq!(schema.max_inputs(), 3);
        assert_eq!(schema.min_outputs(), 1);
        assert_eq!(schema.max_outputs(), 1);
        assert_eq!(schema.input(1).map(|slot| slot.name), Some("B"));
        assert_eq!(schema.input(3), None);
        assert_eq!(schema.attribute("size").map(|a| a.kind), Some(AttributeKind::Int));
        assert!(schema
            .type_constraint("T")
            .unwrap()
            .allows(ElementType::Float64));
    }

    #[test]
    fn test_variadic() {
        let mut def = schema_def();
        def.inputs = vec![
            FormalParameter::single(0, "A", "T", "First input."),
            FormalParameter::variadic(1, "rest", "T", "Other inputs."),
        ];
        let schema = SchemaDescriptor::new(def).unwrap();
        assert_eq!(schema.min_inputs(), 1);
        assert_eq!(schema.max_inputs(), usize::MAX);
        assert_eq!(schema.input(7).map(|slot| slot.name), Some("rest"));
    }

    #[test]
    fn test_invalid_schemas() {
        #[derive(Debug)]
        struct Case {
            modify: fn(&mut SchemaDef),
            expected: SchemaError,
        }

        let cases = [
            Case {
                modify: |def| def.inputs[0].index = 0,
                expected: SchemaError::DuplicateSlot {
                    side: Side::Input,
                    index: 0,
                },
            },
            Case {
                modify: |def| def.inputs[0].index = 3,
                expected: SchemaError::MissingSlot {
                    side: Side::Input,
                    index: 2,
                },
            },
            Case {
                modify: |def| def.outputs[0].index = 1,
                expected: SchemaError::MissingSlot {
                    side: Side::Output,
                    index: 0,
                },
            },
            Case {
                modify: |def| {
                    def.inputs[1] = FormalParameter::variadic(0, "A", "T", "First input.")
                },
                expected: SchemaError::MisplacedVariadic {
                    side: Side::Input,
                    name: "A",
                },
            },
            Case {
                modify: |def| {
                    def.outputs.push(FormalParameter::variadic(1, "Z1", "T", "Extra."));
                    def.outputs.push(FormalParameter::variadic(2, "Z2", "T", "Extra."));
                },
                expected: SchemaError::MisplacedVariadic {
                    side: Side::Output,
                    name: "Z1",
                },
            },
            Case {
                modify: |def| def.outputs[0].type_param = "U",
                expected: SchemaError::UndeclaredTypeParam {
                    side: Side::Output,
                    name: "Y",
                    type_param: "U",
                },
            },
            Case {
                modify: |def| def.type_constraints[0].allowed.clear(),
                expected: SchemaError::EmptyTypeConstraint { type_param: "T" },
            },
            Case {
                modify: |def| def.type_constraints.push(float_constraint()),
                expected: SchemaError::DuplicateTypeConstraint { type_param: "T" },
            },
            Case {
                modify: |def| {
                    def.attributes
                        .push(AttributeDecl::optional("mode", AttributeKind::Int, "Dupe."))
                },
                expected: SchemaError::DuplicateAttribute { name: "mode" },
            },
            Case {
                modify: |def| def.attributes[0].kind = AttributeKind::Int,
                expected: SchemaError::DefaultKindMismatch {
                    name: "mode",
                    expected: AttributeKind::Int,
                    actual: AttributeKind::String,
                },
            },
        ];

        cases.test_each(|case| {
            let mut def = schema_def();
            (case.modify)(&mut def);
            let err = SchemaDescriptor::new(def).err().unwrap();
            assert_eq!(err, case.expected);
        });
    }

    #[test]
    fn test_display() {
        let schema = SchemaDescriptor::new(schema_def()).unwrap();
        let text = schema.to_string();

        assert!(text.starts_with("Test-1\n"));
        assert!(text.contains("  mode : string (default is \"fast\")"));
        assert!(text.contains("\nInputs (2 - 3)\n"));
        assert!(text.contains("  C : T (optional)"));
        assert!(text.contains("\nOutputs (1)\n"));
        assert!(text.contains("  T in (tensor(float), tensor(double))"));
    }

    #[test]
    fn test_serialize() {
        let schema = SchemaDescriptor::new(schema_def()).unwrap();
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["name"], "Test");
        assert_eq!(json["inputs"][2]["option"], "optional");
        assert_eq!(json["attributes"][0]["default"]["value"], "fast");
        assert_eq!(json["type_constraints"][0]["allowed"][1], "double");
        assert!(json.get("inference").is_none());

        let attr = AttributeDecl::with_default("n", 3i64, "N.");
        assert_eq!(attr.default, super::AttrDefault::Value(AttributeValue::Int(3)));
    }
}
