//! Spiking recurrent cell and layer operators.
//!
//! The operators in this family share one input, output and attribute
//! layout, modeled on the standard ONNX recurrent operators, and one shape
//! inference routine. They differ in name, documentation and neuron
//! parameter attributes.

use crate::attrs::{AttributeKind, Attrs};
use crate::schema::{
    AttributeDecl, FormalParameter, SchemaDef, SchemaDescriptor, SchemaError, TypeConstraint,
};
use nmdefs_shape_inference::ops::{Direction, RecurrentCell};
use nmdefs_shape_inference::{ElementType, InferShapes, InferShapesError, InferenceContext};

/// Operator set version in which the neuromorphic operators were introduced.
pub const NEUROMORPHIC_OPSET_VERSION: u32 = 10;

pub const LIF_CELL: &str = "LIFCell";
pub const LIF_LAYER: &str = "LIFLayer";
pub const LSNN_CELL: &str = "LSNNCell";
pub const LSNN_LAYER: &str = "LSNNLayer";
pub const ADEX_CELL: &str = "ADEXCell";
pub const ADEX_LAYER: &str = "ADEXLayer";

const OPTIONAL_ARGUMENTS_DOC: &str = "
This operator has optional inputs and outputs. A missing argument is
represented by an empty name. Optional arguments at the end of the input or
output list may be left out entirely.
";

/// Parameters which distinguish one operator of the family from another.
pub struct CellDef {
    pub name: &'static str,
    pub doc: &'static str,

    /// Attributes in addition to those common to the family.
    pub attributes: Vec<AttributeDecl>,
}

/// Neuron parameters declared by some operators of the family. These are
/// used only when executing the operator.
fn membrane_attributes() -> Vec<AttributeDecl> {
    vec![
        AttributeDecl::optional(
            "v_thresh",
            AttributeKind::Floats,
            "Membrane voltage threshold.",
        ),
        AttributeDecl::optional("v_leak", AttributeKind::Floats, "Membrane voltage leak."),
        AttributeDecl::optional("v_reset", AttributeKind::Floats, "Membrane voltage reset."),
    ]
}

/// Build the schema for one operator of the recurrent cell family.
pub fn recurrent_schema(def: CellDef) -> Result<SchemaDescriptor, SchemaError> {
    let CellDef {
        name,
        doc,
        attributes: extra_attributes,
    } = def;

    let mut attributes = vec![
        AttributeDecl::with_default(
            "direction",
            Direction::Forward.as_str(),
            "Whether the sequence is processed forward, reversed or in both \
             directions. One of \"forward\" (default), \"reverse\" or \
             \"bidirectional\".",
        ),
        AttributeDecl::optional(
            "hidden_size",
            AttributeKind::Int,
            "Number of neurons in the hidden layer.",
        ),
        AttributeDecl::optional(
            "activation_alpha",
            AttributeKind::Floats,
            "Scaling values for activation functions that take an alpha \
             parameter, in the order the activations are applied.",
        ),
        AttributeDecl::optional(
            "activation_beta",
            AttributeKind::Floats,
            "Scaling values for activation functions that take a beta \
             parameter, in the order the activations are applied.",
        ),
    ];
    attributes.extend(extra_attributes);

    SchemaDescriptor::new(SchemaDef {
        name,
        domain: "",
        since_version: NEUROMORPHIC_OPSET_VERSION,
        doc: format!("{}\n{}", doc.trim(), OPTIONAL_ARGUMENTS_DOC),
        inputs: vec![
            FormalParameter::single(
                0,
                "X",
                "T",
                "Input sequences, padded and packed into a tensor of shape \
                 `[seq_length, batch_size, input_size]`.",
            ),
            FormalParameter::single(
                1,
                "W",
                "T",
                "Input weights for each direction. Has shape \
                 `[num_directions, 4*hidden_size, input_size]`.",
            ),
            FormalParameter::single(
                2,
                "R",
                "T",
                "Recurrence weights for each direction. Has shape \
                 `[num_directions, 4*hidden_size, hidden_size]`.",
            ),
            FormalParameter::optional(
                3,
                "sequence_lens",
                "T1",
                "Length of each sequence in the batch, with shape `[batch_size]`. \
                 If omitted every sequence has length `seq_length`.",
            ),
            FormalParameter::optional(
                4,
                "initial_h",
                "T",
                "Initial hidden state with shape \
                 `[num_directions, batch_size, hidden_size]`. Zero if omitted.",
            ),
        ],
        outputs: vec![
            FormalParameter::optional(
                0,
                "Y",
                "T",
                "Hidden state at every step, with shape \
                 `[seq_length, num_directions, batch_size, hidden_size]`.",
            ),
            FormalParameter::optional(
                1,
                "Y_h",
                "T",
                "Hidden state after the last step, with shape \
                 `[num_directions, batch_size, hidden_size]`.",
            ),
        ],
        attributes,
        type_constraints: vec![
            TypeConstraint::new(
                "T",
                [
                    ElementType::Float16,
                    ElementType::Float32,
                    ElementType::Float64,
                ],
                "Constrain input and output types to float tensors.",
            ),
            TypeConstraint::new(
                "T1",
                [ElementType::Int32],
                "Constrain sequence lengths to integer tensors.",
            ),
        ],
        inference: infer_recurrent,
    })
}

/// Resolve a node's attributes into the configuration used for inference.
///
/// A missing `direction` means "forward". An unrecognized direction, or a
/// `hidden_size` that is missing or not positive, leaves the corresponding
/// dimension unknown.
pub fn recurrent_cell_from_attrs(attrs: &Attrs) -> RecurrentCell {
    let direction = attrs
        .get_str("direction")
        .unwrap_or(Direction::Forward.as_str());
    let hidden_size = attrs
        .get_int("hidden_size")
        .filter(|&size| size > 0)
        .and_then(|size| usize::try_from(size).ok());

    RecurrentCell {
        direction: Direction::parse(direction),
        hidden_size,
    }
}

/// Shape inference routine shared by the recurrent cell family.
pub fn infer_recurrent(
    attrs: &Attrs,
    ctx: &mut InferenceContext<'_>,
) -> Result<(), InferShapesError> {
    let cell = recurrent_cell_from_attrs(attrs);
    log::trace!("Recurrent cell config {:?}", cell);
    cell.infer_shapes(ctx)
}

/// Build the schemas for all operators in the family.
pub fn all_schemas() -> Result<Vec<SchemaDescriptor>, SchemaError> {
    let defs = [
        CellDef {
            name: LIF_CELL,
            doc: "Leaky integrate-and-fire (LIF) neuron cell.",
            attributes: Vec::new(),
        },
        CellDef {
            name: LIF_LAYER,
            doc: "Layer of leaky integrate-and-fire (LIF) neurons.",
            attributes: membrane_attributes(),
        },
        CellDef {
            name: LSNN_CELL,
            doc: "Long short-term memory spiking neural network (LSNN) cell, \
                  built from adaptive LIF neurons.",
            attributes: membrane_attributes(),
        },
        CellDef {
            name: LSNN_LAYER,
            doc: "Layer of long short-term memory spiking neural network (LSNN) \
                  neurons.",
            attributes: Vec::new(),
        },
        CellDef {
            name: ADEX_CELL,
            doc: "Adaptive exponential integrate-and-fire (AdEx) neuron cell.",
            attributes: Vec::new(),
        },
        CellDef {
            name: ADEX_LAYER,
            doc: "Layer of adaptive exponential integrate-and-fire (AdEx) neurons.",
            attributes: Vec::new(),
        },
    ];
    defs.into_iter().map(recurrent_schema).collect()
}
