//! Operator schema definitions.

mod neuromorphic;

pub use neuromorphic::{
    all_schemas, infer_recurrent, recurrent_cell_from_attrs, recurrent_schema, CellDef,
    ADEX_CELL, ADEX_LAYER, LIF_CELL, LIF_LAYER, LSNN_CELL, LSNN_LAYER,
    NEUROMORPHIC_OPSET_VERSION,
};
