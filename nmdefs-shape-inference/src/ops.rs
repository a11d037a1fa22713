//! Shape inference for the supported operator families.

mod recurrent;

pub use recurrent::{Direction, RecurrentCell};
