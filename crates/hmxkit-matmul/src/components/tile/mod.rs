//! In-tile element orders and the accumulator state machine.

mod accumulator;
mod order;

pub use accumulator::*;
pub use order::*;
