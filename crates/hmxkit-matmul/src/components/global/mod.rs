//! Movement of tiles between caller buffers and scratchpad slots.

mod read;
mod write;

pub use read::*;
pub use write::*;
