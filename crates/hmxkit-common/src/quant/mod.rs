mod packing;
mod scheme;

pub use packing::*;
pub use scheme::*;
