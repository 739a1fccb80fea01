pub mod global;
pub mod layout;
pub mod tile;

mod cast;
mod error;
mod ident;
mod pipeline;
mod precision;
mod problem;
mod scratchpad;

pub use cast::*;
pub use error::*;
pub use ident::*;
pub use pipeline::*;
pub use precision::*;
pub use problem::*;
pub use scratchpad::*;
