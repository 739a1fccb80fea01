/// Matmul config module.
pub mod matmul;
/// Layout transcoding config module.
pub mod transcode;

mod base;
mod logger;

pub use base::*;
pub use logger::*;
