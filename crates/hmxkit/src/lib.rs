pub use hmxkit_tensor::*;

pub use hmxkit_common as common;

#[cfg(feature = "matmul")]
pub use hmxkit_matmul as matmul;
