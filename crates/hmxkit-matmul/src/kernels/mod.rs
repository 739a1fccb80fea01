/// Tiled matmul staging every tile through the scratchpad.
pub mod blocked;
/// Naive triple loop over strided views, sharing the numerics of the tiled engine.
pub mod naive;
