#![warn(missing_docs)]

//! Tiled matrix multiplication with an explicit scratchpad budget.
//!
//! `A = X · Wᵗ` is decomposed in hardware-sized tiles. Activation tiles of a row are staged in the
//! scratchpad, weight tiles stream through a single slot, and a modeled accumulator sums tile
//! products before draining them in the output tile order. Three numeric pipelines share the same
//! control flow, see [components::HmxPrecision].
//!
//! The entry point is [multiply], the `mm_*` functions are fixed-signature shortcuts built on it.

mod base;

/// Components of the tiled engine: precisions, tile orders, the accumulator, scratchpad planning
/// and tile movement.
pub mod components;
/// Matmul kernels.
pub mod kernels;

#[cfg(test)]
mod tests;

pub use base::*;
