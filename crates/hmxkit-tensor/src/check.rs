use crate::{TensorDescriptor, TensorError};

/// Check that three descriptors form the multiply `result = left · rightᵗ`.
///
/// The right operand is stored as `[C, K]`: with `left = [R, K]` the result must be `[R, C]`.
/// Only the right operand (the weights) may carry quantization.
pub fn check_mm<A, B, C>(
    result: &TensorDescriptor<A>,
    left: &TensorDescriptor<B>,
    right: &TensorDescriptor<C>,
) -> Result<(), TensorError> {
    for (operand, rank) in [
        ("result", result.ndims()),
        ("left", left.ndims()),
        ("right", right.ndims()),
    ] {
        if rank != 2 {
            return Err(TensorError::UnsupportedRank { operand, rank });
        }
    }

    let (r, k) = (left.rows(), left.cols());
    let c = right.rows();

    if right.cols() != k || result.rows() != r || result.cols() != c {
        return Err(TensorError::ShapeMismatch {
            left: left.dims.to_vec(),
            right: right.dims.to_vec(),
            result: result.dims.to_vec(),
        });
    }

    if left.is_quantized() {
        return Err(TensorError::UnsupportedQuantization { operand: "left" });
    }
    if result.is_quantized() {
        return Err(TensorError::UnsupportedQuantization { operand: "result" });
    }

    Ok(())
}
