use crate::{DType, TensorLayout};
use thiserror::Error;

/// Errors reported while checking tensor descriptors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    /// The descriptor has no backing buffer.
    #[error("The tensor has no backing buffer")]
    NullBuffer,

    /// Rank, dimensions, strides, element count or bounds are inconsistent.
    #[error("Invalid tensor shape: {reason}")]
    BadShape {
        /// What is wrong with the shape.
        reason: String,
    },

    /// The dtype and quantization don't form a recognized pair.
    #[error("Unsupported dtype {dtype:?}: {reason}")]
    BadDType {
        /// Storage dtype of the tensor.
        dtype: DType,
        /// Why the dtype can't be used.
        reason: String,
    },

    /// The layout tag contradicts the rest of the descriptor.
    #[error("Invalid {layout:?} layout: {reason}")]
    BadLayout {
        /// Layout tag of the tensor.
        layout: TensorLayout,
        /// Why the layout is illegal.
        reason: String,
    },

    /// Operand shapes don't compose into a multiply.
    #[error(
        "Shape mismatch: expected left [R, K], right [C, K] and result [R, C], got left {left:?}, right {right:?}, result {result:?}"
    )]
    ShapeMismatch {
        /// Dims of the left operand.
        left: Vec<usize>,
        /// Dims of the right operand.
        right: Vec<usize>,
        /// Dims of the result.
        result: Vec<usize>,
    },

    /// Only the right operand may be quantized.
    #[error("The {operand} operand can't be quantized")]
    UnsupportedQuantization {
        /// Name of the offending operand.
        operand: &'static str,
    },

    /// Multiply operands must be matrices.
    #[error("The {operand} operand has rank {rank}, only rank 2 is supported")]
    UnsupportedRank {
        /// Name of the offending operand.
        operand: &'static str,
        /// Its rank.
        rank: usize,
    },
}

impl TensorError {
    pub(crate) fn bad_shape(reason: impl Into<String>) -> Self {
        TensorError::BadShape {
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_layout(layout: TensorLayout, reason: impl Into<String>) -> Self {
        TensorError::BadLayout {
            layout,
            reason: reason.into(),
        }
    }
}
