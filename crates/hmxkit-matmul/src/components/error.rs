use crate::components::tile::AccumulatorState;
use hmxkit_tensor::TensorError;
use thiserror::Error;

/// Errors that can occur while preparing or running a matmul.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatmulError {
    /// A descriptor is invalid or the operands don't form a multiply.
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// No pipeline handles this combination of platform, dtypes and layouts.
    #[error("Unsupported pipeline: {reason}")]
    UnsupportedPipeline {
        /// Why no pipeline applies.
        reason: String,
    },

    /// The scratchpad can't be partitioned for the problem.
    #[error("Insufficient scratchpad of {size} bytes: {reason}")]
    InsufficientScratchpad {
        /// Scratchpad size in bytes.
        size: usize,
        /// Which requirement failed.
        reason: String,
    },

    /// A tile index or buffer size falls outside its valid extent.
    #[error("Bad parameter: {reason}")]
    BadParam {
        /// What is out of range.
        reason: String,
    },

    /// The accumulator was used out of order.
    #[error("Can't {operation} an accumulator in state {state:?}")]
    AccumulatorState {
        /// The rejected operation.
        operation: &'static str,
        /// State of the accumulator at that time.
        state: AccumulatorState,
    },
}

impl MatmulError {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        MatmulError::UnsupportedPipeline {
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_param(reason: impl Into<String>) -> Self {
        MatmulError::BadParam {
            reason: reason.into(),
        }
    }

    pub(crate) fn scratchpad(size: usize, reason: impl Into<String>) -> Self {
        MatmulError::InsufficientScratchpad {
            size,
            reason: reason.into(),
        }
    }
}
