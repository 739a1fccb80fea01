use serde::{Deserialize, Serialize};

/// Memory layout tag of a tensor.
///
/// The tiled variants describe whole-matrix tile images. Their `dims` stay the logical matrix
/// dims, the tile order is fixed by the precision:
///
/// ```text
/// Activation image (row-major tile order)    Weight image (column-tile-major order)
///
///      k0   k1   k2                                 c0   c1
///   r0 [ 0 ][ 1 ][ 2 ]                          k0 [ 0 ][ 3 ]
///   r1 [ 3 ][ 4 ][ 5 ]                          k1 [ 1 ][ 4 ]
///                                               k2 [ 2 ][ 5 ]
/// ```
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorLayout {
    /// One-dimensional buffer.
    Linear1D,
    /// Row-major matrix.
    RowMajor2D,
    /// Column-major matrix.
    ColMajor2D,
    /// Weight tile image, tiles in row-major element order.
    RowMajorWeightsHmx,
    /// Activation tile image, tiles in row-major element order.
    RowMajorActivationHmx,
    /// Weight tile image, tiles in column-major element order.
    ColMajorWeightsHmx,
    /// Activation tile image, tiles in column-major element order.
    ColMajorActivationHmx,
}

impl TensorLayout {
    /// Whether the layout is a hardware tile image.
    pub fn is_tiled(&self) -> bool {
        matches!(
            self,
            TensorLayout::RowMajorWeightsHmx
                | TensorLayout::RowMajorActivationHmx
                | TensorLayout::ColMajorWeightsHmx
                | TensorLayout::ColMajorActivationHmx
        )
    }

    /// Whether the layout is a weight tile image.
    pub fn is_weights(&self) -> bool {
        matches!(
            self,
            TensorLayout::RowMajorWeightsHmx | TensorLayout::ColMajorWeightsHmx
        )
    }

    /// Whether elements are packed column by column.
    pub fn is_col_major(&self) -> bool {
        matches!(
            self,
            TensorLayout::ColMajor2D
                | TensorLayout::ColMajorWeightsHmx
                | TensorLayout::ColMajorActivationHmx
        )
    }

    /// Rank required by the layout.
    pub fn rank(&self) -> usize {
        match self {
            TensorLayout::Linear1D => 1,
            _ => 2,
        }
    }
}
