use derive_new::new;
use serde::{Deserialize, Serialize};

/// Storage data type of a tensor.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    /// Signed 4-bit integer, two values per byte, low nibble first.
    I4,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 32-bit integer.
    I32,
    /// 16-bit float.
    F16,
    /// 32-bit float.
    F32,
}

/// Rows and columns of one hardware tile.
#[derive(new, Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct TileGeometry {
    /// Number of rows of a tile.
    pub rows: usize,
    /// Number of columns of a tile.
    pub cols: usize,
}

impl TileGeometry {
    /// Number of elements in a tile.
    pub fn num_elements(&self) -> usize {
        self.rows * self.cols
    }
}

impl DType {
    /// Size of one element in bits.
    pub fn size_bits(&self) -> usize {
        match self {
            DType::I4 => 4,
            DType::I8 | DType::U8 => 8,
            DType::F16 => 16,
            DType::I32 | DType::F32 => 32,
        }
    }

    /// Whether the dtype is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(self, DType::I4 | DType::I8 | DType::U8 | DType::I32)
    }

    /// Number of bytes needed to store `num_elements` elements.
    pub fn bytes_for(&self, num_elements: usize) -> usize {
        (num_elements * self.size_bits()).div_ceil(8)
    }

    /// Number of whole elements held by a buffer of `num_bytes` bytes.
    pub fn elements_in(&self, num_bytes: usize) -> usize {
        num_bytes * 8 / self.size_bits()
    }

    /// Tile geometry of an activation-tiled matrix of this dtype.
    ///
    /// 32-bit integers are accumulator output tiles of the 8-bit pipelines and share their
    /// geometry.
    pub fn activation_tile(&self) -> Option<TileGeometry> {
        match self {
            DType::F16 => Some(TileGeometry::new(32, 32)),
            DType::U8 | DType::I8 | DType::I32 => Some(TileGeometry::new(64, 32)),
            DType::I4 | DType::F32 => None,
        }
    }

    /// Tile geometry of a weight-tiled matrix of this dtype.
    pub fn weight_tile(&self) -> Option<TileGeometry> {
        match self {
            DType::F16 | DType::I8 | DType::I4 => Some(TileGeometry::new(32, 32)),
            DType::U8 | DType::I32 | DType::F32 => None,
        }
    }
}
