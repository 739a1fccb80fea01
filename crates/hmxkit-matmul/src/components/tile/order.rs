use hmxkit_tensor::{DType, Element};

/// In-tile element order of a hardware tile.
///
/// Rows are grouped in bundles of `group` rows. Inside a bundle the values of one column are
/// adjacent, so a lane consumes `group` consecutive rows of a column at once:
///
/// ```text
/// Tile 4x3, group 2                 Memory
///
///   [ a0 a1 a2 ]
///   [ b0 b1 b2 ]     ─────►     a0 b0 a1 b1 a2 b2 c0 d0 c1 d1 c2 d2
///   [ c0 c1 c2 ]
///   [ d0 d1 d2 ]
/// ```
///
/// A group of 1 is plain row-major order.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct TileOrder {
    /// Number of rows of the tile.
    pub rows: usize,
    /// Number of columns of the tile.
    pub cols: usize,
    /// Number of rows interleaved together.
    pub group: usize,
}

impl TileOrder {
    /// 32x32 half-precision activation and output tiles.
    pub const F16_ACTIVATION: TileOrder = TileOrder::new(32, 32, 2);
    /// 64x32 8-bit activation tiles.
    pub const B8_ACTIVATION: TileOrder = TileOrder::new(64, 32, 4);
    /// 64x32 32-bit accumulator output tiles.
    pub const I32_OUTPUT: TileOrder = TileOrder::new(64, 32, 1);
    /// 32x32 half-precision weight tiles.
    pub const F16_WEIGHTS: TileOrder = TileOrder::new(32, 32, 2);
    /// 32x32 8-bit weight tiles.
    pub const I8_WEIGHTS: TileOrder = TileOrder::new(32, 32, 4);
    /// 32x32 4-bit weight tiles, a bundle of 8 nibbles fills 4 bytes.
    pub const I4_WEIGHTS: TileOrder = TileOrder::new(32, 32, 8);

    /// Create a new tile order. `group` must divide `rows`.
    pub const fn new(rows: usize, cols: usize, group: usize) -> Self {
        assert!(group > 0 && rows % group == 0);
        Self { rows, cols, group }
    }

    /// Order of activation-tiled (AH) images of the given dtype.
    pub fn activation(dtype: DType) -> Option<Self> {
        match dtype {
            DType::F16 => Some(Self::F16_ACTIVATION),
            DType::U8 | DType::I8 => Some(Self::B8_ACTIVATION),
            DType::I32 => Some(Self::I32_OUTPUT),
            DType::I4 | DType::F32 => None,
        }
    }

    /// Order of weight-tiled (WH) images of the given dtype.
    pub fn weights(dtype: DType) -> Option<Self> {
        match dtype {
            DType::F16 => Some(Self::F16_WEIGHTS),
            DType::I8 => Some(Self::I8_WEIGHTS),
            DType::I4 => Some(Self::I4_WEIGHTS),
            DType::U8 | DType::I32 | DType::F32 => None,
        }
    }

    /// Number of elements in a tile.
    pub const fn num_elements(&self) -> usize {
        self.rows * self.cols
    }

    /// Position of `(row, col)` in the tile.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        (row / self.group) * (self.group * self.cols) + col * self.group + row % self.group
    }

    /// Inverse of [index](TileOrder::index).
    #[inline]
    pub fn position(&self, index: usize) -> (usize, usize) {
        let bundle = self.group * self.cols;
        let within = index % bundle;

        ((index / bundle) * self.group + within % self.group, within / self.group)
    }

    /// Reorder a row-major tile into tile order.
    pub fn to_tiled<E: Element>(&self, flat: &[u8], tiled: &mut [u8]) {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let value = E::read(flat, row * self.cols + col);
                E::write(tiled, self.index(row, col), value);
            }
        }
    }

    /// Reorder a tile in tile order back to row-major order.
    pub fn to_flat<E: Element>(&self, tiled: &[u8], flat: &mut [u8]) {
        for index in 0..self.num_elements() {
            let (row, col) = self.position(index);
            E::write(flat, row * self.cols + col, E::read(tiled, index));
        }
    }
}
