use crate::components::{MatmulError, tile::TileOrder};
use hmxkit_tensor::DType;

/// Which hardware tiling an image uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// Activation tiling (AH): tiles cover the stored matrix as is and follow each other in
    /// row-major tile order.
    Activation,
    /// Weight tiling (WH): the stored matrix is `[C, K]`, tiles cover its transpose `[K, C]` and
    /// follow each other column-tile by column-tile.
    Weights,
}

/// Geometry of a whole-matrix tile image.
///
/// `rows` and `cols` are the dims of the stored matrix, already multiples of the tile.
///
/// ```text
/// Activation [R, K], tile t = row_tile * k_tiles + k_tile
///
///   ┌────┬────┬────┐
///   │ t0 │ t1 │ t2 │
///   ├────┼────┼────┤
///   │ t3 │ t4 │ t5 │
///   └────┴────┴────┘
///
/// Weights stored [C, K], tiles over [K, C], t = c_tile * k_tiles + k_tile
///
///   ┌────┬────┬────┐
///   │ t0 │ t3 │ t6 │  k_tile 0
///   ├────┼────┼────┤
///   │ t1 │ t4 │ t7 │  k_tile 1
///   ├────┼────┼────┤
///   │ t2 │ t5 │ t8 │  k_tile 2
///   └────┴────┴────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileImage {
    /// Tiling of the image.
    pub kind: ImageKind,
    /// In-tile order.
    pub order: TileOrder,
    /// Element type.
    pub dtype: DType,
    /// Rows of the stored matrix.
    pub rows: usize,
    /// Columns of the stored matrix.
    pub cols: usize,
}

impl TileImage {
    /// The image of a `rows x cols` matrix, whose dims must be tile multiples.
    pub fn new(
        kind: ImageKind,
        dtype: DType,
        rows: usize,
        cols: usize,
    ) -> Result<Self, MatmulError> {
        let order = Self::order_of(kind, dtype)?;
        let (tile_rows, tile_cols) = Self::stored_tile(kind, &order);

        if rows == 0 || cols == 0 || rows % tile_rows != 0 || cols % tile_cols != 0 {
            return Err(MatmulError::bad_param(format!(
                "{rows}x{cols} isn't a multiple of the {tile_rows}x{tile_cols} {dtype:?} tile"
            )));
        }

        Ok(Self {
            kind,
            order,
            dtype,
            rows,
            cols,
        })
    }

    /// The image of a `rows x cols` matrix zero-padded to the next tile multiples.
    pub fn padded(
        kind: ImageKind,
        dtype: DType,
        rows: usize,
        cols: usize,
    ) -> Result<Self, MatmulError> {
        let order = Self::order_of(kind, dtype)?;
        let (tile_rows, tile_cols) = Self::stored_tile(kind, &order);

        Self::new(
            kind,
            dtype,
            rows.div_ceil(tile_rows) * tile_rows,
            cols.div_ceil(tile_cols) * tile_cols,
        )
    }

    fn order_of(kind: ImageKind, dtype: DType) -> Result<TileOrder, MatmulError> {
        let order = match kind {
            ImageKind::Activation => TileOrder::activation(dtype),
            ImageKind::Weights => TileOrder::weights(dtype),
        };
        order.ok_or_else(|| {
            MatmulError::bad_param(format!("{dtype:?} has no {kind:?} tile image"))
        })
    }

    // Rows and columns of one tile measured on the stored matrix.
    fn stored_tile(kind: ImageKind, order: &TileOrder) -> (usize, usize) {
        match kind {
            ImageKind::Activation => (order.rows, order.cols),
            ImageKind::Weights => (order.cols, order.rows),
        }
    }

    /// Rows of the tile grid over the stored matrix.
    pub fn row_tiles(&self) -> usize {
        self.rows / Self::stored_tile(self.kind, &self.order).0
    }

    /// Columns of the tile grid over the stored matrix.
    pub fn col_tiles(&self) -> usize {
        self.cols / Self::stored_tile(self.kind, &self.order).1
    }

    /// Bytes of one tile.
    pub fn tile_bytes(&self) -> usize {
        self.dtype.bytes_for(self.order.num_elements())
    }

    /// Bytes of the whole image.
    pub fn num_bytes(&self) -> usize {
        self.row_tiles() * self.col_tiles() * self.tile_bytes()
    }

    /// Position of tile `(tile_row, tile_col)` in the image, counted in tiles.
    ///
    /// Tile coordinates follow the tiled orientation: `(row_tile, k_tile)` for activations and
    /// `(k_tile, c_tile)` for weights.
    pub fn tile_index(&self, tile_row: usize, tile_col: usize) -> usize {
        match self.kind {
            ImageKind::Activation => tile_row * self.col_tiles() + tile_col,
            ImageKind::Weights => tile_col * self.col_tiles() + tile_row,
        }
    }

    /// Byte offset of tile `(tile_row, tile_col)`, see [tile_index](TileImage::tile_index).
    pub fn tile_offset(&self, tile_row: usize, tile_col: usize) -> usize {
        self.tile_index(tile_row, tile_col) * self.tile_bytes()
    }

    /// Element index of `(row, col)` of the stored matrix in the image.
    pub fn element_index(&self, row: usize, col: usize) -> usize {
        let (tile_rows, tile_cols) = Self::stored_tile(self.kind, &self.order);
        let tile_elements = self.order.num_elements();
        let (r, c) = (row % tile_rows, col % tile_cols);

        match self.kind {
            ImageKind::Activation => {
                self.tile_index(row / tile_rows, col / tile_cols) * tile_elements
                    + self.order.index(r, c)
            }
            ImageKind::Weights => {
                self.tile_index(col / tile_cols, row / tile_rows) * tile_elements
                    + self.order.index(c, r)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_tiles_are_row_major() {
        let image = TileImage::new(ImageKind::Activation, DType::U8, 128, 96).unwrap();

        assert_eq!(image.row_tiles(), 2);
        assert_eq!(image.col_tiles(), 3);
        assert_eq!(image.tile_offset(1, 2), 5 * 2048);
        assert_eq!(image.element_index(64, 32), 4 * 2048);
        assert_eq!(image.element_index(1, 0), 1);
        assert_eq!(image.num_bytes(), 6 * 2048);
    }

    #[test]
    fn weight_tiles_are_column_tile_major() {
        // Stored [C, K] = [64, 96], so 3 k-tiles by 2 c-tiles.
        let image = TileImage::new(ImageKind::Weights, DType::I4, 64, 96).unwrap();

        assert_eq!(image.tile_bytes(), 512);
        assert_eq!(image.tile_index(2, 0), 2);
        assert_eq!(image.tile_index(0, 1), 3);
        // W[c = 33][k = 65] is logical (k = 65, c = 33): k-tile 2, c-tile 1.
        assert_eq!(
            image.element_index(33, 65),
            5 * 1024 + TileOrder::I4_WEIGHTS.index(1, 1)
        );
    }

    #[test]
    fn images_cover_every_element_once() {
        for (kind, dtype, rows, cols) in [
            (ImageKind::Activation, DType::F16, 64, 96),
            (ImageKind::Activation, DType::I32, 128, 64),
            (ImageKind::Weights, DType::I8, 96, 64),
        ] {
            let image = TileImage::new(kind, dtype, rows, cols).unwrap();
            let mut seen = vec![false; rows * cols];
            for row in 0..rows {
                for col in 0..cols {
                    let index = image.element_index(row, col);
                    assert!(!seen[index]);
                    seen[index] = true;
                }
            }
        }
    }

    #[test]
    fn padding_rounds_up() {
        let image = TileImage::padded(ImageKind::Weights, DType::I4, 33, 1).unwrap();

        assert_eq!((image.rows, image.cols), (64, 32));
        assert!(TileImage::new(ImageKind::Activation, DType::U8, 32, 32).is_err());
        assert!(TileImage::new(ImageKind::Weights, DType::U8, 32, 32).is_err());
        assert!(TileImage::new(ImageKind::Activation, DType::F32, 32, 32).is_err());
    }
}
