use crate::components::{
    CastFrom, HmxPrecision, MatmulError, MatmulIdent,
    layout::{ImageKind, TileImage, copy_submatrix_to_activation, copy_submatrix_to_weight},
};
use derive_new::new;
use hmxkit_tensor::{Element, MatrixView, TensorDescriptor};

/// Stages activation tiles of the left operand.
pub trait ActivationSource<P: HmxPrecision> {
    /// Stage tile `(row_tile, k_tile)` into `slot`.
    fn stage(&self, slot: &mut [u8], row_tile: usize, k_tile: usize) -> Result<(), MatmulError>;
}

/// Stages weight tiles of the right operand.
pub trait WeightSource<P: HmxPrecision> {
    /// Stage tile `(k_tile, c_tile)` into `slot`.
    fn stage(&self, slot: &mut [u8], k_tile: usize, c_tile: usize) -> Result<(), MatmulError>;
}

/// A whole-matrix tile image whose tiles are staged with a plain copy.
#[derive(Clone, Copy, Debug)]
pub struct TiledOperand<'a> {
    image: TileImage,
    data: &'a [u8],
}

impl<'a> TiledOperand<'a> {
    /// Wrap the bytes of an image.
    pub fn new(image: TileImage, data: &'a [u8]) -> Result<Self, MatmulError> {
        if data.len() < image.num_bytes() {
            return Err(MatmulError::bad_param(format!(
                "the {:?} image needs {} bytes, the buffer holds {}",
                image.kind,
                image.num_bytes(),
                data.len()
            )));
        }

        Ok(Self { image, data })
    }

    /// Wrap a validated tiled descriptor.
    pub fn from_descriptor<D: AsRef<[u8]>>(
        tensor: &'a TensorDescriptor<D>,
        ident: MatmulIdent,
    ) -> Result<Self, MatmulError> {
        let kind = match ident {
            MatmulIdent::Rhs => ImageKind::Weights,
            MatmulIdent::Lhs | MatmulIdent::Out => ImageKind::Activation,
        };
        let image = TileImage::new(kind, tensor.dtype, tensor.rows(), tensor.cols())?;
        let bytes = tensor
            .bytes()
            .ok_or(hmxkit_tensor::TensorError::NullBuffer)?;
        // Tile layouts are packed, an i4 offset is even.
        let start = tensor.dtype.bytes_for(tensor.data_offset);

        let data = bytes
            .get(start..)
            .ok_or_else(|| MatmulError::bad_param("the offset is past the end of the buffer"))?;

        Self::new(image, data)
    }

    /// Geometry of the image.
    pub fn image(&self) -> &TileImage {
        &self.image
    }

    fn copy_tile(
        &self,
        slot: &mut [u8],
        tile_row: usize,
        tile_col: usize,
    ) -> Result<(), MatmulError> {
        if tile_row >= self.image_tile_rows() || tile_col >= self.image_tile_cols() {
            return Err(MatmulError::bad_param(format!(
                "tile ({tile_row}, {tile_col}) is outside the {:?} image",
                self.image.kind
            )));
        }
        let size = self.image.tile_bytes();
        let start = self.image.tile_offset(tile_row, tile_col);
        let dst = slot
            .get_mut(..size)
            .ok_or_else(|| MatmulError::bad_param("the slot is smaller than a tile"))?;

        dst.copy_from_slice(&self.data[start..start + size]);
        Ok(())
    }

    // Tile grid in the tiled orientation, see `TileImage::tile_index`.
    fn image_tile_rows(&self) -> usize {
        match self.image.kind {
            ImageKind::Activation => self.image.row_tiles(),
            ImageKind::Weights => self.image.col_tiles(),
        }
    }

    fn image_tile_cols(&self) -> usize {
        match self.image.kind {
            ImageKind::Activation => self.image.col_tiles(),
            ImageKind::Weights => self.image.row_tiles(),
        }
    }

    fn check_order<P: HmxPrecision, E: Element>(&self, kind: ImageKind) -> Result<(), MatmulError> {
        if self.image.kind != kind || self.image.dtype != E::DTYPE {
            return Err(MatmulError::unsupported(format!(
                "a {:?} {:?} image can't feed the {} pipeline",
                self.image.dtype,
                self.image.kind,
                P::NAME
            )));
        }
        Ok(())
    }

    /// Check the image can feed activation tiles of `P`.
    pub fn as_activations<P: HmxPrecision>(self) -> Result<Self, MatmulError> {
        self.check_order::<P, P::Lhs>(ImageKind::Activation)?;
        Ok(self)
    }

    /// Check the image can feed weight tiles of `P`.
    pub fn as_weights<P: HmxPrecision>(self) -> Result<Self, MatmulError> {
        self.check_order::<P, P::Rhs>(ImageKind::Weights)?;
        Ok(self)
    }
}

impl<P: HmxPrecision> ActivationSource<P> for TiledOperand<'_> {
    fn stage(&self, slot: &mut [u8], row_tile: usize, k_tile: usize) -> Result<(), MatmulError> {
        self.copy_tile(slot, row_tile, k_tile)
    }
}

impl<P: HmxPrecision> WeightSource<P> for TiledOperand<'_> {
    fn stage(&self, slot: &mut [u8], k_tile: usize, c_tile: usize) -> Result<(), MatmulError> {
        self.copy_tile(slot, k_tile, c_tile)
    }
}

/// A strided operand transcoded tile by tile while staging.
#[derive(new, Clone, Copy, Debug)]
pub struct StridedOperand<'a, E> {
    view: MatrixView<'a, E>,
}

impl<P: HmxPrecision, S: Element> ActivationSource<P> for StridedOperand<'_, S>
where
    P::Lhs: CastFrom<S>,
{
    fn stage(&self, slot: &mut [u8], row_tile: usize, k_tile: usize) -> Result<(), MatmulError> {
        copy_submatrix_to_activation::<P, S>(slot, &self.view, row_tile, k_tile)
    }
}

impl<P: HmxPrecision> WeightSource<P> for StridedOperand<'_, P::Rhs> {
    fn stage(&self, slot: &mut [u8], k_tile: usize, c_tile: usize) -> Result<(), MatmulError> {
        copy_submatrix_to_weight::<P>(slot, &self.view, k_tile, c_tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{U8I8Precision, layout::rm_to_ah_u8};
    use hmxkit_tensor::{DType, TensorLayout, TensorRef};

    #[test]
    fn tiled_and_strided_sources_agree() {
        let (rows, cols) = (128, 64);
        let matrix: Vec<u8> = (0..rows * cols).map(|i| (i % 251) as u8).collect();
        let mut image = vec![0u8; rows * cols];
        rm_to_ah_u8(&mut image, &matrix, rows, cols).unwrap();

        let tensor = TensorRef::tiled(
            &image,
            [rows, cols],
            DType::U8,
            TensorLayout::RowMajorActivationHmx,
        );
        let tiled = TiledOperand::from_descriptor(&tensor, MatmulIdent::Lhs)
            .unwrap()
            .as_activations::<U8I8Precision>()
            .unwrap();
        let strided = StridedOperand::new(MatrixView::<u8>::row_major(&matrix, rows, cols));

        let mut expected = vec![0u8; 2048];
        let mut actual = vec![0u8; 2048];
        for row_tile in 0..2 {
            for k_tile in 0..2 {
                ActivationSource::<U8I8Precision>::stage(&strided, &mut expected, row_tile, k_tile)
                    .unwrap();
                ActivationSource::<U8I8Precision>::stage(&tiled, &mut actual, row_tile, k_tile)
                    .unwrap();
                assert_eq!(actual, expected);
            }
        }

        assert!(ActivationSource::<U8I8Precision>::stage(&tiled, &mut actual, 2, 0).is_err());
    }

    #[test]
    fn images_must_match_the_pipeline() {
        let image = vec![0u8; 32 * 32 * 2];
        let tensor = TensorRef::tiled(
            &image,
            [32, 32],
            DType::F16,
            TensorLayout::RowMajorWeightsHmx,
        );
        let operand = TiledOperand::from_descriptor(&tensor, MatmulIdent::Rhs).unwrap();

        assert!(matches!(
            operand.as_weights::<U8I8Precision>(),
            Err(MatmulError::UnsupportedPipeline { .. })
        ));
        assert!(operand.as_activations::<U8I8Precision>().is_err());
    }
}
