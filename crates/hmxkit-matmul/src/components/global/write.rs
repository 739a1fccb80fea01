use crate::components::{
    CastFrom, HmxPrecision, MatmulError,
    layout::{ImageKind, TileImage, copy_tile_to_submatrix},
    tile::TileOrder,
};
use derive_new::new;
use hmxkit_tensor::{Element, MatrixViewMut, TensorDescriptor, TensorError};

/// Receives drained output tiles.
pub trait OutputSink<P: HmxPrecision> {
    /// Write the drained tile in `slot` to output tile `(row_tile, c_tile)`.
    fn write(&mut self, slot: &[u8], row_tile: usize, c_tile: usize) -> Result<(), MatmulError>;
}

/// An activation tile image receiving drained tiles with a plain copy.
#[derive(Debug)]
pub struct TiledOutput<'a> {
    image: TileImage,
    data: &'a mut [u8],
}

impl<'a> TiledOutput<'a> {
    /// Wrap a validated activation-tiled descriptor holding the drained element type of `P`.
    pub fn from_descriptor<P: HmxPrecision, D: AsMut<[u8]>>(
        tensor: &'a mut TensorDescriptor<D>,
    ) -> Result<Self, MatmulError> {
        let order = TileOrder::activation(tensor.dtype);
        if tensor.dtype != P::Out::DTYPE || order != Some(P::OUT_ORDER) {
            return Err(MatmulError::unsupported(format!(
                "a {:?} tile image can't receive {} output tiles",
                tensor.dtype,
                P::NAME
            )));
        }
        let image = TileImage::new(
            ImageKind::Activation,
            tensor.dtype,
            tensor.rows(),
            tensor.cols(),
        )?;
        let start = tensor.dtype.bytes_for(tensor.data_offset);
        let bytes = tensor.bytes_mut().ok_or(TensorError::NullBuffer)?;
        let data = bytes
            .get_mut(start..)
            .filter(|data| data.len() >= image.num_bytes())
            .ok_or_else(|| MatmulError::bad_param("the buffer is smaller than the image"))?;

        Ok(Self { image, data })
    }
}

impl<P: HmxPrecision> OutputSink<P> for TiledOutput<'_> {
    fn write(&mut self, slot: &[u8], row_tile: usize, c_tile: usize) -> Result<(), MatmulError> {
        if row_tile >= self.image.row_tiles() || c_tile >= self.image.col_tiles() {
            return Err(MatmulError::bad_param(format!(
                "tile ({row_tile}, {c_tile}) is outside the output image"
            )));
        }
        let size = self.image.tile_bytes();
        let start = self.image.tile_offset(row_tile, c_tile);
        let src = slot
            .get(..size)
            .ok_or_else(|| MatmulError::bad_param("the slot is smaller than a tile"))?;

        self.data[start..start + size].copy_from_slice(src);
        Ok(())
    }
}

/// A strided result receiving drained tiles through the inverse tile order, clipped to its extent.
#[derive(new, Debug)]
pub struct StridedOutput<'a, T> {
    view: MatrixViewMut<'a, T>,
}

impl<P: HmxPrecision, T: Element> OutputSink<P> for StridedOutput<'_, T>
where
    T: CastFrom<P::Out>,
{
    fn write(&mut self, slot: &[u8], row_tile: usize, c_tile: usize) -> Result<(), MatmulError> {
        copy_tile_to_submatrix::<P, T>(slot, &mut self.view, row_tile, c_tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{F16Precision, U8I8Precision, layout::ah_to_rm_i32};
    use hmxkit_tensor::{DType, TensorLayout, TensorMut, f16};

    #[test]
    fn tiled_output_copies_whole_tiles() {
        let mut slot = vec![0u8; 8192];
        for index in 0..64 * 32 {
            i32::write(&mut slot, index, index as i32);
        }
        let mut buffer = vec![0u8; 64 * 64 * 4];
        let mut tensor = TensorMut::tiled(
            buffer.as_mut_slice(),
            [64, 64],
            DType::I32,
            TensorLayout::RowMajorActivationHmx,
        );
        let mut sink = TiledOutput::from_descriptor::<U8I8Precision, _>(&mut tensor).unwrap();
        OutputSink::<U8I8Precision>::write(&mut sink, &slot, 0, 1).unwrap();
        assert!(OutputSink::<U8I8Precision>::write(&mut sink, &slot, 1, 0).is_err());

        let image: Vec<i32> = bytemuck::pod_collect_to_vec(&buffer);
        let mut matrix = vec![0i32; 64 * 64];
        ah_to_rm_i32(&mut matrix, &image, 64, 64).unwrap();
        assert_eq!(matrix[3 * 64 + 32 + 5], 3 * 32 + 5);
        assert_eq!(matrix[3 * 64 + 5], 0);
    }

    #[test]
    fn tiled_output_needs_the_drained_type() {
        let mut buffer = vec![0u8; 32 * 32 * 2];
        let mut tensor = TensorMut::tiled(
            buffer.as_mut_slice(),
            [32, 32],
            DType::F16,
            TensorLayout::RowMajorActivationHmx,
        );

        assert!(TiledOutput::from_descriptor::<F16Precision, _>(&mut tensor).is_ok());
        assert!(matches!(
            TiledOutput::from_descriptor::<U8I8Precision, _>(&mut tensor),
            Err(MatmulError::UnsupportedPipeline { .. })
        ));
    }

    #[test]
    fn strided_output_widens() {
        let order = F16Precision::OUT_ORDER;
        let mut slot = vec![0u8; 2048];
        f16::write(&mut slot, order.index(1, 2), f16::from_f32(1.5));
        let mut buffer = vec![0u8; 4 * 4 * 4];
        let view = MatrixViewMut::<f32>::row_major(&mut buffer, 4, 4);
        let mut sink = StridedOutput::new(view);

        OutputSink::<F16Precision>::write(&mut sink, &slot, 0, 0).unwrap();

        assert_eq!(f32::read(&buffer, 6), 1.5);
        assert_eq!(f32::read(&buffer, 5), 0.0);
    }
}
