use crate::components::{CastFrom, HmxPrecision, MatmulError};
use hmxkit_tensor::{Element, MatrixView, MatrixViewMut};

/// Stage the activation tile `(tile_row, tile_col)` of `src` into `slot`, in the activation tile
/// order of `P`.
///
/// Cells beyond the extent of `src` are staged as zero.
pub fn copy_submatrix_to_activation<P: HmxPrecision, S: Element>(
    slot: &mut [u8],
    src: &MatrixView<'_, S>,
    tile_row: usize,
    tile_col: usize,
) -> Result<(), MatmulError>
where
    P::Lhs: CastFrom<S>,
{
    let order = P::LHS_ORDER;
    check_tile(src.rows(), src.cols(), order.rows, order.cols, tile_row, tile_col)?;
    check_slot(slot.len(), P::lhs_tile_bytes())?;

    let (row0, col0) = (tile_row * order.rows, tile_col * order.cols);
    for r in 0..order.rows {
        for c in 0..order.cols {
            let value = P::Lhs::cast_from(src.get_or_zero(row0 + r, col0 + c));
            P::Lhs::write(slot, order.index(r, c), value);
        }
    }
    Ok(())
}

/// Stage the weight tile `(k_tile, c_tile)` of the stored `[C, K]` matrix `src` into `slot`.
///
/// The tile holds the transposed block `Wt[k][c] = W[c][k]` in the weight tile order of `P`, cells
/// beyond the extent of `src` are staged as zero.
pub fn copy_submatrix_to_weight<P: HmxPrecision>(
    slot: &mut [u8],
    src: &MatrixView<'_, P::Rhs>,
    k_tile: usize,
    c_tile: usize,
) -> Result<(), MatmulError> {
    let order = P::RHS_ORDER;
    check_tile(src.cols(), src.rows(), order.rows, order.cols, k_tile, c_tile)?;
    check_slot(slot.len(), P::rhs_tile_bytes())?;

    let (k0, c0) = (k_tile * order.rows, c_tile * order.cols);
    for k in 0..order.rows {
        for c in 0..order.cols {
            P::Rhs::write(slot, order.index(k, c), src.get_or_zero(c0 + c, k0 + k));
        }
    }
    Ok(())
}

/// Write the drained output tile in `slot` to tile `(tile_row, tile_col)` of `dst`.
///
/// Only cells inside the extent of `dst` are written.
pub fn copy_tile_to_submatrix<P: HmxPrecision, T: Element>(
    slot: &[u8],
    dst: &mut MatrixViewMut<'_, T>,
    tile_row: usize,
    tile_col: usize,
) -> Result<(), MatmulError>
where
    T: CastFrom<P::Out>,
{
    let order = P::OUT_ORDER;
    check_tile(dst.rows(), dst.cols(), order.rows, order.cols, tile_row, tile_col)?;
    check_slot(slot.len(), P::out_tile_bytes())?;

    let (row0, col0) = (tile_row * order.rows, tile_col * order.cols);
    let rows = order.rows.min(dst.rows() - row0);
    let cols = order.cols.min(dst.cols() - col0);
    for r in 0..rows {
        for c in 0..cols {
            let value = P::Out::read(slot, order.index(r, c));
            dst.set(row0 + r, col0 + c, T::cast_from(value));
        }
    }
    Ok(())
}

fn check_tile(
    valid_rows: usize,
    valid_cols: usize,
    tile_rows: usize,
    tile_cols: usize,
    tile_row: usize,
    tile_col: usize,
) -> Result<(), MatmulError> {
    if tile_row * tile_rows >= valid_rows || tile_col * tile_cols >= valid_cols {
        return Err(MatmulError::bad_param(format!(
            "tile ({tile_row}, {tile_col}) of {tile_rows}x{tile_cols} starts outside the \
             {valid_rows}x{valid_cols} valid extent"
        )));
    }
    Ok(())
}

fn check_slot(len: usize, expected: usize) -> Result<(), MatmulError> {
    match len >= expected {
        true => Ok(()),
        false => Err(MatmulError::bad_param(format!(
            "the slot holds {len} bytes, a tile needs {expected}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{F16Precision, U8I4Precision, U8I8Precision};
    use hmxkit_tensor::{f16, i4};

    #[test]
    fn activation_tile_pads_and_narrows() {
        let (rows, cols) = (40, 20);
        let values: Vec<f32> = (0..rows * cols).map(|i| i as f32).collect();
        let src = MatrixView::<f32>::row_major(bytemuck::cast_slice(&values), rows, cols);
        let mut slot = vec![0xFFu8; 2048];

        copy_submatrix_to_activation::<F16Precision, f32>(&mut slot, &src, 1, 0).unwrap();

        let order = F16Precision::LHS_ORDER;
        assert_eq!(f16::read(&slot, order.index(0, 3)), f16::from_f32(643.0));
        assert_eq!(f16::read(&slot, order.index(7, 19)), f16::from_f32(799.0));
        assert_eq!(f16::read(&slot, order.index(8, 0)), f16::ZERO);
        assert_eq!(f16::read(&slot, order.index(0, 20)), f16::ZERO);
    }

    #[test]
    fn weight_tile_is_transposed() {
        // Stored [C = 3, K = 40] i4 values, W[c][k] = c - k % 4.
        let (c_dim, k_dim) = (3, 40);
        let mut packed = vec![0u8; (c_dim * k_dim) / 2];
        for c in 0..c_dim {
            for k in 0..k_dim {
                let value = i4::new(c as i8 - (k % 4) as i8).unwrap();
                i4::write(&mut packed, c * k_dim + k, value);
            }
        }
        let src = MatrixView::<i4>::row_major(&packed, c_dim, k_dim);
        let mut slot = vec![0u8; 512];

        copy_submatrix_to_weight::<U8I4Precision>(&mut slot, &src, 1, 0).unwrap();

        let order = U8I4Precision::RHS_ORDER;
        // Logical k = 33, c = 2.
        assert_eq!(i4::read(&slot, order.index(1, 2)).value(), 1);
        assert_eq!(i4::read(&slot, order.index(8, 0)), i4::default());
        assert_eq!(i4::read(&slot, order.index(1, 3)), i4::default());
    }

    #[test]
    fn output_tile_is_clipped() {
        let order = U8I8Precision::OUT_ORDER;
        let mut slot = vec![0u8; 8192];
        for r in 0..64 {
            for c in 0..32 {
                i32::write(&mut slot, order.index(r, c), (r * 100 + c) as i32);
            }
        }
        let mut buffer = vec![-1i32; 70 * 40];
        let mut dst =
            MatrixViewMut::<i32>::row_major(bytemuck::cast_slice_mut(&mut buffer), 70, 40);

        copy_tile_to_submatrix::<U8I8Precision, i32>(&slot, &mut dst, 1, 1).unwrap();

        assert_eq!(buffer[64 * 40 + 32], 0);
        assert_eq!(buffer[69 * 40 + 39], 507);
        assert_eq!(buffer[63 * 40 + 39], -1);
        assert_eq!(buffer[64 * 40 + 31], -1);
    }

    #[test]
    fn tiles_must_start_inside_the_extent() {
        let values = vec![0u8; 64 * 32];
        let src = MatrixView::<u8>::row_major(&values, 64, 32);
        let mut slot = vec![0u8; 2048];

        assert!(copy_submatrix_to_activation::<U8I8Precision, u8>(&mut slot, &src, 0, 0).is_ok());
        assert!(matches!(
            copy_submatrix_to_activation::<U8I8Precision, u8>(&mut slot, &src, 1, 0),
            Err(MatmulError::BadParam { .. })
        ));
        assert!(matches!(
            copy_submatrix_to_activation::<U8I8Precision, u8>(&mut slot, &src, 0, 1),
            Err(MatmulError::BadParam { .. })
        ));
        assert!(matches!(
            copy_submatrix_to_activation::<U8I8Precision, u8>(&mut slot[..100], &src, 0, 0),
            Err(MatmulError::BadParam { .. })
        ));

        let mut out = vec![0u8; 4 * 64 * 32];
        let mut dst = MatrixViewMut::<i32>::row_major(&mut out, 64, 32);
        let tile = vec![0u8; 8192];
        assert!(copy_tile_to_submatrix::<U8I8Precision, i32>(&tile, &mut dst, 0, 1).is_err());
    }
}
