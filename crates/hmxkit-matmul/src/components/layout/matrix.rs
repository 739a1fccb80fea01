use crate::components::{
    MatmulError,
    layout::{ImageKind, TileImage},
};
use bytemuck::Pod;
use hmxkit_common::quant::fits_i4;
use hmxkit_tensor::{Element, MatrixView, MatrixViewMut, f16, i4};

/// Write the tile image of `src` into `dst`.
///
/// Cells of the image beyond the extent of `src` are zero.
pub fn to_image<E: Element>(
    image: &TileImage,
    src: &MatrixView<'_, E>,
    dst: &mut [u8],
) -> Result<(), MatmulError> {
    check_image::<E>(image, dst.len())?;
    if src.rows() > image.rows || src.cols() > image.cols {
        return Err(MatmulError::bad_param(format!(
            "a {}x{} matrix doesn't fit a {}x{} image",
            src.rows(),
            src.cols(),
            image.rows,
            image.cols
        )));
    }

    write_image(image, dst, |row, col| src.get_or_zero(row, col));
    Ok(())
}

/// Read the tile image `src` back into `dst`, over the extent of `dst` only.
pub fn from_image<E: Element>(
    image: &TileImage,
    src: &[u8],
    dst: &mut MatrixViewMut<'_, E>,
) -> Result<(), MatmulError> {
    check_image::<E>(image, src.len())?;
    if dst.rows() > image.rows || dst.cols() > image.cols {
        return Err(MatmulError::bad_param(format!(
            "a {}x{} image doesn't cover a {}x{} matrix",
            image.rows,
            image.cols,
            dst.rows(),
            dst.cols()
        )));
    }

    for row in 0..dst.rows() {
        for col in 0..dst.cols() {
            dst.set(row, col, E::read(src, image.element_index(row, col)));
        }
    }
    Ok(())
}

fn check_image<E: Element>(image: &TileImage, num_bytes: usize) -> Result<(), MatmulError> {
    if image.dtype != E::DTYPE {
        return Err(MatmulError::bad_param(format!(
            "a {:?} image can't hold {:?} elements",
            image.dtype,
            E::DTYPE
        )));
    }
    if num_bytes < image.num_bytes() {
        return Err(MatmulError::bad_param(format!(
            "the image needs {} bytes, the buffer holds {num_bytes}",
            image.num_bytes()
        )));
    }
    Ok(())
}

fn write_image<E: Element>(image: &TileImage, dst: &mut [u8], value: impl Fn(usize, usize) -> E) {
    for row in 0..image.rows {
        for col in 0..image.cols {
            E::write(dst, image.element_index(row, col), value(row, col));
        }
    }
}

fn check_matrix<E>(data: &[E], rows: usize, cols: usize) -> Result<(), MatmulError> {
    match data.len() >= rows * cols {
        true => Ok(()),
        false => Err(MatmulError::bad_param(format!(
            "a {rows}x{cols} matrix doesn't fit {} elements",
            data.len()
        ))),
    }
}

fn image_of(
    kind: ImageKind,
    dtype: hmxkit_tensor::DType,
    rows: usize,
    cols: usize,
    padded: bool,
) -> Result<TileImage, MatmulError> {
    match padded {
        true => TileImage::padded(kind, dtype, rows, cols),
        false => TileImage::new(kind, dtype, rows, cols),
    }
}

fn rm_to_image<E: Element + Pod>(
    kind: ImageKind,
    dst: &mut [E],
    src: &[E],
    rows: usize,
    cols: usize,
    padded: bool,
) -> Result<(), MatmulError> {
    check_matrix(src, rows, cols)?;
    let image = image_of(kind, E::DTYPE, rows, cols, padded)?;
    let view = MatrixView::<E>::row_major(bytemuck::cast_slice(src), rows, cols);

    to_image(&image, &view, bytemuck::cast_slice_mut(dst))
}

fn image_to_rm<E: Element + Pod>(
    kind: ImageKind,
    dst: &mut [E],
    src: &[E],
    rows: usize,
    cols: usize,
    padded: bool,
) -> Result<(), MatmulError> {
    check_matrix(dst, rows, cols)?;
    let image = image_of(kind, E::DTYPE, rows, cols, padded)?;
    let mut view = MatrixViewMut::<E>::row_major(bytemuck::cast_slice_mut(dst), rows, cols);

    from_image(&image, bytemuck::cast_slice(src), &mut view)
}

// The image of a tile-multiple matrix has exactly as many elements as the matrix.
fn convert_in_place<E: Element + Pod>(
    data: &mut [E],
    rows: usize,
    cols: usize,
    convert: fn(&mut [E], &[E], usize, usize) -> Result<(), MatmulError>,
) -> Result<(), MatmulError> {
    check_matrix(data, rows, cols)?;
    let src = data[..rows * cols].to_vec();

    convert(data, &src, rows, cols)
}

macro_rules! tile_conversions {
    ($kind:expr, $elem:ty, $to:ident, $from:ident, $to_inplace:ident, $from_inplace:ident) => {
        #[doc = concat!(
            "Convert a row-major `rows x cols` `", stringify!($elem), "` matrix into its ",
            stringify!($kind), " tile image, zero-padded to tile multiples."
        )]
        pub fn $to(
            dst: &mut [$elem],
            src: &[$elem],
            rows: usize,
            cols: usize,
        ) -> Result<(), MatmulError> {
            rm_to_image($kind, dst, src, rows, cols, true)
        }

        #[doc = concat!("Inverse of [", stringify!($to), "], padding is dropped.")]
        pub fn $from(
            dst: &mut [$elem],
            src: &[$elem],
            rows: usize,
            cols: usize,
        ) -> Result<(), MatmulError> {
            image_to_rm($kind, dst, src, rows, cols, true)
        }

        #[doc = concat!(
            "In-place [", stringify!($to), "], `rows` and `cols` must be tile multiples."
        )]
        pub fn $to_inplace(
            data: &mut [$elem],
            rows: usize,
            cols: usize,
        ) -> Result<(), MatmulError> {
            convert_in_place(data, rows, cols, |dst, src, rows, cols| {
                rm_to_image($kind, dst, src, rows, cols, false)
            })
        }

        #[doc = concat!(
            "In-place [", stringify!($from), "], `rows` and `cols` must be tile multiples."
        )]
        pub fn $from_inplace(
            data: &mut [$elem],
            rows: usize,
            cols: usize,
        ) -> Result<(), MatmulError> {
            convert_in_place(data, rows, cols, |dst, src, rows, cols| {
                image_to_rm($kind, dst, src, rows, cols, false)
            })
        }
    };
}

tile_conversions!(
    ImageKind::Activation,
    f16,
    rm_to_ah_f16,
    ah_to_rm_f16,
    rm_to_ah_f16_inplace,
    ah_to_rm_f16_inplace
);
tile_conversions!(
    ImageKind::Activation,
    u8,
    rm_to_ah_u8,
    ah_to_rm_u8,
    rm_to_ah_u8_inplace,
    ah_to_rm_u8_inplace
);
tile_conversions!(
    ImageKind::Activation,
    i32,
    rm_to_ah_i32,
    ah_to_rm_i32,
    rm_to_ah_i32_inplace,
    ah_to_rm_i32_inplace
);
// Weight matrices are stored [C, K]: `rows` is C and `cols` is K.
tile_conversions!(
    ImageKind::Weights,
    f16,
    rm_to_wh_f16,
    wh_to_rm_f16,
    rm_to_wh_f16_inplace,
    wh_to_rm_f16_inplace
);
tile_conversions!(
    ImageKind::Weights,
    i8,
    rm_to_wh_i8,
    wh_to_rm_i8,
    rm_to_wh_i8_inplace,
    wh_to_rm_i8_inplace
);

/// Pack a row-major `[C, K]` matrix of 4-bit values held in `i8` into its weight tile image.
///
/// The image is zero-padded to tile multiples, `dst` needs
/// `ceil(rows / 32) * ceil(cols / 32) * 512` bytes. Every value must lie in `[-8, 7]`.
pub fn rm_to_wh_i4(
    dst: &mut [u8],
    src: &[i8],
    rows: usize,
    cols: usize,
) -> Result<(), MatmulError> {
    check_matrix(src, rows, cols)?;
    if let Some(index) = src[..rows * cols].iter().position(|value| !fits_i4(*value)) {
        return Err(MatmulError::bad_param(format!(
            "value {} at index {index} doesn't fit in 4 bits",
            src[index]
        )));
    }

    let image = TileImage::padded(ImageKind::Weights, hmxkit_tensor::DType::I4, rows, cols)?;
    check_image::<i4>(&image, dst.len())?;
    let view = MatrixView::<i8>::row_major(bytemuck::cast_slice(src), rows, cols);

    write_image(&image, dst, |row, col| {
        i4::from_bits(view.get_or_zero(row, col) as u8)
    });
    Ok(())
}

/// Inverse of [rm_to_wh_i4], values are sign-extended to `i8`.
pub fn wh_to_rm_i4(
    dst: &mut [i8],
    src: &[u8],
    rows: usize,
    cols: usize,
) -> Result<(), MatmulError> {
    check_matrix(dst, rows, cols)?;
    let image = TileImage::padded(ImageKind::Weights, hmxkit_tensor::DType::I4, rows, cols)?;
    check_image::<i4>(&image, src.len())?;

    for row in 0..rows {
        for col in 0..cols {
            dst[row * cols + col] = i4::read(src, image.element_index(row, col)).value();
        }
    }
    Ok(())
}
