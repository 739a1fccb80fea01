use crate::{DType, Quantization, TensorDescriptor, TensorError};
use hmxkit_common::{quant::QuantLevel, stride};

/// Check the internal consistency of a tensor descriptor.
///
/// The checks run in order and the first failure is reported:
///
/// 1. [TensorError::NullBuffer] if no buffer is set.
/// 2. [TensorError::BadShape] for a rank outside `[1, 2]`, zero dims or strides, an element count
///    that isn't the span of the strides, a view reaching past the buffer or continuous
///    strides that aren't packed.
/// 3. [TensorError::BadDType] for an unrecognized dtype/quantization pair.
/// 4. [TensorError::BadLayout] for a layout tag contradicting the rank, the continuity flag or the
///    tile geometry of the dtype.
pub fn validate<D: AsRef<[u8]>>(tensor: &TensorDescriptor<D>) -> Result<(), TensorError> {
    let buffer_elements = tensor.buffer_elements().ok_or(TensorError::NullBuffer)?;

    check_shape(tensor, buffer_elements)?;
    check_dtype(tensor)?;
    check_layout(tensor)
}

fn check_shape<D>(tensor: &TensorDescriptor<D>, buffer_elements: usize) -> Result<(), TensorError> {
    let ndims = tensor.ndims();
    if !(1..=2).contains(&ndims) {
        return Err(TensorError::bad_shape(format!(
            "rank {ndims} is outside [1, 2]"
        )));
    }
    if tensor.strides.len() != ndims {
        return Err(TensorError::bad_shape(format!(
            "{} strides for {ndims} dims",
            tensor.strides.len()
        )));
    }
    if tensor.dims.contains(&0) || tensor.strides.contains(&0) {
        return Err(TensorError::bad_shape(format!(
            "dims {:?} and strides {:?} must be positive",
            tensor.dims, tensor.strides
        )));
    }

    let span = stride::span(&tensor.dims, &tensor.strides)
        .ok_or_else(|| TensorError::bad_shape("the view span overflows"))?;
    if tensor.num_elements != span {
        return Err(TensorError::bad_shape(format!(
            "num_elements is {} but the strides span {span} elements",
            tensor.num_elements
        )));
    }

    let end = tensor
        .data_offset
        .checked_add(span)
        .ok_or_else(|| TensorError::bad_shape("the view end overflows"))?;
    if end > buffer_elements {
        return Err(TensorError::bad_shape(format!(
            "the view ends at element {end} but the buffer holds {buffer_elements}"
        )));
    }

    if tensor.is_continuous && !stride::is_packed(&tensor.dims, &tensor.strides) {
        return Err(TensorError::bad_shape(format!(
            "strides {:?} don't pack dims {:?}",
            tensor.strides, tensor.dims
        )));
    }

    Ok(())
}

fn check_dtype<D>(tensor: &TensorDescriptor<D>) -> Result<(), TensorError> {
    let scheme = match tensor.quantization {
        Quantization::None => return Ok(()),
        Quantization::Scheme(scheme) => scheme,
    };

    let recognized = tensor.dtype.is_integer()
        && scheme.is_stored_as(tensor.dtype.size_bits())
        && !matches!(scheme.level, QuantLevel::Block(0));

    match recognized {
        true => Ok(()),
        false => Err(TensorError::BadDType {
            dtype: tensor.dtype,
            reason: format!("not a storage type for {scheme:?}"),
        }),
    }
}

fn check_layout<D>(tensor: &TensorDescriptor<D>) -> Result<(), TensorError> {
    let layout = tensor.layout;

    if layout.rank() != tensor.ndims() {
        return Err(TensorError::bad_layout(
            layout,
            format!("expected rank {}, got {}", layout.rank(), tensor.ndims()),
        ));
    }

    let packed_row = stride::is_packed_row_major(&tensor.dims, &tensor.strides);
    let packed_col = stride::is_packed_col_major(&tensor.dims, &tensor.strides);
    let packed_in_order = match layout.is_col_major() {
        true => packed_col,
        false => packed_row,
    };

    if tensor.is_continuous && !packed_in_order {
        return Err(TensorError::bad_layout(
            layout,
            "continuous strides don't follow the layout order",
        ));
    }
    if !tensor.is_continuous && (packed_row || packed_col) {
        return Err(TensorError::bad_layout(
            layout,
            "packed strides must be flagged continuous",
        ));
    }

    if !layout.is_tiled() {
        return Ok(());
    }

    if !tensor.is_continuous {
        return Err(TensorError::bad_layout(layout, "tile images must be continuous"));
    }

    let geometry = match layout.is_weights() {
        true => tensor.dtype.weight_tile(),
        false => tensor.dtype.activation_tile(),
    };
    let geometry = geometry.ok_or_else(|| {
        TensorError::bad_layout(layout, format!("{:?} has no tile geometry", tensor.dtype))
    })?;

    if tensor.rows() % geometry.rows != 0 || tensor.cols() % geometry.cols != 0 {
        return Err(TensorError::bad_layout(
            layout,
            format!(
                "dims {:?} aren't multiples of the {}x{} tile",
                tensor.dims, geometry.rows, geometry.cols
            ),
        ));
    }

    if tensor.dtype == DType::I4 && tensor.data_offset % 2 != 0 {
        return Err(TensorError::bad_layout(
            layout,
            "4-bit tile images must start on a byte boundary",
        ));
    }

    Ok(())
}
