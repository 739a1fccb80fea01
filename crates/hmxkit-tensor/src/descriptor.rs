use crate::{DType, TensorLayout};
use hmxkit_common::{
    quant::QuantScheme,
    stride::{self, StridePattern},
};
use smallvec::SmallVec;

/// Dimensions of a tensor, at most 2 are supported.
pub type Dims = SmallVec<[usize; 2]>;
/// Strides of a tensor, in elements.
pub type Strides = SmallVec<[usize; 2]>;

/// Quantization of the values of a tensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Quantization {
    /// Plain values.
    #[default]
    None,
    /// Quantized values following the given scheme.
    Scheme(QuantScheme),
}

impl Quantization {
    /// Whether the values are quantized.
    pub fn is_quantized(&self) -> bool {
        matches!(self, Quantization::Scheme(_))
    }
}

/// Describes a (at most 2-D) view into a caller-owned buffer.
///
/// The descriptor never owns memory: `D` is a borrowed byte slice ([TensorRef] or [TensorMut]),
/// and `data` is `None` to model a missing buffer. Dims, strides and offsets are in elements,
/// a 4-bit element being one nibble.
#[derive(Clone, Debug)]
pub struct TensorDescriptor<D> {
    /// Backing buffer, `None` when unset.
    pub data: Option<D>,
    /// Dimensions, `[rows, cols]` for matrices.
    pub dims: Dims,
    /// Strides in elements, same arity as `dims`.
    pub strides: Strides,
    /// Offset of the first element in the backing buffer, in elements.
    pub data_offset: usize,
    /// Highest reachable index plus one.
    pub num_elements: usize,
    /// Storage type of the elements.
    pub dtype: DType,
    /// Quantization of the values.
    pub quantization: Quantization,
    /// Layout tag.
    pub layout: TensorLayout,
    /// Whether the strides pack the dims with no gaps.
    pub is_continuous: bool,
}

/// A read-only tensor descriptor.
pub type TensorRef<'a> = TensorDescriptor<&'a [u8]>;
/// A writable tensor descriptor.
pub type TensorMut<'a> = TensorDescriptor<&'a mut [u8]>;

impl<D> TensorDescriptor<D> {
    /// A packed row-major matrix.
    pub fn row_major(data: D, dims: [usize; 2], dtype: DType) -> Self {
        let strides = stride::contiguous_strides(&dims);
        Self::from_parts(data, &dims, &strides, dtype, TensorLayout::RowMajor2D)
    }

    /// A packed column-major matrix.
    pub fn col_major(data: D, dims: [usize; 2], dtype: DType) -> Self {
        let strides = stride::col_major_strides(&dims);
        Self::from_parts(data, &dims, &strides, dtype, TensorLayout::ColMajor2D)
    }

    /// A matrix with arbitrary strides.
    ///
    /// Strides packing the matrix column by column are tagged [TensorLayout::ColMajor2D], any
    /// other pattern [TensorLayout::RowMajor2D]. `is_continuous` and `num_elements` are derived
    /// from the strides.
    pub fn strided(data: D, dims: [usize; 2], strides: [usize; 2], dtype: DType) -> Self {
        let layout = match stride::describe(&dims, &strides) {
            StridePattern::ColMajor => TensorLayout::ColMajor2D,
            _ => TensorLayout::RowMajor2D,
        };
        Self::from_parts(data, &dims, &strides, dtype, layout)
    }

    /// A packed one-dimensional buffer of `len` elements.
    pub fn linear(data: D, len: usize, dtype: DType) -> Self {
        Self::from_parts(data, &[len], &[1], dtype, TensorLayout::Linear1D)
    }

    /// A whole-matrix tile image. `dims` are the logical matrix dims.
    pub fn tiled(data: D, dims: [usize; 2], dtype: DType, layout: TensorLayout) -> Self {
        let strides = match layout.is_col_major() {
            true => stride::col_major_strides(&dims),
            false => stride::contiguous_strides(&dims),
        };
        Self::from_parts(data, &dims, &strides, dtype, layout)
    }

    fn from_parts(
        data: D,
        dims: &[usize],
        strides: &[usize],
        dtype: DType,
        layout: TensorLayout,
    ) -> Self {
        Self {
            data: Some(data),
            dims: SmallVec::from_slice(dims),
            strides: SmallVec::from_slice(strides),
            data_offset: 0,
            num_elements: stride::span(dims, strides).unwrap_or(0),
            dtype,
            quantization: Quantization::None,
            layout,
            is_continuous: stride::is_packed(dims, strides),
        }
    }

    /// Set the element offset of the view.
    pub fn with_offset(mut self, data_offset: usize) -> Self {
        self.data_offset = data_offset;
        self
    }

    /// Set the quantization of the values.
    pub fn with_quantization(mut self, quantization: Quantization) -> Self {
        self.quantization = quantization;
        self
    }

    /// Set the layout tag.
    pub fn with_layout(mut self, layout: TensorLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Number of dimensions.
    pub fn ndims(&self) -> usize {
        self.dims.len()
    }

    /// Number of rows of a matrix.
    pub fn rows(&self) -> usize {
        self.dims[0]
    }

    /// Number of columns of a matrix.
    pub fn cols(&self) -> usize {
        self.dims[1]
    }

    /// Whether the values are quantized.
    pub fn is_quantized(&self) -> bool {
        self.quantization.is_quantized()
    }
}

impl<D: AsRef<[u8]>> TensorDescriptor<D> {
    /// The backing bytes, if set.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.data.as_ref().map(|data| data.as_ref())
    }

    /// Number of elements the backing buffer can hold.
    pub fn buffer_elements(&self) -> Option<usize> {
        self.bytes().map(|bytes| self.dtype.elements_in(bytes.len()))
    }

    /// A read-only descriptor over the same view.
    pub fn to_ref(&self) -> TensorRef<'_> {
        TensorDescriptor {
            data: self.bytes(),
            dims: self.dims.clone(),
            strides: self.strides.clone(),
            data_offset: self.data_offset,
            num_elements: self.num_elements,
            dtype: self.dtype,
            quantization: self.quantization,
            layout: self.layout,
            is_continuous: self.is_continuous,
        }
    }
}

impl<D: AsMut<[u8]>> TensorDescriptor<D> {
    /// The backing bytes, if set.
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.data.as_mut().map(|data| data.as_mut())
    }
}
