use crate::{Element, TensorDescriptor, TensorError};
use core::marker::PhantomData;

/// Typed read access to a strided matrix.
#[derive(Clone, Copy, Debug)]
pub struct MatrixView<'a, E> {
    data: &'a [u8],
    offset: usize,
    rows: usize,
    cols: usize,
    row_stride: usize,
    col_stride: usize,
    _elem: PhantomData<E>,
}

/// Typed read/write access to a strided matrix.
#[derive(Debug)]
pub struct MatrixViewMut<'a, E> {
    data: &'a mut [u8],
    offset: usize,
    rows: usize,
    cols: usize,
    row_stride: usize,
    col_stride: usize,
    _elem: PhantomData<E>,
}

fn view_parts<D>(
    tensor: &TensorDescriptor<D>,
    dtype: crate::DType,
) -> Result<[usize; 5], TensorError> {
    if tensor.dtype != dtype {
        return Err(TensorError::BadDType {
            dtype: tensor.dtype,
            reason: format!("expected {dtype:?} elements"),
        });
    }
    if tensor.ndims() != 2 {
        return Err(TensorError::UnsupportedRank {
            operand: "view",
            rank: tensor.ndims(),
        });
    }
    if tensor.layout.is_tiled() {
        return Err(TensorError::bad_layout(
            tensor.layout,
            "tile images can't be addressed with strides",
        ));
    }

    Ok([
        tensor.data_offset,
        tensor.rows(),
        tensor.cols(),
        tensor.strides[0],
        tensor.strides[1],
    ])
}

impl<'a, E: Element> MatrixView<'a, E> {
    /// A view over a validated matrix descriptor.
    pub fn new<D: AsRef<[u8]>>(tensor: &'a TensorDescriptor<D>) -> Result<Self, TensorError> {
        let [offset, rows, cols, row_stride, col_stride] = view_parts(tensor, E::DTYPE)?;
        let data = tensor.bytes().ok_or(TensorError::NullBuffer)?;

        Ok(Self {
            data,
            offset,
            rows,
            cols,
            row_stride,
            col_stride,
            _elem: PhantomData,
        })
    }

    /// A packed row-major view over raw bytes.
    pub fn row_major(data: &'a [u8], rows: usize, cols: usize) -> Self {
        Self {
            data,
            offset: 0,
            rows,
            cols,
            row_stride: cols,
            col_stride: 1,
            _elem: PhantomData,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The element at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> E {
        E::read(self.data, self.offset + row * self.row_stride + col * self.col_stride)
    }

    /// The element at `(row, col)`, or zero outside the matrix.
    #[inline]
    pub fn get_or_zero(&self, row: usize, col: usize) -> E {
        match row < self.rows && col < self.cols {
            true => self.get(row, col),
            false => E::default(),
        }
    }
}

impl<'a, E: Element> MatrixViewMut<'a, E> {
    /// A writable view over a validated matrix descriptor.
    pub fn new<D: AsMut<[u8]>>(tensor: &'a mut TensorDescriptor<D>) -> Result<Self, TensorError> {
        let [offset, rows, cols, row_stride, col_stride] = view_parts(tensor, E::DTYPE)?;
        let data = tensor.bytes_mut().ok_or(TensorError::NullBuffer)?;

        Ok(Self {
            data,
            offset,
            rows,
            cols,
            row_stride,
            col_stride,
            _elem: PhantomData,
        })
    }

    /// A packed row-major view over raw bytes.
    pub fn row_major(data: &'a mut [u8], rows: usize, cols: usize) -> Self {
        Self {
            data,
            offset: 0,
            rows,
            cols,
            row_stride: cols,
            col_stride: 1,
            _elem: PhantomData,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The element at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> E {
        E::read(&*self.data, self.offset + row * self.row_stride + col * self.col_stride)
    }

    /// Overwrite the element at `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: E) {
        let index = self.offset + row * self.row_stride + col * self.col_stride;
        E::write(self.data, index, value);
    }

    /// A read-only view over the same elements.
    pub fn as_view(&self) -> MatrixView<'_, E> {
        MatrixView {
            data: &*self.data,
            offset: self.offset,
            rows: self.rows,
            cols: self.cols,
            row_stride: self.row_stride,
            col_stride: self.col_stride,
            _elem: PhantomData,
        }
    }
}
