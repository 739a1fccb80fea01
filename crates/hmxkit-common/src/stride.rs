//! Stride helpers for descriptor validation and strided tile staging.
//!
//! Strides are expressed in element units (not bytes). For 4-bit types an element is a nibble,
//! callers convert to byte offsets themselves.

/// Canonical contiguous row-major strides for a given shape (in elements).
///
/// Example: shape [R, C] -> strides [C, 1]
pub fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut s = 1usize;
    for (i, dim) in shape.iter().enumerate().rev() {
        strides[i] = s;
        s = s.saturating_mul(*dim.max(&1));
    }
    strides
}

/// Canonical contiguous column-major strides for a given shape (in elements).
///
/// Example: shape [R, C] -> strides [1, R]
pub fn col_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut s = 1usize;
    for (i, dim) in shape.iter().enumerate() {
        strides[i] = s;
        s = s.saturating_mul(*dim.max(&1));
    }
    strides
}

/// Number of elements spanned by a view: the highest reachable index plus one.
///
/// Returns `None` on overflow or when a dimension is zero.
pub fn span(shape: &[usize], strides: &[usize]) -> Option<usize> {
    if shape.len() != strides.len() || shape.contains(&0) {
        return None;
    }

    shape
        .iter()
        .zip(strides)
        .try_fold(1usize, |acc, (dim, stride)| {
            stride
                .checked_mul(dim - 1)
                .and_then(|extent| acc.checked_add(extent))
        })
}

/// A coarse description of a stride pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StridePattern {
    /// Fully contiguous row-major layout.
    Contiguous,
    /// Fully contiguous column-major layout that isn't also row-major.
    ColMajor,
    /// 2D with inner-most contiguous axis and a row pitch (in elements) on the outer axis.
    /// `row_pitch_elems > cols`.
    InnerContiguous2D {
        /// Pitch between consecutive rows in elements.
        row_pitch_elems: usize,
    },
    /// Any other stride pattern.
    Other,
}

/// Describe the given shape/strides pair, used to tag descriptors built from raw strides.
pub fn describe(shape: &[usize], strides: &[usize]) -> StridePattern {
    if shape.len() != strides.len() {
        return StridePattern::Other;
    }

    if strides == contiguous_strides(shape).as_slice() {
        return StridePattern::Contiguous;
    }

    if strides == col_major_strides(shape).as_slice() {
        return StridePattern::ColMajor;
    }

    if let ([rows, cols], [row_pitch, 1]) = (shape, strides) {
        if *rows > 0 && row_pitch > cols {
            return StridePattern::InnerContiguous2D {
                row_pitch_elems: *row_pitch,
            };
        }
    }

    StridePattern::Other
}

/// Whether the strides pack `shape` in row-major order.
///
/// Strides of unit dimensions never contribute to an offset and are ignored.
pub fn is_packed_row_major(shape: &[usize], strides: &[usize]) -> bool {
    shape.len() == strides.len()
        && shape
            .iter()
            .zip(strides)
            .zip(contiguous_strides(shape))
            .all(|((dim, stride), expected)| *dim == 1 || *stride == expected)
}

/// Whether the strides pack `shape` in column-major order.
///
/// Strides of unit dimensions never contribute to an offset and are ignored.
pub fn is_packed_col_major(shape: &[usize], strides: &[usize]) -> bool {
    shape.len() == strides.len()
        && shape
            .iter()
            .zip(strides)
            .zip(col_major_strides(shape))
            .all(|((dim, stride), expected)| *dim == 1 || *stride == expected)
}

/// Whether the given shape/strides is packed, in either row-major or column-major order.
#[inline]
pub fn is_packed(shape: &[usize], strides: &[usize]) -> bool {
    is_packed_row_major(shape, strides) || is_packed_col_major(shape, strides)
}

/// Round `value` up to the next multiple of `align`.
#[inline]
pub fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Round `value` down to a multiple of `align`.
#[inline]
pub fn align_down(value: usize, align: usize) -> usize {
    value - value % align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_strides() {
        assert_eq!(contiguous_strides(&[32, 64]), vec![64, 1]);
        assert_eq!(contiguous_strides(&[7]), vec![1]);
        assert_eq!(col_major_strides(&[32, 64]), vec![1, 32]);
    }

    #[test]
    fn test_span() {
        assert_eq!(span(&[4, 8], &[8, 1]), Some(32));
        // Row pitch twice the column count leaves a gap after the last row.
        assert_eq!(span(&[4, 8], &[16, 1]), Some(3 * 16 + 8));
        assert_eq!(span(&[4, 8], &[1, 4]), Some(32));
        assert_eq!(span(&[0, 8], &[8, 1]), None);
        assert_eq!(span(&[2, 2], &[usize::MAX, 1]), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&[4, 8], &[8, 1]), StridePattern::Contiguous);
        assert_eq!(describe(&[4, 8], &[1, 4]), StridePattern::ColMajor);
        assert_eq!(
            describe(&[4, 8], &[16, 1]),
            StridePattern::InnerContiguous2D {
                row_pitch_elems: 16
            }
        );
        assert_eq!(describe(&[4, 8], &[8, 2]), StridePattern::Other);
        assert_eq!(describe(&[4, 8], &[8]), StridePattern::Other);
    }

    #[test]
    fn test_packed_ignores_unit_dims() {
        assert!(is_packed_row_major(&[1, 8], &[8, 1]));
        assert!(is_packed_row_major(&[1, 8], &[16, 1]));
        assert!(is_packed_col_major(&[1, 8], &[16, 1]));
        assert!(is_packed_col_major(&[4, 8], &[1, 4]));
        assert!(!is_packed_row_major(&[4, 8], &[1, 4]));
        assert!(!is_packed(&[4, 8], &[16, 1]));
    }

    #[test]
    fn test_align() {
        assert_eq!(align_up(2049, 2048), 4096);
        assert_eq!(align_up(0, 128), 0);
        assert_eq!(align_down(4095, 256), 3840);
    }
}
