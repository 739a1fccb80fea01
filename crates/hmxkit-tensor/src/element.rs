use crate::DType;
use core::fmt::Debug;
use half::f16;
use hmxkit_common::quant::{Nibble, set_i4, sign_extend_i4, unpack_i4};

/// An element type that can be read from and written to raw tensor bytes.
///
/// Accesses are unaligned: host buffers and scratchpads carry no alignment guarantee.
pub trait Element: Copy + Default + Debug + PartialEq + Send + Sync + 'static {
    /// The dtype tag matching this element type.
    const DTYPE: DType;

    /// Read the element at `index` (in elements, not bytes).
    fn read(bytes: &[u8], index: usize) -> Self;

    /// Write the element at `index` (in elements, not bytes).
    fn write(bytes: &mut [u8], index: usize, value: Self);
}

macro_rules! pod_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;

            #[inline]
            fn read(bytes: &[u8], index: usize) -> Self {
                let size = core::mem::size_of::<Self>();
                bytemuck::pod_read_unaligned(&bytes[index * size..(index + 1) * size])
            }

            #[inline]
            fn write(bytes: &mut [u8], index: usize, value: Self) {
                let size = core::mem::size_of::<Self>();
                bytes[index * size..(index + 1) * size].copy_from_slice(bytemuck::bytes_of(&value));
            }
        }
    };
}

pod_element!(i8, DType::I8);
pod_element!(u8, DType::U8);
pod_element!(i32, DType::I32);
pod_element!(f16, DType::F16);
pod_element!(f32, DType::F32);

/// A signed 4-bit integer, stored sign-extended.
///
/// In memory two values share a byte, the element at an even index in the low nibble.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct i4(i8);

impl i4 {
    /// Largest representable value.
    pub const MAX: i4 = i4(7);
    /// Smallest representable value.
    pub const MIN: i4 = i4(-8);

    /// Create a 4-bit integer, `None` when `value` is outside `[-8, 7]`.
    pub fn new(value: i8) -> Option<Self> {
        hmxkit_common::quant::fits_i4(value).then_some(Self(value))
    }

    /// Create a 4-bit integer from the four low bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        Self(sign_extend_i4(bits))
    }

    /// The sign-extended value.
    pub fn value(self) -> i8 {
        self.0
    }
}

impl Element for i4 {
    const DTYPE: DType = DType::I4;

    #[inline]
    fn read(bytes: &[u8], index: usize) -> Self {
        Self(unpack_i4(bytes[index / 2], Nibble::of_index(index)))
    }

    #[inline]
    fn write(bytes: &mut [u8], index: usize, value: Self) {
        set_i4(&mut bytes[index / 2], Nibble::of_index(index), value.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unaligned_reads() {
        let mut bytes = [0u8; 9];
        f32::write(&mut bytes[1..], 1, 1.5);

        assert_eq!(f32::read(&bytes[1..], 1), 1.5);
        assert_eq!(f32::read(&bytes[1..], 0), 0.0);
    }

    #[test]
    fn nibbles_are_independent() {
        let mut bytes = [0u8; 2];
        i4::write(&mut bytes, 0, i4::from_bits(0x9));
        i4::write(&mut bytes, 1, i4::MAX);
        i4::write(&mut bytes, 3, i4::MIN);

        assert_eq!(bytes, [0x79, 0x80]);
        assert_eq!(i4::read(&bytes, 0).value(), -7);
        assert_eq!(i4::read(&bytes, 1).value(), 7);
        assert_eq!(i4::read(&bytes, 2).value(), 0);
        assert_eq!(i4::read(&bytes, 3).value(), -8);
    }

    #[test]
    fn i4_range() {
        assert_eq!(i4::new(-8), Some(i4::MIN));
        assert_eq!(i4::new(8), None);
        assert_eq!(i4::from_bits(0xF).value(), -1);
    }
}
