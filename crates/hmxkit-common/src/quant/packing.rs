/// Smallest value representable by a signed 4-bit integer.
pub const I4_MIN: i8 = -8;
/// Largest value representable by a signed 4-bit integer.
pub const I4_MAX: i8 = 7;

/// Which half of a packed byte holds a 4-bit value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Nibble {
    /// Bits 0..4, the first value of a pair.
    Low,
    /// Bits 4..8, the second value of a pair.
    High,
}

impl Nibble {
    /// The nibble holding the element at the given linear index (low nibble first).
    #[inline]
    pub fn of_index(index: usize) -> Self {
        if index % 2 == 0 {
            Nibble::Low
        } else {
            Nibble::High
        }
    }
}

/// Pack two signed 4-bit values into one byte, `v0` in the low nibble.
///
/// Only the four low bits of each value are kept.
#[inline]
pub fn pack_i4(v0: i8, v1: i8) -> u8 {
    ((v0 as u8) & 0x0F) | (((v1 as u8) & 0x0F) << 4)
}

/// Extract and sign-extend one 4-bit value from a packed byte.
#[inline]
pub fn unpack_i4(byte: u8, nibble: Nibble) -> i8 {
    match nibble {
        // Shift the low nibble up so the arithmetic shift replicates its sign bit.
        Nibble::Low => ((byte << 4) as i8) >> 4,
        Nibble::High => (byte as i8) >> 4,
    }
}

/// Sign-extend the four low bits of `value`.
#[inline]
pub fn sign_extend_i4(value: u8) -> i8 {
    unpack_i4(value & 0x0F, Nibble::Low)
}

/// Write a 4-bit value into one nibble of `byte`, leaving the other nibble untouched.
#[inline]
pub fn set_i4(byte: &mut u8, nibble: Nibble, value: i8) {
    let bits = (value as u8) & 0x0F;
    *byte = match nibble {
        Nibble::Low => (*byte & 0xF0) | bits,
        Nibble::High => (*byte & 0x0F) | (bits << 4),
    };
}

/// Whether `value` fits in a signed 4-bit integer.
#[inline]
pub fn fits_i4(value: i8) -> bool {
    (I4_MIN..=I4_MAX).contains(&value)
}
