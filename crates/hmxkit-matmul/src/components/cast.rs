use hmxkit_tensor::{Element, f16};

/// Conversion applied when an element crosses a pipeline boundary.
///
/// Staging narrows 32-bit float activations to half precision, writing a half-precision tile to a
/// 32-bit float result widens it back.
pub trait CastFrom<T>: Sized {
    /// Convert `value`.
    fn cast_from(value: T) -> Self;
}

impl<E: Element> CastFrom<E> for E {
    #[inline]
    fn cast_from(value: E) -> Self {
        value
    }
}

impl CastFrom<f32> for f16 {
    #[inline]
    fn cast_from(value: f32) -> Self {
        f16::from_f32(value)
    }
}

impl CastFrom<f16> for f32 {
    #[inline]
    fn cast_from(value: f16) -> Self {
        value.to_f32()
    }
}
