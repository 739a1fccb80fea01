//! Each output element is computed on its own, summing over the inner dimension in order.
//!
//! Products are accumulated with the same [HmxPrecision] arithmetic and in the same order as the
//! blocked engine, so both give bit-identical results.
use crate::components::{CastFrom, HmxPrecision};
use hmxkit_tensor::{Element, MatrixView, MatrixViewMut};

/// Compute `out = lhs x rhs^T` with `lhs = [R, K]`, `rhs = [C, K]` and `out = [R, C]`.
pub fn launch<P: HmxPrecision, S: Element, T: Element>(
    lhs: &MatrixView<'_, S>,
    rhs: &MatrixView<'_, P::Rhs>,
    out: &mut MatrixViewMut<'_, T>,
) where
    P::Lhs: CastFrom<S>,
    T: CastFrom<P::Out>,
{
    let inner = lhs.cols();

    for r in 0..out.rows() {
        for c in 0..out.cols() {
            let mut acc = P::Acc::default();
            for k in 0..inner {
                acc = P::multiply_add(acc, P::Lhs::cast_from(lhs.get(r, k)), rhs.get(c, k));
            }
            out.set(r, c, T::cast_from(P::drain(acc)));
        }
    }
}
