use crate::components::HmxPrecision;
use hmxkit_tensor::TensorDescriptor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Description of a matmul problem to solve, regardless of actual data
pub struct MatmulProblem {
    /// Rows of the left operand and of the result.
    pub r: usize,
    /// Inner dimension shared by both operands.
    pub k: usize,
    /// Rows of the right operand, columns of the result.
    pub c: usize,
}

impl MatmulProblem {
    /// The problem described by compatible operands, `left = [R, K]` and `right = [C, K]`.
    pub fn from_operands<L, R>(left: &TensorDescriptor<L>, right: &TensorDescriptor<R>) -> Self {
        Self {
            r: left.rows(),
            k: left.cols(),
            c: right.rows(),
        }
    }

    /// Number of activation row-tiles.
    pub fn row_tiles<P: HmxPrecision>(&self) -> usize {
        self.r.div_ceil(P::LHS_ORDER.rows)
    }

    /// Number of inner tiles.
    pub fn inner_tiles<P: HmxPrecision>(&self) -> usize {
        self.k.div_ceil(P::LHS_ORDER.cols)
    }

    /// Number of output column-tiles.
    pub fn col_tiles<P: HmxPrecision>(&self) -> usize {
        self.c.div_ceil(P::RHS_ORDER.cols)
    }

    /// Number of tile products the blocked engine performs.
    pub fn num_tile_products<P: HmxPrecision>(&self) -> usize {
        self.row_tiles::<P>() * self.col_tiles::<P>() * self.inner_tiles::<P>()
    }
}

impl core::fmt::Display for MatmulProblem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {}] x [{}, {}]^T", self.r, self.k, self.c, self.k)
    }
}
