#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
/// Identifier for the three tensors of a matmul.
pub enum MatmulIdent {
    /// Activations `X`, `[R, K]`.
    Lhs,
    /// Weights `W`, stored `[C, K]`.
    Rhs,
    /// Result `A`, `[R, C]`.
    Out,
}

impl MatmulIdent {
    /// Name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            MatmulIdent::Lhs => "left",
            MatmulIdent::Rhs => "right",
            MatmulIdent::Out => "result",
        }
    }
}

impl core::fmt::Display for MatmulIdent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
