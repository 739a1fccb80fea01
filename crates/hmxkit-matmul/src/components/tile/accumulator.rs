use crate::components::{HmxPrecision, MatmulError, tile::TileOrder};
use bytemuck::{Pod, Zeroable};
use hmxkit_tensor::Element;

/// Lifecycle of an [Accumulator].
///
/// ```text
///                 clear                 multiply_add
/// Uninitialized ───────► Cleared ─────────────────► Accumulating ◄─┐
///                          ▲  │                        │  │        │ multiply_add
///                          │  └──── drain ──┐  drain ──┘  └────────┘
///                          │                ▼
///                          └── clear ──── Drained
/// ```
///
/// `clear` is valid from every state.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum AccumulatorState {
    /// Never cleared, the sums are meaningless.
    Uninitialized,
    /// All sums are zero.
    Cleared,
    /// At least one tile product was added.
    Accumulating,
    /// The sums were read out, a clear is required before reuse.
    Drained,
}

/// How drained sums are laid out, written once per call into the config slot of the scratchpad.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Zeroable, Pod)]
pub struct DrainConfig {
    /// Bit width of drained elements.
    pub out_bits: u32,
    /// Rows of the drained tile.
    pub rows: u32,
    /// Columns of the drained tile.
    pub cols: u32,
    /// Row bundle size of the drained tile order.
    pub group: u32,
}

impl DrainConfig {
    /// Number of meaningful bytes in the config slot.
    pub const SIZE: usize = core::mem::size_of::<DrainConfig>();

    /// The configuration draining tiles of precision `P`.
    pub fn of<P: HmxPrecision>() -> Self {
        let order = P::OUT_ORDER;
        Self {
            out_bits: P::Out::DTYPE.size_bits() as u32,
            rows: order.rows as u32,
            cols: order.cols as u32,
            group: order.group as u32,
        }
    }

    /// Write the configuration at the start of `slot`.
    pub fn store(&self, slot: &mut [u8]) -> Result<(), MatmulError> {
        let dst = slot
            .get_mut(..Self::SIZE)
            .ok_or_else(|| MatmulError::bad_param("the config slot is too small"))?;
        dst.copy_from_slice(bytemuck::bytes_of(self));
        Ok(())
    }

    /// Read a configuration from the start of `slot`.
    pub fn load(slot: &[u8]) -> Result<Self, MatmulError> {
        let src = slot
            .get(..Self::SIZE)
            .ok_or_else(|| MatmulError::bad_param("the config slot is too small"))?;
        Ok(bytemuck::pod_read_unaligned(src))
    }
}

/// Partial sums of one output tile.
///
/// Models the hardware accumulator: it is cleared, receives one tile product per inner tile, and
/// is drained to a staging slot in the output tile order.
#[derive(Debug)]
pub struct Accumulator<P: HmxPrecision> {
    sums: Vec<P::Acc>,
    lhs: Vec<P::Lhs>,
    rhs: Vec<P::Rhs>,
    state: AccumulatorState,
}

impl<P: HmxPrecision> Default for Accumulator<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: HmxPrecision> Accumulator<P> {
    /// An uninitialized accumulator.
    pub fn new() -> Self {
        Self {
            sums: vec![P::Acc::default(); P::out_tile().num_elements()],
            lhs: vec![P::Lhs::default(); P::LHS_ORDER.num_elements()],
            rhs: vec![P::Rhs::default(); P::RHS_ORDER.num_elements()],
            state: AccumulatorState::Uninitialized,
        }
    }

    /// Current state.
    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    /// Reset every sum to zero.
    pub fn clear(&mut self) {
        self.sums.fill(P::Acc::default());
        self.state = AccumulatorState::Cleared;
    }

    /// Add the product of a staged activation tile and a staged weight tile.
    pub fn multiply_add(&mut self, activation: &[u8], weights: &[u8]) -> Result<(), MatmulError> {
        if !matches!(
            self.state,
            AccumulatorState::Cleared | AccumulatorState::Accumulating
        ) {
            return Err(MatmulError::AccumulatorState {
                operation: "multiply_add",
                state: self.state,
            });
        }
        check_len("activation", activation, P::lhs_tile_bytes())?;
        check_len("weight", weights, P::rhs_tile_bytes())?;

        let lhs_order = P::LHS_ORDER;
        let rhs_order = P::RHS_ORDER;
        let (rows, inner, cols) = (lhs_order.rows, lhs_order.cols, rhs_order.cols);

        // Unpack both tiles to row-major once, the inner loop then runs over contiguous values.
        unpack(&lhs_order, activation, &mut self.lhs);
        unpack_transposed(&rhs_order, weights, &mut self.rhs);

        for r in 0..rows {
            let lhs_row = &self.lhs[r * inner..(r + 1) * inner];
            for c in 0..cols {
                let rhs_col = &self.rhs[c * inner..(c + 1) * inner];
                let sum = &mut self.sums[r * cols + c];
                *sum = lhs_row
                    .iter()
                    .zip(rhs_col)
                    .fold(*sum, |acc, (lhs, rhs)| P::multiply_add(acc, *lhs, *rhs));
            }
        }

        self.state = AccumulatorState::Accumulating;
        Ok(())
    }

    /// Read the sums out into `out` following `config`.
    pub fn drain(&mut self, config: &DrainConfig, out: &mut [u8]) -> Result<(), MatmulError> {
        if !matches!(
            self.state,
            AccumulatorState::Cleared | AccumulatorState::Accumulating
        ) {
            return Err(MatmulError::AccumulatorState {
                operation: "drain",
                state: self.state,
            });
        }
        if *config != DrainConfig::of::<P>() {
            return Err(MatmulError::bad_param(format!(
                "drain configuration {config:?} doesn't match the {} pipeline",
                P::NAME
            )));
        }
        check_len("output", out, P::out_tile_bytes())?;

        let order = P::OUT_ORDER;
        for (index, sum) in self.sums.iter().enumerate() {
            let (row, col) = (index / order.cols, index % order.cols);
            P::Out::write(out, order.index(row, col), P::drain(*sum));
        }

        self.state = AccumulatorState::Drained;
        Ok(())
    }
}

fn check_len(what: &str, slot: &[u8], expected: usize) -> Result<(), MatmulError> {
    match slot.len() >= expected {
        true => Ok(()),
        false => Err(MatmulError::bad_param(format!(
            "{what} tile holds {} bytes, expected {expected}",
            slot.len()
        ))),
    }
}

fn unpack<E: Element>(order: &TileOrder, tile: &[u8], flat: &mut [E]) {
    for (index, value) in flat.iter_mut().enumerate() {
        *value = E::read(tile, order.index(index / order.cols, index % order.cols));
    }
}

// Weight tiles are inner x cols, stored here column by column so each output column reads a
// contiguous slice.
fn unpack_transposed<E: Element>(order: &TileOrder, tile: &[u8], flat: &mut [E]) {
    for (index, value) in flat.iter_mut().enumerate() {
        let (col, row) = (index / order.rows, index % order.rows);
        *value = E::read(tile, order.index(row, col));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{F16Precision, U8I8Precision};
    use hmxkit_tensor::f16;

    fn identity_weights() -> Vec<u8> {
        let order = U8I8Precision::RHS_ORDER;
        let mut tile = vec![0u8; U8I8Precision::rhs_tile_bytes()];
        for i in 0..32 {
            i8::write(&mut tile, order.index(i, i), 1);
        }
        tile
    }

    #[test]
    fn identity_product() {
        let lhs_order = U8I8Precision::LHS_ORDER;
        let mut activation = vec![0u8; 2048];
        for r in 0..64 {
            for k in 0..32 {
                u8::write(&mut activation, lhs_order.index(r, k), (r + k) as u8);
            }
        }
        let weights = identity_weights();
        let mut out = vec![0u8; 8192];

        let mut acc = Accumulator::<U8I8Precision>::new();
        acc.clear();
        acc.multiply_add(&activation, &weights).unwrap();
        acc.multiply_add(&activation, &weights).unwrap();
        acc.drain(&DrainConfig::of::<U8I8Precision>(), &mut out)
            .unwrap();

        let out_order = U8I8Precision::OUT_ORDER;
        for r in 0..64 {
            for c in 0..32 {
                assert_eq!(i32::read(&out, out_order.index(r, c)), 2 * (r + c) as i32);
            }
        }
    }

    #[test]
    fn state_machine() {
        let activation = vec![0u8; 2048];
        let weights = vec![0u8; 2048];
        let mut out = vec![0u8; 2048];
        let config = DrainConfig::of::<F16Precision>();
        let mut acc = Accumulator::<F16Precision>::new();

        assert_eq!(
            acc.multiply_add(&activation, &weights),
            Err(MatmulError::AccumulatorState {
                operation: "multiply_add",
                state: AccumulatorState::Uninitialized
            })
        );
        assert!(acc.drain(&config, &mut out).is_err());

        acc.clear();
        acc.drain(&config, &mut out).unwrap();
        assert_eq!(acc.state(), AccumulatorState::Drained);
        assert!(matches!(
            acc.multiply_add(&activation, &weights),
            Err(MatmulError::AccumulatorState {
                state: AccumulatorState::Drained,
                ..
            })
        ));
        assert!(acc.drain(&config, &mut out).is_err());

        acc.clear();
        acc.multiply_add(&activation, &weights).unwrap();
        assert_eq!(acc.state(), AccumulatorState::Accumulating);
    }

    #[test]
    fn cleared_drain_writes_zeros() {
        let mut out = vec![0xFFu8; 2048];
        let mut acc = Accumulator::<F16Precision>::new();

        acc.clear();
        acc.drain(&DrainConfig::of::<F16Precision>(), &mut out)
            .unwrap();

        assert!(out.chunks(2).all(|v| f16::read(v, 0) == f16::ZERO));
    }

    #[test]
    fn config_goes_through_the_slot() {
        let mut slot = vec![0u8; 256];
        let config = DrainConfig::of::<U8I8Precision>();
        config.store(&mut slot[1..]).unwrap();

        assert_eq!(DrainConfig::load(&slot[1..]).unwrap(), config);
        assert_eq!(config.rows, 64);
        assert_eq!(config.out_bits, 32);

        let mut acc = Accumulator::<F16Precision>::new();
        acc.clear();
        let mut out = vec![0u8; 2048];
        assert!(matches!(
            acc.drain(&config, &mut out),
            Err(MatmulError::BadParam { .. })
        ));
    }
}
