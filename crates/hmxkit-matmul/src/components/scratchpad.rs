use crate::components::{HmxPrecision, MatmulError};
use core::ops::Range;
use hmxkit_common::stride::{align_down, align_up};

/// Alignment and size unit of activation slots, also the required granularity of a scratchpad.
pub const ACTIVATION_ALIGNMENT: usize = 2048;
/// Alignment of the weight and result slots.
pub const WEIGHTS_ALIGNMENT: usize = 128;
/// Alignment of the accumulator configuration slot.
pub const CONFIG_ALIGNMENT: usize = 256;
/// Size reserved for the accumulator configuration.
pub const CONFIG_SIZE: usize = 256;

/// Partition of a scratchpad for one multiply.
///
/// ```text
/// 0                                                                      size
/// ├─ act 0 ─┼─ act 1 ─┼ … ┼─ weights ─┼ ……… ┼─ result ─┼ … ┼─ config ─┼ … ┤
///   2048 B    2048 B        128-aligned       128-aligned   256-aligned
/// ```
///
/// One activation slot per inner tile, so a whole row of activation tiles stays resident while
/// every output column-tile of that row is computed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScratchpadLayout {
    /// Total size of the scratchpad in bytes.
    pub size: usize,
    /// Number of activation slots.
    pub num_activation_slots: usize,
    /// Byte size of each activation slot.
    pub activation_slot_size: usize,
    /// Bytes of the weight slot.
    pub weights: Range<usize>,
    /// Bytes of the result staging slot.
    pub result: Range<usize>,
    /// Bytes of the accumulator configuration slot.
    pub config: Range<usize>,
}

/// Disjoint mutable slots of a scratchpad, see [ScratchpadLayout::split].
pub struct ScratchpadSlots<'a> {
    activations: &'a mut [u8],
    activation_slot_size: usize,
    activation_tile_bytes: usize,
    /// Staged weight tile.
    pub weights: &'a mut [u8],
    /// Drained output tile.
    pub result: &'a mut [u8],
    /// Accumulator configuration.
    pub config: &'a mut [u8],
}

impl ScratchpadLayout {
    /// Plan a scratchpad of `size` bytes for precision `P` and an inner dimension of `inner`.
    pub fn plan<P: HmxPrecision>(size: usize, inner: usize) -> Result<Self, MatmulError> {
        if size == 0 {
            return Err(MatmulError::scratchpad(size, "the scratchpad is empty"));
        }
        if size % ACTIVATION_ALIGNMENT != 0 {
            return Err(MatmulError::scratchpad(
                size,
                format!("not a multiple of {ACTIVATION_ALIGNMENT} bytes"),
            ));
        }

        let num_activation_slots = inner.div_ceil(P::LHS_ORDER.cols);
        let activation_slot_size = align_up(P::lhs_tile_bytes(), ACTIVATION_ALIGNMENT);
        let activations_end = num_activation_slots * activation_slot_size;

        let weights_start = align_up(activations_end, WEIGHTS_ALIGNMENT);
        let weights = weights_start..weights_start + P::rhs_tile_bytes();

        let config_start = align_down(size - CONFIG_SIZE, CONFIG_ALIGNMENT);
        let config = config_start..config_start + CONFIG_SIZE;

        let result_start = config_start
            .checked_sub(P::out_tile_bytes())
            .map(|end| align_down(end, WEIGHTS_ALIGNMENT))
            .ok_or_else(|| {
                MatmulError::scratchpad(size, "no room for the result slot before the config")
            })?;
        let result = result_start..result_start + P::out_tile_bytes();

        if result.start < weights.end {
            return Err(MatmulError::scratchpad(
                size,
                format!(
                    "{num_activation_slots} activation slots, a weight slot and a result slot need {} bytes",
                    Self::required_size::<P>(inner)
                ),
            ));
        }

        Ok(Self {
            size,
            num_activation_slots,
            activation_slot_size,
            weights,
            result,
            config,
        })
    }

    /// Smallest scratchpad size accepted by [plan](ScratchpadLayout::plan) for `inner`.
    pub fn required_size<P: HmxPrecision>(inner: usize) -> usize {
        let activations = inner.div_ceil(P::LHS_ORDER.cols)
            * align_up(P::lhs_tile_bytes(), ACTIVATION_ALIGNMENT);
        let weights_end = align_up(activations, WEIGHTS_ALIGNMENT) + P::rhs_tile_bytes();
        let result_end = align_up(weights_end, WEIGHTS_ALIGNMENT) + P::out_tile_bytes();
        let config_end = align_up(result_end, CONFIG_ALIGNMENT) + CONFIG_SIZE;

        align_up(config_end, ACTIVATION_ALIGNMENT)
    }

    /// Bytes of activation slot `index`.
    pub fn activation_slot(&self, index: usize) -> Range<usize> {
        let start = index * self.activation_slot_size;
        start..start + self.activation_slot_size
    }

    /// Borrow the slots of `scratchpad` separately.
    pub fn split<'a, P: HmxPrecision>(
        &self,
        scratchpad: &'a mut [u8],
    ) -> Result<ScratchpadSlots<'a>, MatmulError> {
        if scratchpad.len() < self.size {
            return Err(MatmulError::scratchpad(
                scratchpad.len(),
                format!("the plan covers {} bytes", self.size),
            ));
        }

        let (head, config) = scratchpad.split_at_mut(self.config.start);
        let (head, result) = head.split_at_mut(self.result.start);
        let (head, weights) = head.split_at_mut(self.weights.start);
        let activations = &mut head[..self.num_activation_slots * self.activation_slot_size];

        Ok(ScratchpadSlots {
            activations,
            activation_slot_size: self.activation_slot_size,
            activation_tile_bytes: P::lhs_tile_bytes(),
            weights: &mut weights[..self.weights.len()],
            result: &mut result[..self.result.len()],
            config: &mut config[..self.config.len()],
        })
    }
}

impl ScratchpadSlots<'_> {
    /// Activation tile staged in slot `index`.
    pub fn activation(&self, index: usize) -> &[u8] {
        let start = index * self.activation_slot_size;
        &self.activations[start..start + self.activation_tile_bytes]
    }

    /// Mutable activation tile of slot `index`.
    pub fn activation_mut(&mut self, index: usize) -> &mut [u8] {
        let start = index * self.activation_slot_size;
        &mut self.activations[start..start + self.activation_tile_bytes]
    }
}

impl core::fmt::Display for ScratchpadLayout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "scratchpad {} B: {} activation slots of {} B, weights {:?}, result {:?}, config {:?}",
            self.size,
            self.num_activation_slots,
            self.activation_slot_size,
            self.weights,
            self.result,
            self.config
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{F16Precision, U8I4Precision, U8I8Precision};
    use pretty_assertions::assert_eq;

    #[test]
    fn f16_plan() {
        let layout = ScratchpadLayout::plan::<F16Precision>(10240, 64).unwrap();

        assert_eq!(
            layout,
            ScratchpadLayout {
                size: 10240,
                num_activation_slots: 2,
                activation_slot_size: 2048,
                weights: 4096..6144,
                result: 7936..9984,
                config: 9984..10240,
            }
        );
        assert_eq!(layout.activation_slot(1), 2048..4096);
    }

    #[test]
    fn rejects_bad_sizes() {
        for size in [0, 1000, 2049, 8192] {
            assert!(matches!(
                ScratchpadLayout::plan::<F16Precision>(size, 64),
                Err(MatmulError::InsufficientScratchpad { size: s, .. }) if s == size
            ));
        }
        assert!(ScratchpadLayout::plan::<U8I8Precision>(2048, 32).is_err());
    }

    #[test]
    fn planned_regions_are_disjoint_and_aligned() {
        for inner in [1, 32, 100, 512, 4096] {
            let size = ScratchpadLayout::required_size::<U8I4Precision>(inner);
            let layout = ScratchpadLayout::plan::<U8I4Precision>(size, inner).unwrap();
            let activations_end = layout.activation_slot(layout.num_activation_slots - 1).end;

            assert!(activations_end <= layout.weights.start);
            assert!(layout.weights.end <= layout.result.start);
            assert!(layout.result.end <= layout.config.start);
            assert!(layout.config.end <= size);
            assert_eq!(layout.weights.start % WEIGHTS_ALIGNMENT, 0);
            assert_eq!(layout.result.start % WEIGHTS_ALIGNMENT, 0);
            assert_eq!(layout.config.start % CONFIG_ALIGNMENT, 0);
        }
    }

    #[test]
    fn required_size_is_tight_enough() {
        assert_eq!(ScratchpadLayout::required_size::<F16Precision>(64), 10240);
        assert!(ScratchpadLayout::plan::<F16Precision>(8192, 64).is_err());
    }

    #[test]
    fn split_hands_out_every_slot() {
        let mut scratchpad = vec![0u8; 10240];
        let layout = ScratchpadLayout::plan::<F16Precision>(10240, 64).unwrap();
        let mut slots = layout.split::<F16Precision>(&mut scratchpad).unwrap();

        slots.activation_mut(1).fill(1);
        slots.weights.fill(2);
        slots.result.fill(3);
        slots.config.fill(4);
        assert_eq!(slots.activation(0)[0], 0);

        assert_eq!(scratchpad[2048], 1);
        assert_eq!(scratchpad[4096], 2);
        assert_eq!(scratchpad[7936], 3);
        assert_eq!(scratchpad[10239], 4);
        assert_eq!(scratchpad[6144], 0);

        let mut small = vec![0u8; 4096];
        assert!(layout.split::<F16Precision>(&mut small).is_err());
    }
}
