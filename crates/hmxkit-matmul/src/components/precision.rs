use crate::components::tile::TileOrder;
use hmxkit_tensor::{Element, TileGeometry, f16, i4};

/// Numeric pipeline of the tile engine.
///
/// A precision fixes the staged element types, the accumulator and the in-tile orders. The
/// activation tile is `LHS_ORDER.rows x LHS_ORDER.cols` (rows x inner), the weight tile
/// `RHS_ORDER.rows x RHS_ORDER.cols` (inner x cols) and the drained output tile
/// `LHS_ORDER.rows x RHS_ORDER.cols`.
pub trait HmxPrecision: Send + Sync + Copy + 'static {
    /// Element of staged activation tiles.
    type Lhs: Element;
    /// Element of staged weight tiles.
    type Rhs: Element;
    /// Partial sum held by the accumulator.
    type Acc: Copy + Default + core::fmt::Debug + Send + Sync;
    /// Element of drained output tiles.
    type Out: Element;

    /// Short name used in logs.
    const NAME: &'static str;
    /// Order of activation tiles.
    const LHS_ORDER: TileOrder;
    /// Order of weight tiles.
    const RHS_ORDER: TileOrder;
    /// Order of drained output tiles.
    const OUT_ORDER: TileOrder;

    /// Accumulate one product.
    fn multiply_add(acc: Self::Acc, lhs: Self::Lhs, rhs: Self::Rhs) -> Self::Acc;

    /// Convert a partial sum to the output element.
    fn drain(acc: Self::Acc) -> Self::Out;

    /// Geometry of the drained output tile.
    fn out_tile() -> TileGeometry {
        TileGeometry::new(Self::LHS_ORDER.rows, Self::RHS_ORDER.cols)
    }

    /// Payload of one activation tile in bytes.
    fn lhs_tile_bytes() -> usize {
        Self::Lhs::DTYPE.bytes_for(Self::LHS_ORDER.num_elements())
    }

    /// Payload of one weight tile in bytes.
    fn rhs_tile_bytes() -> usize {
        Self::Rhs::DTYPE.bytes_for(Self::RHS_ORDER.num_elements())
    }

    /// Payload of one drained output tile in bytes.
    fn out_tile_bytes() -> usize {
        Self::Out::DTYPE.bytes_for(Self::OUT_ORDER.num_elements())
    }
}

/// Half-precision inputs, products summed in `f32`, narrowed to `f16` on drain.
#[derive(Clone, Copy, Debug)]
pub struct F16Precision;

/// Unsigned 8-bit activations by signed 8-bit weights, exact `i32` sums.
#[derive(Clone, Copy, Debug)]
pub struct U8I8Precision;

/// Unsigned 8-bit activations by signed 4-bit weights, exact `i32` sums.
#[derive(Clone, Copy, Debug)]
pub struct U8I4Precision;

impl HmxPrecision for F16Precision {
    type Lhs = f16;
    type Rhs = f16;
    type Acc = f32;
    type Out = f16;

    const NAME: &'static str = "f16";
    const LHS_ORDER: TileOrder = TileOrder::F16_ACTIVATION;
    const RHS_ORDER: TileOrder = TileOrder::F16_WEIGHTS;
    const OUT_ORDER: TileOrder = TileOrder::F16_ACTIVATION;

    #[inline]
    fn multiply_add(acc: f32, lhs: f16, rhs: f16) -> f32 {
        acc + lhs.to_f32() * rhs.to_f32()
    }

    #[inline]
    fn drain(acc: f32) -> f16 {
        f16::from_f32(acc)
    }
}

impl HmxPrecision for U8I8Precision {
    type Lhs = u8;
    type Rhs = i8;
    type Acc = i32;
    type Out = i32;

    const NAME: &'static str = "u8i8_i32";
    const LHS_ORDER: TileOrder = TileOrder::B8_ACTIVATION;
    const RHS_ORDER: TileOrder = TileOrder::I8_WEIGHTS;
    const OUT_ORDER: TileOrder = TileOrder::I32_OUTPUT;

    #[inline]
    fn multiply_add(acc: i32, lhs: u8, rhs: i8) -> i32 {
        acc.wrapping_add(lhs as i32 * rhs as i32)
    }

    #[inline]
    fn drain(acc: i32) -> i32 {
        acc
    }
}

impl HmxPrecision for U8I4Precision {
    type Lhs = u8;
    type Rhs = i4;
    type Acc = i32;
    type Out = i32;

    const NAME: &'static str = "u8i4_i32";
    const LHS_ORDER: TileOrder = TileOrder::B8_ACTIVATION;
    const RHS_ORDER: TileOrder = TileOrder::I4_WEIGHTS;
    const OUT_ORDER: TileOrder = TileOrder::I32_OUTPUT;

    #[inline]
    fn multiply_add(acc: i32, lhs: u8, rhs: i4) -> i32 {
        acc.wrapping_add(lhs as i32 * rhs.value() as i32)
    }

    #[inline]
    fn drain(acc: i32) -> i32 {
        acc
    }
}
