use crate::components::{
    HmxPrecision, MatmulError, MatmulProblem, ScratchpadLayout,
    global::{ActivationSource, OutputSink, WeightSource},
    tile::{Accumulator, DrainConfig},
};
use hmxkit_common::config::{Logger, matmul::MatmulLogLevel};

/// Compute `out = lhs x rhs^T` tile by tile through `scratchpad`.
///
/// For every row-tile, all of its activation tiles are staged first. Each output column-tile then
/// clears the accumulator, stages and multiplies one weight tile per inner tile, drains into the
/// result slot and hands the drained tile to `out`.
///
/// The scratchpad is planned before any tile is touched, so an
/// [InsufficientScratchpad](MatmulError::InsufficientScratchpad) error leaves `out` unchanged.
/// Any later error leaves `out` partially written.
pub fn launch<P: HmxPrecision>(
    scratchpad: &mut [u8],
    problem: &MatmulProblem,
    lhs: &dyn ActivationSource<P>,
    rhs: &dyn WeightSource<P>,
    out: &mut dyn OutputSink<P>,
    logger: &mut Logger,
) -> Result<(), MatmulError> {
    let layout = ScratchpadLayout::plan::<P>(scratchpad.len(), problem.k)?;
    let mut slots = layout.split::<P>(scratchpad)?;
    DrainConfig::of::<P>().store(slots.config)?;

    let row_tiles = problem.row_tiles::<P>();
    let col_tiles = problem.col_tiles::<P>();
    let inner_tiles = problem.inner_tiles::<P>();

    if let MatmulLogLevel::Full = logger.log_level_matmul() {
        logger.log_matmul(&format!(
            "{} {problem}: {row_tiles}x{col_tiles} output tiles, {inner_tiles} inner tiles, {layout}",
            P::NAME
        ));
    }

    let mut accumulator = Accumulator::<P>::new();

    for row_tile in 0..row_tiles {
        for k_tile in 0..inner_tiles {
            lhs.stage(slots.activation_mut(k_tile), row_tile, k_tile)?;
        }

        for c_tile in 0..col_tiles {
            accumulator.clear();
            for k_tile in 0..inner_tiles {
                rhs.stage(slots.weights, k_tile, c_tile)?;
                accumulator.multiply_add(slots.activation(k_tile), slots.weights)?;
            }

            let config = DrainConfig::load(slots.config)?;
            accumulator.drain(&config, slots.result)?;
            out.write(slots.result, row_tile, c_tile)?;
        }
    }

    log::trace!(
        "{} matmul {problem} done, {} tile products",
        P::NAME,
        problem.num_tile_products::<P>()
    );

    Ok(())
}
