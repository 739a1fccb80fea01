use crate::{
    components::{
        CastFrom, F16Precision, HmxPrecision, MatmulError, MatmulIdent, MatmulProblem, Pipeline,
        ScratchpadLayout, U8I4Precision, U8I8Precision,
        global::{
            ActivationSource, OutputSink, StridedOperand, StridedOutput, TiledOperand, TiledOutput,
        },
        layout::{ImageKind, TileImage, to_image},
    },
    kernels::{blocked, naive},
};
use hmxkit_common::config::{BinaryLogLevel, GlobalConfig, Logger, matmul::MatmulLogLevel};
use hmxkit_tensor::{
    DType, Element, MatrixView, MatrixViewMut, TensorDescriptor, TensorLayout, TensorMut,
    TensorRef, check_mm, f16, validate,
};

/// Where a multiply runs.
#[derive(Debug)]
pub enum Platform<'a> {
    /// Naive reference multiply straight from the descriptors.
    Cpu,
    /// Not available, always fails with [UnsupportedPipeline](MatmulError::UnsupportedPipeline).
    Gpu,
    /// Tiled engine staging through the given scratchpad.
    Npu(&'a mut [u8]),
}

/// Compute `result = left · rightᵗ` with `left = [R, K]`, `right = [C, K]` and `result = [R, C]`.
///
/// All three descriptors are validated and checked for compatibility before the pipeline is
/// selected from their dtypes:
///
/// | left      | right | result    | pipeline                 |
/// |-----------|-------|-----------|--------------------------|
/// | f16 / f32 | f16   | f16 / f32 | [F16Precision]           |
/// | u8        | i8    | i32       | [U8I8Precision]          |
/// | u8        | i4    | i32       | [U8I4Precision]          |
///
/// On failure the content of `result` is undefined.
pub fn multiply<O, L, R>(
    platform: Platform<'_>,
    result: &mut TensorDescriptor<O>,
    left: &TensorDescriptor<L>,
    right: &TensorDescriptor<R>,
) -> Result<(), MatmulError>
where
    O: AsRef<[u8]> + AsMut<[u8]>,
    L: AsRef<[u8]>,
    R: AsRef<[u8]>,
{
    validate(left)?;
    validate(right)?;
    validate(&*result)?;
    check_mm(&*result, left, right)?;

    let pipeline = Pipeline::select(left.dtype, right.dtype, result.dtype)?;
    if right.is_quantized() {
        return Err(MatmulError::unsupported("quantized weights"));
    }

    let mut logger = Logger::new();
    if !matches!(logger.log_level_matmul(), MatmulLogLevel::Disabled) {
        logger.log_matmul(&format!(
            "{pipeline} on {}: {} ({:?}) x {} ({:?}) -> {} ({:?})",
            platform_name(&platform),
            format_dims(&left.dims),
            left.layout,
            format_dims(&right.dims),
            right.layout,
            format_dims(&result.dims),
            result.layout,
        ));
    }

    match pipeline {
        Pipeline::F16F16F16 => {
            run::<F16Precision, f16, f16, _, _, _>(platform, result, left, right, &mut logger)
        }
        Pipeline::F32F16F32 => {
            run::<F16Precision, f32, f32, _, _, _>(platform, result, left, right, &mut logger)
        }
        Pipeline::F16F16F32 => {
            run::<F16Precision, f16, f32, _, _, _>(platform, result, left, right, &mut logger)
        }
        Pipeline::F32F16F16 => {
            run::<F16Precision, f32, f16, _, _, _>(platform, result, left, right, &mut logger)
        }
        Pipeline::U8I8I32 => {
            run::<U8I8Precision, u8, i32, _, _, _>(platform, result, left, right, &mut logger)
        }
        Pipeline::U8I4I32 => {
            run::<U8I4Precision, u8, i32, _, _, _>(platform, result, left, right, &mut logger)
        }
    }
}

fn platform_name(platform: &Platform<'_>) -> String {
    match platform {
        Platform::Cpu => "cpu".to_string(),
        Platform::Gpu => "gpu".to_string(),
        Platform::Npu(scratchpad) => format!("npu ({} B scratchpad)", scratchpad.len()),
    }
}

fn format_dims(dims: &[usize]) -> String {
    let dims: Vec<String> = dims.iter().map(ToString::to_string).collect();
    format!("[{}]", dims.join(", "))
}

fn run<P, S, T, O, L, R>(
    platform: Platform<'_>,
    result: &mut TensorDescriptor<O>,
    left: &TensorDescriptor<L>,
    right: &TensorDescriptor<R>,
    logger: &mut Logger,
) -> Result<(), MatmulError>
where
    P: HmxPrecision,
    S: Element,
    T: Element + CastFrom<P::Out>,
    P::Lhs: CastFrom<S>,
    O: AsRef<[u8]> + AsMut<[u8]>,
    L: AsRef<[u8]>,
    R: AsRef<[u8]>,
{
    match platform {
        Platform::Gpu => Err(MatmulError::unsupported("no GPU backend is available")),
        Platform::Cpu => run_cpu::<P, S, T, O, L, R>(result, left, right),
        Platform::Npu(scratchpad) => {
            run_npu::<P, S, T, O, L, R>(scratchpad, result, left, right, logger)
        }
    }
}

fn run_cpu<P, S, T, O, L, R>(
    result: &mut TensorDescriptor<O>,
    left: &TensorDescriptor<L>,
    right: &TensorDescriptor<R>,
) -> Result<(), MatmulError>
where
    P: HmxPrecision,
    S: Element,
    T: Element + CastFrom<P::Out>,
    P::Lhs: CastFrom<S>,
    O: AsRef<[u8]> + AsMut<[u8]>,
    L: AsRef<[u8]>,
    R: AsRef<[u8]>,
{
    for (ident, layout) in [
        (MatmulIdent::Lhs, left.layout),
        (MatmulIdent::Rhs, right.layout),
        (MatmulIdent::Out, result.layout),
    ] {
        if layout.is_tiled() {
            return Err(MatmulError::unsupported(format!(
                "the cpu path reads strided matrices only, the {ident} operand is {layout:?}"
            )));
        }
    }

    let lhs = MatrixView::<S>::new(left)?;
    let rhs = MatrixView::<P::Rhs>::new(right)?;
    let mut out = MatrixViewMut::<T>::new(result)?;
    naive::launch::<P, S, T>(&lhs, &rhs, &mut out);

    Ok(())
}

fn run_npu<P, S, T, O, L, R>(
    scratchpad: &mut [u8],
    result: &mut TensorDescriptor<O>,
    left: &TensorDescriptor<L>,
    right: &TensorDescriptor<R>,
    logger: &mut Logger,
) -> Result<(), MatmulError>
where
    P: HmxPrecision,
    S: Element,
    T: Element + CastFrom<P::Out>,
    P::Lhs: CastFrom<S>,
    O: AsRef<[u8]> + AsMut<[u8]>,
    L: AsRef<[u8]>,
    R: AsRef<[u8]>,
{
    let problem = MatmulProblem::from_operands(left, right);
    // Fail on a small scratchpad before paying for a weight transcode.
    ScratchpadLayout::plan::<P>(scratchpad.len(), problem.k)?;

    let lhs: Box<dyn ActivationSource<P> + '_> = match left.layout {
        TensorLayout::RowMajorActivationHmx if S::DTYPE == P::Lhs::DTYPE => Box::new(
            TiledOperand::from_descriptor(left, MatmulIdent::Lhs)?.as_activations::<P>()?,
        ),
        TensorLayout::RowMajor2D | TensorLayout::ColMajor2D => {
            Box::new(StridedOperand::new(MatrixView::<S>::new(left)?))
        }
        layout => {
            return Err(MatmulError::unsupported(format!(
                "{:?} activations in {layout:?} layout for the {} pipeline",
                left.dtype,
                P::NAME
            )));
        }
    };

    let mut out: Box<dyn OutputSink<P> + '_> = match result.layout {
        TensorLayout::RowMajorActivationHmx if T::DTYPE == P::Out::DTYPE => {
            Box::new(TiledOutput::from_descriptor::<P, O>(result)?)
        }
        TensorLayout::RowMajor2D | TensorLayout::ColMajor2D => {
            Box::new(StridedOutput::new(MatrixViewMut::<T>::new(result)?))
        }
        layout => {
            return Err(MatmulError::unsupported(format!(
                "{:?} results in {layout:?} layout for the {} pipeline",
                result.dtype,
                P::NAME
            )));
        }
    };

    let transcoded;
    let rhs = match right.layout {
        TensorLayout::RowMajorWeightsHmx => {
            TiledOperand::from_descriptor(right, MatmulIdent::Rhs)?.as_weights::<P>()?
        }
        TensorLayout::RowMajor2D | TensorLayout::ColMajor2D => {
            let view = MatrixView::<P::Rhs>::new(right)?;
            let image =
                TileImage::padded(ImageKind::Weights, P::Rhs::DTYPE, problem.c, problem.k)?;
            transcoded = transcode_weights(&image, &view, logger)?;
            TiledOperand::new(image, &transcoded)?
        }
        layout => {
            return Err(MatmulError::unsupported(format!(
                "weights in {layout:?} layout"
            )));
        }
    };

    blocked::launch::<P>(scratchpad, &problem, &*lhs, &rhs, &mut *out, logger)
}

fn transcode_weights<E: Element>(
    image: &TileImage,
    view: &MatrixView<'_, E>,
    logger: &mut Logger,
) -> Result<Vec<u8>, MatmulError> {
    let mut data = vec![0u8; image.num_bytes()];
    to_image(image, view, &mut data)?;

    let message = format!(
        "transcoded {}x{} {:?} weights into a {} B tile image ({} tiles)",
        view.rows(),
        view.cols(),
        E::DTYPE,
        data.len(),
        image.row_tiles() * image.col_tiles()
    );
    if !matches!(logger.log_level_matmul(), MatmulLogLevel::Disabled) {
        logger.log_matmul(&message);
    }
    if let BinaryLogLevel::Full = logger.log_level_transcode() {
        logger.log_transcode(&message);
    }
    log::debug!("{message}");

    Ok(data)
}

/// A zeroed scratchpad of the configured size.
pub fn default_scratchpad() -> Vec<u8> {
    vec![0u8; GlobalConfig::get().matmul.scratchpad_size]
}

/// `f16` activation image `[r, k]` times `f16` weight image `[c, k]` into an `f16` activation
/// image `[r, c]`.
///
/// The images are laid out the way [rm_to_ah_f16](crate::components::layout::rm_to_ah_f16) and
/// [rm_to_wh_f16](crate::components::layout::rm_to_wh_f16) build them, zero-padded to tile
/// multiples. `out` receives the padded result image, read it back with
/// [ah_to_rm_f16](crate::components::layout::ah_to_rm_f16).
pub fn mm_f16(
    scratchpad: &mut [u8],
    out: &mut [f16],
    lhs: &[f16],
    rhs: &[f16],
    r: usize,
    k: usize,
    c: usize,
) -> Result<(), MatmulError> {
    let lhs_image = TileImage::padded(ImageKind::Activation, DType::F16, r, k)?;
    let rhs_image = TileImage::padded(ImageKind::Weights, DType::F16, c, k)?;
    let out_image = TileImage::padded(ImageKind::Activation, DType::F16, r, c)?;

    let left = TensorRef::tiled(
        bytemuck::cast_slice(lhs),
        [lhs_image.rows, lhs_image.cols],
        DType::F16,
        TensorLayout::RowMajorActivationHmx,
    );
    let right = weight_image(bytemuck::cast_slice(rhs), &rhs_image);
    let mut result = TensorMut::tiled(
        bytemuck::cast_slice_mut(out),
        [out_image.rows, out_image.cols],
        DType::F16,
        TensorLayout::RowMajorActivationHmx,
    );

    multiply(Platform::Npu(scratchpad), &mut result, &left, &right)
}

/// Row-major `f32` activations `[r, k]` times an `f16` weight image `[c, k]` into row-major `f32`.
///
/// `r`, `k` and `c` are the logical dims, the weight image is the zero-padded one built by
/// [rm_to_wh_f16](crate::components::layout::rm_to_wh_f16).
pub fn mm_f32f16_f32(
    scratchpad: &mut [u8],
    out: &mut [f32],
    lhs: &[f32],
    rhs: &[f16],
    r: usize,
    k: usize,
    c: usize,
) -> Result<(), MatmulError> {
    row_major_mm(scratchpad, out, lhs, bytemuck::cast_slice(rhs), DType::F16, r, k, c)
}

/// Row-major `f16` activations `[r, k]` times an `f16` weight image `[c, k]` into row-major `f16`.
pub fn mm_f16f16_f16(
    scratchpad: &mut [u8],
    out: &mut [f16],
    lhs: &[f16],
    rhs: &[f16],
    r: usize,
    k: usize,
    c: usize,
) -> Result<(), MatmulError> {
    row_major_mm(scratchpad, out, lhs, bytemuck::cast_slice(rhs), DType::F16, r, k, c)
}

/// Row-major `u8` activations `[r, k]` times an `i8` weight image `[c, k]` into row-major `i32`.
///
/// `k` and `c` don't need to be tile multiples, the image is padded like
/// [rm_to_wh_i8](crate::components::layout::rm_to_wh_i8) pads it.
pub fn mm_u8i8_i32(
    scratchpad: &mut [u8],
    out: &mut [i32],
    lhs: &[u8],
    rhs: &[i8],
    r: usize,
    k: usize,
    c: usize,
) -> Result<(), MatmulError> {
    row_major_mm(scratchpad, out, lhs, bytemuck::cast_slice(rhs), DType::I8, r, k, c)
}

/// Row-major `u8` activations `[r, k]` times a packed `i4` weight image `[c, k]` into row-major
/// `i32`. See [rm_to_wh_i4](crate::components::layout::rm_to_wh_i4) to build the image.
pub fn mm_u8i4_i32(
    scratchpad: &mut [u8],
    out: &mut [i32],
    lhs: &[u8],
    rhs: &[u8],
    r: usize,
    k: usize,
    c: usize,
) -> Result<(), MatmulError> {
    row_major_mm(scratchpad, out, lhs, rhs, DType::I4, r, k, c)
}

fn weight_image<'a>(data: &'a [u8], image: &TileImage) -> TensorRef<'a> {
    TensorRef::tiled(
        data,
        [image.rows, image.cols],
        image.dtype,
        TensorLayout::RowMajorWeightsHmx,
    )
}

// Weight images are padded to tile multiples, so the activations are widened to the padded inner
// dim and the result is staged at the padded column count when the logical dims aren't.
#[allow(clippy::too_many_arguments)]
fn row_major_mm<S: Element + bytemuck::Pod, T: Element + bytemuck::Pod>(
    scratchpad: &mut [u8],
    out: &mut [T],
    lhs: &[S],
    rhs: &[u8],
    rhs_dtype: DType,
    r: usize,
    k: usize,
    c: usize,
) -> Result<(), MatmulError> {
    let image = TileImage::padded(ImageKind::Weights, rhs_dtype, c, k)?;
    let (padded_c, padded_k) = (image.rows, image.cols);
    let right = weight_image(rhs, &image);

    let widened;
    let lhs = match padded_k == k {
        true => lhs,
        false => {
            widened = pad_cols(lhs, r, k, padded_k)?;
            widened.as_slice()
        }
    };
    let left = TensorRef::row_major(bytemuck::cast_slice(lhs), [r, padded_k], S::DTYPE);

    if padded_c == c {
        let mut result = TensorMut::row_major(bytemuck::cast_slice_mut(out), [r, c], T::DTYPE);
        return multiply(Platform::Npu(scratchpad), &mut result, &left, &right);
    }

    validate(&TensorRef::row_major(bytemuck::cast_slice(out), [r, c], T::DTYPE))?;
    let mut staged = vec![T::default(); r * padded_c];
    let mut result = TensorMut::row_major(
        bytemuck::cast_slice_mut(&mut staged),
        [r, padded_c],
        T::DTYPE,
    );
    multiply(Platform::Npu(scratchpad), &mut result, &left, &right)?;

    for (dst, src) in out.chunks_exact_mut(c).zip(staged.chunks_exact(padded_c)) {
        dst.copy_from_slice(&src[..c]);
    }

    Ok(())
}

fn pad_cols<E: Element + bytemuck::Pod>(
    data: &[E],
    rows: usize,
    cols: usize,
    padded_cols: usize,
) -> Result<Vec<E>, MatmulError> {
    validate(&TensorRef::row_major(bytemuck::cast_slice(data), [rows, cols], E::DTYPE))?;

    let mut padded = vec![E::default(); rows * padded_cols];
    for (dst, src) in padded.chunks_exact_mut(padded_cols).zip(data.chunks_exact(cols)) {
        dst[..cols].copy_from_slice(src);
    }

    Ok(padded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn small_scratchpad_fails_before_transcoding_weights() {
        let path = std::env::temp_dir()
            .join(format!("hmxkit-transcode-{}.log", std::process::id()));
        let mut config = GlobalConfig::default();
        config.transcode.logger.file = Some(path.clone());
        config.transcode.logger.append = false;
        config.transcode.logger.level = BinaryLogLevel::Full;
        let mut logger = Logger::from_config(Arc::new(config));

        let lhs = vec![1u8; 64 * 64];
        let rhs = vec![1u8; 32 * 64];
        let mut out = vec![0u8; 64 * 32 * 4];
        let left = TensorRef::row_major(lhs.as_slice(), [64, 64], DType::U8);
        let right = TensorRef::row_major(rhs.as_slice(), [32, 64], DType::I8);
        let mut result = TensorMut::row_major(out.as_mut_slice(), [64, 32], DType::I32);

        let mut small = vec![0u8; 4096];
        let err = run_npu::<U8I8Precision, u8, i32, _, _, _>(
            &mut small,
            &mut result,
            &left,
            &right,
            &mut logger,
        );
        assert!(matches!(err, Err(MatmulError::InsufficientScratchpad { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        let mut scratchpad = vec![0u8; 32 * 1024];
        run_npu::<U8I8Precision, u8, i32, _, _, _>(
            &mut scratchpad,
            &mut result,
            &left,
            &right,
            &mut logger,
        )
        .unwrap();
        let log = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(log.contains("transcoded 32x64 I8 weights"), "{log}");
        assert!(out.chunks_exact(4).all(|v| v == 64i32.to_ne_bytes()));
    }
}
