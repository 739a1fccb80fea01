use hmxkit::{
    DType, Element, TensorLayout, TensorMut, TensorRef,
    common::config::{GlobalConfig, matmul::MatmulLogLevel},
    f16,
    matmul::{
        Platform,
        components::{
            MatmulError,
            layout::{
                ah_to_rm_f16, ah_to_rm_f16_inplace, rm_to_ah_f16, rm_to_ah_f16_inplace,
                rm_to_wh_f16, rm_to_wh_f16_inplace, rm_to_wh_i4, rm_to_wh_i8,
            },
        },
        default_scratchpad, mm_f16, mm_u8i4_i32, mm_u8i8_i32, multiply,
    },
};
use std::time::Instant;

const N_ROW: usize = 64;
const N_INNER: usize = 256;
const N_COL: usize = 128;

fn main() {
    if std::env::args().any(|arg| arg == "--log") {
        let mut config = GlobalConfig::default();
        config.matmul.logger.stdout = true;
        config.matmul.logger.level = MatmulLogLevel::Full;
        GlobalConfig::set(config);
    }

    let scenarios: [(&str, fn() -> Result<Report, MatmulError>); 9] = [
        ("f16 tiled (AH x WH -> AH)", f16_tiled),
        ("u8 x i4 -> i32 (RM x WH -> RM)", u8i4),
        ("u8 x i8 -> i32 (RM x WH -> RM)", u8i8),
        ("f32 x f16 -> f32 (RM x WH -> RM)", f32_weights_tiled),
        ("f32 x f16 -> f32, strided result", f32_strided_result),
        ("f16 x f16 -> f16, strided result", f16_strided_result),
        ("f16 tensors all tiled", f16_all_tiled),
        ("f16 row-major weights with offset result, cpu vs npu", cpu_vs_npu),
        ("u8 x i8 -> i32 row-major weights", u8i8_row_major_weights),
    ];

    let mut failures = 0;
    for (index, (name, scenario)) in scenarios.iter().enumerate() {
        match scenario() {
            Ok(report) => {
                println!(
                    "Scenario {}: {name}, {:.5} s, max error {}",
                    index + 1,
                    report.seconds,
                    report.max_error
                );
                if !report.passed {
                    failures += 1;
                    println!("Scenario {}: error not within tolerance", index + 1);
                }
            }
            Err(err) => {
                failures += 1;
                println!("Scenario {}: {name} failed: {err}", index + 1);
            }
        }
    }

    match failures {
        0 => println!("All scenarios passed"),
        n => {
            println!("{n} scenarios failed");
            std::process::exit(1);
        }
    }
}

struct Report {
    seconds: f64,
    max_error: f32,
    passed: bool,
}

impl Report {
    fn float(start: Instant, actual: &[f32], expected: &[f32]) -> Self {
        let seconds = start.elapsed().as_secs_f64();
        let mut max_error = 0.0f32;
        let mut passed = true;

        for (a, e) in actual.iter().zip(expected) {
            let error = (a - e).abs();
            max_error = max_error.max(error);
            passed &= error <= f32::max(0.01, e.abs() / 1000.0);
        }

        Self {
            seconds,
            max_error,
            passed,
        }
    }

    fn exact(start: Instant, actual: &[i32], expected: &[i32]) -> Self {
        let seconds = start.elapsed().as_secs_f64();
        let max_error = actual
            .iter()
            .zip(expected)
            .map(|(a, e)| a.abs_diff(*e) as f32)
            .fold(0.0, f32::max);

        Self {
            seconds,
            max_error,
            passed: max_error == 0.0,
        }
    }
}

fn activations_f16(rows: usize, inner: usize) -> Vec<f16> {
    (0..rows * inner)
        .map(|i| f16::from_f32((i / inner % 5) as f32 + 0.067))
        .collect()
}

fn weights_f16(cols: usize, inner: usize) -> Vec<f16> {
    (0..cols * inner)
        .map(|i| f16::from_f32((i / inner % 3) as f32 + 0.04906))
        .collect()
}

fn activations_u8(rows: usize, inner: usize) -> Vec<u8> {
    (0..rows * inner)
        .map(|index| {
            let (i, j) = (index / inner, index % inner);
            ((i * j + 2 + i) & 0xFF) as u8
        })
        .collect()
}

fn weights_i4(cols: usize, inner: usize) -> Vec<i8> {
    (0..cols * inner)
        .map(|index| {
            let (i, j) = (index / inner, index % inner);
            let nibble = ((i + j * 3 - i / 4) & 0x0F) as i8;
            if nibble & 0x08 != 0 { nibble - 16 } else { nibble }
        })
        .collect()
}

fn weights_i8(cols: usize, inner: usize) -> Vec<i8> {
    (0..cols * inner)
        .map(|index| {
            let (i, j) = (index / inner, index % inner);
            ((i + j * 3 - i / 4) & 0xFF) as u8 as i8
        })
        .collect()
}

fn reference_f32(lhs: &[f32], rhs: &[f32], rows: usize, inner: usize, cols: usize) -> Vec<f32> {
    let mut out = vec![0.0; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            out[r * cols + c] = (0..inner).map(|k| lhs[r * inner + k] * rhs[c * inner + k]).sum();
        }
    }
    out
}

fn reference_i32(lhs: &[u8], rhs: &[i8], rows: usize, inner: usize, cols: usize) -> Vec<i32> {
    let mut out = vec![0i32; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            out[r * cols + c] = (0..inner).fold(0i32, |acc, k| {
                acc.wrapping_add(lhs[r * inner + k] as i32 * rhs[c * inner + k] as i32)
            });
        }
    }
    out
}

fn widen(values: &[f16]) -> Vec<f32> {
    values.iter().map(|v| v.to_f32()).collect()
}

fn f16_tiled() -> Result<Report, MatmulError> {
    let (r, k, c) = (32, 64, 128);
    let mut lhs = activations_f16(r, k);
    let mut rhs = weights_f16(c, k);
    let expected = reference_f32(&widen(&lhs), &widen(&rhs), r, k, c);

    rm_to_wh_f16_inplace(&mut rhs, c, k)?;
    rm_to_ah_f16_inplace(&mut lhs, r, k)?;
    let mut out = vec![f16::ZERO; r * c];
    let mut scratchpad = default_scratchpad();

    let start = Instant::now();
    mm_f16(&mut scratchpad, &mut out, &lhs, &rhs, r, k, c)?;
    ah_to_rm_f16_inplace(&mut out, r, c)?;

    Ok(Report::float(start, &widen(&out), &expected))
}

fn u8i4() -> Result<Report, MatmulError> {
    let (r, k, c) = (N_ROW, 128, N_COL);
    let lhs = activations_u8(r, k);
    let weights = weights_i4(c, k);
    let expected = reference_i32(&lhs, &weights, r, k, c);

    let mut rhs = vec![0u8; c * k / 2];
    rm_to_wh_i4(&mut rhs, &weights, c, k)?;
    let mut out = vec![0i32; r * c];
    let mut scratchpad = default_scratchpad();

    let start = Instant::now();
    mm_u8i4_i32(&mut scratchpad, &mut out, &lhs, &rhs, r, k, c)?;

    Ok(Report::exact(start, &out, &expected))
}

fn u8i8() -> Result<Report, MatmulError> {
    let (r, k, c) = (N_ROW, N_INNER, N_COL);
    let lhs = activations_u8(r, k);
    let weights = weights_i8(c, k);
    let expected = reference_i32(&lhs, &weights, r, k, c);

    let mut rhs = vec![0i8; c * k];
    rm_to_wh_i8(&mut rhs, &weights, c, k)?;
    let mut out = vec![0i32; r * c];
    let mut scratchpad = default_scratchpad();

    let start = Instant::now();
    mm_u8i8_i32(&mut scratchpad, &mut out, &lhs, &rhs, r, k, c)?;

    Ok(Report::exact(start, &out, &expected))
}

fn f32_activations(r: usize, k: usize) -> Vec<f32> {
    widen(&activations_f16(r, k))
}

fn tiled_weights(c: usize, k: usize) -> Result<(Vec<f16>, Vec<f32>), MatmulError> {
    let weights = weights_f16(c, k);
    let mut tiled = vec![f16::ZERO; weights.len()];
    rm_to_wh_f16(&mut tiled, &weights, c, k)?;
    Ok((tiled, widen(&weights)))
}

fn f32_weights_tiled() -> Result<Report, MatmulError> {
    let (r, k, c) = (N_ROW, N_INNER, N_COL);
    let lhs = f32_activations(r, k);
    let (rhs, weights) = tiled_weights(c, k)?;
    let expected = reference_f32(&lhs, &weights, r, k, c);

    let left = TensorRef::row_major(bytemuck::cast_slice(&lhs), [r, k], DType::F32);
    let right = TensorRef::tiled(
        bytemuck::cast_slice(&rhs),
        [c, k],
        DType::F16,
        TensorLayout::RowMajorWeightsHmx,
    );
    let mut out = vec![0.0f32; r * c];
    let mut result = TensorMut::row_major(bytemuck::cast_slice_mut(&mut out), [r, c], DType::F32);
    let mut scratchpad = default_scratchpad();

    let start = Instant::now();
    multiply(Platform::Npu(&mut scratchpad), &mut result, &left, &right)?;

    Ok(Report::float(start, &out, &expected))
}

fn strided<E: Element + bytemuck::Pod>(
    r: usize,
    k: usize,
    c: usize,
    lhs: &[E],
    rhs: &[f16],
) -> Result<(Vec<E>, Instant), MatmulError> {
    let stride = c + 64;
    let left = TensorRef::row_major(bytemuck::cast_slice(lhs), [r, k], E::DTYPE);
    let right = TensorRef::tiled(
        bytemuck::cast_slice(rhs),
        [c, k],
        DType::F16,
        TensorLayout::RowMajorWeightsHmx,
    );
    let mut out = vec![0u8; E::DTYPE.bytes_for(r * stride)];
    let mut result = TensorMut::strided(out.as_mut_slice(), [r, c], [stride, 1], E::DTYPE);
    let mut scratchpad = default_scratchpad();

    let start = Instant::now();
    multiply(Platform::Npu(&mut scratchpad), &mut result, &left, &right)?;

    // Keep the valid columns only.
    let packed = (0..r * c)
        .map(|index| E::read(&out, (index / c) * stride + index % c))
        .collect();

    Ok((packed, start))
}

fn f32_strided_result() -> Result<Report, MatmulError> {
    let (r, k, c) = (N_ROW, N_INNER, N_COL);
    let lhs = f32_activations(r, k);
    let (rhs, weights) = tiled_weights(c, k)?;
    let expected = reference_f32(&lhs, &weights, r, k, c);

    let (out, start) = strided(r, k, c, &lhs, &rhs)?;

    Ok(Report::float(start, &out, &expected))
}

fn f16_strided_result() -> Result<Report, MatmulError> {
    let (r, k, c) = (N_ROW, N_INNER, N_COL);
    let lhs = activations_f16(r, k);
    let (rhs, weights) = tiled_weights(c, k)?;
    let expected = reference_f32(&widen(&lhs), &weights, r, k, c);

    let (out, start) = strided(r, k, c, &lhs, &rhs)?;

    Ok(Report::float(start, &widen(&out), &expected))
}

fn f16_all_tiled() -> Result<Report, MatmulError> {
    let (r, k, c) = (N_ROW, N_INNER, N_COL);
    let lhs = activations_f16(r, k);
    let (rhs, weights) = tiled_weights(c, k)?;
    let expected = reference_f32(&widen(&lhs), &weights, r, k, c);

    let mut tiled_lhs = vec![f16::ZERO; lhs.len()];
    rm_to_ah_f16(&mut tiled_lhs, &lhs, r, k)?;
    let left = TensorRef::tiled(
        bytemuck::cast_slice(&tiled_lhs),
        [r, k],
        DType::F16,
        TensorLayout::RowMajorActivationHmx,
    );
    let right = TensorRef::tiled(
        bytemuck::cast_slice(&rhs),
        [c, k],
        DType::F16,
        TensorLayout::RowMajorWeightsHmx,
    );
    let mut out = vec![f16::ZERO; r * c];
    let mut result = TensorMut::tiled(
        bytemuck::cast_slice_mut(&mut out),
        [r, c],
        DType::F16,
        TensorLayout::RowMajorActivationHmx,
    );
    let mut scratchpad = default_scratchpad();

    let start = Instant::now();
    multiply(Platform::Npu(&mut scratchpad), &mut result, &left, &right)?;
    let mut flat = vec![f16::ZERO; r * c];
    ah_to_rm_f16(&mut flat, &out, r, c)?;

    Ok(Report::float(start, &widen(&flat), &expected))
}

fn cpu_vs_npu() -> Result<Report, MatmulError> {
    let (r, k, c) = (N_ROW, N_INNER, N_COL);
    let offset = 16;
    let lhs = activations_f16(r, k);
    let rhs = weights_f16(c, k);
    let left = TensorRef::row_major(bytemuck::cast_slice(&lhs), [r, k], DType::F16);
    let right = TensorRef::row_major(bytemuck::cast_slice(&rhs), [c, k], DType::F16);

    let mut npu = vec![f16::ZERO; offset + r * c];
    let mut result = TensorMut::row_major(bytemuck::cast_slice_mut(&mut npu), [r, c], DType::F16)
        .with_offset(offset);
    let mut scratchpad = default_scratchpad();
    let start = Instant::now();
    multiply(Platform::Npu(&mut scratchpad), &mut result, &left, &right)?;
    println!("  npu runs {:.5} s", start.elapsed().as_secs_f64());

    let mut cpu = vec![f16::ZERO; offset + r * c];
    let mut result = TensorMut::row_major(bytemuck::cast_slice_mut(&mut cpu), [r, c], DType::F16)
        .with_offset(offset);
    let start = Instant::now();
    multiply(Platform::Cpu, &mut result, &left, &right)?;
    println!("  cpu runs {:.5} s", start.elapsed().as_secs_f64());

    Ok(Report::float(start, &widen(&npu[offset..]), &widen(&cpu[offset..])))
}

fn u8i8_row_major_weights() -> Result<Report, MatmulError> {
    let (r, k, c) = (N_ROW + 7, N_INNER - 5, N_COL + 3);
    let lhs = activations_u8(r, k);
    let rhs = weights_i8(c, k);
    let expected = reference_i32(&lhs, &rhs, r, k, c);

    let left = TensorRef::row_major(&lhs, [r, k], DType::U8);
    let right = TensorRef::row_major(bytemuck::cast_slice(&rhs), [c, k], DType::I8);
    let mut out = vec![0i32; r * c];
    let mut result = TensorMut::row_major(bytemuck::cast_slice_mut(&mut out), [r, c], DType::I32);
    let mut scratchpad = default_scratchpad();

    let start = Instant::now();
    multiply(Platform::Npu(&mut scratchpad), &mut result, &left, &right)?;

    Ok(Report::exact(start, &out, &expected))
}
