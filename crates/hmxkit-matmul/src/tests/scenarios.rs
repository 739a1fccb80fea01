use crate::{
    Platform,
    components::{
        F16Precision, U8I4Precision, U8I8Precision,
        layout::{
            ImageKind, TileImage, ah_to_rm_f16, ah_to_rm_f16_inplace, rm_to_ah_f16,
            rm_to_ah_f16_inplace, rm_to_wh_f16, rm_to_wh_f16_inplace, rm_to_wh_i4, rm_to_wh_i8,
        },
    },
    mm_f16, mm_f16f16_f16, mm_f32f16_f32, mm_u8i4_i32, mm_u8i8_i32, multiply,
    tests::test_utils::{
        MatmulTestCase, assert_equals_approx, random_f16, seeded, sext4, to_f32,
    },
};
use hmxkit_tensor::{DType, Element, TensorMut, TensorRef, f16};
use pretty_assertions::assert_eq;
use rand::Rng;

fn scenario_activations(case: &MatmulTestCase) -> Vec<f16> {
    (0..case.r * case.k)
        .map(|i| f16::from_f32((i / case.k % 5) as f32 + 0.067))
        .collect()
}

fn scenario_weights(case: &MatmulTestCase) -> Vec<f16> {
    (0..case.c * case.k)
        .map(|i| f16::from_f32((i / case.k % 3) as f32 + 0.04906))
        .collect()
}

fn integer_activations(case: &MatmulTestCase) -> Vec<u8> {
    let mut values = Vec::with_capacity(case.r * case.k);
    for i in 0..case.r {
        for j in 0..case.k {
            values.push(((i * j + 2 + i) & 0xFF) as u8);
        }
    }
    values
}

fn i4_weights(case: &MatmulTestCase) -> Vec<i8> {
    let mut values = Vec::with_capacity(case.c * case.k);
    for i in 0..case.c {
        for j in 0..case.k {
            values.push(sext4(i + 3 * j - i / 4));
        }
    }
    values
}

fn i8_weights(case: &MatmulTestCase) -> Vec<i8> {
    let mut values = Vec::with_capacity(case.c * case.k);
    for i in 0..case.c {
        for j in 0..case.k {
            values.push(((i + 3 * j - i / 4) & 0xFF) as u8 as i8);
        }
    }
    values
}

#[test]
fn f16_tiled_scenario() {
    let case = MatmulTestCase::new(32, 64, 128);
    let mut lhs = scenario_activations(&case);
    let mut rhs = scenario_weights(&case);
    let expected = case.matmul_cpu_f32(&to_f32(&lhs), &to_f32(&rhs));

    rm_to_ah_f16_inplace(&mut lhs, case.r, case.k).unwrap();
    rm_to_wh_f16_inplace(&mut rhs, case.c, case.k).unwrap();
    let mut out = vec![f16::ZERO; case.r * case.c];
    let mut scratchpad = case.scratchpad::<F16Precision>();

    mm_f16(&mut scratchpad, &mut out, &lhs, &rhs, case.r, case.k, case.c).unwrap();
    ah_to_rm_f16_inplace(&mut out, case.r, case.c).unwrap();

    assert_equals_approx(&to_f32(&out), &expected);
}

#[test]
fn f16_row_major_scenario() {
    let case = MatmulTestCase::new(45, 64, 96);
    let lhs = scenario_activations(&case);
    let weights = scenario_weights(&case);
    let expected = case.matmul_cpu_f32(&to_f32(&lhs), &to_f32(&weights));

    let mut rhs = vec![f16::ZERO; weights.len()];
    rm_to_wh_f16(&mut rhs, &weights, case.c, case.k).unwrap();
    let mut out = vec![f16::ZERO; case.r * case.c];
    let mut scratchpad = case.scratchpad::<F16Precision>();

    mm_f16f16_f16(&mut scratchpad, &mut out, &lhs, &rhs, case.r, case.k, case.c).unwrap();

    assert_equals_approx(&to_f32(&out), &expected);
}

#[test]
fn f32_activations_are_narrowed() {
    let case = MatmulTestCase::new(20, 96, 64);
    let mut rng = seeded(3);
    let lhs: Vec<f32> = (0..case.r * case.k)
        .map(|_| rng.random_range(-2.0..2.0))
        .collect();
    let weights = random_f16(&mut rng, case.c * case.k);
    let narrowed: Vec<f32> = lhs.iter().map(|v| f16::from_f32(*v).to_f32()).collect();
    let expected = case.matmul_cpu_f32(&narrowed, &to_f32(&weights));

    let mut rhs = vec![f16::ZERO; weights.len()];
    rm_to_wh_f16(&mut rhs, &weights, case.c, case.k).unwrap();
    let mut out = vec![0.0f32; case.r * case.c];
    let mut scratchpad = case.scratchpad::<F16Precision>();

    mm_f32f16_f32(&mut scratchpad, &mut out, &lhs, &rhs, case.r, case.k, case.c).unwrap();

    assert_equals_approx(&out, &expected);
}

#[test]
fn u8i4_scenario() {
    let case = MatmulTestCase::new(64, 128, 128);
    let lhs = integer_activations(&case);
    let weights = i4_weights(&case);
    let expected = case.matmul_cpu_i32(&lhs, &weights);

    let mut rhs = vec![0u8; case.c * case.k / 2];
    rm_to_wh_i4(&mut rhs, &weights, case.c, case.k).unwrap();
    let mut out = vec![0i32; case.r * case.c];
    let mut scratchpad = case.scratchpad::<U8I4Precision>();

    mm_u8i4_i32(&mut scratchpad, &mut out, &lhs, &rhs, case.r, case.k, case.c).unwrap();

    assert_eq!(out, expected);
}

#[test]
fn u8i8_scenario_with_partial_tiles() {
    let case = MatmulTestCase::new(100, 96, 64);
    let lhs = integer_activations(&case);
    let weights = i8_weights(&case);
    let expected = case.matmul_cpu_i32(&lhs, &weights);

    let mut rhs = vec![0i8; weights.len()];
    rm_to_wh_i8(&mut rhs, &weights, case.c, case.k).unwrap();
    let mut out = vec![0i32; case.r * case.c];
    let mut scratchpad = case.scratchpad::<U8I8Precision>();

    mm_u8i8_i32(&mut scratchpad, &mut out, &lhs, &rhs, case.r, case.k, case.c).unwrap();

    assert_eq!(out, expected);
}

#[test]
fn padded_images_feed_the_fixed_signature_calls() {
    let case = MatmulTestCase::new(40, 50, 70);
    let lhs = integer_activations(&case);
    let weights = i8_weights(&case);
    let expected = case.matmul_cpu_i32(&lhs, &weights);

    let image = TileImage::padded(ImageKind::Weights, DType::I8, case.c, case.k).unwrap();
    let mut rhs = vec![0i8; image.num_bytes()];
    rm_to_wh_i8(&mut rhs, &weights, case.c, case.k).unwrap();
    let mut out = vec![0i32; case.r * case.c];
    let mut scratchpad = case.scratchpad::<U8I8Precision>();

    mm_u8i8_i32(&mut scratchpad, &mut out, &lhs, &rhs, case.r, case.k, case.c).unwrap();

    assert_eq!(out, expected);
}

#[test]
fn padded_i4_images_feed_the_fixed_signature_calls() {
    let case = MatmulTestCase::new(64, 72, 33);
    let lhs = integer_activations(&case);
    let weights = i4_weights(&case);
    let expected = case.matmul_cpu_i32(&lhs, &weights);

    let image = TileImage::padded(ImageKind::Weights, DType::I4, case.c, case.k).unwrap();
    let mut rhs = vec![0u8; image.num_bytes()];
    rm_to_wh_i4(&mut rhs, &weights, case.c, case.k).unwrap();
    let mut out = vec![0i32; case.r * case.c];
    let mut scratchpad = case.scratchpad::<U8I4Precision>();

    mm_u8i4_i32(&mut scratchpad, &mut out, &lhs, &rhs, case.r, case.k, case.c).unwrap();

    assert_eq!(out, expected);
}

#[test]
fn padded_f16_images_round_trip() {
    let case = MatmulTestCase::new(20, 40, 50);
    let lhs = scenario_activations(&case);
    let weights = scenario_weights(&case);
    let expected = case.matmul_cpu_f32(&to_f32(&lhs), &to_f32(&weights));

    let lhs_image = TileImage::padded(ImageKind::Activation, DType::F16, case.r, case.k).unwrap();
    let rhs_image = TileImage::padded(ImageKind::Weights, DType::F16, case.c, case.k).unwrap();
    let out_image = TileImage::padded(ImageKind::Activation, DType::F16, case.r, case.c).unwrap();
    let mut tiled_lhs = vec![f16::ZERO; lhs_image.rows * lhs_image.cols];
    let mut tiled_rhs = vec![f16::ZERO; rhs_image.rows * rhs_image.cols];
    rm_to_ah_f16(&mut tiled_lhs, &lhs, case.r, case.k).unwrap();
    rm_to_wh_f16(&mut tiled_rhs, &weights, case.c, case.k).unwrap();
    let mut tiled_out = vec![f16::ZERO; out_image.rows * out_image.cols];
    let mut scratchpad = case.scratchpad::<F16Precision>();

    mm_f16(
        &mut scratchpad,
        &mut tiled_out,
        &tiled_lhs,
        &tiled_rhs,
        case.r,
        case.k,
        case.c,
    )
    .unwrap();
    let mut out = vec![f16::ZERO; case.r * case.c];
    ah_to_rm_f16(&mut out, &tiled_out, case.r, case.c).unwrap();

    assert_equals_approx(&to_f32(&out), &expected);

    let mut row_major = vec![f16::ZERO; case.r * case.c];
    mm_f16f16_f16(
        &mut scratchpad,
        &mut row_major,
        &lhs,
        &tiled_rhs,
        case.r,
        case.k,
        case.c,
    )
    .unwrap();
    assert_eq!(row_major, out);
}

#[test]
fn strided_result_leaves_gaps_untouched() {
    let case = MatmulTestCase::new(64, 64, 32);
    let lhs = integer_activations(&case);
    let rhs = i8_weights(&case);
    let expected = case.matmul_cpu_i32(&lhs, &rhs);
    const SENTINEL: i32 = 0x5A5A_5A5A;

    let mut buffer = vec![0u8; case.r * 2 * case.c * 4];
    for index in 0..case.r * 2 * case.c {
        i32::write(&mut buffer, index, SENTINEL);
    }
    let left = TensorRef::row_major(&lhs, [case.r, case.k], DType::U8);
    let right = TensorRef::row_major(bytemuck::cast_slice(&rhs), [case.c, case.k], DType::I8);
    let mut result = TensorMut::strided(
        buffer.as_mut_slice(),
        [case.r, case.c],
        [2 * case.c, 1],
        DType::I32,
    );
    let mut scratchpad = case.scratchpad::<U8I8Precision>();

    multiply(Platform::Npu(&mut scratchpad), &mut result, &left, &right).unwrap();

    for row in 0..case.r {
        for col in 0..2 * case.c {
            let value = i32::read(&buffer, row * 2 * case.c + col);
            match col < case.c {
                true => assert_eq!(value, expected[row * case.c + col]),
                false => assert_eq!(value, SENTINEL),
            }
        }
    }
}

#[test]
fn zero_padding_does_not_change_the_valid_extent() {
    let case = MatmulTestCase::new(37, 45, 50);
    let padded = MatmulTestCase::new(64, 64, 64);
    let mut rng = seeded(5);
    let lhs: Vec<u8> = (0..case.r * case.k).map(|_| rng.random()).collect();
    let rhs: Vec<i8> = (0..case.c * case.k).map(|_| rng.random()).collect();

    let mut padded_lhs = vec![0u8; padded.r * padded.k];
    let mut padded_rhs = vec![0i8; padded.c * padded.k];
    for i in 0..case.r {
        padded_lhs[i * padded.k..i * padded.k + case.k]
            .copy_from_slice(&lhs[i * case.k..(i + 1) * case.k]);
    }
    for i in 0..case.c {
        padded_rhs[i * padded.k..i * padded.k + case.k]
            .copy_from_slice(&rhs[i * case.k..(i + 1) * case.k]);
    }

    let run = |case: &MatmulTestCase, lhs: &[u8], rhs: &[i8]| {
        let mut out = vec![0u8; case.r * case.c * 4];
        let left = TensorRef::row_major(lhs, [case.r, case.k], DType::U8);
        let right = TensorRef::row_major(bytemuck::cast_slice(rhs), [case.c, case.k], DType::I8);
        let mut result = TensorMut::row_major(out.as_mut_slice(), [case.r, case.c], DType::I32);
        let mut scratchpad = case.scratchpad::<U8I8Precision>();
        multiply(Platform::Npu(&mut scratchpad), &mut result, &left, &right).unwrap();
        bytemuck::pod_collect_to_vec::<u8, i32>(&out)
    };

    let small = run(&case, &lhs, &rhs);
    let large = run(&padded, &padded_lhs, &padded_rhs);

    for row in 0..case.r {
        assert_eq!(
            small[row * case.c..(row + 1) * case.c],
            large[row * padded.c..row * padded.c + case.c]
        );
    }
    assert_eq!(small, case.matmul_cpu_i32(&lhs, &rhs));
}

#[test]
fn cpu_and_npu_agree_bit_for_bit() {
    let case = MatmulTestCase::new(33, 70, 65);
    let mut rng = seeded(9);
    let lhs = random_f16(&mut rng, case.r * case.k);
    let rhs = random_f16(&mut rng, case.c * case.k);

    let run = |platform: Platform| {
        let mut out = vec![0u8; case.r * case.c * 4];
        let left = TensorRef::row_major(bytemuck::cast_slice(&lhs), [case.r, case.k], DType::F16);
        let right =
            TensorRef::row_major(bytemuck::cast_slice(&rhs), [case.c, case.k], DType::F16);
        let mut result = TensorMut::row_major(out.as_mut_slice(), [case.r, case.c], DType::F32);
        multiply(platform, &mut result, &left, &right).unwrap();
        out
    };

    let mut scratchpad = case.scratchpad::<F16Precision>();
    let npu = run(Platform::Npu(&mut scratchpad));
    let cpu = run(Platform::Cpu);

    assert_eq!(npu, cpu);
}

#[test]
fn col_major_operands() {
    let case = MatmulTestCase::new(40, 64, 33);
    let lhs = integer_activations(&case);
    let rhs = i4_weights(&case);
    let expected = case.matmul_cpu_i32(&lhs, &rhs);

    // Column-major copies of both operands, and i4 values packed two per byte.
    let mut lhs_col = vec![0u8; lhs.len()];
    for i in 0..case.r {
        for j in 0..case.k {
            lhs_col[j * case.r + i] = lhs[i * case.k + j];
        }
    }
    let mut rhs_col = vec![0u8; rhs.len() / 2 + 1];
    for i in 0..case.c {
        for j in 0..case.k {
            let value = hmxkit_tensor::i4::new(rhs[i * case.k + j]).unwrap();
            hmxkit_tensor::i4::write(&mut rhs_col, j * case.c + i, value);
        }
    }

    let left = TensorRef::col_major(&lhs_col, [case.r, case.k], DType::U8);
    let right = TensorRef::col_major(&rhs_col, [case.c, case.k], DType::I4);
    let mut out = vec![0u8; case.r * case.c * 4];
    let mut result = TensorMut::col_major(out.as_mut_slice(), [case.r, case.c], DType::I32);
    let mut scratchpad = case.scratchpad::<U8I4Precision>();

    multiply(Platform::Npu(&mut scratchpad), &mut result, &left, &right).unwrap();

    for i in 0..case.r {
        for j in 0..case.c {
            assert_eq!(i32::read(&out, j * case.r + i), expected[i * case.c + j]);
        }
    }
}

#[test]
fn integer_extremes_are_exact() {
    let case = MatmulTestCase::new(64, 32, 32);
    let lhs = vec![255u8; case.r * case.k];
    let rhs = vec![-128i8; case.c * case.k];

    let mut tiled = vec![0i8; rhs.len()];
    rm_to_wh_i8(&mut tiled, &rhs, case.c, case.k).unwrap();
    let mut out = vec![0i32; case.r * case.c];
    let mut scratchpad = case.scratchpad::<U8I8Precision>();
    mm_u8i8_i32(&mut scratchpad, &mut out, &lhs, &tiled, case.r, case.k, case.c).unwrap();

    assert!(out.iter().all(|v| *v == 255 * -128 * 32));
}
