//! Contraction driver scenarios: gemv, ger, gemm, the rank-driven
//! wrapper, and consistency against dense references.

use approx::assert_relative_eq;
use blockblas::blas::contract;
use blockblas::{
    gemm, gemm_scaled, gemv, gemv_scaled, ger, ger_scaled, BlockDims, BlockTensor, DenseTensor,
    Execution, Transpose,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

// Nonuniform block partitions used throughout: dense extents 5, 3, 4.
const DM: &[usize] = &[2, 3];
const DK: &[usize] = &[1, 2];
const DN: &[usize] = &[2, 2];

fn dims(parts: &[&[usize]]) -> BlockDims {
    BlockDims::from(parts.iter().map(|p| p.to_vec()).collect::<Vec<_>>())
}

fn rand_block(dims: BlockDims, seed: u64) -> BlockTensor<f64> {
    BlockTensor::random_with_rng(dims, &mut StdRng::seed_from_u64(seed))
}

/// Row-major `rows x cols` rendering of `op(T)`; with `trans` the stored
/// dense data is `cols x rows`.
fn flat_op(t: &DenseTensor<f64>, rows: usize, cols: usize, trans: bool) -> Vec<f64> {
    let data = t.data();
    let mut out = vec![0.0; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            out[r * cols + c] = if trans {
                data[c * rows + r]
            } else {
                data[r * cols + c]
            };
        }
    }
    out
}

fn matmul_ref(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut out = vec![0.0; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut sum = 0.0;
            for x in 0..k {
                sum += a[i * k + x] * b[x * n + j];
            }
            out[i * n + j] = sum;
        }
    }
    out
}

fn assert_dense_eq(got: &DenseTensor<f64>, expect: &[f64]) {
    assert_eq!(got.data().len(), expect.len());
    for (&g, &e) in got.data().iter().zip(expect) {
        assert_relative_eq!(g, e, max_relative = 1e-10, epsilon = 1e-12);
    }
}

#[test]
fn test_block_diagonal_times_full() {
    // Identity-valued diagonal blocks of A against an all-ones B: every
    // destination block receives exactly one pair and equals ones.
    let d = dims(&[&[2, 2], &[2, 2]]);
    let mut a: BlockTensor<f64> = BlockTensor::new(d.clone());
    let eye = DenseTensor::from_vec(vec![1.0, 0.0, 0.0, 1.0], &[2, 2]).unwrap();
    a.insert(0, eye.clone()).unwrap();
    a.insert(3, eye).unwrap();
    let mut b: BlockTensor<f64> = BlockTensor::new(d.clone());
    for tag in 0..4 {
        b.insert(tag, DenseTensor::ones(&[2, 2])).unwrap();
    }
    let mut c: BlockTensor<f64> = BlockTensor::new(d);

    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut c,
        Execution::Serial,
    )
    .unwrap();

    assert_eq!(c.nnzblocks(), 4);
    for (_, block) in c.iter() {
        assert!(block.data().iter().all(|&v| v == 1.0));
    }
}

#[test]
fn test_block_diagonal_product_stays_block_diagonal() {
    let d = dims(&[&[2, 2], &[2, 2]]);
    let mut rng = StdRng::seed_from_u64(21);
    let mut a: BlockTensor<f64> = BlockTensor::new(d.clone());
    let mut b: BlockTensor<f64> = BlockTensor::new(d.clone());
    for tag in [0usize, 3] {
        a.insert(tag, DenseTensor::random_with_rng(&[2, 2], &mut rng))
            .unwrap();
        b.insert(tag, DenseTensor::random_with_rng(&[2, 2], &mut rng))
            .unwrap();
    }
    let mut c: BlockTensor<f64> = BlockTensor::new(d);

    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut c,
        Execution::Serial,
    )
    .unwrap();

    let tags: Vec<usize> = c.tags().collect();
    assert_eq!(tags, vec![0, 3]);
}

#[test]
fn test_gemm_matches_dense_reference() {
    let a = rand_block(dims(&[DM, DK]), 22);
    let b = rand_block(dims(&[DK, DN]), 23);
    let mut c: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));

    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut c,
        Execution::Serial,
    )
    .unwrap();

    let expect = matmul_ref(a.to_dense().data(), b.to_dense().data(), 5, 3, 4);
    assert_dense_eq(&c.to_dense(), &expect);
}

#[test]
fn test_gemm_transpose_variants_match_dense() {
    for (ta, tb) in [
        (Transpose::NoTrans, Transpose::NoTrans),
        (Transpose::NoTrans, Transpose::Trans),
        (Transpose::Trans, Transpose::NoTrans),
        (Transpose::Trans, Transpose::Trans),
    ] {
        let a_dims = match ta {
            Transpose::NoTrans => dims(&[DM, DK]),
            Transpose::Trans => dims(&[DK, DM]),
        };
        let b_dims = match tb {
            Transpose::NoTrans => dims(&[DK, DN]),
            Transpose::Trans => dims(&[DN, DK]),
        };
        let a = rand_block(a_dims, 24);
        let b = rand_block(b_dims, 25);
        let mut c: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));

        gemm(ta, tb, 1, 1.0, &a, &b, 0.0, &mut c, Execution::Serial).unwrap();

        let op_a = flat_op(&a.to_dense(), 5, 3, ta == Transpose::Trans);
        let op_b = flat_op(&b.to_dense(), 3, 4, tb == Transpose::Trans);
        let expect = matmul_ref(&op_a, &op_b, 5, 3, 4);
        assert_dense_eq(&c.to_dense(), &expect);
    }
}

#[test]
fn test_gemm_nonuniform_partitions_match_dense() {
    // The contracted partition shares no structure with either free
    // partition, so any free/contracted mix-up in the destination shape
    // computation is rejected or produces wrong extents.
    let m: &[usize] = &[3, 4];
    let k: &[usize] = &[2, 1, 2];
    let n: &[usize] = &[1, 5];
    for (ta, tb) in [
        (Transpose::NoTrans, Transpose::NoTrans),
        (Transpose::NoTrans, Transpose::Trans),
        (Transpose::Trans, Transpose::NoTrans),
        (Transpose::Trans, Transpose::Trans),
    ] {
        let a_dims = match ta {
            Transpose::NoTrans => dims(&[m, k]),
            Transpose::Trans => dims(&[k, m]),
        };
        let b_dims = match tb {
            Transpose::NoTrans => dims(&[k, n]),
            Transpose::Trans => dims(&[n, k]),
        };
        let a = rand_block(a_dims, 60);
        let b = rand_block(b_dims, 61);
        let mut c: BlockTensor<f64> = BlockTensor::new(dims(&[m, n]));

        gemm(ta, tb, 1, 1.0, &a, &b, 0.0, &mut c, Execution::Serial).unwrap();

        let op_a = flat_op(&a.to_dense(), 7, 5, ta == Transpose::Trans);
        let op_b = flat_op(&b.to_dense(), 5, 6, tb == Transpose::Trans);
        let expect = matmul_ref(&op_a, &op_b, 7, 5, 6);
        assert_dense_eq(&c.to_dense(), &expect);
    }
}

#[test]
fn test_gemm_multi_axis_contraction_matches_dense() {
    let a = rand_block(dims(&[DM, DK, DN]), 26);
    let b = rand_block(dims(&[DK, DN, DM]), 27);
    let mut c: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DM]));

    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        2,
        1.0,
        &a,
        &b,
        0.0,
        &mut c,
        Execution::Serial,
    )
    .unwrap();

    // Row-major flattening makes the multi-axis product a plain matmul.
    let expect = matmul_ref(a.to_dense().data(), b.to_dense().data(), 5, 12, 5);
    assert_dense_eq(&c.to_dense(), &expect);
}

#[test]
fn test_gemm_beta_accumulates() {
    let a = rand_block(dims(&[DM, DK]), 28);
    let b = rand_block(dims(&[DK, DN]), 29);
    let mut c = rand_block(dims(&[DM, DN]), 30);
    let c0 = c.to_dense();

    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        2.0,
        &a,
        &b,
        0.5,
        &mut c,
        Execution::Serial,
    )
    .unwrap();

    let prod = matmul_ref(a.to_dense().data(), b.to_dense().data(), 5, 3, 4);
    let expect: Vec<f64> = prod
        .iter()
        .zip(c0.data())
        .map(|(&p, &old)| 2.0 * p + 0.5 * old)
        .collect();
    assert_dense_eq(&c.to_dense(), &expect);
}

#[test]
fn test_gemm_sparsity_within_legality() {
    let a = rand_block(dims(&[DM, DK]), 31);
    let b = rand_block(dims(&[DK, DN]), 32);
    let mut c: BlockTensor<f64> =
        BlockTensor::with_legality(dims(&[DM, DN]), Arc::new(|tag| tag % 2 == 0));

    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut c,
        Execution::Serial,
    )
    .unwrap();

    assert!(c.nnzblocks() > 0);
    assert!(c.tags().all(|tag| tag % 2 == 0));
    // Stored blocks carry the full contraction value for their tag.
    let expect = matmul_ref(a.to_dense().data(), b.to_dense().data(), 5, 3, 4);
    let expect_c = DenseTensor::from_vec(expect, &[5, 4]).unwrap();
    let legal_only =
        BlockTensor::from_dense(dims(&[DM, DN]), &expect_c).unwrap();
    for (&tag, block) in c.iter() {
        let reference = legal_only.find(tag).unwrap();
        for (&g, &e) in block.data().iter().zip(reference.data()) {
            assert_relative_eq!(g, e, max_relative = 1e-10);
        }
    }
}

#[test]
fn test_gemm_serial_threaded_identical() {
    let a = rand_block(dims(&[DM, DK]), 33);
    let b = rand_block(dims(&[DK, DN]), 34);
    let mut c1: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));
    let mut c2: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));

    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut c1,
        Execution::Serial,
    )
    .unwrap();
    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut c2,
        Execution::Threaded {
            serial_threshold: 0,
        },
    )
    .unwrap();

    // Bit-identical, not just approximately equal.
    assert_eq!(c1, c2);
}

#[test]
fn test_gemm_empty_operand_leaves_destination_empty() {
    let a: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DK]));
    let b = rand_block(dims(&[DK, DN]), 35);
    let mut c: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));

    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut c,
        Execution::Serial,
    )
    .unwrap();
    assert_eq!(c.nnzblocks(), 0);
}

#[test]
fn test_gemm_contracted_partition_mismatch() {
    let a = rand_block(dims(&[DM, DK]), 36);
    let b = rand_block(dims(&[&[3], DN]), 37);
    let mut c: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));
    // Same dense extent on the contracted dimension but a different block
    // partition: rejected.
    assert!(gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut c,
        Execution::Serial,
    )
    .is_err());
}

#[test]
fn test_gemv_matches_dense_reference() {
    let a = rand_block(dims(&[DM, DK]), 38);
    let x = rand_block(dims(&[DK]), 39);
    let mut y: BlockTensor<f64> = BlockTensor::new(dims(&[DM]));

    gemv(
        Transpose::NoTrans,
        1.0,
        &a,
        &x,
        0.0,
        &mut y,
        Execution::Serial,
    )
    .unwrap();

    let expect = matmul_ref(a.to_dense().data(), x.to_dense().data(), 5, 3, 1);
    assert_dense_eq(&y.to_dense(), &expect);
}

#[test]
fn test_gemv_trans_matches_dense_reference() {
    // Transposed layout: A stored with the contracted dimension leading.
    let a = rand_block(dims(&[DK, DM]), 40);
    let x = rand_block(dims(&[DK]), 41);
    let mut y: BlockTensor<f64> = BlockTensor::new(dims(&[DM]));

    gemv(
        Transpose::Trans,
        1.0,
        &a,
        &x,
        0.0,
        &mut y,
        Execution::Serial,
    )
    .unwrap();

    let op_a = flat_op(&a.to_dense(), 5, 3, true);
    let expect = matmul_ref(&op_a, x.to_dense().data(), 5, 3, 1);
    assert_dense_eq(&y.to_dense(), &expect);
}

#[test]
fn test_gemv_beta_prescale() {
    let a = rand_block(dims(&[DM, DK]), 42);
    let x = rand_block(dims(&[DK]), 43);
    let mut y = rand_block(dims(&[DM]), 44);
    let y0 = y.to_dense();

    gemv(
        Transpose::NoTrans,
        2.0,
        &a,
        &x,
        0.5,
        &mut y,
        Execution::Serial,
    )
    .unwrap();

    let prod = matmul_ref(a.to_dense().data(), x.to_dense().data(), 5, 3, 1);
    let expect: Vec<f64> = prod
        .iter()
        .zip(y0.data())
        .map(|(&p, &old)| 2.0 * p + 0.5 * old)
        .collect();
    assert_dense_eq(&y.to_dense(), &expect);
}

#[test]
fn test_ger_matches_dense_reference() {
    let a = rand_block(dims(&[DM]), 45);
    let b = rand_block(dims(&[DN]), 46);
    let mut c: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));

    ger(1.5, &a, &b, &mut c, Execution::Serial).unwrap();

    let ad = a.to_dense();
    let bd = b.to_dense();
    let mut expect = vec![0.0; 5 * 4];
    for i in 0..5 {
        for j in 0..4 {
            expect[i * 4 + j] = 1.5 * ad.data()[i] * bd.data()[j];
        }
    }
    assert_dense_eq(&c.to_dense(), &expect);
}

#[test]
fn test_ger_all_blocks_vetoed_leaves_empty() {
    let a = rand_block(dims(&[DM]), 47);
    let b = rand_block(dims(&[DN]), 48);
    let mut c: BlockTensor<f64> = BlockTensor::with_legality(dims(&[DM, DN]), Arc::new(|_| false));

    ger(1.0, &a, &b, &mut c, Execution::Serial).unwrap();
    assert_eq!(c.nnzblocks(), 0);
}

#[test]
fn test_gemm_scaled_constant_weight() {
    let a = rand_block(dims(&[DM, DK]), 49);
    let b = rand_block(dims(&[DK, DN]), 50);
    let mut c1: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));
    let mut c2: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));

    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        3.0,
        &a,
        &b,
        0.0,
        &mut c1,
        Execution::Serial,
    )
    .unwrap();
    let weight = |_: &[usize], _: &[usize], _: &[usize]| 3.0;
    gemm_scaled(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut c2,
        Some(&weight),
        Execution::Serial,
    )
    .unwrap();

    assert_eq!(c1, c2);
}

#[test]
fn test_gemv_scaled_constant_weight() {
    let a = rand_block(dims(&[DM, DK]), 62);
    let x = rand_block(dims(&[DK]), 63);
    let mut y1: BlockTensor<f64> = BlockTensor::new(dims(&[DM]));
    let mut y2: BlockTensor<f64> = BlockTensor::new(dims(&[DM]));

    gemv(
        Transpose::NoTrans,
        2.0,
        &a,
        &x,
        0.0,
        &mut y1,
        Execution::Serial,
    )
    .unwrap();
    let weight = |_: &[usize], _: &[usize], _: &[usize]| 2.0;
    gemv_scaled(
        Transpose::NoTrans,
        1.0,
        &a,
        &x,
        0.0,
        &mut y2,
        Some(&weight),
        Execution::Serial,
    )
    .unwrap();

    assert_eq!(y1, y2);
}

#[test]
fn test_ger_scaled_constant_weight() {
    let a = rand_block(dims(&[DM]), 64);
    let b = rand_block(dims(&[DN]), 65);
    let mut c1: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));
    let mut c2: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));

    ger(2.0, &a, &b, &mut c1, Execution::Serial).unwrap();
    let weight = |_: &[usize], _: &[usize], _: &[usize]| 2.0;
    ger_scaled(1.0, &a, &b, &mut c2, Some(&weight), Execution::Serial).unwrap();

    assert_eq!(c1, c2);
}

#[test]
fn test_gemm_scaled_coordinate_weight() {
    let a = rand_block(dims(&[DM, DK]), 51);
    let b = rand_block(dims(&[DK, DN]), 52);
    let mut c: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));

    // Zero out every contribution landing in destination block row 0.
    let weight =
        |_: &[usize], _: &[usize], c_coords: &[usize]| if c_coords[0] == 0 { 0.0 } else { 1.0 };
    gemm_scaled(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut c,
        Some(&weight),
        Execution::Serial,
    )
    .unwrap();

    for (&tag, block) in c.iter() {
        let row = c.dims().tag_coords(tag)[0];
        if row == 0 {
            // Matched pairs still reserve the block; the weight nulls it.
            assert!(block.data().iter().all(|&v| v == 0.0));
        } else {
            assert!(block.data().iter().any(|&v| v != 0.0));
        }
    }
}

#[test]
fn test_contract_wrapper_selects_gemv_when_b_fully_contracted() {
    let a = rand_block(dims(&[DM, DK]), 53);
    let x = rand_block(dims(&[DK]), 54);

    let mut via_contract: BlockTensor<f64> = BlockTensor::new(dims(&[DM]));
    contract(1.0, &a, &x, 1, 0.0, &mut via_contract, Execution::Serial).unwrap();

    let mut via_gemv: BlockTensor<f64> = BlockTensor::new(dims(&[DM]));
    gemv(
        Transpose::NoTrans,
        1.0,
        &a,
        &x,
        0.0,
        &mut via_gemv,
        Execution::Serial,
    )
    .unwrap();

    assert_eq!(via_contract, via_gemv);
}

#[test]
fn test_contract_wrapper_selects_gemv_when_a_fully_contracted() {
    let a = rand_block(dims(&[DK]), 55);
    let b = rand_block(dims(&[DK, DN]), 56);

    let mut y: BlockTensor<f64> = BlockTensor::new(dims(&[DN]));
    contract(1.0, &a, &b, 1, 0.0, &mut y, Execution::Serial).unwrap();

    // y_j = sum_k a_k B(k, j)
    let ad = a.to_dense();
    let bd = b.to_dense();
    let mut expect = vec![0.0; 4];
    for k in 0..3 {
        for j in 0..4 {
            expect[j] += ad.data()[k] * bd.data()[k * 4 + j];
        }
    }
    assert_dense_eq(&y.to_dense(), &expect);
}

#[test]
fn test_contract_wrapper_selects_gemm_otherwise() {
    let a = rand_block(dims(&[DM, DK]), 57);
    let b = rand_block(dims(&[DK, DN]), 58);

    let mut via_contract: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));
    contract(1.0, &a, &b, 1, 0.0, &mut via_contract, Execution::Serial).unwrap();

    let mut via_gemm: BlockTensor<f64> = BlockTensor::new(dims(&[DM, DN]));
    gemm(
        Transpose::NoTrans,
        Transpose::NoTrans,
        1,
        1.0,
        &a,
        &b,
        0.0,
        &mut via_gemm,
        Execution::Serial,
    )
    .unwrap();

    assert_eq!(via_contract, via_gemm);
}
