//! Block-pair matching and task-list construction.
//!
//! This is the sparse layer of every operation: walk the stored blocks of
//! the sources, decide which destination blocks become nonzero, reserve
//! them, and emit one task per destination tag. Tasks are then handed to
//! an [`Execution`] strategy; all matching itself runs single-threaded.
//!
//! Contraction matching works in tag space over normalized views (both
//! operands carry their contracted block dimensions last). With `stride`
//! the grid size of the contracted part, an operand tag splits as
//! `tag / stride` (free coordinate) and `tag % stride` (contracted
//! coordinate); a pair contributes to `C(i, j)` exactly when the
//! contracted coordinates agree. The stored blocks of one free row of `A`
//! then occupy the contiguous tag interval `[i*stride, i*stride+stride-1]`,
//! which the ordered map answers as a range query.
//!
//! Destination legality is checked before any matching work for a tag;
//! a disallowed tag contributes nothing and is not an error. A tag with no
//! matched pair is never reserved.

use std::collections::BTreeMap;

use crate::block::tensor::BlockTensor;
use crate::block::view::BlockView;
use crate::contract::exec::Execution;
use crate::contract::task::{ContractionKernel, ContractionTask, ReplicationTask};
use crate::dense::DenseTensor;
use crate::error::BlasError;
use crate::kernel::{ddot, Transpose};
use crate::scalar::Scalar;

/// Per-pair weight functor: maps (A-coords, B-coords, C-coords), all in
/// normalized view order, to a scale multiplied into that pair's
/// contribution.
pub type PairScale<'f, T> = &'f dyn Fn(&[usize], &[usize], &[usize]) -> T;

type Pairs<'a, T> = Vec<(&'a DenseTensor<T>, &'a DenseTensor<T>, T)>;

/// Grid size of the trailing `k` dimensions of a view's block structure.
fn trailing_stride(dims: &crate::block::dims::BlockDims, k: usize) -> usize {
    let grid = dims.grid_shape();
    grid[grid.len() - k..].iter().product::<usize>().max(1)
}

/// Bind pending pair lists to their reserved destination blocks and build
/// the task list.
///
/// Every pending tag was reserved during matching, so each lookup hits a
/// stored block.
fn bind_contraction<'a, T: Scalar>(
    c: &'a mut BlockTensor<T>,
    mut pending: BTreeMap<usize, Pairs<'a, T>>,
    kernel: ContractionKernel<T>,
) -> Vec<ContractionTask<'a, T>> {
    let mut tasks = Vec::with_capacity(pending.len());
    for (&tag, dst) in c.iter_mut() {
        if let Some(pairs) = pending.remove(&tag) {
            tasks.push(ContractionTask::new(kernel, pairs, dst));
        }
    }
    debug_assert!(pending.is_empty());
    tasks
}

/// Same binding step for level-1 work: one source block per destination.
fn bind_replication<'a, T: Scalar>(
    y: &'a mut BlockTensor<T>,
    mut pending: BTreeMap<usize, &'a DenseTensor<T>>,
    make: impl Fn(&'a DenseTensor<T>, &'a mut DenseTensor<T>) -> ReplicationTask<'a, T>,
) -> Vec<ReplicationTask<'a, T>> {
    let mut tasks = Vec::with_capacity(pending.len());
    for (&tag, dst) in y.iter_mut() {
        if let Some(src) = pending.remove(&tag) {
            tasks.push(make(src, dst));
        }
    }
    debug_assert!(pending.is_empty());
    tasks
}

/// Replicate the stored blocks of `x` into `y`.
///
/// A block of `x` whose tag `y` refuses is an error unless
/// `allow_missing_as_zero`, in which case it is dropped silently (the
/// up-cast path onto a more restrictive destination).
pub fn copy_blocks<'a, T: Scalar>(
    x: &'a BlockTensor<T>,
    y: &'a mut BlockTensor<T>,
    allow_missing_as_zero: bool,
    exec: Execution,
) -> Result<(), BlasError> {
    let mut pending: BTreeMap<usize, &'a DenseTensor<T>> = BTreeMap::new();
    for (&tag, block) in x.iter() {
        match y.reserve(tag) {
            Some(_) => {
                pending.insert(tag, block);
            }
            None if allow_missing_as_zero => {}
            None => {
                return Err(BlasError::BlockUnavailable {
                    routine: "copy",
                    tag,
                });
            }
        }
    }
    let mut tasks = bind_replication(y, pending, ReplicationTask::copy);
    exec.run(&mut tasks);
    Ok(())
}

/// Scale every stored block of `x` in place. Never allocates.
pub fn scale_blocks<T: Scalar>(alpha: T, x: &mut BlockTensor<T>, exec: Execution) {
    let mut tasks: Vec<ReplicationTask<'_, T>> = x
        .iter_mut()
        .map(|(_, block)| ReplicationTask::scale(alpha, block))
        .collect();
    exec.run(&mut tasks);
}

/// y += alpha * x over stored blocks of `x`.
///
/// Unlike [`copy_blocks`] a refused destination tag is always an error: a
/// nonzero contribution would be lost.
pub fn axpy_blocks<'a, T: Scalar>(
    alpha: T,
    x: &'a BlockTensor<T>,
    y: &'a mut BlockTensor<T>,
    exec: Execution,
) -> Result<(), BlasError> {
    let mut pending: BTreeMap<usize, &'a DenseTensor<T>> = BTreeMap::new();
    for (&tag, block) in x.iter() {
        match y.reserve(tag) {
            Some(_) => {
                pending.insert(tag, block);
            }
            None => {
                return Err(BlasError::BlockUnavailable {
                    routine: "axpy",
                    tag,
                });
            }
        }
    }
    let mut tasks = bind_replication(y, pending, |src, dst| ReplicationTask::axpy(alpha, src, dst));
    exec.run(&mut tasks);
    Ok(())
}

/// Unconjugated inner product over the tag intersection. Runs serially and
/// never allocates.
pub fn dot_blocks<T: Scalar>(x: &BlockTensor<T>, y: &BlockTensor<T>) -> T {
    let mut sum = T::zero();
    for (&tag, xb) in x.iter() {
        if let Some(yb) = y.find(tag) {
            sum = sum + ddot(xb, yb);
        }
    }
    sum
}

/// y += alpha * op(A) * x, with `x` fully contracted.
///
/// `a` is the normalized view (contracted dimensions trailing); `trans_a`
/// tells the dense kernel how the stored buffers are laid out.
pub fn gemv_blocks<'a, T: Scalar>(
    trans_a: Transpose,
    alpha: T,
    a: &BlockView<'a, T>,
    x: &'a BlockTensor<T>,
    y: &'a mut BlockTensor<T>,
    scale: Option<PairScale<'_, T>>,
    exec: Execution,
) -> Result<(), BlasError> {
    let stride = x.grid_size();
    if stride == 0 || a.grid_size() == 0 {
        return Ok(());
    }
    debug_assert_eq!(trailing_stride(a.dims(), x.rank()), stride);
    let nrows = a.grid_size() / stride;

    let mut pending: BTreeMap<usize, Pairs<'a, T>> = BTreeMap::new();
    for i in 0..nrows {
        if !y.allowed(i) {
            continue;
        }
        let lo = i * stride;
        let mut pairs: Pairs<'a, T> = Vec::new();
        for (&tag_a, &a_block) in a.slab(lo..=lo + stride - 1) {
            if let Some(x_block) = x.find(tag_a % stride) {
                let weight = match scale {
                    Some(f) => f(
                        &a.tag_coords(tag_a),
                        &x.tag_coords(tag_a % stride),
                        &y.tag_coords(i),
                    ),
                    None => T::one(),
                };
                pairs.push((a_block, x_block, weight));
            }
        }
        if pairs.is_empty() {
            continue;
        }
        if y.reserve(i).is_none() {
            return Err(BlasError::BlockUnavailable {
                routine: "gemv",
                tag: i,
            });
        }
        pending.insert(i, pairs);
    }

    let kernel = ContractionKernel::Gemv { trans_a, alpha };
    let mut tasks = bind_contraction(y, pending, kernel);
    exec.run(&mut tasks);
    Ok(())
}

/// C += alpha * a (outer) b over all stored block pairs.
///
/// Each `(tag_a, tag_b)` pair maps to its own destination tag
/// `tag_a * grid_size(b) + tag_b`; pairs are still grouped per destination
/// tag so that no two tasks ever share a block.
pub fn ger_blocks<'a, T: Scalar>(
    alpha: T,
    a: &'a BlockTensor<T>,
    b: &'a BlockTensor<T>,
    c: &'a mut BlockTensor<T>,
    scale: Option<PairScale<'_, T>>,
    exec: Execution,
) -> Result<(), BlasError> {
    let ncols = b.grid_size();
    let mut pending: BTreeMap<usize, Pairs<'a, T>> = BTreeMap::new();
    for (&tag_a, a_block) in a.iter() {
        for (&tag_b, b_block) in b.iter() {
            let c_tag = tag_a * ncols + tag_b;
            if !c.allowed(c_tag) {
                continue;
            }
            let weight = match scale {
                Some(f) => f(
                    &a.tag_coords(tag_a),
                    &b.tag_coords(tag_b),
                    &c.tag_coords(c_tag),
                ),
                None => T::one(),
            };
            if c.reserve(c_tag).is_none() {
                return Err(BlasError::BlockUnavailable {
                    routine: "ger",
                    tag: c_tag,
                });
            }
            pending
                .entry(c_tag)
                .or_default()
                .push((a_block, b_block, weight));
        }
    }

    let kernel = ContractionKernel::Ger { alpha };
    let mut tasks = bind_contraction(c, pending, kernel);
    exec.run(&mut tasks);
    Ok(())
}

/// C += alpha * op(A) * op(B), contracting `contracted` block dimensions.
///
/// Both views are normalized; the transpose flags describe the stored
/// buffer layouts for the dense kernel.
pub fn gemm_blocks<'a, T: Scalar>(
    trans_a: Transpose,
    trans_b: Transpose,
    contracted: usize,
    alpha: T,
    a: &BlockView<'a, T>,
    b: &BlockView<'a, T>,
    c: &'a mut BlockTensor<T>,
    scale: Option<PairScale<'_, T>>,
    exec: Execution,
) -> Result<(), BlasError> {
    if a.grid_size() == 0 || b.grid_size() == 0 {
        return Ok(());
    }
    let stride = trailing_stride(a.dims(), contracted);
    debug_assert_eq!(trailing_stride(b.dims(), contracted), stride);
    let nrows = a.grid_size() / stride;
    let ncols = b.grid_size() / stride;

    let mut pending: BTreeMap<usize, Pairs<'a, T>> = BTreeMap::new();
    for i in 0..nrows {
        let lo = i * stride;
        let row: Vec<(usize, &'a DenseTensor<T>)> = a
            .slab(lo..=lo + stride - 1)
            .map(|(&tag, &block)| (tag, block))
            .collect();
        if row.is_empty() {
            continue;
        }
        for j in 0..ncols {
            let c_tag = i * ncols + j;
            if !c.allowed(c_tag) {
                continue;
            }
            let mut pairs: Pairs<'a, T> = Vec::new();
            for &(tag_a, a_block) in &row {
                let tag_b = j * stride + tag_a % stride;
                if let Some(b_block) = b.find(tag_b) {
                    let weight = match scale {
                        Some(f) => f(
                            &a.tag_coords(tag_a),
                            &b.tag_coords(tag_b),
                            &c.tag_coords(c_tag),
                        ),
                        None => T::one(),
                    };
                    pairs.push((a_block, b_block, weight));
                }
            }
            if pairs.is_empty() {
                continue;
            }
            if c.reserve(c_tag).is_none() {
                return Err(BlasError::BlockUnavailable {
                    routine: "gemm",
                    tag: c_tag,
                });
            }
            pending.insert(c_tag, pairs);
        }
    }

    let kernel = ContractionKernel::Gemm {
        trans_a,
        trans_b,
        contracted,
        alpha,
    };
    let mut tasks = bind_contraction(c, pending, kernel);
    exec.run(&mut tasks);
    Ok(())
}
