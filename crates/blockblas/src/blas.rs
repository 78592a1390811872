//! Block-sparse BLAS drivers.
//!
//! Drivers validate shapes, prepare the destination (resize or beta
//! pre-scale), normalize transposes into tag-remapped views, and hand the
//! rest to the dispatch layer. The `_scaled` variants additionally accept
//! a per-pair weight functor over the matched block multi-indices.

use crate::block::dims::BlockDims;
use crate::block::tensor::BlockTensor;
use crate::block::view::BlockView;
use crate::contract::dispatch::{
    axpy_blocks, copy_blocks, dot_blocks, gemm_blocks, gemv_blocks, ger_blocks, scale_blocks,
    PairScale,
};
use crate::contract::exec::Execution;
use crate::contract::shape::{gemm_shape, gemv_shape, ger_shape};
use crate::error::BlasError;
use crate::kernel::{self, Transpose};
use crate::scalar::Scalar;

fn shape_mismatch(expected: &BlockDims, actual: &BlockDims) -> BlasError {
    BlasError::ShapeMismatch {
        expected: expected.dense_shape(),
        actual: actual.dense_shape(),
    }
}

/// Prepare a contraction destination: adopt the computed structure when
/// empty, otherwise validate it and pre-scale the existing blocks by
/// `beta`.
fn prepare_dest<T: Scalar>(
    c: &mut BlockTensor<T>,
    dims: BlockDims,
    beta: T,
    exec: Execution,
) -> Result<(), BlasError> {
    if c.is_empty() {
        c.resize(dims)?;
    } else {
        if *c.dims() != dims {
            return Err(shape_mismatch(&dims, c.dims()));
        }
        scale_blocks(beta, c, exec);
    }
    Ok(())
}

/// y = x.
///
/// By default `y` adopts `x`'s block structure, discarding its previous
/// contents. With `allow_missing_as_zero` the structures must already
/// match and blocks of `x` that `y`'s legality predicate refuses are
/// dropped silently (the up-cast onto a more restrictive destination).
pub fn copy<T: Scalar>(
    x: &BlockTensor<T>,
    y: &mut BlockTensor<T>,
    allow_missing_as_zero: bool,
    exec: Execution,
) -> Result<(), BlasError> {
    if allow_missing_as_zero {
        if y.dims() != x.dims() {
            return Err(shape_mismatch(x.dims(), y.dims()));
        }
        y.clear();
    } else {
        y.clear();
        y.resize(x.dims().clone())?;
    }
    copy_blocks(x, y, allow_missing_as_zero, exec)
}

/// x *= alpha. In place; never allocates.
pub fn scal<T: Scalar>(alpha: T, x: &mut BlockTensor<T>, exec: Execution) {
    scale_blocks(alpha, x, exec);
}

/// Unconjugated inner product over matching stored blocks.
pub fn dot<T: Scalar>(x: &BlockTensor<T>, y: &BlockTensor<T>) -> Result<T, BlasError> {
    if x.dims() != y.dims() {
        return Err(shape_mismatch(x.dims(), y.dims()));
    }
    Ok(dot_blocks(x, y))
}

/// y += alpha * x.
///
/// An empty `y` adopts `x`'s block structure; otherwise the structures
/// must match. A block of `x` that `y` refuses to store is an error.
pub fn axpy<T: Scalar>(
    alpha: T,
    x: &BlockTensor<T>,
    y: &mut BlockTensor<T>,
    exec: Execution,
) -> Result<(), BlasError> {
    if y.is_empty() {
        y.resize(x.dims().clone())?;
    } else if y.dims() != x.dims() {
        return Err(shape_mismatch(x.dims(), y.dims()));
    }
    axpy_blocks(alpha, x, y, exec)
}

/// y = alpha * op(A) * x + beta * y, with `x` fully contracted.
pub fn gemv<T: Scalar>(
    trans_a: Transpose,
    alpha: T,
    a: &BlockTensor<T>,
    x: &BlockTensor<T>,
    beta: T,
    y: &mut BlockTensor<T>,
    exec: Execution,
) -> Result<(), BlasError> {
    gemv_scaled(trans_a, alpha, a, x, beta, y, None, exec)
}

/// [`gemv`] with a per-pair weight functor.
#[allow(clippy::too_many_arguments)]
pub fn gemv_scaled<T: Scalar>(
    trans_a: Transpose,
    alpha: T,
    a: &BlockTensor<T>,
    x: &BlockTensor<T>,
    beta: T,
    y: &mut BlockTensor<T>,
    scale: Option<PairScale<'_, T>>,
    exec: Execution,
) -> Result<(), BlasError> {
    let a_view = match trans_a {
        Transpose::NoTrans => BlockView::new(a),
        Transpose::Trans => BlockView::transposed(a, x.rank()),
    };
    let y_dims = gemv_shape(a_view.dims(), x.dims())?;
    prepare_dest(y, y_dims, beta, exec)?;
    gemv_blocks(trans_a, alpha, &a_view, x, y, scale, exec)
}

/// C += alpha * a (outer) b.
pub fn ger<T: Scalar>(
    alpha: T,
    a: &BlockTensor<T>,
    b: &BlockTensor<T>,
    c: &mut BlockTensor<T>,
    exec: Execution,
) -> Result<(), BlasError> {
    ger_scaled(alpha, a, b, c, None, exec)
}

/// [`ger`] with a per-pair weight functor.
pub fn ger_scaled<T: Scalar>(
    alpha: T,
    a: &BlockTensor<T>,
    b: &BlockTensor<T>,
    c: &mut BlockTensor<T>,
    scale: Option<PairScale<'_, T>>,
    exec: Execution,
) -> Result<(), BlasError> {
    let c_dims = ger_shape(a.dims(), b.dims());
    if c.is_empty() {
        c.resize(c_dims)?;
    } else if *c.dims() != c_dims {
        return Err(shape_mismatch(&c_dims, c.dims()));
    }
    ger_blocks(alpha, a, b, c, scale, exec)
}

/// C = alpha * op(A) * op(B) + beta * C, contracting `k` dimensions.
///
/// # Example
///
/// ```
/// use blockblas::{gemm, BlockDims, BlockTensor, DenseTensor, Execution, Transpose};
///
/// let dims = BlockDims::from(vec![vec![2, 2], vec![2, 2]]);
/// let mut a: BlockTensor<f64> = BlockTensor::new(dims.clone());
/// a.insert(0, DenseTensor::ones(&[2, 2])).unwrap();
/// let mut b: BlockTensor<f64> = BlockTensor::new(dims.clone());
/// b.insert(1, DenseTensor::ones(&[2, 2])).unwrap();
/// let mut c: BlockTensor<f64> = BlockTensor::new(dims);
///
/// gemm(
///     Transpose::NoTrans,
///     Transpose::NoTrans,
///     1,
///     1.0,
///     &a,
///     &b,
///     0.0,
///     &mut c,
///     Execution::Serial,
/// )
/// .unwrap();
/// // Only C(0, 1) receives a contribution.
/// assert_eq!(c.nnzblocks(), 1);
/// assert!(c.find(1).is_some());
/// ```
#[allow(clippy::too_many_arguments)]
pub fn gemm<T: Scalar>(
    trans_a: Transpose,
    trans_b: Transpose,
    k: usize,
    alpha: T,
    a: &BlockTensor<T>,
    b: &BlockTensor<T>,
    beta: T,
    c: &mut BlockTensor<T>,
    exec: Execution,
) -> Result<(), BlasError> {
    gemm_scaled(trans_a, trans_b, k, alpha, a, b, beta, c, None, exec)
}

/// [`gemm`] with a per-pair weight functor over (A, B, C) block
/// multi-indices in normalized view order.
#[allow(clippy::too_many_arguments)]
pub fn gemm_scaled<T: Scalar>(
    trans_a: Transpose,
    trans_b: Transpose,
    k: usize,
    alpha: T,
    a: &BlockTensor<T>,
    b: &BlockTensor<T>,
    beta: T,
    c: &mut BlockTensor<T>,
    scale: Option<PairScale<'_, T>>,
    exec: Execution,
) -> Result<(), BlasError> {
    // Normalize both operands so contracted block dimensions trail.
    let a_view = match trans_a {
        Transpose::NoTrans => BlockView::new(a),
        Transpose::Trans => BlockView::transposed(a, k),
    };
    let b_view = match trans_b {
        Transpose::NoTrans => BlockView::transposed(b, k),
        Transpose::Trans => BlockView::new(b),
    };
    let c_dims = gemm_shape(a_view.dims(), b_view.dims(), k)?;
    prepare_dest(c, c_dims, beta, exec)?;
    gemm_blocks(trans_a, trans_b, k, alpha, &a_view, &b_view, c, scale, exec)
}

/// C = alpha * A * B + beta * C, selecting gemv or gemm from the ranks.
///
/// When one operand is fully contracted the operation degenerates to a
/// matrix-vector product; `gemv` is called with the operand order (and
/// transpose) adjusted accordingly.
pub fn contract<T: Scalar>(
    alpha: T,
    a: &BlockTensor<T>,
    b: &BlockTensor<T>,
    k: usize,
    beta: T,
    c: &mut BlockTensor<T>,
    exec: Execution,
) -> Result<(), BlasError> {
    if k == b.rank() {
        gemv(Transpose::NoTrans, alpha, a, b, beta, c, exec)
    } else if k == a.rank() {
        gemv(Transpose::Trans, alpha, b, a, beta, c, exec)
    } else {
        gemm(
            Transpose::NoTrans,
            Transpose::NoTrans,
            k,
            alpha,
            a,
            b,
            beta,
            c,
            exec,
        )
    }
}

/// A *= diag(d) from the right: the trailing dimensions of `A` are scaled
/// by the matching block of `d`. Blocks of `A` without a stored diagonal
/// block are left unchanged. Runs serially.
pub fn dimd<T: Scalar>(a: &mut BlockTensor<T>, d: &BlockTensor<T>) -> Result<(), BlasError> {
    let ra = a.rank();
    let rd = d.rank();
    if rd >= ra {
        return Err(BlasError::RankMismatch {
            expected: rd + 1,
            actual: ra,
        });
    }
    if &a.dims().as_slice()[ra - rd..] != d.dims().as_slice() {
        return Err(shape_mismatch(d.dims(), a.dims()));
    }
    let stride = d.grid_size();
    for (&tag, block) in a.iter_mut() {
        if let Some(d_block) = d.find(tag % stride) {
            kernel::dimd(block, d_block);
        }
    }
    Ok(())
}

/// B = diag(d) * B: the leading dimensions of `B` are scaled by the
/// matching block of `d`. Blocks of `B` without a stored diagonal block
/// are left unchanged. Runs serially.
pub fn didm<T: Scalar>(d: &BlockTensor<T>, b: &mut BlockTensor<T>) -> Result<(), BlasError> {
    let rb = b.rank();
    let rd = d.rank();
    if rd >= rb {
        return Err(BlasError::RankMismatch {
            expected: rd + 1,
            actual: rb,
        });
    }
    if &b.dims().as_slice()[..rd] != d.dims().as_slice() {
        return Err(shape_mismatch(d.dims(), b.dims()));
    }
    let stride: usize = b.dims().grid_shape()[rd..].iter().product::<usize>().max(1);
    for (&tag, block) in b.iter_mut() {
        if let Some(d_block) = d.find(tag / stride) {
            kernel::didm(d_block, block);
        }
    }
    Ok(())
}
