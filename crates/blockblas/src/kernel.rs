//! Dense BLAS kernels over [`DenseTensor`] blocks.
//!
//! Thin pass-throughs to faer's matmul, plus the trivial level-1 loops.
//! Each kernel interprets a tensor's row-major buffer as a matrix by
//! splitting its dimensions at the contracted boundary; no data is copied
//! or permuted. Contraction kernels *accumulate* into the destination
//! (`C += alpha * op(A) op(B)`); any `beta` pre-scaling happens once at the
//! driver level, before task execution.
//!
//! faer runs sequentially here (`Par::Seq`): parallelism lives at the
//! block-task level, not inside a single dense call.

use faer::linalg::matmul::matmul;
use faer::{Accum, MatMut, MatRef, Par};

use crate::dense::DenseTensor;
use crate::scalar::Scalar;

/// Transpose mode of a contraction operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transpose {
    NoTrans,
    Trans,
}

/// View a row-major tensor buffer as an `rows x cols` faer matrix.
///
/// A row-major `rows x cols` matrix is the transpose of a column-major
/// `cols x rows` matrix over the same buffer.
fn as_mat<T: Scalar>(t: &DenseTensor<T>, rows: usize, cols: usize) -> MatRef<'_, T> {
    debug_assert_eq!(rows * cols, t.len());
    MatRef::from_column_major_slice(t.data(), cols, rows).transpose()
}

fn as_mat_mut<T: Scalar>(t: &mut DenseTensor<T>, rows: usize, cols: usize) -> MatMut<'_, T> {
    debug_assert_eq!(rows * cols, t.len());
    MatMut::from_column_major_slice_mut(t.data_mut(), cols, rows).transpose_mut()
}

/// y = x (element-wise overwrite; shapes must agree element-wise).
pub fn dcopy<T: Scalar>(x: &DenseTensor<T>, y: &mut DenseTensor<T>) {
    debug_assert_eq!(x.len(), y.len());
    y.data_mut().copy_from_slice(x.data());
}

/// x *= alpha.
pub fn dscal<T: Scalar>(alpha: T, x: &mut DenseTensor<T>) {
    for v in x.data_mut() {
        *v = alpha * *v;
    }
}

/// y += alpha * x.
pub fn daxpy<T: Scalar>(alpha: T, x: &DenseTensor<T>, y: &mut DenseTensor<T>) {
    debug_assert_eq!(x.len(), y.len());
    for (yv, &xv) in y.data_mut().iter_mut().zip(x.data().iter()) {
        *yv = *yv + alpha * xv;
    }
}

/// Unconjugated dot product of two equal-length tensors.
pub fn ddot<T: Scalar>(x: &DenseTensor<T>, y: &DenseTensor<T>) -> T {
    debug_assert_eq!(x.len(), y.len());
    let mut sum = T::zero();
    for (&xv, &yv) in x.data().iter().zip(y.data().iter()) {
        sum = sum + xv * yv;
    }
    sum
}

/// y += alpha * op(A) * x.
///
/// `x` is the fully-contracted operand: its entire length is the contracted
/// extent `k`. For `NoTrans`, `A`'s trailing dimensions form the contracted
/// part; for `Trans` the leading dimensions do.
pub fn dgemv<T: Scalar>(
    trans_a: Transpose,
    alpha: T,
    a: &DenseTensor<T>,
    x: &DenseTensor<T>,
    y: &mut DenseTensor<T>,
) {
    let k = x.len();
    debug_assert!(k > 0 && a.len() % k == 0);
    let m = a.len() / k;
    let a_op = match trans_a {
        Transpose::NoTrans => as_mat(a, m, k),
        Transpose::Trans => as_mat(a, k, m).transpose(),
    };
    let x_col = as_mat(x, k, 1);
    let y_col = as_mat_mut(y, m, 1);
    matmul(y_col, Accum::Add, a_op, x_col, alpha, Par::Seq);
}

/// C += alpha * x (outer) y.
pub fn dger<T: Scalar>(alpha: T, x: &DenseTensor<T>, y: &DenseTensor<T>, c: &mut DenseTensor<T>) {
    let m = x.len();
    let n = y.len();
    let c_mat = as_mat_mut(c, m, n);
    matmul(
        c_mat,
        Accum::Add,
        as_mat(x, m, 1),
        as_mat(y, n, 1).transpose(),
        alpha,
        Par::Seq,
    );
}

/// C += alpha * op(A) * op(B), contracting `contracted` dimensions.
///
/// The operand buffers are split at the contracted boundary implied by the
/// transpose flag: `NoTrans` puts the contracted part last for `A` and
/// first for `B`, `Trans` the reverse.
pub fn dgemm<T: Scalar>(
    trans_a: Transpose,
    trans_b: Transpose,
    contracted: usize,
    alpha: T,
    a: &DenseTensor<T>,
    b: &DenseTensor<T>,
    c: &mut DenseTensor<T>,
) {
    let (m, ka) = split_extents(a.shape(), contracted, trans_a == Transpose::NoTrans);
    let (n, kb) = split_extents(b.shape(), contracted, trans_b == Transpose::Trans);
    debug_assert_eq!(ka, kb);
    debug_assert_eq!(m * n, c.len());
    let a_op = match trans_a {
        Transpose::NoTrans => as_mat(a, m, ka),
        Transpose::Trans => as_mat(a, ka, m).transpose(),
    };
    let b_op = match trans_b {
        Transpose::NoTrans => as_mat(b, kb, n),
        Transpose::Trans => as_mat(b, n, kb).transpose(),
    };
    let c_mat = as_mat_mut(c, m, n);
    matmul(c_mat, Accum::Add, a_op, b_op, alpha, Par::Seq);
}

/// Split a shape into (free, contracted) extent products.
///
/// `contracted_last` selects whether the trailing `contracted` dimensions
/// are the contracted part (otherwise the leading ones are).
fn split_extents(shape: &[usize], contracted: usize, contracted_last: bool) -> (usize, usize) {
    debug_assert!(contracted <= shape.len());
    let split = if contracted_last {
        shape.len() - contracted
    } else {
        contracted
    };
    let lead: usize = shape[..split].iter().product::<usize>().max(1);
    let trail: usize = shape[split..].iter().product::<usize>().max(1);
    if contracted_last {
        (lead, trail)
    } else {
        (trail, lead)
    }
}

/// A *= diag(d) applied from the right: column j scaled by d[j].
pub fn dimd<T: Scalar>(a: &mut DenseTensor<T>, d: &DenseTensor<T>) {
    let n = d.len();
    debug_assert!(n > 0 && a.len() % n == 0);
    let dvals = d.data();
    for (j, v) in a.data_mut().iter_mut().enumerate() {
        *v = *v * dvals[j % n];
    }
}

/// B *= diag(d) applied from the left: row i scaled by d[i].
pub fn didm<T: Scalar>(d: &DenseTensor<T>, b: &mut DenseTensor<T>) {
    let m = d.len();
    debug_assert!(m > 0 && b.len() % m == 0);
    let n = b.len() / m;
    let dvals = d.data();
    for (idx, v) in b.data_mut().iter_mut().enumerate() {
        *v = dvals[idx / n] * *v;
    }
}
