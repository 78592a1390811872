//! Task argument objects: the work items produced by dispatch.
//!
//! A task owns exclusive access to its destination block (`&mut`) and
//! shared access to its source blocks (`&`). Dispatch creates at most one
//! task per destination tag, which is what makes the task list safe to run
//! concurrently.

use crate::contract::exec::Task;
use crate::dense::DenseTensor;
use crate::kernel::{daxpy, dcopy, dgemm, dgemv, dger, dscal, Transpose};
use crate::scalar::Scalar;

/// Element-wise kernel selector for level-1 block work.
#[derive(Clone, Copy, Debug)]
pub enum ReplicationKernel<T> {
    /// dst = src
    Copy,
    /// dst *= alpha
    Scale(T),
    /// dst += alpha * src
    Axpy(T),
}

/// One level-1 block operation: at most one source, one destination.
pub struct ReplicationTask<'a, T: Scalar> {
    kernel: ReplicationKernel<T>,
    src: Option<&'a DenseTensor<T>>,
    dst: &'a mut DenseTensor<T>,
}

impl<'a, T: Scalar> ReplicationTask<'a, T> {
    pub fn copy(src: &'a DenseTensor<T>, dst: &'a mut DenseTensor<T>) -> Self {
        Self {
            kernel: ReplicationKernel::Copy,
            src: Some(src),
            dst,
        }
    }

    pub fn scale(alpha: T, dst: &'a mut DenseTensor<T>) -> Self {
        Self {
            kernel: ReplicationKernel::Scale(alpha),
            src: None,
            dst,
        }
    }

    pub fn axpy(alpha: T, src: &'a DenseTensor<T>, dst: &'a mut DenseTensor<T>) -> Self {
        Self {
            kernel: ReplicationKernel::Axpy(alpha),
            src: Some(src),
            dst,
        }
    }
}

impl<T: Scalar> Task for ReplicationTask<'_, T> {
    fn run(&mut self) {
        match self.kernel {
            ReplicationKernel::Copy => dcopy(self.src.unwrap(), self.dst),
            ReplicationKernel::Scale(alpha) => dscal(alpha, self.dst),
            ReplicationKernel::Axpy(alpha) => daxpy(alpha, self.src.unwrap(), self.dst),
        }
    }

    fn cost(&self) -> u64 {
        self.dst.len() as u64
    }
}

/// Contraction kernel selector carrying the dense-layout flags.
///
/// The transpose flags describe how the *stored* block buffers are laid
/// out relative to the normalized (contracted-dims-trailing) view order
/// used by dispatch.
#[derive(Clone, Copy, Debug)]
pub enum ContractionKernel<T> {
    Gemv {
        trans_a: Transpose,
        alpha: T,
    },
    Ger {
        alpha: T,
    },
    Gemm {
        trans_a: Transpose,
        trans_b: Transpose,
        contracted: usize,
        alpha: T,
    },
}

/// One contraction into a single destination block.
///
/// `pairs` lists the matched operand block pairs with a per-pair scale
/// (the scale-functor weight, `one()` when unscaled); all pairs accumulate
/// into the same destination in discovery order.
pub struct ContractionTask<'a, T: Scalar> {
    kernel: ContractionKernel<T>,
    pairs: Vec<(&'a DenseTensor<T>, &'a DenseTensor<T>, T)>,
    dst: &'a mut DenseTensor<T>,
    cost: u64,
}

impl<'a, T: Scalar> ContractionTask<'a, T> {
    pub fn new(
        kernel: ContractionKernel<T>,
        pairs: Vec<(&'a DenseTensor<T>, &'a DenseTensor<T>, T)>,
        dst: &'a mut DenseTensor<T>,
    ) -> Self {
        let cost = pairs
            .iter()
            .map(|&(a, b, _)| pair_cost(&kernel, a, b))
            .sum();
        Self {
            kernel,
            pairs,
            dst,
            cost,
        }
    }

    /// Number of matched operand pairs.
    pub fn npairs(&self) -> usize {
        self.pairs.len()
    }
}

/// Flop estimate for one matched pair under a kernel.
fn pair_cost<T: Scalar>(
    kernel: &ContractionKernel<T>,
    a: &DenseTensor<T>,
    b: &DenseTensor<T>,
) -> u64 {
    match *kernel {
        ContractionKernel::Gemv { .. } | ContractionKernel::Ger { .. } => a.len() as u64,
        ContractionKernel::Gemm {
            trans_b,
            contracted,
            ..
        } => {
            let rb = b.ndim();
            let k_block: usize = match trans_b {
                Transpose::NoTrans => b.shape()[..contracted].iter().product(),
                Transpose::Trans => b.shape()[rb - contracted..].iter().product(),
            };
            (a.len() * (b.len() / k_block.max(1))) as u64
        }
    }
}

impl<T: Scalar> Task for ContractionTask<'_, T> {
    fn run(&mut self) {
        for &(a, b, scale) in &self.pairs {
            match self.kernel {
                ContractionKernel::Gemv { trans_a, alpha } => {
                    dgemv(trans_a, alpha * scale, a, b, self.dst)
                }
                ContractionKernel::Ger { alpha } => dger(alpha * scale, a, b, self.dst),
                ContractionKernel::Gemm {
                    trans_a,
                    trans_b,
                    contracted,
                    alpha,
                } => dgemm(trans_a, trans_b, contracted, alpha * scale, a, b, self.dst),
            }
        }
    }

    fn cost(&self) -> u64 {
        self.cost
    }
}
