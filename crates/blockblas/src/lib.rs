//! Block-sparse tensor BLAS.
//!
//! A block-sparse tensor partitions each dimension into blocks and stores
//! only the nonzero dense blocks, keyed by the row-major flattening of
//! their block coordinates (the block *tag*). This crate provides BLAS-like
//! drivers over such tensors: level-1 replication (`copy`, `scal`, `axpy`,
//! `dot`), contractions (`gemv`, `ger`, `gemm`), and diagonal scaling
//! (`dimd`, `didm`).
//!
//! Sparsity is decided per destination block: the drivers match stored
//! operand blocks through tag arithmetic, reserve exactly the destination
//! blocks that receive a contribution, and run one independent task per
//! destination block under a serial or rayon-threaded [`Execution`]
//! strategy. An optional legality predicate on the destination keeps
//! symmetry-forbidden blocks at exact zero without storing them.
//!
//! # Example
//!
//! ```
//! use blockblas::{gemm, BlockDims, BlockTensor, DenseTensor, Execution, Transpose};
//!
//! // 2 x 2 block grid, each block 2 x 2.
//! let dims = BlockDims::from(vec![vec![2, 2], vec![2, 2]]);
//!
//! // Block-diagonal A, B with blocks everywhere.
//! let mut a: BlockTensor<f64> = BlockTensor::new(dims.clone());
//! a.insert(0, DenseTensor::ones(&[2, 2])).unwrap();
//! a.insert(3, DenseTensor::ones(&[2, 2])).unwrap();
//! let mut b: BlockTensor<f64> = BlockTensor::new(dims.clone());
//! for tag in 0..4 {
//!     b.insert(tag, DenseTensor::ones(&[2, 2])).unwrap();
//! }
//!
//! let mut c: BlockTensor<f64> = BlockTensor::new(dims);
//! gemm(
//!     Transpose::NoTrans,
//!     Transpose::NoTrans,
//!     1,
//!     1.0,
//!     &a,
//!     &b,
//!     0.0,
//!     &mut c,
//!     Execution::Serial,
//! )
//! .unwrap();
//! assert_eq!(c.nnzblocks(), 4);
//! ```

pub mod blas;
pub mod block;
pub mod contract;
pub mod dense;
pub mod error;
pub mod kernel;
pub mod random;
pub mod scalar;
pub mod strides;

pub use blas::{
    axpy, copy, didm, dimd, dot, gemm, gemm_scaled, gemv, gemv_scaled, ger, ger_scaled, scal,
};
pub use block::{BlockDim, BlockDims, BlockTensor, BlockView, Legality};
pub use contract::{Execution, PairScale, Task};
pub use dense::DenseTensor;
pub use error::BlasError;
pub use kernel::Transpose;
pub use random::{RandomNormal, RandomUniform};
pub use scalar::{c64, Scalar};
