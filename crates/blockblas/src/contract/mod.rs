//! Contraction machinery: shape calculators, tasks, execution, dispatch.

pub mod dispatch;
pub mod exec;
pub mod shape;
pub mod task;

pub use dispatch::PairScale;
pub use exec::{Execution, Task};
pub use shape::{gemm_shape, gemv_shape, ger_shape};
pub use task::{ContractionKernel, ContractionTask, ReplicationKernel, ReplicationTask};
