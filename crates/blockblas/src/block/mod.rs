//! Block-sparse storage: block structure, container, and views.

pub mod dims;
pub mod tensor;
pub mod view;

pub use dims::{BlockDim, BlockDims};
pub use tensor::{BlockTensor, Legality};
pub use view::BlockView;
