//! Error types for blockblas.

use thiserror::Error;

/// Errors that can occur in block-sparse BLAS operations.
#[derive(Debug, Error)]
pub enum BlasError {
    /// Destination tensor pre-exists with an incompatible shape.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Operation requires operands of a specific rank.
    #[error("rank mismatch: expected rank {expected}, got rank {actual}")]
    RankMismatch { expected: usize, actual: usize },

    /// A legally-nonzero result block could not be reserved.
    #[error("{routine}: required block {tag} could not be reserved")]
    BlockUnavailable { routine: &'static str, tag: usize },

    /// Resizing a container that still holds blocks.
    #[error("cannot resize a container holding {nnzblocks} blocks; clear it first")]
    NonEmptyResize { nnzblocks: usize },

    /// Block data shape does not match the block structure at its tag.
    #[error("block data for tag {tag} has wrong shape: expected {expected:?}, got {actual:?}")]
    BlockShapeMismatch {
        tag: usize,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Inserting at a tag that is out of range or vetoed by the legality predicate.
    #[error("block tag {tag} is not storable (out of range or disallowed)")]
    IllegalTag { tag: usize },
}
