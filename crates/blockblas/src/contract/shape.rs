//! Destination block-structure calculators for contractions.
//!
//! These operate on *normalized* operand structures: any transpose has
//! already been folded away by the driver's view remapping, so both `A`
//! and `B` carry their contracted dimensions last (the same convention
//! the slab matching works in). Contracted dimensions must agree block by
//! block, not just in dense extent, because the tag algebra of the
//! dispatch identifies blocks through the grid.

use crate::block::dims::BlockDims;
use crate::error::BlasError;

/// Check that two per-dimension partitions agree, dim by dim.
fn check_contracted(a: &[crate::block::dims::BlockDim], b: &[crate::block::dims::BlockDim]) -> Result<(), BlasError> {
    for (da, db) in a.iter().zip(b.iter()) {
        if da != db {
            return Err(BlasError::ShapeMismatch {
                expected: da.block_sizes().to_vec(),
                actual: db.block_sizes().to_vec(),
            });
        }
    }
    Ok(())
}

/// Result structure of `y = A * x` where `x` is fully contracted.
///
/// `A`'s trailing `rank(x)` dimensions must match `x`; the result keeps
/// `A`'s leading dimensions.
pub fn gemv_shape(a: &BlockDims, x: &BlockDims) -> Result<BlockDims, BlasError> {
    let ra = a.rank();
    let rx = x.rank();
    if rx >= ra {
        return Err(BlasError::RankMismatch {
            expected: rx + 1,
            actual: ra,
        });
    }
    check_contracted(&a.as_slice()[ra - rx..], x.as_slice())?;
    Ok(BlockDims::new(a.as_slice()[..ra - rx].to_vec()))
}

/// Result structure of the outer product `C = a (outer) b`: the
/// concatenation of both operand structures.
pub fn ger_shape(a: &BlockDims, b: &BlockDims) -> BlockDims {
    let mut dims = Vec::with_capacity(a.rank() + b.rank());
    dims.extend_from_slice(a.as_slice());
    dims.extend_from_slice(b.as_slice());
    BlockDims::new(dims)
}

/// Result structure of `C = A * B` contracting `k` dimensions.
///
/// Both operands carry their contracted dimensions last; those must match
/// dim by dim. The result is `A`'s free (leading) dimensions followed by
/// `B`'s free ones. `k` must leave at least one free dimension on each
/// side (full contraction of one operand is the gemv case, of both the
/// dot case).
pub fn gemm_shape(a: &BlockDims, b: &BlockDims, k: usize) -> Result<BlockDims, BlasError> {
    let ra = a.rank();
    let rb = b.rank();
    if k == 0 || k >= ra {
        return Err(BlasError::RankMismatch {
            expected: k + 1,
            actual: ra,
        });
    }
    if k >= rb {
        return Err(BlasError::RankMismatch {
            expected: k + 1,
            actual: rb,
        });
    }
    check_contracted(&a.as_slice()[ra - k..], &b.as_slice()[rb - k..])?;
    let mut dims = Vec::with_capacity(ra + rb - 2 * k);
    dims.extend_from_slice(&a.as_slice()[..ra - k]);
    dims.extend_from_slice(&b.as_slice()[..rb - k]);
    Ok(BlockDims::new(dims))
}
