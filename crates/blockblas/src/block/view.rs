//! Read-only, tag-remapped views of a block tensor.
//!
//! Transpose normalization happens once, at the driver edge, by rotating
//! the first `m` block dimensions to the end *in tag space only*. The
//! dense block data is never copied or permuted; the dense kernels account
//! for the element layout through their transpose flags. After this
//! remapping the contraction dispatch always sees operands with contracted
//! dimensions in canonical position, so its slab arithmetic has a single
//! code path.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::block::dims::BlockDims;
use crate::block::tensor::BlockTensor;
use crate::dense::DenseTensor;
use crate::scalar::Scalar;
use crate::strides::Coords;

/// Borrowed view of a block tensor's stored blocks under a (possibly
/// remapped) tag order.
pub struct BlockView<'a, T: Scalar> {
    dims: BlockDims,
    map: BTreeMap<usize, &'a DenseTensor<T>>,
}

impl<'a, T: Scalar> BlockView<'a, T> {
    /// Identity view: same tags, borrowed blocks.
    pub fn new(tensor: &'a BlockTensor<T>) -> Self {
        Self {
            dims: tensor.dims().clone(),
            map: tensor.iter().map(|(&tag, block)| (tag, block)).collect(),
        }
    }

    /// View with the first `m` block dimensions rotated to the end.
    ///
    /// A block at grid coordinates `(c0..cm, cm..cr)` appears in the view
    /// at `(cm..cr, c0..cm)`. Block data references are unchanged.
    pub fn transposed(tensor: &'a BlockTensor<T>, m: usize) -> Self {
        let rank = tensor.rank();
        debug_assert!(m <= rank);
        let dims = tensor.dims().rotate_left(m);
        let map = tensor
            .iter()
            .map(|(&tag, block)| {
                let coords = tensor.dims().tag_coords(tag);
                let mut rotated: Coords = Coords::with_capacity(rank);
                rotated.extend_from_slice(&coords[m..]);
                rotated.extend_from_slice(&coords[..m]);
                (dims.coords_tag(&rotated), block)
            })
            .collect();
        Self { dims, map }
    }

    /// Block structure in view order.
    #[inline]
    pub fn dims(&self) -> &BlockDims {
        &self.dims
    }

    /// Rank of the viewed tensor.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.rank()
    }

    /// Total number of grid cells in view order.
    #[inline]
    pub fn grid_size(&self) -> usize {
        self.dims.grid_size()
    }

    /// Number of visible blocks.
    #[inline]
    pub fn nnzblocks(&self) -> usize {
        self.map.len()
    }

    /// Look up a block by view tag.
    #[inline]
    pub fn find(&self, tag: usize) -> Option<&'a DenseTensor<T>> {
        self.map.get(&tag).copied()
    }

    /// Blocks whose view tags fall in the inclusive range, ascending.
    pub fn slab(
        &self,
        range: RangeInclusive<usize>,
    ) -> btree_map::Range<'_, usize, &'a DenseTensor<T>> {
        self.map.range(range)
    }

    /// Iterate visible blocks in ascending view-tag order.
    pub fn iter(&self) -> btree_map::Iter<'_, usize, &'a DenseTensor<T>> {
        self.map.iter()
    }

    /// Grid coordinates of a view tag.
    pub fn tag_coords(&self, tag: usize) -> Coords {
        self.dims.tag_coords(tag)
    }
}
