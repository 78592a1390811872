//! Block structure of the tensor dimensions.
//!
//! Each logical dimension is partitioned into contiguous blocks; the block
//! sizes per dimension are a [`BlockDim`]. The cartesian product of the
//! per-dimension partitions defines the block grid, and a block is addressed
//! either by its grid coordinates or by their row-major flattening (the
//! block *tag*).

use crate::strides::{coords_to_tag, tag_to_coords, Coords};

/// Block partition of a single dimension.
///
/// Stores the block sizes and their cumulative offsets into the dense
/// extent.
///
/// # Example
///
/// ```
/// use blockblas::BlockDim;
///
/// let dim = BlockDim::new(vec![2, 3, 4]);
/// assert_eq!(dim.nblocks(), 3);
/// assert_eq!(dim.total_size(), 9);
/// assert_eq!(dim.block_offset(2), 5);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockDim {
    block_sizes: Vec<usize>,
    cumulative: Vec<usize>,
    total_size: usize,
}

impl BlockDim {
    /// Create a partition from a list of block sizes.
    pub fn new(block_sizes: Vec<usize>) -> Self {
        let mut cumulative = Vec::with_capacity(block_sizes.len() + 1);
        cumulative.push(0);
        let mut total = 0usize;
        for &size in &block_sizes {
            total += size;
            cumulative.push(total);
        }
        Self {
            block_sizes,
            cumulative,
            total_size: total,
        }
    }

    /// Create a partition with `nblocks` blocks of equal size.
    pub fn uniform(nblocks: usize, block_size: usize) -> Self {
        Self::new(vec![block_size; nblocks])
    }

    /// Number of blocks along this dimension.
    #[inline]
    pub fn nblocks(&self) -> usize {
        self.block_sizes.len()
    }

    /// Dense extent of this dimension (sum of block sizes).
    #[inline]
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Size of block `block_index`.
    #[inline]
    pub fn block_size(&self, block_index: usize) -> usize {
        self.block_sizes[block_index]
    }

    /// Dense offset at which block `block_index` starts.
    #[inline]
    pub fn block_offset(&self, block_index: usize) -> usize {
        self.cumulative[block_index]
    }

    /// All block sizes.
    #[inline]
    pub fn block_sizes(&self) -> &[usize] {
        &self.block_sizes
    }

    /// Locate the block containing a dense index.
    ///
    /// Returns `(block_index, offset_within_block)`, or `None` if the index
    /// is out of range.
    pub fn find_block(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.total_size {
            return None;
        }
        let block_index = match self.cumulative[1..].binary_search(&index) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        Some((block_index, index - self.cumulative[block_index]))
    }
}

impl std::fmt::Display for BlockDim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockDim({:?})", self.block_sizes)
    }
}

impl From<Vec<usize>> for BlockDim {
    fn from(block_sizes: Vec<usize>) -> Self {
        Self::new(block_sizes)
    }
}

impl<const N: usize> From<[usize; N]> for BlockDim {
    fn from(block_sizes: [usize; N]) -> Self {
        Self::new(block_sizes.to_vec())
    }
}

/// Block structure of a whole tensor: one [`BlockDim`] per dimension.
///
/// The block grid has shape `grid_shape()` (blocks per dimension) and tags
/// run over `0..grid_size()` in row-major order.
///
/// # Example
///
/// ```
/// use blockblas::{BlockDim, BlockDims};
///
/// let dims = BlockDims::new(vec![
///     BlockDim::new(vec![2, 3]),
///     BlockDim::new(vec![4, 5, 6]),
/// ]);
/// assert_eq!(dims.grid_shape(), vec![2, 3]);
/// assert_eq!(dims.grid_size(), 6);
/// // Tag 5 is grid coordinate (1, 2): block shape 3 x 6.
/// assert_eq!(dims.block_shape(5), vec![3, 6]);
/// assert_eq!(dims.dense_shape(), vec![5, 15]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockDims {
    dims: Vec<BlockDim>,
}

impl BlockDims {
    /// Create from per-dimension block partitions.
    pub fn new(dims: Vec<BlockDim>) -> Self {
        Self { dims }
    }

    /// Tensor rank.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Partition of dimension `i`.
    #[inline]
    pub fn dim(&self, i: usize) -> &BlockDim {
        &self.dims[i]
    }

    /// Blocks per dimension.
    pub fn grid_shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.nblocks()).collect()
    }

    /// Total number of grid cells (valid tags are `0..grid_size()`).
    pub fn grid_size(&self) -> usize {
        self.dims.iter().map(|d| d.nblocks()).product()
    }

    /// Dense extent per dimension.
    pub fn dense_shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.total_size()).collect()
    }

    /// Total dense element count.
    pub fn dense_size(&self) -> usize {
        self.dims.iter().map(|d| d.total_size()).product()
    }

    /// Grid coordinates of a tag.
    pub fn tag_coords(&self, tag: usize) -> Coords {
        tag_to_coords(tag, &self.grid_shape())
    }

    /// Tag of a grid coordinate tuple.
    pub fn coords_tag(&self, coords: &[usize]) -> usize {
        coords_to_tag(coords, &self.grid_shape())
    }

    /// Dense shape of the block at `tag`.
    pub fn block_shape(&self, tag: usize) -> Vec<usize> {
        let coords = self.tag_coords(tag);
        coords
            .iter()
            .zip(&self.dims)
            .map(|(&c, dim)| dim.block_size(c))
            .collect()
    }

    /// Element count of the block at `tag`.
    pub fn block_size(&self, tag: usize) -> usize {
        self.block_shape(tag).iter().product::<usize>().max(1)
    }

    /// Whether grid coordinates lie within the grid.
    pub fn contains_coords(&self, coords: &[usize]) -> bool {
        coords.len() == self.rank()
            && coords
                .iter()
                .zip(&self.dims)
                .all(|(&c, dim)| c < dim.nblocks())
    }

    /// Rotate the first `m` dimensions to the end.
    ///
    /// This is the block-structure counterpart of the tag remapping done by
    /// a transposed view: `[d0..dm, dm..dr]` becomes `[dm..dr, d0..dm]`.
    pub fn rotate_left(&self, m: usize) -> Self {
        debug_assert!(m <= self.rank());
        let mut dims = Vec::with_capacity(self.rank());
        dims.extend_from_slice(&self.dims[m..]);
        dims.extend_from_slice(&self.dims[..m]);
        Self { dims }
    }

    /// All per-dimension partitions.
    #[inline]
    pub fn as_slice(&self) -> &[BlockDim] {
        &self.dims
    }
}

impl std::ops::Index<usize> for BlockDims {
    type Output = BlockDim;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.dims[index]
    }
}

impl From<Vec<Vec<usize>>> for BlockDims {
    fn from(sizes: Vec<Vec<usize>>) -> Self {
        Self::new(sizes.into_iter().map(BlockDim::new).collect())
    }
}

impl<'a> IntoIterator for &'a BlockDims {
    type Item = &'a BlockDim;
    type IntoIter = std::slice::Iter<'a, BlockDim>;

    fn into_iter(self) -> Self::IntoIter {
        self.dims.iter()
    }
}
