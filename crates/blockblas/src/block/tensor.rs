//! Block-sparse tensor container.
//!
//! Stores only nonzero blocks, keyed by block tag in a sorted map. An
//! absent block is an implicit zero and is never materialized except
//! through [`BlockTensor::reserve`]. An optional legality predicate marks
//! tags that must stay zero (for example by a symmetry sector rule);
//! `reserve` and `insert` refuse such tags.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::block::dims::BlockDims;
use crate::dense::DenseTensor;
use crate::error::BlasError;
use crate::scalar::Scalar;
use crate::strides::Coords;

/// Predicate deciding whether a block tag may hold data.
pub type Legality = Arc<dyn Fn(usize) -> bool + Send + Sync>;

/// A block-sparse tensor of runtime rank.
///
/// # Example
///
/// ```
/// use blockblas::{BlockDims, BlockTensor, DenseTensor};
///
/// let dims = BlockDims::from(vec![vec![2, 2], vec![2, 2]]);
/// let mut t: BlockTensor<f64> = BlockTensor::new(dims);
/// assert_eq!(t.grid_size(), 4);
/// assert_eq!(t.nnzblocks(), 0);
///
/// t.insert(0, DenseTensor::ones(&[2, 2])).unwrap();
/// assert_eq!(t.nnzblocks(), 1);
/// assert!(t.find(3).is_none()); // absent block, implicit zero
/// ```
#[derive(Clone)]
pub struct BlockTensor<T: Scalar> {
    dims: BlockDims,
    blocks: BTreeMap<usize, DenseTensor<T>>,
    legality: Option<Legality>,
}

impl<T: Scalar> BlockTensor<T> {
    /// Create an empty tensor with the given block structure.
    pub fn new(dims: BlockDims) -> Self {
        Self {
            dims,
            blocks: BTreeMap::new(),
            legality: None,
        }
    }

    /// Create an empty tensor whose storable tags are restricted by a
    /// predicate.
    pub fn with_legality(dims: BlockDims, legality: Legality) -> Self {
        Self {
            dims,
            blocks: BTreeMap::new(),
            legality: Some(legality),
        }
    }

    /// Block structure.
    #[inline]
    pub fn dims(&self) -> &BlockDims {
        &self.dims
    }

    /// Tensor rank.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.rank()
    }

    /// Total number of grid cells (the tag range).
    #[inline]
    pub fn grid_size(&self) -> usize {
        self.dims.grid_size()
    }

    /// Number of stored (nonzero) blocks.
    #[inline]
    pub fn nnzblocks(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no blocks are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Legality predicate, if any.
    #[inline]
    pub fn legality(&self) -> Option<&Legality> {
        self.legality.as_ref()
    }

    /// Whether `tag` is in range and permitted by the legality predicate.
    pub fn allowed(&self, tag: usize) -> bool {
        tag < self.grid_size() && self.legality.as_ref().is_none_or(|pred| pred(tag))
    }

    /// Grid coordinates of a tag.
    pub fn tag_coords(&self, tag: usize) -> Coords {
        self.dims.tag_coords(tag)
    }

    /// Look up a stored block.
    #[inline]
    pub fn find(&self, tag: usize) -> Option<&DenseTensor<T>> {
        self.blocks.get(&tag)
    }

    /// Look up a stored block mutably. Never allocates.
    #[inline]
    pub fn find_mut(&mut self, tag: usize) -> Option<&mut DenseTensor<T>> {
        self.blocks.get_mut(&tag)
    }

    /// Stored blocks whose tags fall in the inclusive range.
    ///
    /// This is the slab query of the contraction dispatch: with `stride`
    /// the trailing grid extent, the slab of row `i` is
    /// `slab(i * stride..=i * stride + stride - 1)`.
    pub fn slab(
        &self,
        range: RangeInclusive<usize>,
    ) -> btree_map::Range<'_, usize, DenseTensor<T>> {
        self.blocks.range(range)
    }

    /// Fetch the block at `tag`, zero-allocating it if absent.
    ///
    /// Returns `None` when the tag is out of range or vetoed by the
    /// legality predicate; nothing is allocated in that case. This is the
    /// only path that materializes a block implicitly.
    pub fn reserve(&mut self, tag: usize) -> Option<&mut DenseTensor<T>> {
        if !self.allowed(tag) {
            return None;
        }
        let shape = self.dims.block_shape(tag);
        Some(
            self.blocks
                .entry(tag)
                .or_insert_with(|| DenseTensor::zeros(&shape)),
        )
    }

    /// Insert a block at `tag`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// `IllegalTag` when the tag is out of range or disallowed,
    /// `BlockShapeMismatch` when the data shape does not match the block
    /// structure at that tag.
    pub fn insert(&mut self, tag: usize, block: DenseTensor<T>) -> Result<(), BlasError> {
        if !self.allowed(tag) {
            return Err(BlasError::IllegalTag { tag });
        }
        let expected = self.dims.block_shape(tag);
        if block.shape() != expected.as_slice() {
            return Err(BlasError::BlockShapeMismatch {
                tag,
                expected,
                actual: block.shape().to_vec(),
            });
        }
        self.blocks.insert(tag, block);
        Ok(())
    }

    /// Remove and return the block at `tag`.
    pub fn erase(&mut self, tag: usize) -> Option<DenseTensor<T>> {
        self.blocks.remove(&tag)
    }

    /// Remove all stored blocks, keeping the block structure.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Replace the block structure.
    ///
    /// # Errors
    ///
    /// `NonEmptyResize` when blocks are stored; call [`clear`](Self::clear)
    /// first to accept the data loss explicitly.
    pub fn resize(&mut self, dims: BlockDims) -> Result<(), BlasError> {
        if !self.blocks.is_empty() {
            return Err(BlasError::NonEmptyResize {
                nnzblocks: self.nnzblocks(),
            });
        }
        self.dims = dims;
        Ok(())
    }

    /// Iterate stored blocks in ascending tag order.
    pub fn iter(&self) -> btree_map::Iter<'_, usize, DenseTensor<T>> {
        self.blocks.iter()
    }

    /// Iterate stored blocks mutably in ascending tag order.
    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, usize, DenseTensor<T>> {
        self.blocks.iter_mut()
    }

    /// Stored tags in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.keys().copied()
    }

    /// Materialize the full dense tensor, absent blocks as zeros.
    pub fn to_dense(&self) -> DenseTensor<T> {
        let shape = self.dims.dense_shape();
        let mut dense = DenseTensor::zeros(&shape);
        let dense_strides = dense.strides();
        for (&tag, block) in &self.blocks {
            let coords = self.dims.tag_coords(tag);
            let offsets: Vec<usize> = coords
                .iter()
                .enumerate()
                .map(|(d, &c)| self.dims.dim(d).block_offset(c))
                .collect();
            let bshape = block.shape().to_vec();
            let mut idx = vec![0usize; bshape.len()];
            for &v in block.data() {
                let linear: usize = idx
                    .iter()
                    .zip(&offsets)
                    .zip(&dense_strides)
                    .map(|((&i, &off), &s)| (i + off) * s)
                    .sum();
                dense.data_mut()[linear] = v;
                // Odometer over the block shape, last dimension fastest.
                for d in (0..bshape.len()).rev() {
                    idx[d] += 1;
                    if idx[d] < bshape[d] {
                        break;
                    }
                    idx[d] = 0;
                }
            }
        }
        dense
    }

    /// Build a block tensor from dense data, materializing every allowed
    /// block.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when the dense shape disagrees with the block
    /// structure.
    pub fn from_dense(dims: BlockDims, dense: &DenseTensor<T>) -> Result<Self, BlasError> {
        let expected = dims.dense_shape();
        if dense.shape() != expected.as_slice() {
            return Err(BlasError::ShapeMismatch {
                expected,
                actual: dense.shape().to_vec(),
            });
        }
        let dense_strides = dense.strides();
        let mut out = Self::new(dims);
        for tag in 0..out.grid_size() {
            let coords = out.dims.tag_coords(tag);
            let offsets: Vec<usize> = coords
                .iter()
                .enumerate()
                .map(|(d, &c)| out.dims.dim(d).block_offset(c))
                .collect();
            let bshape = out.dims.block_shape(tag);
            let mut block = DenseTensor::zeros(&bshape);
            let mut idx = vec![0usize; bshape.len()];
            for slot in block.data_mut() {
                let linear: usize = idx
                    .iter()
                    .zip(&offsets)
                    .zip(&dense_strides)
                    .map(|((&i, &off), &s)| (i + off) * s)
                    .sum();
                *slot = dense.data()[linear];
                for d in (0..bshape.len()).rev() {
                    idx[d] += 1;
                    if idx[d] < bshape[d] {
                        break;
                    }
                    idx[d] = 0;
                }
            }
            out.blocks.insert(tag, block);
        }
        Ok(out)
    }
}

impl<T: Scalar> std::fmt::Debug for BlockTensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockTensor")
            .field("dims", &self.dims)
            .field("blocks", &self.blocks)
            .field("legality", &self.legality.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

impl<T: Scalar> PartialEq for BlockTensor<T> {
    /// Structural equality over block structure and stored blocks; the
    /// legality predicate is not compared.
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims && self.blocks == other.blocks
    }
}

impl<T: Scalar> std::fmt::Display for BlockTensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BlockTensor(rank={}, grid={:?}, nnzblocks={}/{})",
            self.rank(),
            self.dims.grid_shape(),
            self.nnzblocks(),
            self.grid_size()
        )
    }
}
