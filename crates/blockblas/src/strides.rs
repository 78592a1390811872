//! Stride computation and block-tag arithmetic.
//!
//! Uses row-major (C) order throughout: the last dimension varies fastest.
//! Block tags are the row-major flattening of a block-coordinate tuple over
//! the block grid, which is what makes the slab arithmetic in the dispatch
//! layer work (`tag / stride` = leading sub-index, `tag % stride` = trailing
//! sub-index).

use smallvec::SmallVec;

/// Coordinate tuple for a block within the block grid.
///
/// Stack-allocated for ranks up to 8, heap fallback above.
pub type Coords = SmallVec<[usize; 8]>;

/// Compute row-major strides from a shape.
///
/// For shape `[d0, d1, d2]`, returns `[d1*d2, d2, 1]`.
///
/// # Examples
///
/// ```
/// use blockblas::strides::row_major_strides;
///
/// assert_eq!(row_major_strides(&[3, 4, 5]), vec![20, 5, 1]);
/// assert_eq!(row_major_strides(&[2, 3]), vec![3, 1]);
/// assert_eq!(row_major_strides(&[5]), vec![1]);
/// assert_eq!(row_major_strides(&[]), Vec::<usize>::new());
/// ```
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0usize; shape.len()];
    let mut stride = 1;
    for (i, &dim) in shape.iter().enumerate().rev() {
        strides[i] = stride;
        stride *= dim;
    }
    strides
}

/// Convert a flat tag to grid coordinates in row-major order.
pub fn tag_to_coords(mut tag: usize, grid: &[usize]) -> Coords {
    let mut coords: Coords = SmallVec::from_elem(0, grid.len());
    for (i, &dim) in grid.iter().enumerate().rev() {
        coords[i] = tag % dim;
        tag /= dim;
    }
    coords
}

/// Convert grid coordinates to a flat tag in row-major order.
#[inline]
pub fn coords_to_tag(coords: &[usize], grid: &[usize]) -> usize {
    debug_assert_eq!(coords.len(), grid.len());
    let mut tag = 0;
    for (&c, &dim) in coords.iter().zip(grid.iter()) {
        tag = tag * dim + c;
    }
    tag
}
