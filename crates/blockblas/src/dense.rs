//! Dense tensor type: the contiguous building block stored per tag.
//!
//! A `DenseTensor` is a plain multi-dimensional array in row-major order.
//! The block-sparse layer treats it as an opaque value: sources are shared
//! by `&`, the destination of a task is bound by `&mut`.

use crate::error::BlasError;
use crate::scalar::Scalar;
use crate::strides::{coords_to_tag, row_major_strides};

/// A contiguous row-major multi-dimensional array of scalars.
///
/// # Example
///
/// ```
/// use blockblas::DenseTensor;
///
/// let mut t: DenseTensor<f64> = DenseTensor::zeros(&[2, 3]);
/// t.set(&[0, 1], 5.0).unwrap();
/// assert_eq!(t.get(&[0, 1]), Some(&5.0));
///
/// // Row-major: data runs along the last dimension first.
/// let t2 = DenseTensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// assert_eq!(t2.get(&[0, 2]), Some(&3.0));
/// assert_eq!(t2.get(&[1, 0]), Some(&4.0));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DenseTensor<T: Scalar> {
    data: Vec<T>,
    shape: Vec<usize>,
}

impl<T: Scalar> DenseTensor<T> {
    /// Create a zero-initialized tensor with the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        let len: usize = shape.iter().product::<usize>().max(1);
        Self {
            data: vec![T::zero(); len],
            shape: shape.to_vec(),
        }
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        let mut t = Self::zeros(shape);
        t.fill(T::one());
        t
    }

    /// Create a tensor from row-major data and a shape.
    ///
    /// # Errors
    ///
    /// Returns `BlasError::ShapeMismatch` if the data length does not match
    /// the shape.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self, BlasError> {
        let expected: usize = shape.iter().product::<usize>().max(1);
        if data.len() != expected {
            return Err(BlasError::ShapeMismatch {
                expected: shape.to_vec(),
                actual: vec![data.len()],
            });
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
        })
    }

    /// Get the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the rank (number of dimensions).
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get the total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the tensor has zero elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the underlying data as a slice (row-major).
    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Get the underlying data as a mutable slice.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Get an element by cartesian indices.
    ///
    /// Returns `None` on out-of-bounds or wrong index count.
    pub fn get(&self, indices: &[usize]) -> Option<&T> {
        if indices.len() != self.ndim() {
            return None;
        }
        for (&idx, &dim) in indices.iter().zip(self.shape.iter()) {
            if idx >= dim {
                return None;
            }
        }
        self.data.get(coords_to_tag(indices, &self.shape))
    }

    /// Set an element by cartesian indices.
    pub fn set(&mut self, indices: &[usize], value: T) -> Result<(), BlasError> {
        if indices.len() != self.ndim() {
            return Err(BlasError::RankMismatch {
                expected: self.ndim(),
                actual: indices.len(),
            });
        }
        for (&idx, &dim) in indices.iter().zip(self.shape.iter()) {
            if idx >= dim {
                return Err(BlasError::ShapeMismatch {
                    expected: self.shape.clone(),
                    actual: indices.to_vec(),
                });
            }
        }
        let linear = coords_to_tag(indices, &self.shape);
        self.data[linear] = value;
        Ok(())
    }

    /// Fill all elements with a value.
    pub fn fill(&mut self, value: T) {
        for x in &mut self.data {
            *x = value;
        }
    }

    /// Row-major strides of this tensor.
    pub fn strides(&self) -> Vec<usize> {
        row_major_strides(&self.shape)
    }
}

impl<T: Scalar> std::fmt::Display for DenseTensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DenseTensor(shape={:?}, len={})", self.shape, self.len())
    }
}
