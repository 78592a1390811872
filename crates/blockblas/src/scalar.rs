//! Scalar trait for tensor element types.

use faer_traits::ComplexField;
use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

pub use faer::c64;

/// Trait for scalar types supported by blockblas.
///
/// This trait wraps faer's `ComplexField` with the additional bounds
/// required for block-sparse dispatch: value semantics, arithmetic
/// operators, and thread-safety (tasks may execute on a worker pool).
pub trait Scalar:
    ComplexField
    + Copy
    + Debug
    + Default
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + 'static
{
    /// Returns the additive identity (zero).
    fn zero() -> Self {
        Self::default()
    }

    /// Returns the multiplicative identity (one).
    fn one() -> Self;
}

impl Scalar for f64 {
    fn one() -> Self {
        1.0
    }
}

impl Scalar for c64 {
    fn one() -> Self {
        c64::new(1.0, 0.0)
    }
}
