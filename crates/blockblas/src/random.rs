//! Random tensor construction.
//!
//! Random dense blocks and block tensors, mainly for tests and
//! benchmarks. A random block tensor materializes every allowed block.

use rand::distr::StandardUniform;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::block::dims::BlockDims;
use crate::block::tensor::{BlockTensor, Legality};
use crate::dense::DenseTensor;
use crate::scalar::{c64, Scalar};

/// Trait for types that can be sampled from a uniform distribution.
pub trait RandomUniform: Scalar {
    /// Sample from the uniform distribution [0, 1).
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self;
}

impl RandomUniform for f64 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardUniform)
    }
}

impl RandomUniform for c64 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        c64::new(rng.sample(StandardUniform), rng.sample(StandardUniform))
    }
}

/// Trait for types that can be sampled from a normal distribution.
pub trait RandomNormal: Scalar {
    /// Sample from the standard normal distribution.
    fn sample_normal<R: Rng>(rng: &mut R) -> Self;
}

impl RandomNormal for f64 {
    fn sample_normal<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardNormal)
    }
}

impl RandomNormal for c64 {
    fn sample_normal<R: Rng>(rng: &mut R) -> Self {
        // Standard complex normal: independent N(0, 1/2) parts so that
        // |z|^2 has mean 1.
        let scale = std::f64::consts::FRAC_1_SQRT_2;
        c64::new(
            rng.sample::<f64, _>(StandardNormal) * scale,
            rng.sample::<f64, _>(StandardNormal) * scale,
        )
    }
}

impl<T: RandomUniform> DenseTensor<T> {
    /// Create a tensor with uniform random values in [0, 1).
    pub fn random(shape: &[usize]) -> Self {
        Self::random_with_rng(shape, &mut rand::rng())
    }

    /// Create a tensor with uniform random values using a specific RNG.
    ///
    /// # Example
    ///
    /// ```
    /// use blockblas::DenseTensor;
    /// use rand::rngs::StdRng;
    /// use rand::SeedableRng;
    ///
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let t1: DenseTensor<f64> = DenseTensor::random_with_rng(&[2, 3], &mut rng);
    ///
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let t2: DenseTensor<f64> = DenseTensor::random_with_rng(&[2, 3], &mut rng);
    /// assert_eq!(t1.data(), t2.data());
    /// ```
    pub fn random_with_rng<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        let len: usize = shape.iter().product::<usize>().max(1);
        let data: Vec<T> = (0..len).map(|_| T::sample_uniform(rng)).collect();
        Self::from_vec(data, shape).expect("shape and data length should match")
    }
}

impl<T: RandomNormal> DenseTensor<T> {
    /// Create a tensor with standard normal random values.
    pub fn randn(shape: &[usize]) -> Self {
        Self::randn_with_rng(shape, &mut rand::rng())
    }

    /// Create a tensor with standard normal random values using a
    /// specific RNG.
    pub fn randn_with_rng<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        let len: usize = shape.iter().product::<usize>().max(1);
        let data: Vec<T> = (0..len).map(|_| T::sample_normal(rng)).collect();
        Self::from_vec(data, shape).expect("shape and data length should match")
    }
}

impl<T: RandomUniform> BlockTensor<T> {
    /// Create a block tensor with every allowed block filled with uniform
    /// random values.
    pub fn random_with_rng<R: Rng>(dims: BlockDims, rng: &mut R) -> Self {
        let mut out = Self::new(dims);
        fill_random(&mut out, rng);
        out
    }

    /// Like [`random_with_rng`](Self::random_with_rng) but restricted by
    /// a legality predicate: vetoed tags stay absent.
    pub fn random_with_legality<R: Rng>(dims: BlockDims, legality: Legality, rng: &mut R) -> Self {
        let mut out = Self::with_legality(dims, legality);
        fill_random(&mut out, rng);
        out
    }
}

fn fill_random<T: RandomUniform, R: Rng>(t: &mut BlockTensor<T>, rng: &mut R) {
    for tag in 0..t.grid_size() {
        if let Some(block) = t.reserve(tag) {
            for v in block.data_mut() {
                *v = T::sample_uniform(rng);
            }
        }
    }
}
