//! Seeded input vectors and error statistics

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use statrs::statistics::Statistics;

/// Reproducible source of test vectors with entries in `[-1, 1]`
pub struct VectorSource {
    rng: ChaCha20Rng,
}

impl VectorSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    pub fn vector(&mut self, dim: usize) -> Vec<f32> {
        (0..dim).map(|_| self.rng.gen_range(-1.0f32..=1.0)).collect()
    }

    /// Vector scaled to unit Euclidean norm
    pub fn unit_vector(&mut self, dim: usize) -> Vec<f32> {
        let mut v = self.vector(dim);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }

    pub fn batch(&mut self, count: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..count).map(|_| self.vector(dim)).collect()
    }
}

/// Absolute error between a reference and a recovered vector
#[derive(Debug, Clone, Copy)]
pub struct ErrorStats {
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
}

/// Error statistics over the common prefix of `expected` and `actual`
pub fn error_stats(expected: &[f32], actual: &[f32]) -> ErrorStats {
    let errors: Vec<f64> = expected
        .iter()
        .zip(actual)
        .map(|(&e, &a)| (f64::from(e) - f64::from(a)).abs())
        .collect();
    ErrorStats {
        mean: errors.iter().mean(),
        std_dev: errors.iter().std_dev(),
        max: Statistics::max(errors.iter()),
    }
}

/// Inner product in `f64`
pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_source_is_seeded() {
        let a = VectorSource::new(7).batch(3, 16);
        let b = VectorSource::new(7).batch(3, 16);
        assert_eq!(a, b);
        assert_ne!(a, VectorSource::new(8).batch(3, 16));
        assert!(a.iter().flatten().all(|x| (-1.0..=1.0).contains(x)));
    }

    #[test]
    fn test_error_stats() {
        let stats = error_stats(&[1.0, 2.0, 3.0], &[1.0, 2.5, 2.0]);
        assert!((stats.mean - 0.5).abs() < 1e-12);
        assert_eq!(stats.max, 1.0);
        let unit = VectorSource::new(1).unit_vector(64);
        assert!((dot(&unit, &unit) - 1.0).abs() < 1e-5);
    }
}
