//! Trait implementations for `faer::Mat` and `Vec<T>`.
//!
//! These let dense faer matrices and plain vectors flow through the generic
//! Krylov loop and the Newton layer. Inner products pick up Rayon data
//! parallelism when the `rayon` feature is enabled; the reduction order
//! differs from the serial path, so norms may disagree in the last ulp.

use crate::core::traits::{InnerProduct, MatVec};
use faer::Mat;
use num_traits::Float;

impl<T: Float> MatVec<Vec<T>> for Mat<T> {
    fn matvec(&self, x: &Vec<T>, y: &mut Vec<T>) {
        assert_eq!(self.ncols(), x.len(), "matvec: x has wrong length");
        assert_eq!(self.nrows(), y.len(), "matvec: y has wrong length");
        for i in 0..self.nrows() {
            let mut acc = T::zero();
            for j in 0..self.ncols() {
                acc = acc + self[(i, j)] * x[j];
            }
            y[i] = acc;
        }
    }
}

impl<T: Float + Send + Sync> InnerProduct<Vec<T>> for () {
    type Scalar = T;

    fn dot(&self, x: &Vec<T>, y: &Vec<T>) -> T {
        assert_eq!(x.len(), y.len(), "dot: length mismatch");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            x.as_slice()
                .par_iter()
                .zip(y.as_slice().par_iter())
                .map(|(xi, yi)| *xi * *yi)
                .reduce(|| T::zero(), |acc, v| acc + v)
        }
        #[cfg(not(feature = "rayon"))]
        {
            x.iter()
                .zip(y.iter())
                .map(|(xi, yi)| *xi * *yi)
                .fold(T::zero(), |acc, v| acc + v)
        }
    }

    fn norm(&self, x: &Vec<T>) -> T {
        self.dot(x, x).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matvec_matches_hand_computation() {
        let a = Mat::from_fn(2, 3, |i, j| (i * 3 + j) as f64);
        let x = vec![1.0, 2.0, 3.0];
        let mut y = vec![0.0; 2];
        a.matvec(&x, &mut y);
        assert_eq!(y, vec![8.0, 26.0]);
    }

    #[test]
    fn norm_of_unit_axes() {
        let ip = ();
        let x = vec![3.0, 4.0];
        assert!((InnerProduct::<Vec<f64>>::norm(&ip, &x) - 5.0_f64).abs() < 1e-15);
    }
}
