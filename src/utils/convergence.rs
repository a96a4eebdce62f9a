//! Residual norms and tolerance checks shared by every solver layer.

use num_traits::Float;

use crate::config::ConvergenceTest;

/// Iteration outcome reported by linear and nonlinear solvers.
#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
}

/// Stateless residual test against absolute and relative tolerances.
///
/// The absolute floor dominates: any norm at or below `atol` converges no
/// matter what the relative tolerance says. A zero reference norm means the
/// iteration started converged, so the relative branch never divides by it.
#[derive(Clone, Copy, Debug)]
pub struct ResidualTest<T> {
    pub atol: T,
    pub rtol: T,
    pub test: ConvergenceTest,
}

impl<T: Float> ResidualTest<T> {
    pub fn new(atol: T, rtol: T, test: ConvergenceTest) -> Self {
        Self { atol, rtol, test }
    }

    /// Check `norm` against the tolerances, with `norm0` the reference
    /// (iteration-scaled) residual. Returns the verdict plus stats for the
    /// caller's bookkeeping.
    pub fn check(&self, norm: T, norm0: T, iterations: usize) -> (bool, SolveStats<T>) {
        let converged = if norm <= self.atol {
            true
        } else if norm0 == T::zero() {
            // started converged; nothing to be relative to
            true
        } else {
            self.rtol > T::zero() && norm / norm0 <= self.rtol
        };
        (
            converged,
            SolveStats {
                iterations,
                final_residual: norm,
                converged,
            },
        )
    }
}

/// Residual norms split per solution component.
///
/// Recomputed every nonlinear iteration and discarded with it; the layout
/// assumption is block-contiguous components of equal length.
#[derive(Clone, Debug)]
pub struct ResidualRecord {
    pub norms: Vec<f64>,
}

impl ResidualRecord {
    /// Split `r` into `num_components` contiguous blocks and take the
    /// Euclidean norm of each. A trailing remainder (non-divisible length)
    /// is folded into the last component.
    pub fn from_residual(r: &[f64], num_components: usize) -> Self {
        let nc = num_components.max(1);
        let block = r.len() / nc;
        let mut norms = vec![0.0; nc];
        for (i, &ri) in r.iter().enumerate() {
            let c = (i / block.max(1)).min(nc - 1);
            norms[c] += ri * ri;
        }
        for n in &mut norms {
            *n = n.sqrt();
        }
        Self { norms }
    }

    /// Combined norm over all components.
    pub fn total(&self) -> f64 {
        self.norms.iter().map(|n| n * n).sum::<f64>().sqrt()
    }

    /// True when every component passes its own (atol, rtol) pair against
    /// the per-component reference norms in `record0`.
    pub fn all_converged(&self, record0: &ResidualRecord, atol: &[f64], rtol: &[f64]) -> bool {
        self.norms.iter().enumerate().all(|(c, &n)| {
            let test = ResidualTest::new(atol[c], rtol[c], ConvergenceTest::Rits);
            test.check(n, record0.norms[c], 0).0
        })
    }
}
