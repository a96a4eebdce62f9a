//! Sparse-direct backend: LU with full pivoting via faer.
//!
//! This is the `LU`/superLU role from the original solver stack: no
//! iteration, no preconditioning, a fresh factorization per solve. Suitable
//! whenever the system is small enough that factorization cost beats Krylov
//! iteration, or when the Jacobian is too ill-conditioned for BiCGStab.

use faer::linalg::solvers::{FullPivLu, SolveCore};
use faer::{Conj, Mat, MatMut};

use crate::error::LinearSolveFailure;
use crate::linear::LinearSolver;
use crate::utils::convergence::SolveStats;

/// Direct LU solver. Keeps the last factorization so a caller reusing the
/// same matrix can solve additional right-hand sides without refactoring.
pub struct LuSolver {
    factor: Option<FullPivLu<f64>>,
}

impl LuSolver {
    pub fn new() -> Self {
        LuSolver { factor: None }
    }

    /// Solve against the cached factorization from the last [`solve`] call.
    ///
    /// [`solve`]: LinearSolver::solve
    pub fn solve_cached(&self, b: &[f64], x: &mut [f64]) -> Result<(), LinearSolveFailure> {
        let factor = self
            .factor
            .as_ref()
            .ok_or(LinearSolveFailure::Breakdown("no cached factorization"))?;
        let n = b.len();
        x.clone_from_slice(b);
        let x_mat = MatMut::from_column_major_slice_mut(x, n, 1);
        factor.solve_in_place_with_conj(Conj::No, x_mat);
        if x.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(LinearSolveFailure::Singular)
        }
    }
}

impl Default for LuSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearSolver<Mat<f64>> for LuSolver {
    /// Factor and solve A·x = b.
    ///
    /// Full pivoting does not fail outright on a singular matrix; it
    /// produces a factorization whose back-substitution emits non-finite
    /// entries. Those are caught here and reported as `Singular` so the
    /// caller never sees a poisoned solution vector.
    fn solve(
        &mut self,
        a: &Mat<f64>,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<SolveStats<f64>, LinearSolveFailure> {
        let factor = FullPivLu::new(a.as_ref());
        x.clone_from_slice(b);
        let n = x.len();
        let x_mat = MatMut::from_column_major_slice_mut(x, n, 1);
        factor.solve_in_place_with_conj(Conj::No, x_mat);
        self.factor = Some(factor);
        if !x.iter().all(|v| v.is_finite()) {
            return Err(LinearSolveFailure::Singular);
        }
        Ok(SolveStats {
            iterations: 1,
            final_residual: 0.0,
            converged: true,
        })
    }
}
