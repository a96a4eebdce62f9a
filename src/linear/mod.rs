//! Linear solve layer: one assembled system, one solve, one backend.
//!
//! The nonlinear solver owns a [`LinearSystem`] for the duration of a single
//! Newton linearization and hands it to the [`LinearAdapter`] by reference;
//! the adapter never mutates it and holds no state across solves.

use faer::Mat;

use crate::error::LinearSolveFailure;
use crate::utils::convergence::SolveStats;

pub mod adapter;
pub mod direct;
pub mod krylov;

pub use adapter::LinearAdapter;
pub use direct::LuSolver;
pub use krylov::BiCgStabSolver;

/// Assembled Jacobian and right-hand side for one Newton linearization.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    matrix: Mat<f64>,
    rhs: Vec<f64>,
}

impl LinearSystem {
    /// Takes ownership of the assembled matrix and RHS. The matrix must be
    /// square and match the RHS length.
    pub fn new(matrix: Mat<f64>, rhs: Vec<f64>) -> Self {
        assert_eq!(matrix.nrows(), matrix.ncols(), "system matrix must be square");
        assert_eq!(matrix.nrows(), rhs.len(), "rhs length must match matrix order");
        Self { matrix, rhs }
    }

    pub fn matrix(&self) -> &Mat<f64> {
        &self.matrix
    }

    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    pub fn ndof(&self) -> usize {
        self.rhs.len()
    }
}

/// Common interface for the direct and iterative backends.
pub trait LinearSolver<M> {
    /// Solve A·x = b, writing the result into `x`.
    fn solve(
        &mut self,
        a: &M,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<SolveStats<f64>, LinearSolveFailure>;
}
