//! Uniform front over the direct and iterative backends.
//!
//! The backend choice is already resolved by the configuration layer
//! (`useSuperlu`-style overrides never reach this module). Each call builds
//! a fresh backend solver, uses it for exactly one solve, and drops it; no
//! state crosses solve invocations.

use log::debug;

use crate::config::{Backend, ConvergenceTest, SolverConfig};
use crate::error::LinearSolveFailure;
use crate::linear::{BiCgStabSolver, LinearSolver, LinearSystem, LuSolver};

pub struct LinearAdapter {
    backend: Backend,
    test: ConvergenceTest,
    atol: f64,
    rtol: f64,
    max_iters: usize,
}

impl LinearAdapter {
    pub fn from_config(cfg: &SolverConfig) -> Self {
        Self {
            backend: cfg.backend,
            test: cfg.linear_test,
            atol: cfg.l_atol_res,
            rtol: cfg.lin_tol_fac,
            max_iters: cfg.max_linear_its,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn rtol(&self) -> f64 {
        self.rtol
    }

    /// Adjust the relative tolerance for the next solve. This is the hook
    /// the Eisenstat–Walker forcing term drives; it has no effect on the
    /// direct backend.
    pub fn set_rtol(&mut self, rtol: f64) {
        self.rtol = rtol;
    }

    /// Solve the system, returning a fresh solution vector. The system is
    /// borrowed immutably and left untouched.
    pub fn solve(&self, system: &LinearSystem) -> Result<Vec<f64>, LinearSolveFailure> {
        let n = system.ndof();
        let mut x = vec![0.0; n];
        debug!("linear solve: backend = {:?}, n = {n}", self.backend);
        match self.backend {
            Backend::DirectSparse => {
                let mut solver = LuSolver::new();
                solver.solve(system.matrix(), system.rhs(), &mut x)?;
            }
            Backend::IterativeKrylov => {
                let mut solver =
                    BiCgStabSolver::new(self.atol, self.rtol, self.test, self.max_iters);
                solver.solve(system.matrix(), system.rhs(), &mut x)?;
            }
        }
        Ok(x)
    }
}
