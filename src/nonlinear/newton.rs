//! Newton iteration with optional line search and Eisenstat–Walker forcing.

use log::debug;

use crate::config::SolverConfig;
use crate::core::traits::InnerProduct;
use crate::error::{NonlinearSolveFailure, SolveFailure};
use crate::linear::{LinearAdapter, LinearSystem};
use crate::nonlinear::NonlinearProblem;
use crate::utils::convergence::{ResidualTest, SolveStats};

// Eisenstat–Walker choice 2 constants (gamma, alpha = 2) with the usual
// safeguards against oversolving and against a tolerance looser than 0.9.
const EW_GAMMA: f64 = 0.9;
const EW_ETA_MAX: f64 = 0.9;
const EW_ETA_MIN: f64 = 1.0e-6;
const EW_SAFEGUARD_FLOOR: f64 = 0.1;

pub struct NewtonSolver<'a> {
    cfg: &'a SolverConfig,
    adapter: LinearAdapter,
}

impl<'a> NewtonSolver<'a> {
    pub fn new(cfg: &'a SolverConfig) -> Self {
        let adapter = LinearAdapter::from_config(cfg);
        Self { cfg, adapter }
    }

    /// Newton-to-convergence. Fails with `MaxIterationsExceeded` after
    /// exactly `max_nonlinear_its` corrections; on any failure the caller's
    /// iterate is left untouched (the solver works on an internal copy).
    pub fn solve<P: NonlinearProblem>(
        &mut self,
        problem: &P,
        u: &mut [f64],
    ) -> Result<SolveStats<f64>, SolveFailure> {
        let mut u_work = u.to_vec();
        let stats = self.correct(problem, &mut u_work, self.cfg.max_nonlinear_its)?;
        if !stats.converged {
            return Err(NonlinearSolveFailure::MaxIterationsExceeded {
                iterations: stats.iterations,
                residual: stats.final_residual,
            }
            .into());
        }
        u.copy_from_slice(&u_work);
        Ok(stats)
    }

    /// Apply up to `max_its` Newton corrections in place, reporting rather
    /// than failing when the tolerance is not met. Pseudo-time marching
    /// calls this with `max_its = 1`: the marching supplies the outer
    /// iteration, so an unconverged correction is progress, not an error.
    /// Linear failures and line-search exhaustion still abort.
    pub fn correct<P: NonlinearProblem>(
        &mut self,
        problem: &P,
        u: &mut [f64],
        max_its: usize,
    ) -> Result<SolveStats<f64>, SolveFailure> {
        let n = problem.ndof();
        let ip = ();
        let test = ResidualTest::new(
            self.cfg.nl_atol_res,
            self.cfg.tol_fac,
            self.cfg.nonlinear_test,
        );

        let mut r = vec![0.0; n];
        problem.residual(u, &mut r);
        let mut norm = ip.norm(&r);
        let norm0 = norm;
        let mut prev_norm = norm;
        let mut eta_prev = self.adapter.rtol();

        for k in 0..max_its {
            let (done, stats) = test.check(norm, norm0, k);
            if done {
                return Ok(stats);
            }

            if self.cfg.use_eisenstat_walker && k > 0 {
                let eta = self.forcing_term(norm, prev_norm, eta_prev);
                self.adapter.set_rtol(eta);
                eta_prev = eta;
            }

            let jacobian = problem.jacobian(u);
            let rhs: Vec<f64> = r.iter().map(|ri| -ri).collect();
            let system = LinearSystem::new(jacobian, rhs);
            let correction = self.adapter.solve(&system)?;

            prev_norm = norm;
            norm = self.apply_step(problem, u, &correction, &mut r, norm)?;
            debug!("newton it {}: |F| = {norm:.3e}", k + 1);
        }

        let (_, stats) = test.check(norm, norm0, max_its);
        Ok(stats)
    }

    /// Take the Newton step, backtracking by halves when a line search is
    /// enabled. Returns the residual norm at the accepted iterate.
    fn apply_step<P: NonlinearProblem>(
        &self,
        problem: &P,
        u: &mut [f64],
        correction: &[f64],
        r: &mut Vec<f64>,
        norm: f64,
    ) -> Result<f64, SolveFailure> {
        let ip = ();
        let mut lambda = 1.0;
        let mut attempts = 0;
        loop {
            let u_trial: Vec<f64> = u
                .iter()
                .zip(correction)
                .map(|(ui, di)| ui + lambda * di)
                .collect();
            problem.residual(&u_trial, r);
            let trial_norm = ip.norm(r);

            // max_line_searches == 0 accepts the full step unconditionally
            if self.cfg.max_line_searches == 0 || trial_norm < norm {
                u.copy_from_slice(&u_trial);
                return Ok(trial_norm);
            }
            attempts += 1;
            if attempts > self.cfg.max_line_searches {
                return Err(NonlinearSolveFailure::LineSearchExhausted {
                    attempts: self.cfg.max_line_searches,
                }
                .into());
            }
            lambda *= 0.5;
        }
    }

    fn forcing_term(&self, norm: f64, prev_norm: f64, eta_prev: f64) -> f64 {
        let mut eta = EW_GAMMA * (norm / prev_norm).powi(2);
        let safeguard = EW_GAMMA * eta_prev * eta_prev;
        if safeguard > EW_SAFEGUARD_FLOOR {
            eta = eta.max(safeguard);
        }
        eta.clamp(EW_ETA_MIN, EW_ETA_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Backend, SolverOptions};
    use crate::error::LinearSolveFailure;
    use faer::Mat;

    /// Scalar problem F(u) = u^2 - 2, component-wise.
    struct SqrtTwo {
        n: usize,
    }

    impl NonlinearProblem for SqrtTwo {
        fn ndof(&self) -> usize {
            self.n
        }
        fn residual(&self, u: &[f64], r: &mut [f64]) {
            for (ri, ui) in r.iter_mut().zip(u) {
                *ri = ui * ui - 2.0;
            }
        }
        fn jacobian(&self, u: &[f64]) -> Mat<f64> {
            Mat::from_fn(self.n, self.n, |i, j| if i == j { 2.0 * u[i] } else { 0.0 })
        }
    }

    /// Residual with a Jacobian that is singular everywhere.
    struct Degenerate;

    impl NonlinearProblem for Degenerate {
        fn ndof(&self) -> usize {
            2
        }
        fn residual(&self, _u: &[f64], r: &mut [f64]) {
            r.fill(1.0);
        }
        fn jacobian(&self, _u: &[f64]) -> Mat<f64> {
            Mat::zeros(2, 2)
        }
    }

    fn cfg(max_its: usize) -> SolverConfig {
        SolverOptions {
            max_nonlinear_its: max_its,
            nl_atol_res: 1e-12,
            use_superlu: true,
            ..SolverOptions::default()
        }
        .build()
        .unwrap()
    }

    #[test]
    fn newton_finds_sqrt_two() {
        let cfg = cfg(20);
        let mut solver = NewtonSolver::new(&cfg);
        let mut u = vec![1.0; 4];
        let stats = solver.solve(&SqrtTwo { n: 4 }, &mut u).unwrap();
        assert!(stats.converged);
        for ui in &u {
            assert!((ui - 2.0_f64.sqrt()).abs() < 1e-10);
        }
    }

    #[test]
    fn zero_initial_residual_converges_in_zero_iterations() {
        let cfg = cfg(20);
        let mut solver = NewtonSolver::new(&cfg);
        let root = 2.0_f64.sqrt();
        let mut u = vec![root; 3];
        let stats = solver.solve(&SqrtTwo { n: 3 }, &mut u).unwrap();
        assert!(stats.converged);
        assert_eq!(stats.iterations, 0);
    }

    #[test]
    fn iteration_cap_is_exact() {
        let cfg = SolverOptions {
            max_nonlinear_its: 3,
            nl_atol_res: 1e-30,
            tol_fac: 0.0,
            use_superlu: true,
            ..SolverOptions::default()
        }
        .build()
        .unwrap();
        let mut solver = NewtonSolver::new(&cfg);
        let mut u = vec![1.0; 2];
        let err = solver.solve(&SqrtTwo { n: 2 }, &mut u);
        match err {
            Err(SolveFailure::Nonlinear(NonlinearSolveFailure::MaxIterationsExceeded {
                iterations,
                ..
            })) => assert_eq!(iterations, 3),
            other => panic!("expected MaxIterationsExceeded, got {other:?}"),
        }
        // failed solve leaves the iterate untouched
        assert_eq!(u, vec![1.0; 2]);
    }

    #[test]
    fn singular_jacobian_propagates_linear_failure() {
        let cfg = cfg(5);
        let mut solver = NewtonSolver::new(&cfg);
        let mut u = vec![0.0; 2];
        let err = solver.solve(&Degenerate, &mut u);
        assert!(matches!(
            err,
            Err(SolveFailure::Linear(LinearSolveFailure::Singular))
        ));
    }

    /// F(u) = atan(u): full Newton steps diverge from |u| > ~1.39, the
    /// classic case where damping is mandatory.
    struct Atan;

    impl NonlinearProblem for Atan {
        fn ndof(&self) -> usize {
            1
        }
        fn residual(&self, u: &[f64], r: &mut [f64]) {
            r[0] = u[0].atan();
        }
        fn jacobian(&self, u: &[f64]) -> Mat<f64> {
            Mat::from_fn(1, 1, |_, _| 1.0 / (1.0 + u[0] * u[0]))
        }
    }

    #[test]
    fn line_search_rescues_divergent_full_steps() {
        let cfg = SolverOptions {
            max_nonlinear_its: 100,
            max_line_searches: 20,
            nl_atol_res: 1e-10,
            use_superlu: true,
            ..SolverOptions::default()
        }
        .build()
        .unwrap();
        let mut solver = NewtonSolver::new(&cfg);
        let mut u = vec![10.0];
        let stats = solver.solve(&Atan, &mut u).unwrap();
        assert!(stats.converged);
        assert!(u[0].abs() < 1e-9);
    }

    #[test]
    fn line_search_exhaustion_is_an_error() {
        // From u = 10 the step needs three halvings before the residual
        // drops; a cap of two must fail.
        let cfg = SolverOptions {
            max_nonlinear_its: 100,
            max_line_searches: 2,
            nl_atol_res: 1e-10,
            use_superlu: true,
            ..SolverOptions::default()
        }
        .build()
        .unwrap();
        let mut solver = NewtonSolver::new(&cfg);
        let mut u = vec![10.0];
        let err = solver.solve(&Atan, &mut u);
        assert!(matches!(
            err,
            Err(SolveFailure::Nonlinear(NonlinearSolveFailure::LineSearchExhausted {
                attempts: 2
            }))
        ));
    }

    #[test]
    fn eisenstat_walker_converges_with_krylov_backend() {
        let cfg = SolverOptions {
            max_nonlinear_its: 30,
            nl_atol_res: 1e-10,
            use_eisenstat_walker: true,
            linear_backend: Backend::IterativeKrylov,
            ..SolverOptions::default()
        }
        .build()
        .unwrap();
        let mut solver = NewtonSolver::new(&cfg);
        let mut u = vec![1.0; 4];
        let stats = solver.solve(&SqrtTwo { n: 4 }, &mut u).unwrap();
        assert!(stats.converged);
        for ui in &u {
            assert!((ui - 2.0_f64.sqrt()).abs() < 1e-8);
        }
    }
}
