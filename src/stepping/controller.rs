//! Per-time-level orchestration: plain Newton or PsiTC marching.

use log::{debug, info};

use crate::config::{SolverConfig, StepControl};
use crate::error::{PseudoTimeFailure, SolveFailure};
use crate::nonlinear::{NewtonSolver, NonlinearProblem};
use crate::stepping::pseudo_time::{PseudoTimeResidual, PseudoTimeState};
use crate::utils::convergence::ResidualRecord;

// A pseudo-step whose physical residual does not drop below this fraction
// of the previous one counts as stagnating (or diverging) and pulls the
// pseudo-step back to its starting size instead of growing it.
const REDUCE_TRIGGER: f64 = 0.99;

/// Controller state for the current physical time level. `Converged` and
/// `Failed` are terminal; the time-stepping driver calls
/// [`StepController::begin_level`] before the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    NewtonAdvance,
    PseudoTimeAdvance,
    Converged,
    Failed,
}

/// What one time level cost.
#[derive(Debug, Clone, Copy)]
pub struct LevelStats {
    /// Pseudo-steps taken (0 in plain-Newton mode).
    pub pseudo_steps: usize,
    /// Total Newton corrections across the level.
    pub newton_iterations: usize,
    /// Physical residual norm at exit.
    pub final_residual: f64,
}

pub struct StepController<'a> {
    cfg: &'a SolverConfig,
    state: ControllerState,
    pseudo: PseudoTimeState,
}

impl<'a> StepController<'a> {
    /// The mode (plain Newton vs PsiTC) is fixed here, by configuration,
    /// and never toggled mid-solve.
    pub fn new(cfg: &'a SolverConfig) -> Self {
        Self {
            cfg,
            state: ControllerState::Idle,
            pseudo: PseudoTimeState::new(1.0, cfg.psitc.start_ratio),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Pseudo-time step size, for observability in PsiTC mode.
    pub fn dtau(&self) -> f64 {
        self.pseudo.dtau
    }

    /// Arm the controller for the next physical time level. `dtau0` seeds
    /// the pseudo-time step (typically CFL-derived by the driver); plain
    /// Newton mode ignores it.
    pub fn begin_level(&mut self, dtau0: f64) {
        self.state = ControllerState::Idle;
        self.pseudo = PseudoTimeState::new(dtau0, self.cfg.psitc.start_ratio);
    }

    /// Advance `u` through one physical time level, leaving the controller
    /// in a terminal state. On failure `u` is untouched: the last-converged
    /// state is what the driver retries from.
    pub fn advance<P: NonlinearProblem>(
        &mut self,
        problem: &P,
        u: &mut [f64],
    ) -> Result<LevelStats, SolveFailure> {
        assert_eq!(
            self.state,
            ControllerState::Idle,
            "advance() requires begin_level() after a terminal state"
        );
        match self.cfg.step_control {
            StepControl::Newton => self.newton_advance(problem, u),
            StepControl::PsiTC => self.pseudo_time_advance(problem, u),
        }
    }

    fn newton_advance<P: NonlinearProblem>(
        &mut self,
        problem: &P,
        u: &mut [f64],
    ) -> Result<LevelStats, SolveFailure> {
        self.state = ControllerState::NewtonAdvance;
        let mut newton = NewtonSolver::new(self.cfg);
        match newton.solve(problem, u) {
            Ok(stats) => {
                self.state = ControllerState::Converged;
                info!(
                    "newton advance converged: {} its, |F| = {:.3e}",
                    stats.iterations, stats.final_residual
                );
                Ok(LevelStats {
                    pseudo_steps: 0,
                    newton_iterations: stats.iterations,
                    final_residual: stats.final_residual,
                })
            }
            Err(err) => {
                self.state = ControllerState::Failed;
                Err(err)
            }
        }
    }

    fn pseudo_time_advance<P: NonlinearProblem>(
        &mut self,
        problem: &P,
        u: &mut [f64],
    ) -> Result<LevelStats, SolveFailure> {
        self.state = ControllerState::PseudoTimeAdvance;
        let psitc = self.cfg.psitc;
        let nc = problem.num_components();
        assert_eq!(
            nc,
            self.cfg.num_components(),
            "per-component tolerances must match the problem"
        );

        let mut u_work = u.to_vec();
        let mut newton = NewtonSolver::new(self.cfg);
        let mut r = vec![0.0; problem.ndof()];

        problem.residual(&u_work, &mut r);
        let record0 = ResidualRecord::from_residual(&r, nc);
        if record0.all_converged(&record0, &self.cfg.atol_res, &self.cfg.rtol_res) {
            self.state = ControllerState::Converged;
            return Ok(LevelStats {
                pseudo_steps: 0,
                newton_iterations: 0,
                final_residual: record0.total(),
            });
        }

        let mut prev_total = record0.total();
        let mut newton_its = 0;
        loop {
            if self.pseudo.steps_taken >= psitc.n_steps_max {
                self.state = ControllerState::Failed;
                return Err(PseudoTimeFailure::StepCapExceeded {
                    steps: self.pseudo.steps_taken,
                    residual: prev_total,
                }
                .into());
            }

            // one bounded Newton solve against the pseudo-time residual;
            // an unconverged correction keeps marching, linear failures abort
            let frozen = PseudoTimeResidual::new(problem, u_work.clone(), self.pseudo.dtau);
            let stats = newton
                .correct(&frozen, &mut u_work, self.cfg.max_nonlinear_its)
                .map_err(|err| {
                    self.state = ControllerState::Failed;
                    err
                })?;
            newton_its += stats.iterations;

            problem.residual(&u_work, &mut r);
            let record = ResidualRecord::from_residual(&r, nc);
            let total = record.total();
            self.pseudo.steps_taken += 1;
            self.pseudo.steps_since_force += 1;
            debug!(
                "psitc step {}: dtau = {:.3e}, |F| = {total:.3e}",
                self.pseudo.steps_taken, self.pseudo.dtau
            );

            if record.all_converged(&record0, &self.cfg.atol_res, &self.cfg.rtol_res) {
                self.state = ControllerState::Converged;
                info!(
                    "psitc converged in {} pseudo-steps, |F| = {total:.3e}",
                    self.pseudo.steps_taken
                );
                u.copy_from_slice(&u_work);
                return Ok(LevelStats {
                    pseudo_steps: self.pseudo.steps_taken,
                    newton_iterations: newton_its,
                    final_residual: total,
                });
            }

            // step-size policy: periodic forcing wins, then the
            // stagnation/divergence pullback, then growth
            if self.pseudo.steps_since_force >= psitc.n_steps_force {
                self.pseudo.force_reset(psitc.start_ratio);
            } else if total >= REDUCE_TRIGGER * prev_total {
                self.pseudo.force_reset(psitc.start_ratio);
            } else {
                self.pseudo.grow(psitc.reduce_ratio);
            }
            prev_total = total;
        }
    }
}
