//! Solver configuration surface.
//!
//! This module provides `SolverOptions`, the raw parameter set recognized by
//! the step-control core, and `SolverConfig`, the validated immutable value
//! every component borrows. Backend override precedence (a superLU-style
//! "force direct" flag clobbering the configured Krylov backend) is resolved
//! exactly once in `SolverOptions::build`, never re-derived mid-solve.

use std::str::FromStr;

use crate::error::ConfigError;

/// Time-discretization scheme feeding the residual provider.
///
/// The core does not discretize anything itself; the tag records which
/// residual the black-box provider is expected to hand over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeIntegration {
    /// Steady residual, no time derivative (pairs with plain Newton).
    NoIntegration,
    /// Backward Euler with a fixed physical step.
    #[default]
    BackwardEuler,
    /// Backward Euler with CFL-derived step (pairs with PsiTC marching).
    BackwardEulerCfl,
}

/// Step-controller mode for one physical time level. Fixed at build time,
/// never toggled mid-solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepControl {
    /// Plain Newton iteration to convergence.
    #[default]
    Newton,
    /// Pseudo-transient continuation with adaptive pseudo-step growth.
    PsiTC,
}

/// Named residual convergence test modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvergenceTest {
    /// Relative-iteration-scaled: compare against the first residual of the
    /// current iteration sequence.
    #[default]
    Rits,
    /// Like `Rits`, but the residual is recomputed from scratch (true,
    /// unpreconditioned residual) before testing.
    RitsTrue,
}

impl FromStr for ConvergenceTest {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "rits" => Ok(ConvergenceTest::Rits),
            "rits-true" => Ok(ConvergenceTest::RitsTrue),
            other => Err(ConfigError::UnknownConvergenceTest(other.to_string())),
        }
    }
}

/// Linear solve backend, after override resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Sparse-direct factorization (LU with full pivoting).
    #[default]
    DirectSparse,
    /// Iterative Krylov solve (BiCGStab).
    IterativeKrylov,
}

/// PsiTC tuning with documented defaults.
///
/// `dtau` grows by `reduce_ratio` on every quiet pseudo-step and is pulled
/// back to `start_ratio * dtau0` every `n_steps_force` steps regardless of
/// the residual trend, so runaway growth cannot mask slow convergence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsitcOptions {
    /// Steps between unconditional pseudo-step resets (default 3).
    pub n_steps_force: usize,
    /// Pseudo-step cap per physical time level (default 50).
    pub n_steps_max: usize,
    /// Growth factor applied to `dtau` per quiet step (default 2.0).
    pub reduce_ratio: f64,
    /// Reset target as a multiple of the initial `dtau` (default 1.0).
    pub start_ratio: f64,
}

impl Default for PsitcOptions {
    fn default() -> Self {
        Self {
            n_steps_force: 3,
            n_steps_max: 50,
            reduce_ratio: 2.0,
            start_ratio: 1.0,
        }
    }
}

/// Opaque mesh descriptor consumed by the core.
///
/// Only the characteristic element size `he` is acted on (tolerance
/// scaling); the overlap-layer count is carried through for the partitioned
/// backend and otherwise ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInfo {
    /// Characteristic element size.
    pub he: f64,
    /// Parallel overlap layers in the mesh partitioning.
    pub n_overlap_layers: usize,
}

impl MeshInfo {
    pub fn new(he: f64) -> Self {
        Self { he, n_overlap_layers: 0 }
    }
}

/// Mesh-scaled absolute tolerance: `max(floor, scale * he^p)`.
pub fn scaled_atol(floor: f64, scale: f64, he: f64, p: i32) -> f64 {
    floor.max(scale * he.powi(p))
}

/// Raw, mutable option set. Call [`SolverOptions::build`] to validate and
/// freeze it into a [`SolverConfig`].
#[derive(Debug, Clone)]
pub struct SolverOptions {
    pub time_integration: TimeIntegration,
    pub step_control: StepControl,
    /// Newton iteration cap. With PsiTC this is typically 1: the pseudo-time
    /// marching supplies the outer iteration instead of Newton.
    pub max_nonlinear_its: usize,
    /// Line-search halving cap; 0 accepts the full Newton step.
    pub max_line_searches: usize,
    pub nonlinear_test: ConvergenceTest,
    pub linear_test: ConvergenceTest,
    pub use_eisenstat_walker: bool,
    /// Configured backend, before override resolution.
    pub linear_backend: Backend,
    /// Forces `Backend::DirectSparse` unconditionally when set.
    pub use_superlu: bool,
    pub psitc: PsitcOptions,
    /// Nonlinear absolute residual tolerance.
    pub nl_atol_res: f64,
    /// Nonlinear relative tolerance factor (0 disables the relative test).
    pub tol_fac: f64,
    /// Linear relative tolerance as a fraction of the nonlinear one.
    pub lin_tol_fac: f64,
    /// Linear absolute tolerance; defaults to `lin_tol_fac * nl_atol_res`.
    pub l_atol_res: Option<f64>,
    /// Linear iteration cap for the Krylov backend.
    pub max_linear_its: usize,
    /// Per-component absolute tolerances for the physical residual test.
    pub atol_res: Vec<f64>,
    /// Per-component relative tolerances for the physical residual test.
    pub rtol_res: Vec<f64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            time_integration: TimeIntegration::default(),
            step_control: StepControl::default(),
            max_nonlinear_its: 10,
            max_line_searches: 0,
            nonlinear_test: ConvergenceTest::Rits,
            linear_test: ConvergenceTest::RitsTrue,
            use_eisenstat_walker: false,
            linear_backend: Backend::IterativeKrylov,
            use_superlu: false,
            psitc: PsitcOptions::default(),
            nl_atol_res: 1.0e-8,
            tol_fac: 0.0,
            lin_tol_fac: 0.01,
            l_atol_res: None,
            max_linear_its: 1000,
            atol_res: vec![1.0e-8],
            rtol_res: vec![0.0],
        }
    }
}

impl SolverOptions {
    /// Newton branch of the level-set redistancing setup: no time
    /// integration, 50 Newton iterations, line search disabled, relative
    /// test off, `nl_atol_res = max(1e-10, 0.005 he)`.
    pub fn redistancing_newton(mesh: MeshInfo) -> Self {
        let atol = scaled_atol(1.0e-10, 0.005, mesh.he, 1);
        Self {
            time_integration: TimeIntegration::NoIntegration,
            step_control: StepControl::Newton,
            max_nonlinear_its: 50,
            max_line_searches: 0,
            tol_fac: 0.0,
            lin_tol_fac: 0.01,
            nl_atol_res: atol,
            atol_res: vec![atol],
            rtol_res: vec![0.0],
            ..Self::default()
        }
    }

    /// PsiTC branch of the redistancing setup: CFL-scaled backward Euler,
    /// one Newton correction per pseudo-step, psitc {3, 50, 2.0, 1.0}.
    pub fn redistancing_psitc(mesh: MeshInfo) -> Self {
        let atol = scaled_atol(1.0e-10, 0.005, mesh.he, 1);
        Self {
            time_integration: TimeIntegration::BackwardEulerCfl,
            step_control: StepControl::PsiTC,
            max_nonlinear_its: 1,
            max_line_searches: 0,
            psitc: PsitcOptions::default(),
            tol_fac: 0.0,
            lin_tol_fac: 0.01,
            nl_atol_res: atol,
            atol_res: vec![atol],
            rtol_res: vec![0.0],
            ..Self::default()
        }
    }

    /// Validate and freeze into an immutable [`SolverConfig`].
    ///
    /// This is where `use_superlu` clobbers `linear_backend`, once and for
    /// all; the resolved backend is the only one components ever see.
    pub fn build(self) -> Result<SolverConfig, ConfigError> {
        if self.psitc.reduce_ratio <= 0.0 {
            return Err(ConfigError::NonPositiveRatio("reduceRatio"));
        }
        if self.psitc.start_ratio <= 0.0 {
            return Err(ConfigError::NonPositiveRatio("startRatio"));
        }
        if self.psitc.n_steps_max == 0 {
            return Err(ConfigError::ZeroStepCap);
        }
        if self.atol_res.len() != self.rtol_res.len() {
            return Err(ConfigError::ToleranceComponentMismatch {
                atol: self.atol_res.len(),
                rtol: self.rtol_res.len(),
            });
        }
        let backend = if self.use_superlu {
            Backend::DirectSparse
        } else {
            self.linear_backend
        };
        let l_atol_res = self
            .l_atol_res
            .unwrap_or(self.lin_tol_fac * self.nl_atol_res);
        Ok(SolverConfig {
            time_integration: self.time_integration,
            step_control: self.step_control,
            max_nonlinear_its: self.max_nonlinear_its,
            max_line_searches: self.max_line_searches,
            nonlinear_test: self.nonlinear_test,
            linear_test: self.linear_test,
            use_eisenstat_walker: self.use_eisenstat_walker,
            backend,
            psitc: self.psitc,
            nl_atol_res: self.nl_atol_res,
            tol_fac: self.tol_fac,
            lin_tol_fac: self.lin_tol_fac,
            l_atol_res,
            max_linear_its: self.max_linear_its,
            atol_res: self.atol_res,
            rtol_res: self.rtol_res,
        })
    }
}

/// Validated, immutable configuration. Constructed once per run via
/// [`SolverOptions::build`] and passed by reference into every component.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub time_integration: TimeIntegration,
    pub step_control: StepControl,
    pub max_nonlinear_its: usize,
    pub max_line_searches: usize,
    pub nonlinear_test: ConvergenceTest,
    pub linear_test: ConvergenceTest,
    pub use_eisenstat_walker: bool,
    /// Resolved backend (override precedence already applied).
    pub backend: Backend,
    pub psitc: PsitcOptions,
    pub nl_atol_res: f64,
    pub tol_fac: f64,
    pub lin_tol_fac: f64,
    pub l_atol_res: f64,
    pub max_linear_its: usize,
    pub atol_res: Vec<f64>,
    pub rtol_res: Vec<f64>,
}

impl SolverConfig {
    /// Number of solution components the physical residual test tracks.
    pub fn num_components(&self) -> usize {
        self.atol_res.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superlu_flag_overrides_krylov_backend() {
        let cfg = SolverOptions {
            linear_backend: Backend::IterativeKrylov,
            use_superlu: true,
            ..SolverOptions::default()
        }
        .build()
        .unwrap();
        assert_eq!(cfg.backend, Backend::DirectSparse);
    }

    #[test]
    fn backend_kept_when_no_override() {
        let cfg = SolverOptions {
            linear_backend: Backend::IterativeKrylov,
            use_superlu: false,
            ..SolverOptions::default()
        }
        .build()
        .unwrap();
        assert_eq!(cfg.backend, Backend::IterativeKrylov);
    }

    #[test]
    fn scaled_atol_floor_dominates_fine_mesh() {
        // 0.005 * he beats the floor for any realistic he
        assert!((scaled_atol(1.0e-10, 0.005, 0.01, 1) - 5.0e-5).abs() < 1e-18);
        // he^2 scaling under the floor
        assert_eq!(scaled_atol(1.0e-10, 0.001, 1.0e-5, 2), 1.0e-10);
    }

    #[test]
    fn convergence_test_parses_named_modes() {
        assert_eq!("rits".parse::<ConvergenceTest>().unwrap(), ConvergenceTest::Rits);
        assert_eq!("rits-true".parse::<ConvergenceTest>().unwrap(), ConvergenceTest::RitsTrue);
        assert!("ants".parse::<ConvergenceTest>().is_err());
    }

    #[test]
    fn build_rejects_bad_psitc_ratios() {
        let opts = SolverOptions {
            psitc: PsitcOptions { reduce_ratio: 0.0, ..PsitcOptions::default() },
            ..SolverOptions::default()
        };
        assert!(opts.build().is_err());
    }

    #[test]
    fn default_linear_atol_follows_lin_tol_fac() {
        let cfg = SolverOptions {
            nl_atol_res: 1.0e-6,
            lin_tol_fac: 0.01,
            l_atol_res: None,
            ..SolverOptions::default()
        }
        .build()
        .unwrap();
        assert!((cfg.l_atol_res - 1.0e-8).abs() < 1e-20);
    }
}
