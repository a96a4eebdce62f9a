use thiserror::Error;

// Failure taxonomy for the solve stack. Linear failures abort the enclosing
// Newton invocation immediately and are never retried internally; nonlinear
// and pseudo-time failures abort the step controller for the current time
// level and are surfaced to the time-stepping driver.

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinearSolveFailure {
    #[error("singular linear system (non-finite solution from factorization)")]
    Singular,
    #[error("linear iteration limit exceeded after {iterations} iterations (residual {residual:.3e})")]
    IterationLimitExceeded { iterations: usize, residual: f64 },
    #[error("breakdown in iterative method: {0}")]
    Breakdown(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NonlinearSolveFailure {
    #[error("nonlinear iteration limit reached after {iterations} iterations (residual {residual:.3e})")]
    MaxIterationsExceeded { iterations: usize, residual: f64 },
    #[error("line search failed to reduce the residual after {attempts} halvings")]
    LineSearchExhausted { attempts: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PseudoTimeFailure {
    #[error("pseudo-time step cap reached after {steps} steps (residual {residual:.3e})")]
    StepCapExceeded { steps: usize, residual: f64 },
}

/// Umbrella error at the step-controller boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveFailure {
    #[error(transparent)]
    Linear(#[from] LinearSolveFailure),
    #[error(transparent)]
    Nonlinear(#[from] NonlinearSolveFailure),
    #[error(transparent)]
    PseudoTime(#[from] PseudoTimeFailure),
}

/// Rejected configuration, reported once at build time rather than mid-solve.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("psitc ratio `{0}` must be positive")]
    NonPositiveRatio(&'static str),
    #[error("psitc step cap must be at least 1")]
    ZeroStepCap,
    #[error("per-component tolerance arrays differ in length ({atol} vs {rtol})")]
    ToleranceComponentMismatch { atol: usize, rtol: usize },
    #[error("unknown convergence test `{0}` (expected `rits` or `rits-true`)")]
    UnknownConvergenceTest(String),
}
