//! Configuration types for the step-control core.

pub mod options;
pub use options::{
    Backend, ConvergenceTest, MeshInfo, PsitcOptions, SolverConfig, SolverOptions, StepControl,
    TimeIntegration, scaled_atol,
};
