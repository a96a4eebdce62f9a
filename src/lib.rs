//! psitc: Newton / pseudo-transient step control for nonlinear PDE solves
//!
//! This crate provides the per-time-level solve orchestration for coupled
//! PDE systems: a residual/convergence evaluator, a uniform adapter over
//! direct and Krylov linear backends, a Newton solver with line search and
//! Eisenstat–Walker forcing, and a step controller that marches either
//! plain Newton or pseudo-transient continuation (PsiTC) to a residual
//! tolerance. Mesh, discretization, and coefficient evaluation stay behind
//! the `NonlinearProblem` trait.

pub mod config;
pub mod core;
pub mod error;
pub mod linear;
pub mod nonlinear;
pub mod stepping;
pub mod utils;

// Re-exports for convenience
pub use crate::config::*;
pub use crate::core::*;
pub use crate::error::*;
pub use crate::linear::*;
pub use crate::nonlinear::*;
pub use crate::stepping::*;
pub use crate::utils::*;

// Re-export SolveStats at the crate root for convenience
pub use crate::utils::convergence::SolveStats;
