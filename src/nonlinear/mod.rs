//! Nonlinear solve layer: the black-box problem contract and Newton.

use faer::Mat;

pub mod newton;
pub use newton::NewtonSolver;

/// Residual and Jacobian provider for one PDE system.
///
/// The coefficient side (advection-diffusion-reaction, level-set
/// redistancing, momentum) lives entirely behind this trait; the solve
/// stack treats it as a callable and nothing more.
pub trait NonlinearProblem {
    /// Degrees of freedom in the solution vector.
    fn ndof(&self) -> usize;

    /// Evaluate F(u) into `r`.
    fn residual(&self, u: &[f64], r: &mut [f64]);

    /// Assemble the Jacobian dF/du at `u`.
    fn jacobian(&self, u: &[f64]) -> Mat<f64>;

    /// Number of solution components, for per-component residual splits.
    fn num_components(&self) -> usize {
        1
    }
}
