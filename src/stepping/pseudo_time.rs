//! Pseudo-time state and the pseudo-time-discretized residual.

use faer::Mat;

use crate::nonlinear::NonlinearProblem;

/// Mutable per-level state of the PsiTC marching. Reset at the start of
/// every physical time level; mutated once per controller iteration.
#[derive(Debug, Clone, Copy)]
pub struct PseudoTimeState {
    dtau0: f64,
    pub dtau: f64,
    pub steps_taken: usize,
    pub steps_since_force: usize,
}

impl PseudoTimeState {
    pub fn new(dtau0: f64, start_ratio: f64) -> Self {
        Self {
            dtau0,
            dtau: start_ratio * dtau0,
            steps_taken: 0,
            steps_since_force: 0,
        }
    }

    /// Grow the pseudo-step after a quiet step.
    pub fn grow(&mut self, reduce_ratio: f64) {
        self.dtau *= reduce_ratio;
    }

    /// Pull the pseudo-step back toward its starting size. Used both for
    /// the periodic forcing and for the divergence/stagnation trigger.
    pub fn force_reset(&mut self, start_ratio: f64) {
        self.dtau = start_ratio * self.dtau0;
        self.steps_since_force = 0;
    }
}

/// The residual one PsiTC step solves: `F_tau(u) = (u - u_prev)/dtau + F(u)`,
/// with Jacobian `J(u) + I/dtau`. The artificial mass term freezes `u_prev`
/// for the duration of the step.
pub struct PseudoTimeResidual<'a, P> {
    inner: &'a P,
    u_prev: Vec<f64>,
    dtau: f64,
}

impl<'a, P: NonlinearProblem> PseudoTimeResidual<'a, P> {
    pub fn new(inner: &'a P, u_prev: Vec<f64>, dtau: f64) -> Self {
        Self { inner, u_prev, dtau }
    }
}

impl<P: NonlinearProblem> NonlinearProblem for PseudoTimeResidual<'_, P> {
    fn ndof(&self) -> usize {
        self.inner.ndof()
    }

    fn residual(&self, u: &[f64], r: &mut [f64]) {
        self.inner.residual(u, r);
        for ((ri, ui), pi) in r.iter_mut().zip(u).zip(&self.u_prev) {
            *ri += (ui - pi) / self.dtau;
        }
    }

    fn jacobian(&self, u: &[f64]) -> Mat<f64> {
        let mut j = self.inner.jacobian(u);
        let shift = 1.0 / self.dtau;
        for i in 0..j.nrows() {
            j[(i, i)] += shift;
        }
        j
    }

    fn num_components(&self) -> usize {
        self.inner.num_components()
    }
}
