//! Steady 1D advection-diffusion with a quadratic reaction term, advanced
//! once by plain Newton and once by PsiTC marching.
//!
//!   -eps u'' + a u' + u^2 = f   on (0, 1),  u(0) = u(1) = 0
//!
//! Run with RUST_LOG=debug to watch the iteration and pseudo-step traces.

use faer::Mat;
use psitc::config::{MeshInfo, SolverOptions};
use psitc::nonlinear::NonlinearProblem;
use psitc::stepping::StepController;

struct AdrProblem {
    n: usize,
    h: f64,
    eps: f64,
    a: f64,
    f: Vec<f64>,
}

impl AdrProblem {
    fn new(n: usize) -> Self {
        let h = 1.0 / (n + 1) as f64;
        // manufactured forcing for u*(x) = sin(pi x)
        let eps = 0.1;
        let a = 1.0;
        let pi = std::f64::consts::PI;
        let f = (1..=n)
            .map(|i| {
                let x = i as f64 * h;
                let u = (pi * x).sin();
                eps * pi * pi * u + a * pi * (pi * x).cos() + u * u
            })
            .collect();
        Self { n, h, eps, a, f }
    }
}

impl NonlinearProblem for AdrProblem {
    fn ndof(&self) -> usize {
        self.n
    }

    fn residual(&self, u: &[f64], r: &mut [f64]) {
        let (h, eps, a) = (self.h, self.eps, self.a);
        for i in 0..self.n {
            let um = if i > 0 { u[i - 1] } else { 0.0 };
            let up = if i + 1 < self.n { u[i + 1] } else { 0.0 };
            let diffusion = -eps * (up - 2.0 * u[i] + um) / (h * h);
            let advection = a * (up - um) / (2.0 * h);
            r[i] = diffusion + advection + u[i] * u[i] - self.f[i];
        }
    }

    fn jacobian(&self, u: &[f64]) -> Mat<f64> {
        let (h, eps, a) = (self.h, self.eps, self.a);
        Mat::from_fn(self.n, self.n, |i, j| {
            if i == j {
                2.0 * eps / (h * h) + 2.0 * u[i]
            } else if j + 1 == i {
                -eps / (h * h) - a / (2.0 * h)
            } else if j == i + 1 {
                -eps / (h * h) + a / (2.0 * h)
            } else {
                0.0
            }
        })
    }
}

fn main() {
    env_logger::init();
    let mesh = MeshInfo::new(1.0 / 65.0);
    let problem = AdrProblem::new(64);

    let newton_cfg = SolverOptions::redistancing_newton(mesh).build().unwrap();
    let mut controller = StepController::new(&newton_cfg);
    controller.begin_level(1.0);
    let mut u = vec![0.0; 64];
    let stats = controller.advance(&problem, &mut u).unwrap();
    println!(
        "newton: {} its, |F| = {:.3e}",
        stats.newton_iterations, stats.final_residual
    );

    let psitc_cfg = SolverOptions::redistancing_psitc(mesh).build().unwrap();
    let mut controller = StepController::new(&psitc_cfg);
    controller.begin_level(0.5);
    let mut u = vec![0.0; 64];
    let stats = controller.advance(&problem, &mut u).unwrap();
    println!(
        "psitc: {} pseudo-steps, {} newton its, |F| = {:.3e}",
        stats.pseudo_steps, stats.newton_iterations, stats.final_residual
    );
}
