//! Backend override precedence and adapter behavior across backends.

use faer::Mat;
use psitc::config::{Backend, ConvergenceTest, SolverOptions};
use psitc::linear::{LinearAdapter, LinearSystem};

fn spd_system(n: usize) -> LinearSystem {
    let a = Mat::from_fn(n, n, |i, j| {
        if i == j {
            4.0
        } else if i.abs_diff(j) == 1 {
            -1.0
        } else {
            0.0
        }
    });
    let b = (0..n).map(|i| 1.0 + i as f64).collect();
    LinearSystem::new(a, b)
}

#[test]
fn use_superlu_overrides_configured_krylov_backend() {
    let cfg = SolverOptions {
        linear_backend: Backend::IterativeKrylov,
        use_superlu: true,
        ..SolverOptions::default()
    }
    .build()
    .unwrap();
    assert_eq!(cfg.backend, Backend::DirectSparse);
    let adapter = LinearAdapter::from_config(&cfg);
    assert_eq!(adapter.backend(), Backend::DirectSparse);
}

#[test]
fn configured_backend_survives_without_override() {
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
fn convergence_test_names_parse_like_the_config_surface() {
    let nonlinear: ConvergenceTest = "rits".parse().unwrap();
    let linear: ConvergenceTest = "rits-true".parse().unwrap();
    let cfg = SolverOptions {
        nonlinear_test: nonlinear,
        linear_test: linear,
        ..SolverOptions::default()
    }
    .build()
    .unwrap();
    assert_eq!(cfg.nonlinear_test, ConvergenceTest::Rits);
    assert_eq!(cfg.linear_test, ConvergenceTest::RitsTrue);
}

#[test]
fn both_backends_solve_the_same_system_identically() {
    let sys = spd_system(12);
    let direct = LinearAdapter::from_config(
        &SolverOptions { use_superlu: true, ..SolverOptions::default() }
            .build()
            .unwrap(),
    );
    let krylov = LinearAdapter::from_config(
        &SolverOptions {
            linear_backend: Backend::IterativeKrylov,
            l_atol_res: Some(1e-12),
            lin_tol_fac: 1e-12,
            ..SolverOptions::default()
        }
        .build()
        .unwrap(),
    );
    let xd = direct.solve(&sys).unwrap();
    let xk = krylov.solve(&sys).unwrap();
    for (a, b) in xd.iter().zip(&xk) {
        assert!((a - b).abs() < 1e-8, "direct {a} vs krylov {b}");
    }
}
