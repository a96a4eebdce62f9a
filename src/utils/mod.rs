pub mod convergence;

pub use convergence::{ResidualRecord, ResidualTest, SolveStats};
