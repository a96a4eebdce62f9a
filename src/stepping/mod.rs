//! Step control: the per-time-level state machine and PsiTC marching.

pub mod controller;
pub mod pseudo_time;

pub use controller::{ControllerState, LevelStats, StepController};
pub use pseudo_time::{PseudoTimeResidual, PseudoTimeState};
