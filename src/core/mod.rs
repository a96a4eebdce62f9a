//! Core traits and the faer/Vec wrappers that satisfy them.

pub mod traits;
pub mod wrappers;

pub use traits::{InnerProduct, MatVec};
