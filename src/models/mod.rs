//! Fitting models.
//!
//! [`FitModel`] is the contract the solver consumes; [`library`] holds the
//! built-in curves the binary can fit.

pub mod library;
pub mod model;

pub use library::*;
pub use model::{FitModel, predict};
