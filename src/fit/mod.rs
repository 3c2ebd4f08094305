//! Curve fitting.
//!
//! - [`solver`]: the generic Levenberg–Marquardt loop
//! - [`dispatch`]: pick a vector backend for a dataset at runtime
//! - [`batch`]: fit many series in parallel

pub mod batch;
pub mod dispatch;
pub mod solver;

pub use batch::fit_batch;
pub use dispatch::{Backend, fit_dataset, fit_with_backend, resolve_backend, select_backend};
pub use solver::{LAMBDA_FLOOR, LevenbergMarquardt};
