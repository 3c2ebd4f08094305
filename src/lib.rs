//! `lmfit-simd` library crate.
//!
//! A Levenberg–Marquardt curve fitter whose per-point work runs over
//! fixed-capacity SIMD vectors. The binary (`lmfit`) is a thin wrapper around
//! this library so the solver stays testable without spawning processes.
//!
//! - [`simd`]: lane vectors (portable and AVX2) and the support gate
//! - [`math`]: fast table-driven `exp` and the in-place linear solve
//! - [`models`]: the model contract and built-in curves
//! - [`fit`]: the generic solver, backend dispatch, batch fitting

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod report;
pub mod simd;

pub use domain::{FitReport, FitSettings, Termination};
pub use error::FitError;
pub use fit::{LevenbergMarquardt, fit_batch, fit_dataset};
pub use models::FitModel;
