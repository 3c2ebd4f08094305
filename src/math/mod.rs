//! Numerical building blocks: the fast exponential and the in-place linear solve.

pub mod fast_exp;
pub mod gauss;

pub use fast_exp::{EXP_MAX_ARG, EXP_MIN_ARG, fast_exp, fast_exp_slice};
pub use gauss::solve_in_place;
