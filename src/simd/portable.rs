//! Portable backend: plain elementwise loops, available everywhere.

use super::kernel::{BinaryOp, Kernel};
use crate::error::FitError;

/// Scalar kernel. Its `exp` is the exact `f64::exp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Portable;

impl Kernel for Portable {
    const NAME: &'static str = "portable";
    const ACCELERATED: bool = false;

    fn available() -> bool {
        true
    }

    fn binary(op: BinaryOp, a: &[f64], b: &[f64], out: &mut [f64]) {
        for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
            *o = op.apply(x, y);
        }
    }

    fn binary_scalar(op: BinaryOp, a: &[f64], s: f64, out: &mut [f64]) {
        for (o, &x) in out.iter_mut().zip(a) {
            *o = op.apply(x, s);
        }
    }

    fn scalar_binary(op: BinaryOp, s: f64, a: &[f64], out: &mut [f64]) {
        for (o, &x) in out.iter_mut().zip(a) {
            *o = op.apply(s, x);
        }
    }

    fn sum(a: &[f64]) -> f64 {
        a.iter().sum()
    }

    fn dot(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    fn exp(src: &[f64], out: &mut [f64]) -> Result<(), FitError> {
        for (o, &x) in out.iter_mut().zip(src) {
            *o = x.exp();
        }
        Ok(())
    }
}
