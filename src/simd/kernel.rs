//! Lane kernels: the slice-level arithmetic behind every vector backend.
//!
//! A kernel works on equally sized, lane-padded slices and never allocates.
//! [`crate::simd::FixedVector`] owns the storage and the length checks; the
//! kernel only decides *how* a pass over the lanes is executed.

use crate::error::FitError;

/// Lanes in one 256-bit register of `f64`.
pub const LANES: usize = 4;

/// Round `len` up to a whole number of registers.
#[inline]
pub const fn padded_len(len: usize) -> usize {
    len.div_ceil(LANES) * LANES
}

/// Elementwise arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    #[inline(always)]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }
}

/// Backend executing lane passes.
///
/// Implementations may assume all slices passed to one call have the same
/// length; the vector layer asserts it before calling.
pub trait Kernel: Send + Sync + 'static {
    const NAME: &'static str;
    /// `true` for hardware-backed kernels.
    const ACCELERATED: bool;

    /// Whether the kernel can run its accelerated path on this machine.
    fn available() -> bool;

    /// `out[i] = a[i] op b[i]`
    fn binary(op: BinaryOp, a: &[f64], b: &[f64], out: &mut [f64]);

    /// `out[i] = a[i] op s`
    fn binary_scalar(op: BinaryOp, a: &[f64], s: f64, out: &mut [f64]);

    /// `out[i] = s op a[i]`
    fn scalar_binary(op: BinaryOp, s: f64, a: &[f64], out: &mut [f64]);

    fn sum(a: &[f64]) -> f64;

    fn dot(a: &[f64], b: &[f64]) -> f64;

    /// `out[i] = exp(src[i])`
    fn exp(src: &[f64], out: &mut [f64]) -> Result<(), FitError>;
}
