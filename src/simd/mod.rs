//! Fixed-capacity SIMD vectors.
//!
//! A vector holds up to `N` `f64` lanes (`N` is a compile-time constant, e.g.
//! 1024 or 2048). Its logical length is chosen per instance and padded up to
//! whole 256-bit registers; padding lanes are kept at zero so reductions can
//! run over full registers.
//!
//! Hot-path arithmetic writes into a caller-supplied destination
//! (`V::sub(&a, &b, &mut dst)`) and never allocates. The `+ - * /` operators
//! on references are a convenience for cold paths and do allocate.
//!
//! Two backends share one storage type:
//!
//! - [`PortableVector`]: elementwise loops, exact `exp`
//! - [`AcceleratedVector`]: AVX2 intrinsics, table-driven `exp`

pub mod avx;
pub mod kernel;
pub mod portable;
pub mod support;
pub mod vector;

pub use avx::Accelerated;
pub use kernel::{BinaryOp, Kernel, LANES, padded_len};
pub use portable::Portable;
pub use support::{SimdLevel, check_support, hardware_accelerated, simd_level, within_capacity};
pub use vector::FixedVector;

use crate::error::FitError;

/// Portable vector of capacity `N`.
pub type PortableVector<const N: usize> = FixedVector<N, Portable>;

/// AVX2 vector of capacity `N`.
pub type AcceleratedVector<const N: usize> = FixedVector<N, Accelerated>;

/// Capacities the accelerated backend is instantiated with.
pub const ACCELERATED_CAPACITIES: [usize; 2] = [1024, 2048];

/// Capacity of the portable fallback used for datasets of any practical size.
pub const PORTABLE_CAPACITY: usize = 1 << 20;

/// The vector contract the LM solver is generic over.
///
/// Elementwise operations panic when operand lengths differ: that is a caller
/// bug, not a recoverable condition.
pub trait LaneVector: Sized + Clone + Send {
    /// Maximum logical length.
    fn capacity() -> usize;

    /// Whether this backend runs on the current machine.
    fn is_supported() -> bool;

    fn is_accelerated() -> bool;

    fn backend_name() -> &'static str;

    /// Copy `values` into a new vector.
    fn from_slice(values: &[f64]) -> Result<Self, FitError>;

    /// `len` lanes set to `value`.
    fn filled(len: usize, value: f64) -> Result<Self, FitError>;

    /// `len` zeroed lanes.
    fn zeros(len: usize) -> Result<Self, FitError> {
        Self::filled(len, 0.0)
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The logical lanes (padding excluded).
    fn as_slice(&self) -> &[f64];

    /// The logical lanes, writable. Padding stays untouched.
    fn as_mut_slice(&mut self) -> &mut [f64];

    /// `dst = a op b`
    fn apply(op: BinaryOp, a: &Self, b: &Self, dst: &mut Self);

    /// `dst = a op s`
    fn apply_scalar(op: BinaryOp, a: &Self, s: f64, dst: &mut Self);

    /// `dst = s op a`
    fn scalar_apply(op: BinaryOp, s: f64, a: &Self, dst: &mut Self);

    /// Sum of the logical lanes.
    fn sum(&self) -> f64;

    /// `Σ a[i] * b[i]`; `LengthMismatch` when lengths differ.
    fn inner_product(a: &Self, b: &Self) -> Result<f64, FitError>;

    /// `dst[i] = exp(src[i])`.
    fn exp(src: &Self, dst: &mut Self) -> Result<(), FitError>;

    fn add(a: &Self, b: &Self, dst: &mut Self) {
        Self::apply(BinaryOp::Add, a, b, dst)
    }

    fn sub(a: &Self, b: &Self, dst: &mut Self) {
        Self::apply(BinaryOp::Sub, a, b, dst)
    }

    fn mul(a: &Self, b: &Self, dst: &mut Self) {
        Self::apply(BinaryOp::Mul, a, b, dst)
    }

    fn div(a: &Self, b: &Self, dst: &mut Self) {
        Self::apply(BinaryOp::Div, a, b, dst)
    }

    fn add_scalar(a: &Self, s: f64, dst: &mut Self) {
        Self::apply_scalar(BinaryOp::Add, a, s, dst)
    }

    fn sub_scalar(a: &Self, s: f64, dst: &mut Self) {
        Self::apply_scalar(BinaryOp::Sub, a, s, dst)
    }

    fn mul_scalar(a: &Self, s: f64, dst: &mut Self) {
        Self::apply_scalar(BinaryOp::Mul, a, s, dst)
    }

    fn div_scalar(a: &Self, s: f64, dst: &mut Self) {
        Self::apply_scalar(BinaryOp::Div, a, s, dst)
    }

    fn scalar_add(s: f64, a: &Self, dst: &mut Self) {
        Self::scalar_apply(BinaryOp::Add, s, a, dst)
    }

    fn scalar_sub(s: f64, a: &Self, dst: &mut Self) {
        Self::scalar_apply(BinaryOp::Sub, s, a, dst)
    }

    fn scalar_mul(s: f64, a: &Self, dst: &mut Self) {
        Self::scalar_apply(BinaryOp::Mul, s, a, dst)
    }

    fn scalar_div(s: f64, a: &Self, dst: &mut Self) {
        Self::scalar_apply(BinaryOp::Div, s, a, dst)
    }
}
