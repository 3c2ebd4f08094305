//! Storage shared by every backend.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Sub};

use super::kernel::{BinaryOp, Kernel, padded_len};
use super::LaneVector;
use crate::error::FitError;

/// Vector of at most `N` lanes whose passes are executed by kernel `K`.
pub struct FixedVector<const N: usize, K: Kernel> {
    /// Lane storage, `padded_len(len)` long; lanes past `len` are always zero.
    data: Vec<f64>,
    len: usize,
    _kernel: PhantomData<fn() -> K>,
}

impl<const N: usize, K: Kernel> FixedVector<N, K> {
    /// Zeroed vector; `len <= N` is the caller's responsibility.
    fn blank(len: usize) -> Self {
        Self {
            data: vec![0.0; padded_len(len)],
            len,
            _kernel: PhantomData,
        }
    }

    fn check_capacity(len: usize) -> Result<(), FitError> {
        if len > N {
            return Err(FitError::CapacityExceeded {
                requested: len,
                capacity: N,
            });
        }
        Ok(())
    }

    fn clear_padding(&mut self) {
        for lane in &mut self.data[self.len..] {
            *lane = 0.0;
        }
    }

    /// All lanes including padding.
    fn lanes(&self) -> &[f64] {
        &self.data
    }

    fn assert_same_len(&self, other: &Self, what: &str) {
        assert_eq!(
            self.len, other.len,
            "{what}: vector length mismatch ({} vs {})",
            self.len, other.len
        );
    }
}

impl<const N: usize, K: Kernel> LaneVector for FixedVector<N, K> {
    fn capacity() -> usize {
        N
    }

    fn is_supported() -> bool {
        K::available()
    }

    fn is_accelerated() -> bool {
        K::ACCELERATED
    }

    fn backend_name() -> &'static str {
        K::NAME
    }

    fn from_slice(values: &[f64]) -> Result<Self, FitError> {
        Self::check_capacity(values.len())?;
        let mut v = Self::blank(values.len());
        v.data[..values.len()].copy_from_slice(values);
        Ok(v)
    }

    fn filled(len: usize, value: f64) -> Result<Self, FitError> {
        Self::check_capacity(len)?;
        let mut v = Self::blank(len);
        v.data[..len].fill(value);
        Ok(v)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn as_slice(&self) -> &[f64] {
        &self.data[..self.len]
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data[..self.len]
    }

    fn apply(op: BinaryOp, a: &Self, b: &Self, dst: &mut Self) {
        a.assert_same_len(b, "apply");
        a.assert_same_len(dst, "apply");
        K::binary(op, &a.data, &b.data, &mut dst.data);
        dst.clear_padding();
    }

    fn apply_scalar(op: BinaryOp, a: &Self, s: f64, dst: &mut Self) {
        a.assert_same_len(dst, "apply_scalar");
        K::binary_scalar(op, &a.data, s, &mut dst.data);
        dst.clear_padding();
    }

    fn scalar_apply(op: BinaryOp, s: f64, a: &Self, dst: &mut Self) {
        a.assert_same_len(dst, "scalar_apply");
        K::scalar_binary(op, s, &a.data, &mut dst.data);
        dst.clear_padding();
    }

    fn sum(&self) -> f64 {
        K::sum(self.lanes())
    }

    fn inner_product(a: &Self, b: &Self) -> Result<f64, FitError> {
        if a.len != b.len {
            return Err(FitError::LengthMismatch {
                left: a.len,
                right: b.len,
            });
        }
        Ok(K::dot(a.lanes(), b.lanes()))
    }

    fn exp(src: &Self, dst: &mut Self) -> Result<(), FitError> {
        src.assert_same_len(dst, "exp");
        K::exp(&src.data, &mut dst.data)?;
        dst.clear_padding();
        Ok(())
    }
}

impl<const N: usize, K: Kernel> Clone for FixedVector<N, K> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            len: self.len,
            _kernel: PhantomData,
        }
    }
}

impl<const N: usize, K: Kernel> fmt::Debug for FixedVector<N, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedVector")
            .field("backend", &K::NAME)
            .field("capacity", &N)
            .field("len", &self.len)
            .field("lanes", &self.as_slice())
            .finish()
    }
}

impl<const N: usize, K: Kernel> PartialEq for FixedVector<N, K> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

// Allocating operators for cold paths. The solver never uses them.
macro_rules! allocating_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<const N: usize, K: Kernel> $trait<&FixedVector<N, K>> for &FixedVector<N, K> {
            type Output = FixedVector<N, K>;

            fn $method(self, rhs: &FixedVector<N, K>) -> FixedVector<N, K> {
                let mut out = FixedVector::<N, K>::blank(self.len);
                FixedVector::apply($op, self, rhs, &mut out);
                out
            }
        }

        impl<const N: usize, K: Kernel> $trait<f64> for &FixedVector<N, K> {
            type Output = FixedVector<N, K>;

            fn $method(self, rhs: f64) -> FixedVector<N, K> {
                let mut out = FixedVector::<N, K>::blank(self.len);
                FixedVector::apply_scalar($op, self, rhs, &mut out);
                out
            }
        }

        impl<const N: usize, K: Kernel> $trait<&FixedVector<N, K>> for f64 {
            type Output = FixedVector<N, K>;

            fn $method(self, rhs: &FixedVector<N, K>) -> FixedVector<N, K> {
                let mut out = FixedVector::<N, K>::blank(rhs.len);
                FixedVector::scalar_apply($op, self, rhs, &mut out);
                out
            }
        }
    };
}

allocating_op!(Add, add, BinaryOp::Add);
allocating_op!(Sub, sub, BinaryOp::Sub);
allocating_op!(Mul, mul, BinaryOp::Mul);
allocating_op!(Div, div, BinaryOp::Div);
