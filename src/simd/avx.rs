//! Accelerated backend: 256-bit AVX2 registers (4 x f64 per register).
//!
//! Every entry point checks [`Accelerated::available`] (runtime detection,
//! cached) and falls back to the portable loops when AVX2 is missing, except
//! `exp`, which needs the AVX2 gather and reports `Unsupported` instead.
//!
//! # Safety
//!
//! The intrinsics live in the private `x86` module behind
//! `#[target_feature(enable = "avx2")]`. They are only reached after runtime
//! detection succeeded, and every load/store is bounds-checked by the loop
//! condition `i + LANES <= len` on equally sized slices.

use super::kernel::{BinaryOp, Kernel};
use super::portable::Portable;
use super::support;
use crate::error::FitError;

/// AVX2 kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accelerated;

impl Kernel for Accelerated {
    const NAME: &'static str = "avx2";
    const ACCELERATED: bool = true;

    fn available() -> bool {
        support::hardware_accelerated()
    }

    fn binary(op: BinaryOp, a: &[f64], b: &[f64], out: &mut [f64]) {
        #[cfg(target_arch = "x86_64")]
        if Self::available() {
            // SAFETY: AVX2 detected at runtime.
            unsafe {
                match op {
                    BinaryOp::Add => x86::add(a, b, out),
                    BinaryOp::Sub => x86::sub(a, b, out),
                    BinaryOp::Mul => x86::mul(a, b, out),
                    BinaryOp::Div => x86::div(a, b, out),
                }
            }
            return;
        }
        Portable::binary(op, a, b, out);
    }

    fn binary_scalar(op: BinaryOp, a: &[f64], s: f64, out: &mut [f64]) {
        #[cfg(target_arch = "x86_64")]
        if Self::available() {
            // SAFETY: AVX2 detected at runtime.
            unsafe {
                match op {
                    BinaryOp::Add => x86::add_scalar(a, s, out),
                    BinaryOp::Sub => x86::sub_scalar(a, s, out),
                    BinaryOp::Mul => x86::mul_scalar(a, s, out),
                    BinaryOp::Div => x86::div_scalar(a, s, out),
                }
            }
            return;
        }
        Portable::binary_scalar(op, a, s, out);
    }

    fn scalar_binary(op: BinaryOp, s: f64, a: &[f64], out: &mut [f64]) {
        #[cfg(target_arch = "x86_64")]
        if Self::available() {
            // SAFETY: AVX2 detected at runtime.
            unsafe {
                match op {
                    BinaryOp::Add => x86::scalar_add(s, a, out),
                    BinaryOp::Sub => x86::scalar_sub(s, a, out),
                    BinaryOp::Mul => x86::scalar_mul(s, a, out),
                    BinaryOp::Div => x86::scalar_div(s, a, out),
                }
            }
            return;
        }
        Portable::scalar_binary(op, s, a, out);
    }

    fn sum(a: &[f64]) -> f64 {
        #[cfg(target_arch = "x86_64")]
        if Self::available() {
            // SAFETY: AVX2 detected at runtime.
            return unsafe { x86::sum(a) };
        }
        Portable::sum(a)
    }

    fn dot(a: &[f64], b: &[f64]) -> f64 {
        #[cfg(target_arch = "x86_64")]
        if Self::available() {
            // SAFETY: AVX2 detected at runtime.
            return unsafe { x86::dot(a, b) };
        }
        Portable::dot(a, b)
    }

    fn exp(src: &[f64], out: &mut [f64]) -> Result<(), FitError> {
        #[cfg(target_arch = "x86_64")]
        if Self::available() {
            // SAFETY: AVX2 detected at runtime.
            unsafe { x86::exp(src, out) };
            return Ok(());
        }
        let _ = (src, out);
        Err(FitError::Unsupported("accelerated exp requires AVX2"))
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;

    use super::super::kernel::LANES;
    use crate::math::fast_exp::{
        self, C2, EXP_MAX_ARG, EXP_MIN_ARG, INDEX_MASK, INV_SCALE, SCALE, SCALED_BIAS, SHIFT,
        TABLE_BITS,
    };

    macro_rules! lanewise {
        ($vv:ident, $vs:ident, $sv:ident, $intrinsic:ident, $op:tt) => {
            #[target_feature(enable = "avx2")]
            pub(super) unsafe fn $vv(a: &[f64], b: &[f64], out: &mut [f64]) {
                let len = out.len();
                let mut i = 0;
                while i + LANES <= len {
                    unsafe {
                        let va = _mm256_loadu_pd(a.as_ptr().add(i));
                        let vb = _mm256_loadu_pd(b.as_ptr().add(i));
                        _mm256_storeu_pd(out.as_mut_ptr().add(i), $intrinsic(va, vb));
                    }
                    i += LANES;
                }
                for ((o, &x), &y) in out[i..].iter_mut().zip(&a[i..]).zip(&b[i..]) {
                    *o = x $op y;
                }
            }

            #[target_feature(enable = "avx2")]
            pub(super) unsafe fn $vs(a: &[f64], s: f64, out: &mut [f64]) {
                let len = out.len();
                let mut i = 0;
                unsafe {
                    let vs = _mm256_set1_pd(s);
                    while i + LANES <= len {
                        let va = _mm256_loadu_pd(a.as_ptr().add(i));
                        _mm256_storeu_pd(out.as_mut_ptr().add(i), $intrinsic(va, vs));
                        i += LANES;
                    }
                }
                for (o, &x) in out[i..].iter_mut().zip(&a[i..]) {
                    *o = x $op s;
                }
            }

            #[target_feature(enable = "avx2")]
            pub(super) unsafe fn $sv(s: f64, a: &[f64], out: &mut [f64]) {
                let len = out.len();
                let mut i = 0;
                unsafe {
                    let vs = _mm256_set1_pd(s);
                    while i + LANES <= len {
                        let va = _mm256_loadu_pd(a.as_ptr().add(i));
                        _mm256_storeu_pd(out.as_mut_ptr().add(i), $intrinsic(vs, va));
                        i += LANES;
                    }
                }
                for (o, &x) in out[i..].iter_mut().zip(&a[i..]) {
                    *o = s $op x;
                }
            }
        };
    }

    lanewise!(add, add_scalar, scalar_add, _mm256_add_pd, +);
    lanewise!(sub, sub_scalar, scalar_sub, _mm256_sub_pd, -);
    lanewise!(mul, mul_scalar, scalar_mul, _mm256_mul_pd, *);
    lanewise!(div, div_scalar, scalar_div, _mm256_div_pd, /);

    #[inline]
    #[target_feature(enable = "avx2")]
    unsafe fn horizontal_sum(v: __m256d) -> f64 {
        let lo = _mm256_castpd256_pd128(v);
        let hi = _mm256_extractf128_pd::<1>(v);
        let pair = _mm_add_pd(lo, hi);
        let high = _mm_unpackhi_pd(pair, pair);
        _mm_cvtsd_f64(_mm_add_sd(pair, high))
    }

    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn sum(a: &[f64]) -> f64 {
        let len = a.len();
        let mut i = 0;
        let mut total = unsafe {
            let mut acc = _mm256_setzero_pd();
            while i + LANES <= len {
                acc = _mm256_add_pd(acc, _mm256_loadu_pd(a.as_ptr().add(i)));
                i += LANES;
            }
            horizontal_sum(acc)
        };
        for &x in &a[i..] {
            total += x;
        }
        total
    }

    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn dot(a: &[f64], b: &[f64]) -> f64 {
        let len = a.len().min(b.len());
        let mut i = 0;
        let mut total = unsafe {
            let mut acc = _mm256_setzero_pd();
            while i + LANES <= len {
                let va = _mm256_loadu_pd(a.as_ptr().add(i));
                let vb = _mm256_loadu_pd(b.as_ptr().add(i));
                acc = _mm256_add_pd(acc, _mm256_mul_pd(va, vb));
                i += LANES;
            }
            horizontal_sum(acc)
        };
        for (&x, &y) in a[i..len].iter().zip(&b[i..len]) {
            total += x * y;
        }
        total
    }

    /// Four-lane version of [`fast_exp::fast_exp`], same constants and table.
    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn exp(src: &[f64], out: &mut [f64]) {
        let len = out.len();
        let table = fast_exp::table().as_ptr() as *const i64;
        let mut i = 0;
        unsafe {
            let lo = _mm256_set1_pd(EXP_MIN_ARG);
            let hi = _mm256_set1_pd(EXP_MAX_ARG);
            let scale = _mm256_set1_pd(SCALE);
            let inv_scale = _mm256_set1_pd(INV_SCALE);
            let shift = _mm256_set1_pd(SHIFT);
            let shift_bits = _mm256_castpd_si256(shift);
            let index_mask = _mm256_set1_epi64x(INDEX_MASK);
            let bias = _mm256_set1_epi64x(SCALED_BIAS);
            let one = _mm256_set1_pd(1.0);
            let c2 = _mm256_set1_pd(C2);

            while i + LANES <= len {
                let x = _mm256_loadu_pd(src.as_ptr().add(i));
                // max/min return their second operand when it is NaN, so NaN lanes survive.
                let x = _mm256_min_pd(hi, _mm256_max_pd(lo, x));

                let t = _mm256_add_pd(_mm256_mul_pd(x, scale), shift);
                let k = _mm256_sub_epi64(_mm256_castpd_si256(t), shift_bits);
                let r = _mm256_sub_pd(x, _mm256_mul_pd(_mm256_sub_pd(t, shift), inv_scale));

                let index = _mm256_and_si256(k, index_mask);
                let mantissa = _mm256_i64gather_epi64::<8>(table, index);
                // k + bias >= 0 after clamping, so a logical shift floors correctly.
                let exponent = _mm256_slli_epi64::<52>(_mm256_srli_epi64::<{ TABLE_BITS as i32 }>(
                    _mm256_add_epi64(k, bias),
                ));
                let pow2 = _mm256_castsi256_pd(_mm256_or_si256(exponent, mantissa));

                let poly = _mm256_add_pd(one, _mm256_mul_pd(r, _mm256_add_pd(one, _mm256_mul_pd(c2, r))));
                _mm256_storeu_pd(out.as_mut_ptr().add(i), _mm256_mul_pd(pow2, poly));
                i += LANES;
            }
        }
        for (o, &x) in out[i..].iter_mut().zip(&src[i..]) {
            *o = fast_exp::fast_exp(x);
        }
    }
}
