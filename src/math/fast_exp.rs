//! Table-driven `exp` approximation.
//!
//! `exp(x) = 2^(n/2048) * exp(r)` with `n = round(x * 2048 / ln2)` and
//! `|r| <= ln2 / 4096`:
//!
//! - `n` is read straight out of the mantissa bits of `x * 2048/ln2 + 1.5·2^52`;
//!   its low 11 bits index a table of `2^(j/2048)` mantissas, the rest is the
//!   binary exponent
//! - `exp(r)` is replaced by `1 + r + r²/2`
//! - exponent and mantissa are OR-ed together and reinterpreted as an `f64`
//!
//! Relative error stays below 1e-6 (in practice ~1e-12) over
//! `[EXP_MIN_ARG, EXP_MAX_ARG]`. Inputs outside that range are clamped.
//!
//! The table lives in a `LazyLock`: it is written once on first use and only
//! read afterwards, so no further synchronization is needed.

use std::f64::consts::LN_2;
use std::sync::LazyLock;

pub const TABLE_BITS: u32 = 11;
pub const TABLE_SIZE: usize = 1 << TABLE_BITS;

/// Smallest argument whose result is still a normal `f64` (biased exponent 1).
pub const EXP_MIN_ARG: f64 = -708.39;
/// Largest argument whose result still has a finite exponent (biased 2046).
pub const EXP_MAX_ARG: f64 = 709.78;

pub(crate) const SCALE: f64 = TABLE_SIZE as f64 / LN_2;
pub(crate) const INV_SCALE: f64 = LN_2 / TABLE_SIZE as f64;
/// `1.5 * 2^52`: adding it rounds to an integer held in the low mantissa bits.
pub(crate) const SHIFT: f64 = 6_755_399_441_055_744.0;
pub(crate) const INDEX_MASK: i64 = TABLE_SIZE as i64 - 1;
/// Exponent bias pre-multiplied by the table size, so `(k + BIAS) >> 11`
/// is the biased exponent.
pub(crate) const SCALED_BIAS: i64 = 1023 << TABLE_BITS;
pub(crate) const C2: f64 = 0.5;

const MANTISSA_MASK: u64 = (1 << 52) - 1;

static EXP_TABLE: LazyLock<[u64; TABLE_SIZE]> = LazyLock::new(|| {
    let mut table = [0u64; TABLE_SIZE];
    for (j, slot) in table.iter_mut().enumerate() {
        *slot = (j as f64 / TABLE_SIZE as f64).exp2().to_bits() & MANTISSA_MASK;
    }
    table
});

/// Mantissa bits of `2^(j/2048)` for `j in 0..2048`.
pub(crate) fn table() -> &'static [u64; TABLE_SIZE] {
    &EXP_TABLE
}

/// Approximate `x.exp()`. NaN propagates; other inputs are clamped to
/// `[EXP_MIN_ARG, EXP_MAX_ARG]`.
#[inline]
pub fn fast_exp(x: f64) -> f64 {
    if x.is_nan() {
        return x;
    }
    let x = x.clamp(EXP_MIN_ARG, EXP_MAX_ARG);

    let t = x * SCALE + SHIFT;
    let k = t.to_bits() as i64 - SHIFT.to_bits() as i64;
    let r = x - (t - SHIFT) * INV_SCALE;

    let mantissa = EXP_TABLE[(k & INDEX_MASK) as usize];
    let exponent = ((k + SCALED_BIAS) >> TABLE_BITS) as u64;
    let scale = f64::from_bits((exponent << 52) | mantissa);

    scale * (1.0 + r * (1.0 + C2 * r))
}

/// Scalar batched variant: `dst[i] = fast_exp(src[i])`.
///
/// # Panics
/// Panics if `src` and `dst` differ in length.
pub fn fast_exp_slice(src: &[f64], dst: &mut [f64]) {
    assert_eq!(src.len(), dst.len(), "fast_exp_slice: length mismatch");
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = fast_exp(s);
    }
}

/// Largest relative error of [`fast_exp`] against `f64::exp` over `samples`
/// evenly spaced points of `[lo, hi]`.
pub fn max_relative_error(lo: f64, hi: f64, samples: usize) -> f64 {
    let samples = samples.max(2);
    let step = (hi - lo) / (samples - 1) as f64;
    (0..samples)
        .map(|i| {
            let x = lo + step * i as f64;
            let exact = x.exp();
            ((fast_exp(x) - exact) / exact).abs()
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_endpoints() {
        let t = table();
        assert_eq!(t[0], 0);
        let last = f64::from_bits((1023u64 << 52) | t[TABLE_SIZE - 1]);
        assert!((last - (2047.0f64 / 2048.0).exp2()).abs() < 1e-15);
    }

    #[test]
    fn exact_at_zero_and_close_at_one() {
        assert_eq!(fast_exp(0.0), 1.0);
        let e = fast_exp(1.0);
        assert!(((e - std::f64::consts::E) / std::f64::consts::E).abs() < 1e-9);
    }

    #[test]
    fn relative_error_below_1e6_over_full_range() {
        let err = max_relative_error(EXP_MIN_ARG, EXP_MAX_ARG, 2_000_003);
        assert!(err < 1e-6, "max relative error {err}");
    }

    #[test]
    fn relative_error_near_zero_is_tiny() {
        let err = max_relative_error(-1.0, 1.0, 100_001);
        assert!(err < 1e-10, "max relative error {err}");
    }

    #[test]
    fn clamps_out_of_range_and_keeps_nan() {
        assert_eq!(fast_exp(-1e6), fast_exp(EXP_MIN_ARG));
        assert_eq!(fast_exp(1e6), fast_exp(EXP_MAX_ARG));
        assert!(fast_exp(1e6).is_finite());
        assert!(fast_exp(-1e6) > 0.0);
        assert!(fast_exp(f64::NAN).is_nan());
    }

    #[test]
    fn slice_matches_scalar() {
        let src: Vec<f64> = (0..37).map(|i| -20.0 + i as f64 * 1.3).collect();
        let mut dst = vec![0.0; src.len()];
        fast_exp_slice(&src, &mut dst);
        for (x, y) in src.iter().zip(&dst) {
            assert_eq!(*y, fast_exp(*x));
        }
    }
}
