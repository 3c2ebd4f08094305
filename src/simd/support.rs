//! Capability detection and the accelerated-backend support gate.

use std::sync::OnceLock;

use serde::Serialize;

use super::LaneVector;
use crate::domain::FitSettings;

/// SIMD capability detected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimdLevel {
    /// AVX2 available (`x86_64` only).
    Avx2,
    /// Scalar fallback.
    Scalar,
}

/// Detected once at first use.
static SIMD_LEVEL: OnceLock<SimdLevel> = OnceLock::new();

fn detect_simd_level() -> SimdLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return SimdLevel::Avx2;
        }
    }
    SimdLevel::Scalar
}

/// Cached SIMD capability level.
#[inline]
pub fn simd_level() -> SimdLevel {
    *SIMD_LEVEL.get_or_init(detect_simd_level)
}

/// `true` when the CPU can run the accelerated kernel.
#[inline]
pub fn hardware_accelerated() -> bool {
    simd_level() == SimdLevel::Avx2
}

/// Whether `point_count` fits a vector of `capacity` lanes, allowing the
/// dataset to overshoot by `truncate_ratio` (surplus points get dropped).
pub fn within_capacity(point_count: usize, capacity: usize, truncate_ratio: f64) -> bool {
    point_count as f64 <= capacity as f64 * (1.0 + truncate_ratio)
}

/// Can vectors of type `V` hold a dataset of `point_count` points?
///
/// For accelerated vectors this is `false` whenever the backend is switched
/// off in `settings` or the hardware lacks AVX2.
pub fn check_support<V: LaneVector>(point_count: usize, settings: &FitSettings) -> bool {
    if V::is_accelerated() && !settings.simd_enabled {
        return false;
    }
    if !V::is_supported() {
        return false;
    }
    within_capacity(point_count, V::capacity(), settings.truncate_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::{AcceleratedVector, PortableVector};

    #[test]
    fn threshold_is_inclusive() {
        for capacity in [1024usize, 2048] {
            for ratio in [0.0, 0.1, 0.5] {
                let limit = (capacity as f64 * (1.0 + ratio)).floor() as usize;
                assert!(within_capacity(limit, capacity, ratio));
                assert!(!within_capacity(limit + 1, capacity, ratio));
            }
        }
    }

    #[test]
    fn portable_vectors_ignore_the_simd_switch() {
        let mut settings = FitSettings::default();
        settings.simd_enabled = false;
        assert!(check_support::<PortableVector<1024>>(1024, &settings));
        assert!(!check_support::<PortableVector<1024>>(1025, &settings));
    }

    #[test]
    fn accelerated_gate_respects_switch_hardware_and_ratio() {
        let mut settings = FitSettings {
            truncate_ratio: 0.25,
            ..FitSettings::default()
        };
        let hw = hardware_accelerated();
        assert_eq!(check_support::<AcceleratedVector<2048>>(2560, &settings), hw);
        assert!(!check_support::<AcceleratedVector<2048>>(2561, &settings));
        assert_eq!(check_support::<AcceleratedVector<1024>>(1000, &settings), hw);

        settings.simd_enabled = false;
        assert!(!check_support::<AcceleratedVector<1024>>(10, &settings));
    }

    #[test]
    fn detection_is_stable() {
        assert_eq!(simd_level(), simd_level());
    }
}
