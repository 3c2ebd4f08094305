//! Runtime backend selection.
//!
//! The solver is generic over the vector type, so every backend/capacity pair
//! is a separate monomorphization. [`Backend`] names the instantiations the
//! crate ships and [`select_backend`] picks one through the support gate:
//! the smallest accelerated capacity that holds the dataset, otherwise the
//! portable fallback.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::domain::{BackendChoice, FitReport, FitSettings};
use crate::error::FitError;
use crate::models::FitModel;
use crate::simd::{AcceleratedVector, LaneVector, PORTABLE_CAPACITY, PortableVector, check_support};

use super::solver::LevenbergMarquardt;

pub type Accelerated1024 = AcceleratedVector<1024>;
pub type Accelerated2048 = AcceleratedVector<2048>;
pub type PortableFallback = PortableVector<PORTABLE_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    Accelerated1024,
    Accelerated2048,
    Portable,
}

impl Backend {
    pub fn capacity(self) -> usize {
        match self {
            Backend::Accelerated1024 => Accelerated1024::capacity(),
            Backend::Accelerated2048 => Accelerated2048::capacity(),
            Backend::Portable => PortableFallback::capacity(),
        }
    }

    pub fn is_accelerated(self) -> bool {
        !matches!(self, Backend::Portable)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Backend::Accelerated1024 => "avx2/1024",
            Backend::Accelerated2048 => "avx2/2048",
            Backend::Portable => "portable",
        };
        f.write_str(label)
    }
}

/// Best backend for `points` under `settings`.
///
/// A capacity that holds every point wins over a smaller one that would only
/// pass the gate through `truncate_ratio`.
pub fn select_backend(points: usize, settings: &FitSettings) -> Backend {
    let exact = FitSettings {
        truncate_ratio: 0.0,
        ..settings.clone()
    };
    let backend = accelerated_for(points, &exact)
        .or_else(|| accelerated_for(points, settings))
        .unwrap_or(Backend::Portable);
    debug!(points, %backend, "backend selected");
    backend
}

fn accelerated_for(points: usize, settings: &FitSettings) -> Option<Backend> {
    if check_support::<Accelerated1024>(points, settings) {
        Some(Backend::Accelerated1024)
    } else if check_support::<Accelerated2048>(points, settings) {
        Some(Backend::Accelerated2048)
    } else {
        None
    }
}

/// Resolve a user request into a concrete backend.
///
/// Asking for the accelerated backend when the gate refuses it is an error
/// rather than a silent fallback.
pub fn resolve_backend(
    choice: BackendChoice,
    points: usize,
    settings: &FitSettings,
) -> Result<Backend, FitError> {
    match choice {
        BackendChoice::Auto => Ok(select_backend(points, settings)),
        BackendChoice::Portable => Ok(Backend::Portable),
        BackendChoice::Accelerated => match select_backend(points, settings) {
            Backend::Portable => Err(FitError::Unsupported(
                "accelerated backend unavailable for this dataset",
            )),
            backend => Ok(backend),
        },
    }
}

/// Fit one dataset on `backend`.
pub fn fit_with_backend<M: FitModel>(
    backend: Backend,
    model: &M,
    x: &[f64],
    y: &[f64],
    initial: &[f64],
    settings: &FitSettings,
) -> Result<FitReport, FitError> {
    match backend {
        Backend::Accelerated1024 => fit_on::<M, Accelerated1024>(model, x, y, initial, settings),
        Backend::Accelerated2048 => fit_on::<M, Accelerated2048>(model, x, y, initial, settings),
        Backend::Portable => fit_on::<M, PortableFallback>(model, x, y, initial, settings),
    }
}

/// Fit one dataset on the backend [`select_backend`] picks for it.
pub fn fit_dataset<M: FitModel>(
    model: &M,
    x: &[f64],
    y: &[f64],
    initial: &[f64],
    settings: &FitSettings,
) -> Result<(Backend, FitReport), FitError> {
    let backend = select_backend(x.len(), settings);
    let report = fit_with_backend(backend, model, x, y, initial, settings)?;
    Ok((backend, report))
}

fn fit_on<M: FitModel, V: LaneVector>(
    model: &M,
    x: &[f64],
    y: &[f64],
    initial: &[f64],
    settings: &FitSettings,
) -> Result<FitReport, FitError> {
    let mut solver = LevenbergMarquardt::<M, V>::new(model, x, y, initial, settings)?;
    Ok(solver.fit())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::models::{Linear, predict};
    use crate::simd::hardware_accelerated;

    #[test]
    fn small_datasets_prefer_the_smallest_accelerated_capacity() {
        let settings = FitSettings::default();
        let expected = if hardware_accelerated() {
            Backend::Accelerated1024
        } else {
            Backend::Portable
        };
        assert_eq!(select_backend(500, &settings), expected);
    }

    #[test]
    fn mid_sized_datasets_move_to_the_larger_capacity() {
        let settings = FitSettings::default();
        let expected = if hardware_accelerated() {
            Backend::Accelerated2048
        } else {
            Backend::Portable
        };
        assert_eq!(select_backend(1500, &settings), expected);
        assert_eq!(select_backend(5000, &settings), Backend::Portable);
    }

    #[test]
    fn whole_dataset_capacity_beats_truncation() {
        let settings = FitSettings {
            truncate_ratio: 0.1,
            ..FitSettings::default()
        };
        let x: Vec<f64> = (0..1100).map(|i| i as f64 * 0.001).collect();
        let y = predict(&Linear::new(1.5, -0.5), &[1.5, -0.5], &x);
        let model = Linear::new(0.0, 0.0);

        let (backend, report) = fit_dataset(&model, &x, &y, &[0.0, 0.0], &settings).unwrap();
        assert_eq!(report.points, 1100);
        if hardware_accelerated() {
            assert_eq!(backend, Backend::Accelerated2048);
            // Nothing holds 2100 points, so the ratio lets the larger vector truncate.
            assert_eq!(select_backend(2100, &settings), Backend::Accelerated2048);
        } else {
            assert_eq!(backend, Backend::Portable);
        }
    }

    #[test]
    fn disabled_simd_always_falls_back() {
        let settings = FitSettings {
            simd_enabled: false,
            ..FitSettings::default()
        };
        assert_eq!(select_backend(10, &settings), Backend::Portable);
        assert!(matches!(
            resolve_backend(BackendChoice::Accelerated, 10, &settings),
            Err(FitError::Unsupported(_))
        ));
        assert_eq!(
            resolve_backend(BackendChoice::Portable, 10, &settings).unwrap(),
            Backend::Portable
        );
    }

    #[test]
    fn fit_dataset_reports_the_backend_it_used() {
        let x: Vec<f64> = (0..300).map(|i| i as f64 * 0.01).collect();
        let y = predict(&Linear::new(-2.0, 0.5), &[-2.0, 0.5], &x);
        let model = Linear::new(0.0, 0.0);
        let settings = FitSettings::default();

        let (backend, report) = fit_dataset(&model, &x, &y, &[0.0, 0.0], &settings).unwrap();
        assert_eq!(backend, select_backend(300, &settings));
        assert_eq!(report.points, 300);
        assert_relative_eq!(report.parameters[0], -2.0, epsilon = 1e-8);
        assert_relative_eq!(report.parameters[1], 0.5, epsilon = 1e-8);
    }

    #[test]
    fn capacities_are_exposed() {
        assert_eq!(Backend::Accelerated1024.capacity(), 1024);
        assert_eq!(Backend::Accelerated2048.capacity(), 2048);
        assert_eq!(Backend::Portable.capacity(), PORTABLE_CAPACITY);
        assert!(!Backend::Portable.is_accelerated());
    }
}
