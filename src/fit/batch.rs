//! Parallel fitting of many series over one x-axis.
//!
//! Solvers are not shared: each rayon worker builds its own on first use and
//! [`LevenbergMarquardt::reload`]s it for every further series it picks up.

use rayon::prelude::*;
use tracing::info;

use crate::domain::{FitReport, FitSettings};
use crate::error::FitError;
use crate::models::FitModel;
use crate::simd::LaneVector;

use super::dispatch::{
    Accelerated1024, Accelerated2048, Backend, PortableFallback, select_backend,
};
use super::solver::LevenbergMarquardt;

/// Fit every series in `ys` against `x`, starting each from `initial`.
///
/// Reports come back in input order. The first contract violation (a series
/// of the wrong length, for example) fails the whole batch.
pub fn fit_batch<M, Y>(
    model: &M,
    x: &[f64],
    ys: &[Y],
    initial: &[f64],
    settings: &FitSettings,
) -> Result<(Backend, Vec<FitReport>), FitError>
where
    M: FitModel + Sync,
    Y: AsRef<[f64]> + Sync,
{
    let backend = select_backend(x.len(), settings);
    let reports = match backend {
        Backend::Accelerated1024 => batch_on::<M, Accelerated1024, Y>(model, x, ys, initial, settings),
        Backend::Accelerated2048 => batch_on::<M, Accelerated2048, Y>(model, x, ys, initial, settings),
        Backend::Portable => batch_on::<M, PortableFallback, Y>(model, x, ys, initial, settings),
    }?;
    info!(series = ys.len(), %backend, "batch finished");
    Ok((backend, reports))
}

fn batch_on<M, V, Y>(
    model: &M,
    x: &[f64],
    ys: &[Y],
    initial: &[f64],
    settings: &FitSettings,
) -> Result<Vec<FitReport>, FitError>
where
    M: FitModel + Sync,
    V: LaneVector,
    Y: AsRef<[f64]> + Sync,
{
    ys.par_iter()
        .map_init(
            || None::<LevenbergMarquardt<'_, M, V>>,
            |slot, y| -> Result<FitReport, FitError> {
                let y = y.as_ref();
                if let Some(solver) = slot.as_mut() {
                    solver.reload(y, initial)?;
                    return Ok(solver.fit());
                }
                let solver = slot.insert(LevenbergMarquardt::new(model, x, y, initial, settings)?);
                Ok(solver.fit())
            },
        )
        .collect()
}
