//! Levenberg–Marquardt over fixed-capacity lane vectors.
//!
//! One pass of [`LevenbergMarquardt::fit`]:
//!
//! 1. evaluate the model at every `x` and form `chi2 = Σ (y - est)²`
//! 2. transpose the per-point derivative rows into one vector per parameter
//! 3. build the damped Hessian `H[r,c] = Σ d_r·d_c` (diagonal × `1 + λ`) and
//!    the gradient `g[r] = Σ (y - est)·d_r`
//! 4. solve `H·Δ = g` in place and re-evaluate chi2 at `parameters + Δ`
//! 5. accept (λ ÷ 10) or reject (λ × 10), then project every parameter onto
//!    its constraint
//!
//! The loop stops once the pass counter exceeds `max_iterations` or
//! `|chi2 - trial_chi2|` drops below `min_delta_chi2`. A non-finite trial
//! chi2 aborts immediately and keeps the last accepted parameters.
//!
//! Every buffer is allocated in [`LevenbergMarquardt::new`]; a pass performs
//! no heap allocation unless tracing is enabled.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, trace, warn};

use crate::domain::{FitReport, FitSettings, IterationRecord, Termination};
use crate::error::FitError;
use crate::math::solve_in_place;
use crate::models::FitModel;
use crate::simd::{LaneVector, within_capacity};

const LAMBDA_FACTOR: f64 = 10.0;
/// Accepted steps stop shrinking λ here, so a later rejection can still grow it.
pub const LAMBDA_FLOOR: f64 = f64::MIN_POSITIVE;

/// Solver state for one model over one x-axis.
///
/// `fit` takes `&mut self`, so a solver is never shared between threads
/// while it runs. Fit many series in parallel with one solver per worker.
pub struct LevenbergMarquardt<'m, M: FitModel, V: LaneVector> {
    model: &'m M,
    settings: FitSettings,
    /// Length of the x/y slices handed to `new`, before truncation.
    source_len: usize,
    x: Vec<f64>,
    y: V,
    est: V,
    residual: V,
    scratch: V,
    /// One vector per parameter: `derivs[p][i] = ∂f/∂p at x[i]`.
    derivs: Vec<V>,
    deriv_row: Vec<f64>,
    hessian: DMatrix<f64>,
    gradient: DVector<f64>,
    parameters: Vec<f64>,
    trial: Vec<f64>,
    lambda: f64,
    trace: Vec<IterationRecord>,
}

impl<'m, M: FitModel, V: LaneVector> LevenbergMarquardt<'m, M, V> {
    /// Set up a solver for `model` over the points `(x[i], y[i])`.
    ///
    /// Datasets longer than `V::capacity()` are accepted when they stay within
    /// `settings.truncate_ratio` of it; only the first `capacity` points are
    /// fitted then.
    pub fn new(
        model: &'m M,
        x: &[f64],
        y: &[f64],
        initial: &[f64],
        settings: &FitSettings,
    ) -> Result<Self, FitError> {
        settings.validate()?;
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch {
                left: x.len(),
                right: y.len(),
            });
        }
        let n_params = model.parameter_count();
        if initial.len() != n_params {
            return Err(FitError::ParameterCount {
                expected: n_params,
                actual: initial.len(),
            });
        }
        if x.is_empty() {
            return Err(FitError::EmptyDataset);
        }
        for (i, &value) in initial.iter().enumerate() {
            if !model.parameter_constraint(i).admits(value) {
                warn!(
                    parameter = %model.parameters()[i].name,
                    value,
                    "initial value outside its constraint, projected after the first pass"
                );
            }
        }

        let capacity = V::capacity();
        if !within_capacity(x.len(), capacity, settings.truncate_ratio) {
            return Err(FitError::CapacityExceeded {
                requested: x.len(),
                capacity,
            });
        }
        let points = x.len().min(capacity);
        if points < x.len() {
            warn!(
                dropped = x.len() - points,
                capacity,
                backend = V::backend_name(),
                "dataset truncated to vector capacity"
            );
        }

        let mut derivs = Vec::with_capacity(n_params);
        for _ in 0..n_params {
            derivs.push(V::zeros(points)?);
        }

        Ok(Self {
            model,
            settings: settings.clone(),
            source_len: x.len(),
            x: x[..points].to_vec(),
            y: V::from_slice(&y[..points])?,
            est: V::zeros(points)?,
            residual: V::zeros(points)?,
            scratch: V::zeros(points)?,
            derivs,
            deriv_row: vec![0.0; n_params],
            hessian: DMatrix::zeros(n_params, n_params),
            gradient: DVector::zeros(n_params),
            parameters: initial.to_vec(),
            trial: initial.to_vec(),
            lambda: settings.initial_lambda,
            trace: Vec::new(),
        })
    }

    /// Swap in a new observation series over the same x-axis and restart
    /// from `initial`. No buffer is reallocated.
    ///
    /// `y` must have the length of the slices passed to [`Self::new`].
    pub fn reload(&mut self, y: &[f64], initial: &[f64]) -> Result<(), FitError> {
        if y.len() != self.source_len {
            return Err(FitError::LengthMismatch {
                left: self.source_len,
                right: y.len(),
            });
        }
        if initial.len() != self.parameters.len() {
            return Err(FitError::ParameterCount {
                expected: self.parameters.len(),
                actual: initial.len(),
            });
        }
        let points = self.x.len();
        self.y.as_mut_slice().copy_from_slice(&y[..points]);
        self.parameters.copy_from_slice(initial);
        self.trial.copy_from_slice(initial);
        self.lambda = self.settings.initial_lambda;
        self.trace.clear();
        Ok(())
    }

    /// Current parameter values.
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Number of points being fitted.
    pub fn points(&self) -> usize {
        self.x.len()
    }

    pub fn model(&self) -> &'m M {
        self.model
    }

    /// Run the LM loop from the current parameters.
    pub fn fit(&mut self) -> FitReport {
        let max_iterations = self.settings.max_iterations;
        let min_delta = self.settings.min_delta_chi2;
        let mut iteration = 0usize;

        let termination = loop {
            let chi2 = chi_squared(
                self.model,
                &self.parameters,
                &self.x,
                &self.y,
                &mut self.est,
                &mut self.residual,
                &mut self.scratch,
            );

            fill_derivatives(
                self.model,
                &self.parameters,
                &self.x,
                &mut self.deriv_row,
                &mut self.derivs,
            );
            self.build_normal_equations();
            let zero_pivots = solve_in_place(&mut self.hessian, &mut self.gradient);
            if zero_pivots > 0 {
                trace!(iteration, zero_pivots, "degenerate directions left unchanged");
            }

            for ((t, p), d) in self
                .trial
                .iter_mut()
                .zip(&self.parameters)
                .zip(self.gradient.iter())
            {
                *t = p + d;
            }
            let trial_chi2 = chi_squared(
                self.model,
                &self.trial,
                &self.x,
                &self.y,
                &mut self.est,
                &mut self.residual,
                &mut self.scratch,
            );

            if !trial_chi2.is_finite() {
                warn!(iteration, chi2, lambda = self.lambda, "trial chi2 is not finite, aborting fit");
                self.record(iteration, chi2, trial_chi2, false);
                iteration += 1;
                break Termination::Diverged;
            }

            let accepted = trial_chi2 < chi2;
            if accepted {
                self.lambda = (self.lambda / LAMBDA_FACTOR).max(LAMBDA_FLOOR);
                self.parameters.copy_from_slice(&self.trial);
                trace!(iteration, chi2, trial_chi2, lambda = self.lambda, "step accepted");
            } else {
                self.lambda *= LAMBDA_FACTOR;
                trace!(iteration, chi2, trial_chi2, lambda = self.lambda, "step rejected");
            }
            self.constrain();
            self.record(iteration, chi2, trial_chi2, accepted);

            debug!(
                iteration,
                chi2,
                trial_chi2,
                lambda = self.lambda,
                accepted,
                "lm pass"
            );

            iteration += 1;
            if (chi2 - trial_chi2).abs() < min_delta {
                break Termination::Converged;
            }
            if iteration > max_iterations {
                break Termination::IterationLimit;
            }
        };

        let chi2 = chi_squared(
            self.model,
            &self.parameters,
            &self.x,
            &self.y,
            &mut self.est,
            &mut self.residual,
            &mut self.scratch,
        );
        info!(
            ?termination,
            iterations = iteration,
            chi2,
            backend = V::backend_name(),
            "fit finished"
        );

        FitReport {
            parameters: self.parameters.clone(),
            chi2,
            iterations: iteration,
            lambda: self.lambda,
            termination,
            points: self.x.len(),
            trace: self
                .settings
                .collect_trace
                .then(|| std::mem::take(&mut self.trace)),
        }
    }

    /// Fill `hessian` (damped) and `gradient` from the current derivative
    /// vectors and residual.
    fn build_normal_equations(&mut self) {
        let n = self.derivs.len();
        for row in 0..n {
            for col in row..n {
                V::mul(&self.derivs[row], &self.derivs[col], &mut self.scratch);
                let value = self.scratch.sum();
                self.hessian[(row, col)] = value;
                self.hessian[(col, row)] = value;
            }
            self.hessian[(row, row)] *= 1.0 + self.lambda;

            V::mul(&self.residual, &self.derivs[row], &mut self.scratch);
            self.gradient[row] = self.scratch.sum();
        }
    }

    fn constrain(&mut self) {
        for (i, p) in self.parameters.iter_mut().enumerate() {
            *p = self.model.parameter_constraint(i).project(*p);
        }
    }

    fn record(&mut self, iteration: usize, chi2: f64, trial_chi2: f64, accepted: bool) {
        if self.settings.collect_trace {
            self.trace.push(IterationRecord {
                iteration,
                chi2,
                trial_chi2,
                lambda: self.lambda,
                accepted,
            });
        }
    }
}

/// Evaluate the model into `est`, leave `y - est` in `residual` and return
/// `Σ residual²`.
fn chi_squared<M: FitModel, V: LaneVector>(
    model: &M,
    params: &[f64],
    x: &[f64],
    y: &V,
    est: &mut V,
    residual: &mut V,
    scratch: &mut V,
) -> f64 {
    let f = model.function(params);
    for (e, &xi) in est.as_mut_slice().iter_mut().zip(x) {
        *e = f(xi);
    }
    V::sub(y, est, residual);
    V::mul(residual, residual, scratch);
    scratch.sum()
}

/// Call the derivative closure once per point and scatter each row into the
/// parameter-major vectors.
fn fill_derivatives<M: FitModel, V: LaneVector>(
    model: &M,
    params: &[f64],
    x: &[f64],
    row: &mut [f64],
    derivs: &mut [V],
) {
    let deriv = model.derivatives(params);
    for (i, &xi) in x.iter().enumerate() {
        deriv(xi, row);
        for (vector, &value) in derivs.iter_mut().zip(row.iter()) {
            vector.as_mut_slice()[i] = value;
        }
    }
}
