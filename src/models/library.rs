//! Built-in models.
//!
//! Each model owns its parameter metadata and exposes a closed-form function
//! plus analytic derivatives. [`BuiltinModel`] wraps them behind one type so
//! the binary can pick a model at runtime.

use crate::domain::{Constraint, ModelKind, Parameter};
use crate::error::FitError;

use super::model::FitModel;

/// `y = slope·x + intercept`
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    params: [Parameter; 2],
}

impl Linear {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self {
            params: [
                Parameter::new("slope", slope, Constraint::None),
                Parameter::new("intercept", intercept, Constraint::None),
            ],
        }
    }
}

impl FitModel for Linear {
    fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    fn function<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64) -> f64 + 'a {
        let (m, b) = (params[0], params[1]);
        move |x| m * x + b
    }

    fn derivatives<'a>(&'a self, _params: &'a [f64]) -> impl Fn(f64, &mut [f64]) + 'a {
        |x, out: &mut [f64]| {
            out[0] = x;
            out[1] = 1.0;
        }
    }
}

/// `y = amplitude·exp(-x/lifetime) + offset`, lifetime kept positive.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialDecay {
    params: [Parameter; 3],
}

impl ExponentialDecay {
    pub fn new(amplitude: f64, lifetime: f64, offset: f64) -> Self {
        Self {
            params: [
                Parameter::new("amplitude", amplitude, Constraint::None),
                Parameter::new("lifetime", lifetime, Constraint::Positive),
                Parameter::new("offset", offset, Constraint::None),
            ],
        }
    }
}

impl FitModel for ExponentialDecay {
    fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    fn function<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64) -> f64 + 'a {
        let (a, tau, c) = (params[0], params[1], params[2]);
        move |x| a * (-x / tau).exp() + c
    }

    fn derivatives<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64, &mut [f64]) + 'a {
        let (a, tau) = (params[0], params[1]);
        move |x, out: &mut [f64]| {
            let e = (-x / tau).exp();
            out[0] = e;
            out[1] = a * e * x / (tau * tau);
            out[2] = 1.0;
        }
    }
}

/// `y = amplitude·exp(-(x-center)²/(2·width²)) + offset`, width kept positive.
#[derive(Debug, Clone, PartialEq)]
pub struct Gaussian {
    params: [Parameter; 4],
}

impl Gaussian {
    pub fn new(amplitude: f64, center: f64, width: f64, offset: f64) -> Self {
        Self {
            params: [
                Parameter::new("amplitude", amplitude, Constraint::None),
                Parameter::new("center", center, Constraint::None),
                Parameter::new("width", width, Constraint::Positive),
                Parameter::new("offset", offset, Constraint::None),
            ],
        }
    }
}

impl FitModel for Gaussian {
    fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    fn function<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64) -> f64 + 'a {
        let (a, mu, sigma, c) = (params[0], params[1], params[2], params[3]);
        move |x| {
            let d = x - mu;
            a * (-d * d / (2.0 * sigma * sigma)).exp() + c
        }
    }

    fn derivatives<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64, &mut [f64]) + 'a {
        let (a, mu, sigma) = (params[0], params[1], params[2]);
        move |x, out: &mut [f64]| {
            let d = x - mu;
            let s2 = sigma * sigma;
            let g = (-d * d / (2.0 * s2)).exp();
            out[0] = g;
            out[1] = a * g * d / s2;
            out[2] = a * g * d * d / (s2 * sigma);
            out[3] = 1.0;
        }
    }
}

/// `y = a1·exp(-x/tau1) + a2·exp(-x/tau2) + offset`, both lifetimes positive.
#[derive(Debug, Clone, PartialEq)]
pub struct BiExponential {
    params: [Parameter; 5],
}

impl BiExponential {
    pub fn new(a1: f64, tau1: f64, a2: f64, tau2: f64, offset: f64) -> Self {
        Self {
            params: [
                Parameter::new("amplitude_fast", a1, Constraint::None),
                Parameter::new("lifetime_fast", tau1, Constraint::Positive),
                Parameter::new("amplitude_slow", a2, Constraint::None),
                Parameter::new("lifetime_slow", tau2, Constraint::Positive),
                Parameter::new("offset", offset, Constraint::None),
            ],
        }
    }
}

impl FitModel for BiExponential {
    fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    fn function<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64) -> f64 + 'a {
        let (a1, t1, a2, t2, c) = (params[0], params[1], params[2], params[3], params[4]);
        move |x| a1 * (-x / t1).exp() + a2 * (-x / t2).exp() + c
    }

    fn derivatives<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64, &mut [f64]) + 'a {
        let (a1, t1, a2, t2) = (params[0], params[1], params[2], params[3]);
        move |x, out: &mut [f64]| {
            let e1 = (-x / t1).exp();
            let e2 = (-x / t2).exp();
            out[0] = e1;
            out[1] = a1 * e1 * x / (t1 * t1);
            out[2] = e2;
            out[3] = a2 * e2 * x / (t2 * t2);
            out[4] = 1.0;
        }
    }
}

/// Runtime-selected built-in model.
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinModel {
    Linear(Linear),
    Exponential(ExponentialDecay),
    Gaussian(Gaussian),
    BiExponential(BiExponential),
}

type ScalarFn<'a> = Box<dyn Fn(f64) -> f64 + 'a>;
type DerivFn<'a> = Box<dyn Fn(f64, &mut [f64]) + 'a>;

impl BuiltinModel {
    /// Build `kind` starting from `initial`.
    pub fn new(kind: ModelKind, initial: &[f64]) -> Result<Self, FitError> {
        if initial.len() != kind.param_count() {
            return Err(FitError::ParameterCount {
                expected: kind.param_count(),
                actual: initial.len(),
            });
        }
        let p = initial;
        Ok(match kind {
            ModelKind::Linear => BuiltinModel::Linear(Linear::new(p[0], p[1])),
            ModelKind::Exponential => {
                BuiltinModel::Exponential(ExponentialDecay::new(p[0], p[1], p[2]))
            }
            ModelKind::Gaussian => BuiltinModel::Gaussian(Gaussian::new(p[0], p[1], p[2], p[3])),
            ModelKind::BiExponential => {
                BuiltinModel::BiExponential(BiExponential::new(p[0], p[1], p[2], p[3], p[4]))
            }
        })
    }

    /// Build `kind` with a starting point estimated from the data.
    pub fn guess(kind: ModelKind, x: &[f64], y: &[f64]) -> Result<Self, FitError> {
        Self::new(kind, &initial_guess(kind, x, y)?)
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            BuiltinModel::Linear(_) => ModelKind::Linear,
            BuiltinModel::Exponential(_) => ModelKind::Exponential,
            BuiltinModel::Gaussian(_) => ModelKind::Gaussian,
            BuiltinModel::BiExponential(_) => ModelKind::BiExponential,
        }
    }
}

impl FitModel for BuiltinModel {
    fn parameters(&self) -> &[Parameter] {
        match self {
            BuiltinModel::Linear(m) => m.parameters(),
            BuiltinModel::Exponential(m) => m.parameters(),
            BuiltinModel::Gaussian(m) => m.parameters(),
            BuiltinModel::BiExponential(m) => m.parameters(),
        }
    }

    fn function<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64) -> f64 + 'a {
        let f: ScalarFn<'a> = match self {
            BuiltinModel::Linear(m) => Box::new(m.function(params)),
            BuiltinModel::Exponential(m) => Box::new(m.function(params)),
            BuiltinModel::Gaussian(m) => Box::new(m.function(params)),
            BuiltinModel::BiExponential(m) => Box::new(m.function(params)),
        };
        f
    }

    fn derivatives<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64, &mut [f64]) + 'a {
        let d: DerivFn<'a> = match self {
            BuiltinModel::Linear(m) => Box::new(m.derivatives(params)),
            BuiltinModel::Exponential(m) => Box::new(m.derivatives(params)),
            BuiltinModel::Gaussian(m) => Box::new(m.derivatives(params)),
            BuiltinModel::BiExponential(m) => Box::new(m.derivatives(params)),
        };
        d
    }
}

/// Rough data-driven starting point for `kind`.
pub fn initial_guess(kind: ModelKind, x: &[f64], y: &[f64]) -> Result<Vec<f64>, FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    let (Some(&x0), Some(&x1), Some(&y0), Some(&y1)) = (x.first(), x.last(), y.first(), y.last())
    else {
        return Err(FitError::EmptyDataset);
    };

    let span = (x1 - x0).abs().max(f64::EPSILON);
    let (y_min, y_max) = y
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    Ok(match kind {
        ModelKind::Linear => {
            let slope = if x1 != x0 { (y1 - y0) / (x1 - x0) } else { 0.0 };
            vec![slope, y0 - slope * x0]
        }
        ModelKind::Exponential => vec![y0 - y1, span / 3.0, y1],
        ModelKind::Gaussian => {
            let peak = y
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map_or(0, |(i, _)| i);
            vec![y_max - y_min, x[peak], span / 6.0, y_min]
        }
        ModelKind::BiExponential => {
            let half = 0.5 * (y0 - y1);
            vec![half, span / 10.0, half, span / 2.0, y1]
        }
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::models::model::testing::derivative_gap;
    use crate::models::predict;

    fn grid() -> Vec<f64> {
        (0..40).map(|i| i as f64 * 0.25).collect()
    }

    #[test]
    fn analytic_derivatives_match_finite_differences() {
        let xs = grid();
        assert!(derivative_gap(&Linear::new(2.0, -1.0), &[2.0, -1.0], &xs) < 1e-6);
        assert!(derivative_gap(&ExponentialDecay::new(5.0, 2.0, 1.0), &[5.0, 2.0, 1.0], &xs) < 1e-6);
        assert!(
            derivative_gap(&Gaussian::new(3.0, 4.0, 1.5, 0.5), &[3.0, 4.0, 1.5, 0.5], &xs) < 1e-6
        );
        let bi = [4.0, 0.5, 2.0, 5.0, 0.1];
        assert!(derivative_gap(&BiExponential::new(4.0, 0.5, 2.0, 5.0, 0.1), &bi, &xs) < 1e-6);
    }

    #[test]
    fn lifetimes_and_widths_are_positive() {
        let m = ExponentialDecay::new(1.0, 1.0, 0.0);
        assert_eq!(m.parameter_constraint(1), Constraint::Positive);
        assert_eq!(m.parameter_constraint(0), Constraint::None);

        let g = Gaussian::new(1.0, 0.0, 1.0, 0.0);
        assert_eq!(g.parameter_constraint(2), Constraint::Positive);

        let b = BiExponential::new(1.0, 1.0, 1.0, 2.0, 0.0);
        assert_eq!(b.parameter_constraint(1), Constraint::Positive);
        assert_eq!(b.parameter_constraint(3), Constraint::Positive);
    }

    #[test]
    fn builtin_dispatch_matches_concrete_models() {
        let xs = grid();
        let params = [3.0, 4.0, 1.5, 0.5];
        let builtin = BuiltinModel::new(ModelKind::Gaussian, &params).unwrap();
        let concrete = Gaussian::new(3.0, 4.0, 1.5, 0.5);
        assert_eq!(builtin.kind(), ModelKind::Gaussian);
        assert_eq!(builtin.initial_values(), params.to_vec());
        assert_eq!(predict(&builtin, &params, &xs), predict(&concrete, &params, &xs));
        assert!(derivative_gap(&builtin, &params, &xs) < 1e-6);
    }

    #[test]
    fn builtin_rejects_wrong_parameter_count() {
        assert!(matches!(
            BuiltinModel::new(ModelKind::Exponential, &[1.0, 2.0]),
            Err(FitError::ParameterCount {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn initial_guess_recovers_a_line() {
        let x = [1.0, 2.0, 3.0];
        let y = [3.0, 5.0, 7.0];
        let guess = initial_guess(ModelKind::Linear, &x, &y).unwrap();
        assert_relative_eq!(guess[0], 2.0);
        assert_relative_eq!(guess[1], 1.0);
    }

    #[test]
    fn initial_guess_locates_the_peak() {
        let xs = grid();
        let model = Gaussian::new(2.0, 6.0, 0.8, 1.0);
        let ys = predict(&model, &model.initial_values(), &xs);
        let guess = initial_guess(ModelKind::Gaussian, &xs, &ys).unwrap();
        assert_eq!(guess[1], 6.0);
        assert!(guess[0] > 1.9 && guess[0] <= 2.0);
    }

    #[test]
    fn guessed_model_starts_from_the_estimate() {
        let x = [1.0, 2.0, 3.0];
        let y = [3.0, 5.0, 7.0];
        let model = BuiltinModel::guess(ModelKind::Linear, &x, &y).unwrap();
        assert_eq!(model.kind(), ModelKind::Linear);
        assert_eq!(
            model.initial_values(),
            initial_guess(ModelKind::Linear, &x, &y).unwrap()
        );
    }

    #[test]
    fn initial_guess_rejects_empty_data() {
        assert!(matches!(
            initial_guess(ModelKind::Exponential, &[], &[]),
            Err(FitError::EmptyDataset)
        ));
    }
}
