//! The contract a fitting model must fulfil.
//!
//! The solver needs three things from a model:
//!
//! - parameter metadata (count, names, domain constraints)
//! - a scalar function `x -> y` for a given parameter vector
//! - the analytic partial derivatives `∂y/∂p_i` at a single `x`
//!
//! Both generators return closures. They are built once per evaluation pass
//! and then called once per data point, so implementations should unpack the
//! parameter slice up front.

use crate::domain::{Constraint, Parameter};

pub trait FitModel {
    fn parameters(&self) -> &[Parameter];

    fn parameter_count(&self) -> usize {
        self.parameters().len()
    }

    /// # Panics
    /// Panics if `index >= parameter_count()`.
    fn parameter_constraint(&self, index: usize) -> Constraint {
        self.parameters()[index].constraint
    }

    /// The declared starting point.
    fn initial_values(&self) -> Vec<f64> {
        self.parameters().iter().map(|p| p.initial_value).collect()
    }

    /// `x -> y` for the given parameter values.
    fn function<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64) -> f64 + 'a;

    /// `(x, out)`: fill `out[i]` with `∂y/∂p_i` at `x`.
    /// `out.len()` equals `parameter_count()`.
    fn derivatives<'a>(&'a self, params: &'a [f64]) -> impl Fn(f64, &mut [f64]) + 'a;
}

/// Evaluate `model` at every `x` with the given parameters.
pub fn predict<M: FitModel>(model: &M, params: &[f64], x: &[f64]) -> Vec<f64> {
    let f = model.function(params);
    x.iter().map(|&xi| f(xi)).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::FitModel;

    /// Largest absolute gap between analytic and central-difference derivatives.
    pub fn derivative_gap<M: FitModel>(model: &M, params: &[f64], xs: &[f64]) -> f64 {
        let n = model.parameter_count();
        let mut analytic = vec![0.0; n];
        let mut worst: f64 = 0.0;
        let deriv = model.derivatives(params);
        for &x in xs {
            deriv(x, &mut analytic);
            for i in 0..n {
                let h = 1e-6 * params[i].abs().max(1.0);
                let mut up = params.to_vec();
                let mut down = params.to_vec();
                up[i] += h;
                down[i] -= h;
                let numeric = (model.function(&up)(x) - model.function(&down)(x)) / (2.0 * h);
                worst = worst.max((numeric - analytic[i]).abs());
            }
        }
        worst
    }
}
