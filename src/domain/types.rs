//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - used in-memory by the solver
//! - exported to JSON from the `lmfit` binary
//! - reloaded later for comparisons

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lower bound a `Positive` parameter is pushed up to.
pub const POSITIVE_FLOOR: f64 = 1e-10;

/// Domain constraint declared by a model for one of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constraint {
    #[default]
    None,
    /// Strictly greater than zero; non-positive values become [`POSITIVE_FLOOR`].
    Positive,
    /// Zero or greater; negative values become `0`.
    NonNegative,
    /// Rounded to the nearest integer.
    Integer,
}

impl Constraint {
    /// Project `value` onto the constraint's domain.
    pub fn project(self, value: f64) -> f64 {
        match self {
            Constraint::None => value,
            Constraint::Positive => {
                if value <= 0.0 {
                    POSITIVE_FLOOR
                } else {
                    value
                }
            }
            Constraint::NonNegative => value.max(0.0),
            Constraint::Integer => value.round(),
        }
    }

    /// `true` if `value` already lies inside the domain.
    pub fn admits(self, value: f64) -> bool {
        match self {
            Constraint::None => true,
            Constraint::Positive => value > 0.0,
            Constraint::NonNegative => value >= 0.0,
            Constraint::Integer => value.fract() == 0.0,
        }
    }
}

/// Model parameter metadata. Owned by the model and read-only to the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Display name only.
    pub name: String,
    pub initial_value: f64,
    pub constraint: Constraint,
}

impl Parameter {
    pub fn new(name: impl Into<String>, initial_value: f64, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            initial_value,
            constraint,
        }
    }
}

/// Built-in model selector for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    Linear,
    Exponential,
    Gaussian,
    BiExponential,
}

impl ModelKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Exponential => "exponential decay",
            ModelKind::Gaussian => "gaussian peak",
            ModelKind::BiExponential => "bi-exponential decay",
        }
    }

    pub fn param_count(self) -> usize {
        match self {
            ModelKind::Linear => 2,
            ModelKind::Exponential => 3,
            ModelKind::Gaussian => 4,
            ModelKind::BiExponential => 5,
        }
    }
}

/// Backend requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Accelerated when the support gate allows it, portable otherwise.
    Auto,
    Portable,
    Accelerated,
}

/// Why a fit stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// `|chi2 - trial_chi2|` fell below the configured minimum.
    Converged,
    /// The iteration budget ran out.
    IterationLimit,
    /// A trial step produced a non-finite chi-squared. The last accepted
    /// parameters are kept.
    Diverged,
}

/// One pass of the LM loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub chi2: f64,
    pub trial_chi2: f64,
    /// Damping after the accept/reject decision.
    pub lambda: f64,
    pub accepted: bool,
}

/// Outcome of one `fit` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub parameters: Vec<f64>,
    /// Chi-squared at `parameters`.
    pub chi2: f64,
    pub iterations: usize,
    pub lambda: f64,
    pub termination: Termination,
    /// Number of data points actually fitted (after truncation to capacity).
    pub points: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace: Option<Vec<IterationRecord>>,
}

impl FitReport {
    /// Root-mean-square residual.
    pub fn rmse(&self) -> f64 {
        if self.points == 0 {
            return f64::NAN;
        }
        (self.chi2 / self.points as f64).sqrt()
    }
}
