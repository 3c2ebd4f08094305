//! Solver configuration.
//!
//! Settings are layered:
//!
//! 1. built-in defaults
//! 2. an optional JSON file (`--config settings.json`)
//! 3. environment overrides (`LMFIT_*`, a `.env` file is honoured)
//!
//! The binary applies CLI flags on top of the result.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FitError;

pub const ENV_MAX_ITERATIONS: &str = "LMFIT_MAX_ITERATIONS";
pub const ENV_MIN_DELTA_CHI2: &str = "LMFIT_MIN_DELTA_CHI2";
pub const ENV_INITIAL_LAMBDA: &str = "LMFIT_INITIAL_LAMBDA";
pub const ENV_SIMD: &str = "LMFIT_SIMD";
pub const ENV_TRUNCATE_RATIO: &str = "LMFIT_TRUNCATE_RATIO";

/// Configuration shared by the solver and the support gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    /// The loop stops once the iteration counter *exceeds* this value.
    pub max_iterations: usize,
    /// Stop once `|chi2 - trial_chi2|` drops below this.
    pub min_delta_chi2: f64,
    /// Starting damping factor. Each accepted step divides it by 10 and each
    /// rejected step multiplies it by 10; division stops at
    /// [`crate::fit::LAMBDA_FLOOR`].
    pub initial_lambda: f64,
    /// Global switch for the accelerated backend.
    pub simd_enabled: bool,
    /// How far a dataset may overshoot a vector's capacity and still be
    /// accepted (the surplus points are dropped).
    pub truncate_ratio: f64,
    /// Record one [`crate::domain::IterationRecord`] per LM pass.
    pub collect_trace: bool,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            min_delta_chi2: 1e-30,
            initial_lambda: 1e-3,
            simd_enabled: true,
            truncate_ratio: 0.0,
            collect_trace: false,
        }
    }
}

impl FitSettings {
    /// Defaults or `config`, then environment overrides.
    pub fn load(config: Option<&Path>) -> Result<Self, FitError> {
        let mut settings = match config {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        dotenvy::dotenv().ok();
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Read settings from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, FitError> {
        let file = File::open(path)?;
        let settings: FitSettings = serde_json::from_reader(file)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `LMFIT_*` overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), FitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_ITERATIONS) {
            self.max_iterations = parse_value(ENV_MAX_ITERATIONS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MIN_DELTA_CHI2) {
            self.min_delta_chi2 = parse_value(ENV_MIN_DELTA_CHI2, &raw)?;
        }
        if let Some(raw) = lookup(ENV_INITIAL_LAMBDA) {
            self.initial_lambda = parse_value(ENV_INITIAL_LAMBDA, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SIMD) {
            self.simd_enabled = parse_switch(ENV_SIMD, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TRUNCATE_RATIO) {
            self.truncate_ratio = parse_value(ENV_TRUNCATE_RATIO, &raw)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.min_delta_chi2.is_finite() && self.min_delta_chi2 >= 0.0) {
            return Err(FitError::InvalidSettings(format!(
                "min_delta_chi2 must be finite and >= 0, got {}",
                self.min_delta_chi2
            )));
        }
        if !(self.initial_lambda.is_finite() && self.initial_lambda > 0.0) {
            return Err(FitError::InvalidSettings(format!(
                "initial_lambda must be finite and > 0, got {}",
                self.initial_lambda
            )));
        }
        if !(self.truncate_ratio.is_finite() && self.truncate_ratio >= 0.0) {
            return Err(FitError::InvalidSettings(format!(
                "truncate_ratio must be finite and >= 0, got {}",
                self.truncate_ratio
            )));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, FitError> {
    raw.trim()
        .parse()
        .map_err(|_| FitError::InvalidSettings(format!("{key}: cannot parse '{raw}'")))
}

fn parse_switch(key: &str, raw: &str) -> Result<bool, FitError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(FitError::InvalidSettings(format!(
            "{key}: expected on/off, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_solver_contract() {
        let s = FitSettings::default();
        assert_eq!(s.max_iterations, 100);
        assert_eq!(s.min_delta_chi2, 1e-30);
        assert!(s.simd_enabled);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn overrides_are_applied() {
        let mut s = FitSettings::default();
        s.apply_overrides(lookup(&[
            (ENV_MAX_ITERATIONS, "250"),
            (ENV_SIMD, "off"),
            (ENV_TRUNCATE_RATIO, "0.25"),
        ]))
        .unwrap();
        assert_eq!(s.max_iterations, 250);
        assert!(!s.simd_enabled);
        assert_eq!(s.truncate_ratio, 0.25);
    }

    #[test]
    fn bad_override_is_rejected() {
        let mut s = FitSettings::default();
        let err = s
            .apply_overrides(lookup(&[(ENV_INITIAL_LAMBDA, "-1")]))
            .unwrap_err();
        assert!(matches!(err, FitError::InvalidSettings(_)));

        let mut s = FitSettings::default();
        assert!(s.apply_overrides(lookup(&[(ENV_SIMD, "maybe")])).is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let s: FitSettings = serde_json::from_str(r#"{ "max_iterations": 7 }"#).unwrap();
        assert_eq!(s.max_iterations, 7);
        assert_eq!(s.initial_lambda, 1e-3);
    }
}
