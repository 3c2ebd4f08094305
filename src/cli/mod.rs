//! Command-line parsing for the `lmfit` binary.
//!
//! Argument parsing and command dispatch stay out of the solver code; the
//! handlers live in [`crate::app`].

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{BackendChoice, FitSettings, ModelKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lmfit", version, about = "SIMD-batched Levenberg–Marquardt curve fitter")]
pub struct Cli {
    /// Log filter used when `RUST_LOG` is unset (e.g. `info`, `lmfit_simd=debug`).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one synthetic dataset and print the result.
    Fit(FitArgs),
    /// Fit many synthetic series over one x-axis in parallel.
    Batch(BatchArgs),
    /// Show SIMD capability and which backend a dataset size would get.
    Support(SupportArgs),
    /// Measure the fast exp approximation against `f64::exp`.
    ExpCheck(ExpCheckArgs),
}

/// Synthetic dataset options.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Model to generate and fit.
    #[arg(short = 'm', long, value_enum, default_value_t = ModelKind::Exponential)]
    pub model: ModelKind,

    /// Number of data points.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub points: usize,

    #[arg(long, default_value_t = 0.0)]
    pub x_min: f64,

    #[arg(long, default_value_t = 10.0)]
    pub x_max: f64,

    /// Standard deviation of the additive Gaussian noise.
    #[arg(long, default_value_t = 0.01)]
    pub noise: f64,

    /// Random seed for the noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Parameters the data is generated from (comma separated).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub truth: Option<Vec<f64>>,

    /// Starting parameters (comma separated). Estimated from the data when omitted.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub initial: Option<Vec<f64>>,
}

/// Solver settings. Flags override the config file and `LMFIT_*` variables.
#[derive(Debug, Args, Clone, Default)]
pub struct SolverArgs {
    /// JSON settings file.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub max_iterations: Option<usize>,

    #[arg(long)]
    pub min_delta_chi2: Option<f64>,

    #[arg(long)]
    pub initial_lambda: Option<f64>,

    /// Accept datasets up to `capacity × (1 + ratio)` and drop the surplus.
    #[arg(long)]
    pub truncate_ratio: Option<f64>,

    /// Disable the accelerated backend.
    #[arg(long)]
    pub no_simd: bool,
}

impl SolverArgs {
    /// Apply the flags that were given on top of `settings`.
    pub fn apply(&self, settings: &mut FitSettings) {
        if let Some(v) = self.max_iterations {
            settings.max_iterations = v;
        }
        if let Some(v) = self.min_delta_chi2 {
            settings.min_delta_chi2 = v;
        }
        if let Some(v) = self.initial_lambda {
            settings.initial_lambda = v;
        }
        if let Some(v) = self.truncate_ratio {
            settings.truncate_ratio = v;
        }
        if self.no_simd {
            settings.simd_enabled = false;
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    #[command(flatten)]
    pub solver: SolverArgs,

    #[arg(long, value_enum, default_value_t = BackendChoice::Auto)]
    pub backend: BackendChoice,

    /// Print the per-iteration trace.
    #[arg(long)]
    pub trace: bool,

    /// Write the report (with a fitted curve grid) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    #[command(flatten)]
    pub solver: SolverArgs,

    /// Number of series.
    #[arg(long, default_value_t = 64)]
    pub series: usize,

    /// Relative spread of the per-series true parameters.
    #[arg(long, default_value_t = 0.2)]
    pub spread: f64,
}

#[derive(Debug, Args, Clone)]
pub struct SupportArgs {
    /// Dataset size to check.
    #[arg(short = 'n', long, default_value_t = 1024)]
    pub points: usize,

    #[command(flatten)]
    pub solver: SolverArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ExpCheckArgs {
    #[arg(long, default_value_t = crate::math::EXP_MIN_ARG, allow_hyphen_values = true)]
    pub min: f64,

    #[arg(long, default_value_t = crate::math::EXP_MAX_ARG, allow_hyphen_values = true)]
    pub max: f64,

    #[arg(long, default_value_t = 1_000_001)]
    pub samples: usize,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fit_flags_parse() {
        let cli = Cli::try_parse_from([
            "lmfit",
            "fit",
            "--model",
            "gaussian",
            "--truth",
            "3,5,1.2,-0.5",
            "--max-iterations",
            "20",
            "--no-simd",
            "--backend",
            "portable",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.sample.model, ModelKind::Gaussian);
        assert_eq!(args.sample.truth, Some(vec![3.0, 5.0, 1.2, -0.5]));
        assert_eq!(args.backend, BackendChoice::Portable);

        let mut settings = FitSettings::default();
        args.solver.apply(&mut settings);
        assert_eq!(settings.max_iterations, 20);
        assert!(!settings.simd_enabled);
        assert_eq!(settings.initial_lambda, 1e-3);
    }

    #[test]
    fn subcommand_names_are_kebab_case() {
        assert!(Cli::try_parse_from(["lmfit", "exp-check", "--samples", "10"]).is_ok());
        assert!(Cli::try_parse_from(["lmfit", "support", "-n", "3000"]).is_ok());
        assert!(Cli::try_parse_from(["lmfit", "batch", "--model", "bi-exponential"]).is_ok());
    }
}
