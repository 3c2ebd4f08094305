//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main. It:
//! - parses CLI arguments and installs the log subscriber
//! - layers settings (file, environment, flags)
//! - generates synthetic data and runs the solver
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{BatchArgs, Cli, Command, ExpCheckArgs, FitArgs, SampleArgs, SolverArgs, SupportArgs};
use crate::data::{SampleSpec, generate, generate_family};
use crate::domain::{FitSettings, ModelKind};
use crate::error::FitError;
use crate::fit::dispatch::{Accelerated1024, Accelerated2048};
use crate::fit::{fit_batch, fit_with_backend, resolve_backend, select_backend};
use crate::math::fast_exp::max_relative_error;
use crate::models::{BuiltinModel, FitModel};
use crate::report::{ReportFile, format_batch_summary, format_report, format_support, write_report_json};
use crate::simd::{ACCELERATED_CAPACITIES, check_support, simd_level};

/// Points in the fitted-curve grid written by `fit --export`.
const EXPORT_GRID_POINTS: usize = 201;

/// Entry point for the `lmfit` binary.
pub fn run() -> Result<(), FitError> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Batch(args) => handle_batch(args),
        Command::Support(args) => handle_support(args),
        Command::ExpCheck(args) => handle_exp_check(args),
    }
}

/// `RUST_LOG` wins over `--log-level`. Logs go to stderr so reports on
/// stdout stay clean.
fn init_logging(level: &str) -> Result<(), FitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| FitError::InvalidSettings(format!("invalid log filter '{level}': {e}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), FitError> {
    let mut settings = load_settings(&args.solver)?;
    settings.collect_trace = args.trace;

    let kind = args.sample.model;
    let truth = truth_for(&args.sample)?;
    let data = generate(&BuiltinModel::new(kind, &truth)?, &truth, &sample_spec(&args.sample))?;

    let model = match &args.sample.initial {
        Some(values) => BuiltinModel::new(kind, values)?,
        None => BuiltinModel::guess(kind, &data.x, &data.y)?,
    };
    let initial = model.initial_values();

    let backend = resolve_backend(args.backend, data.x.len(), &settings)?;
    info!(%backend, model = kind.display_name(), points = data.x.len(), "fitting");
    let mut report = fit_with_backend(backend, &model, &data.x, &data.y, &initial, &settings)?;

    println!(
        "{}",
        format_report(kind.display_name(), &model, backend, &report, Some(&truth))
    );
    if let Some(trace) = report.trace.as_ref() {
        println!("Trace:");
        for r in trace {
            println!(
                "{:>5}  chi2 {:.6e}  trial {:.6e}  lambda {:.1e}  {}",
                r.iteration,
                r.chi2,
                r.trial_chi2,
                r.lambda,
                if r.accepted { "accepted" } else { "rejected" }
            );
        }
    }

    if let Some(path) = &args.export {
        if !args.trace {
            report.trace = None;
        }
        let file = ReportFile::new(
            kind,
            &model,
            backend,
            report,
            (data.stats.x_min, data.stats.x_max),
            EXPORT_GRID_POINTS,
        );
        write_report_json(path, &file)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<(), FitError> {
    let settings = load_settings(&args.solver)?;
    let kind = args.sample.model;
    let truth = truth_for(&args.sample)?;
    let truth_model = BuiltinModel::new(kind, &truth)?;
    let family = generate_family(
        &truth_model,
        &truth,
        &sample_spec(&args.sample),
        args.series,
        args.spread,
    )?;

    let model = match (&args.sample.initial, family.series.first()) {
        (Some(values), _) => BuiltinModel::new(kind, values)?,
        (None, Some(first)) => BuiltinModel::guess(kind, &family.x, first)?,
        (None, None) => truth_model.clone(),
    };
    let initial = model.initial_values();

    let (backend, reports) = fit_batch(&model, &family.x, &family.series, &initial, &settings)?;
    println!("{}", format_batch_summary(backend, &reports, &family.truths));
    Ok(())
}

fn handle_support(args: SupportArgs) -> Result<(), FitError> {
    let settings = load_settings(&args.solver)?;
    let gate: Vec<(usize, bool)> = ACCELERATED_CAPACITIES
        .iter()
        .map(|&capacity| {
            let ok = match capacity {
                1024 => check_support::<Accelerated1024>(args.points, &settings),
                _ => check_support::<Accelerated2048>(args.points, &settings),
            };
            (capacity, ok)
        })
        .collect();
    let chosen = select_backend(args.points, &settings);
    println!(
        "{}",
        format_support(simd_level(), args.points, &settings, &gate, chosen)
    );
    Ok(())
}

fn handle_exp_check(args: ExpCheckArgs) -> Result<(), FitError> {
    if !(args.min.is_finite() && args.max.is_finite() && args.max > args.min) {
        return Err(FitError::InvalidSettings(format!(
            "invalid range [{}, {}]",
            args.min, args.max
        )));
    }
    if args.samples < 2 {
        return Err(FitError::InvalidSettings("need at least 2 samples".to_string()));
    }
    let err = max_relative_error(args.min, args.max, args.samples);
    println!(
        "fast exp: max relative error {err:.3e} over [{}, {}] ({} samples)",
        args.min, args.max, args.samples
    );
    Ok(())
}

fn load_settings(args: &SolverArgs) -> Result<FitSettings, FitError> {
    let mut settings = FitSettings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn sample_spec(args: &SampleArgs) -> SampleSpec {
    SampleSpec {
        points: args.points,
        x_min: args.x_min,
        x_max: args.x_max,
        noise_sigma: args.noise,
        seed: args.seed,
    }
}

fn truth_for(args: &SampleArgs) -> Result<Vec<f64>, FitError> {
    let truth = args
        .truth
        .clone()
        .unwrap_or_else(|| demo_truth(args.model));
    if truth.len() != args.model.param_count() {
        return Err(FitError::ParameterCount {
            expected: args.model.param_count(),
            actual: truth.len(),
        });
    }
    Ok(truth)
}

/// Generating parameters used when `--truth` is not given. They suit the
/// default `[0, 10]` x-range.
pub fn demo_truth(kind: ModelKind) -> Vec<f64> {
    match kind {
        ModelKind::Linear => vec![1.5, -0.5],
        ModelKind::Exponential => vec![5.0, 2.0, 1.0],
        ModelKind::Gaussian => vec![3.0, 5.0, 1.2, 0.5],
        ModelKind::BiExponential => vec![4.0, 0.5, 2.0, 4.0, 0.2],
    }
}
