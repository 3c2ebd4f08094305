//! Formatted terminal output.
//!
//! Everything here returns a `String`; printing is left to the binary so the
//! layout can be checked in tests.

use std::fmt::Write as _;

use crate::domain::{FitReport, FitSettings, Termination};
use crate::fit::Backend;
use crate::models::FitModel;
use crate::simd::SimdLevel;

/// Summary of a single fit. `truth` adds a column with the generating
/// parameters when the data was synthetic.
pub fn format_report<M: FitModel>(
    title: &str,
    model: &M,
    backend: Backend,
    report: &FitReport,
    truth: Option<&[f64]>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== lmfit: {title} ===");
    let _ = writeln!(out, "Backend: {backend}");
    let _ = writeln!(out, "Points: {}", report.points);
    let _ = writeln!(
        out,
        "Termination: {} after {} iterations (lambda {:.3e})",
        termination_label(report.termination),
        report.iterations,
        report.lambda
    );
    let _ = writeln!(out, "chi2: {:.6e}  rmse: {:.6e}", report.chi2, report.rmse());

    out.push_str("\nParameters:\n");
    match truth {
        Some(_) => {
            let _ = writeln!(out, "{:<16} {:>14} {:>14}", "name", "fitted", "true");
        }
        None => {
            let _ = writeln!(out, "{:<16} {:>14}", "name", "fitted");
        }
    }
    for (i, (param, value)) in model.parameters().iter().zip(&report.parameters).enumerate() {
        match truth.and_then(|t| t.get(i)) {
            Some(t) => {
                let _ = writeln!(out, "{:<16} {:>14.6} {:>14.6}", param.name, value, t);
            }
            None => {
                let _ = writeln!(out, "{:<16} {:>14.6}", param.name, value);
            }
        }
    }
    out
}

/// One line per series plus aggregate statistics.
pub fn format_batch_summary(backend: Backend, reports: &[FitReport], truths: &[Vec<f64>]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== lmfit: batch of {} series ===", reports.len());
    let _ = writeln!(out, "Backend: {backend}");

    let converged = reports
        .iter()
        .filter(|r| r.termination == Termination::Converged)
        .count();
    let diverged = reports
        .iter()
        .filter(|r| r.termination == Termination::Diverged)
        .count();
    let _ = writeln!(
        out,
        "Converged: {converged}  Diverged: {diverged}  Iteration limit: {}",
        reports.len() - converged - diverged
    );

    if let Some(worst) = reports.iter().map(FitReport::rmse).reduce(f64::max) {
        let _ = writeln!(out, "Worst rmse: {worst:.6e}");
    }
    let worst_error = reports
        .iter()
        .zip(truths)
        .flat_map(|(r, t)| {
            r.parameters
                .iter()
                .zip(t)
                .map(|(p, t)| relative_error(*p, *t))
        })
        .reduce(f64::max);
    if let Some(err) = worst_error {
        let _ = writeln!(out, "Worst relative parameter error: {err:.3e}");
    }

    out.push('\n');
    for (i, r) in reports.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>5}  {:<15} iters {:>4}  chi2 {:.4e}  params {}",
            i,
            termination_label(r.termination),
            r.iterations,
            r.chi2,
            fmt_vec(&r.parameters)
        );
    }
    out
}

/// Capability report for the `support` command. `gate` pairs each
/// accelerated capacity with the support gate's answer.
pub fn format_support(
    level: SimdLevel,
    points: usize,
    settings: &FitSettings,
    gate: &[(usize, bool)],
    chosen: Backend,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "SIMD level: {level:?}");
    let _ = writeln!(out, "SIMD enabled: {}", settings.simd_enabled);
    let _ = writeln!(out, "Truncate ratio: {}", settings.truncate_ratio);
    let _ = writeln!(out, "Dataset size: {points}");
    for &(capacity, ok) in gate {
        let _ = writeln!(
            out,
            "  avx2/{capacity:<5} {}",
            if ok { "supported" } else { "unsupported" }
        );
    }
    let _ = writeln!(out, "Selected backend: {chosen}");
    out
}

fn termination_label(t: Termination) -> &'static str {
    match t {
        Termination::Converged => "converged",
        Termination::IterationLimit => "iteration limit",
        Termination::Diverged => "diverged",
    }
}

fn relative_error(value: f64, truth: f64) -> f64 {
    (value - truth).abs() / truth.abs().max(f64::EPSILON)
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.5}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExponentialDecay;

    fn report(termination: Termination) -> FitReport {
        FitReport {
            parameters: vec![5.0, 2.0, 1.0],
            chi2: 4e-4,
            iterations: 12,
            lambda: 1e-9,
            termination,
            points: 100,
            trace: None,
        }
    }

    #[test]
    fn single_report_lists_every_parameter() {
        let model = ExponentialDecay::new(4.0, 1.0, 0.0);
        let text = format_report(
            "exponential decay",
            &model,
            Backend::Portable,
            &report(Termination::Converged),
            Some(&[5.0, 2.0, 1.0]),
        );
        assert!(text.contains("Backend: portable"));
        assert!(text.contains("converged after 12 iterations"));
        for name in ["amplitude", "lifetime", "offset"] {
            assert!(text.contains(name), "missing {name} in\n{text}");
        }
        assert!(text.contains("true"));
    }

    #[test]
    fn batch_summary_counts_terminations() {
        let reports = vec![
            report(Termination::Converged),
            report(Termination::Diverged),
            report(Termination::IterationLimit),
        ];
        let truths = vec![vec![5.0, 2.0, 1.0]; 3];
        let text = format_batch_summary(Backend::Accelerated1024, &reports, &truths);
        assert!(text.contains("Converged: 1  Diverged: 1  Iteration limit: 1"));
        assert!(text.contains("avx2/1024"));
        assert!(text.contains("Worst relative parameter error: 0.000e0"));
    }

    #[test]
    fn support_lists_each_capacity() {
        let text = format_support(
            SimdLevel::Scalar,
            1500,
            &FitSettings::default(),
            &[(1024, false), (2048, false)],
            Backend::Portable,
        );
        assert!(text.contains("avx2/1024  unsupported"));
        assert!(text.contains("Selected backend: portable"));
    }
}
