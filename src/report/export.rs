//! Read/write fit reports as JSON.
//!
//! A report file carries the model, the backend that ran, the full
//! [`FitReport`], and the fitted curve sampled on an even grid for plotting
//! elsewhere.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{FitReport, ModelKind};
use crate::error::FitError;
use crate::fit::Backend;
use crate::models::{FitModel, predict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    pub model: ModelKind,
    pub backend: String,
    pub parameter_names: Vec<String>,
    pub report: FitReport,
    pub grid: CurveGrid,
}

impl ReportFile {
    /// Bundle `report` with the fitted curve over `[x_min, x_max]`.
    pub fn new<M: FitModel>(
        kind: ModelKind,
        model: &M,
        backend: Backend,
        report: FitReport,
        x_range: (f64, f64),
        grid_points: usize,
    ) -> Self {
        let x = grid(x_range, grid_points);
        let y = predict(model, &report.parameters, &x);
        Self {
            tool: "lmfit".to_string(),
            model: kind,
            backend: backend.to_string(),
            parameter_names: model.parameters().iter().map(|p| p.name.clone()).collect(),
            report,
            grid: CurveGrid { x, y },
        }
    }
}

pub fn write_report_json(path: &Path, file: &ReportFile) -> Result<(), FitError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, file)?;
    Ok(())
}

pub fn read_report_json(path: &Path) -> Result<ReportFile, FitError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn grid((lo, hi): (f64, f64), n: usize) -> Vec<f64> {
    let n = n.max(2);
    let (lo, hi) = if lo.is_finite() && hi.is_finite() && hi > lo {
        (lo, hi)
    } else {
        (lo, lo + 1.0)
    };
    (0..n)
        .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Termination;
    use crate::models::Linear;

    #[test]
    fn report_file_survives_a_disk_round_trip() {
        let model = Linear::new(0.0, 0.0);
        let report = FitReport {
            parameters: vec![2.0, 1.0],
            chi2: 0.5,
            iterations: 4,
            lambda: 0.125,
            termination: Termination::Converged,
            points: 10,
            trace: None,
        };
        let file = ReportFile::new(
            ModelKind::Linear,
            &model,
            Backend::Portable,
            report,
            (0.0, 1.0),
            5,
        );
        assert_eq!(file.grid.y, vec![1.0, 1.5, 2.0, 2.5, 3.0]);
        assert_eq!(file.parameter_names, vec!["slope", "intercept"]);

        let path = std::env::temp_dir().join(format!("lmfit-report-{}.json", std::process::id()));
        write_report_json(&path, &file).unwrap();
        let back = read_report_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back, file);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_report_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, FitError::Io(_)));
        assert_eq!(err.exit_code(), 5);
    }
}
