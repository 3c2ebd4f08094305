//! Reporting: terminal summaries and JSON export of fit results.

pub mod export;
pub mod format;

pub use export::{ReportFile, read_report_json, write_report_json};
pub use format::{format_batch_summary, format_report, format_support};
