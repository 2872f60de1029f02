//! Stage summaries for the terminal and for machines.

pub mod json;
pub mod plain;

use crate::analyzer::anomaly::Anomaly;
use crate::analyzer::functionality::ReinjectionReport;
use crate::analyzer::remediation::RemediationReport;
use crate::analyzer::tally::CheckTally;
use serde::Serialize;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Colored plain text.
    #[default]
    Plain,
    /// Pretty-printed JSON.
    Json,
}

/// Reports from a multi-tool run plus the tools that could not be processed.
#[derive(Debug, Serialize)]
pub struct Batch<'a, T> {
    pub reports: &'a [T],
    pub failures: &'a [Anomaly],
}

pub fn format_remediations(
    reports: &[RemediationReport],
    failures: &[Anomaly],
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Plain => {
            let mut out: String = reports.iter().map(plain::remediation).collect();
            out.push_str(&plain::failures(failures));
            out
        }
        OutputFormat::Json => json::to_json(&Batch { reports, failures }),
    }
}

pub fn format_reinjection(report: &ReinjectionReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => plain::reinjection(report),
        OutputFormat::Json => json::to_json(report),
    }
}

pub fn format_tallies(tallies: &[CheckTally], failures: &[Anomaly], format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => {
            let mut out: String = tallies.iter().map(plain::tally).collect();
            out.push_str(&plain::failures(failures));
            out
        }
        OutputFormat::Json => json::to_json(&Batch {
            reports: tallies,
            failures,
        }),
    }
}
