use crate::analyzer::Iteration;
use crate::analyzer::findings::{Severity, Tool};
use crate::error::{HardenerError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub tally: TallyConfig,
}

/// Where each pipeline stage reads and writes its files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub templates_dir: PathBuf,
    pub fixed_dir: PathBuf,
    pub functionality_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            fixed_dir: PathBuf::from("fixed_templates"),
            functionality_dir: PathBuf::from("functionality_templates"),
            profiles_dir: PathBuf::from("functionality_profiles"),
            results_dir: PathBuf::from("."),
        }
    }
}

impl LayoutConfig {
    /// `<templates_dir>/<chart>_template.yaml`
    pub fn template_manifest(&self, chart: &str) -> PathBuf {
        self.templates_dir.join(format!("{}_template.yaml", chart))
    }

    /// `<fixed_dir>/<chart>_<tool>_fixed_template.yaml`
    pub fn fixed_manifest(&self, chart: &str, tool: Tool) -> PathBuf {
        self.fixed_dir
            .join(format!("{}_{}_fixed_template.yaml", chart, tool))
    }

    /// `<fixed_dir>/<chart>_<tool>_fixed_report.json`
    pub fn fixed_report(&self, chart: &str, tool: Tool) -> PathBuf {
        self.fixed_dir
            .join(format!("{}_{}_fixed_report.json", chart, tool))
    }

    /// `<functionality_dir>/<chart>_func_template.yaml`
    pub fn functional_manifest(&self, chart: &str) -> PathBuf {
        self.functionality_dir
            .join(format!("{}_func_template.yaml", chart))
    }

    /// `<functionality_dir>/<chart>_func_report.json`
    pub fn functional_report(&self, chart: &str) -> PathBuf {
        self.functionality_dir
            .join(format!("{}_func_report.json", chart))
    }

    /// `<results_dir>/<tool>_results.json`
    pub fn results_file(&self, tool: Tool) -> PathBuf {
        self.results_dir.join(format!("{}_results.json", tool))
    }

    /// The manifest a stage reads for an iteration. Iteration 2 reads the
    /// output of the first tool's remediation.
    pub fn stage_manifest(
        &self,
        chart: &str,
        iteration: Iteration,
        first_tool: Option<Tool>,
    ) -> Result<PathBuf> {
        Ok(match iteration {
            Iteration::Original => self.template_manifest(chart),
            Iteration::Remediated => {
                let tool = first_tool.ok_or(HardenerError::MissingSelector(
                    "first tool (--first-tool or $first_tool)",
                ))?;
                self.fixed_manifest(chart, tool)
            }
            Iteration::Functional => self.functional_manifest(chart),
        })
    }
}

/// Check counting thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Findings at or above this level count as failing.
    pub severity_floor: Severity,
    /// Exit non-zero from `--count-checks` when any tally fails.
    pub fail_on_findings: bool,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            severity_floor: Severity::Low,
            fail_on_findings: false,
        }
    }
}
