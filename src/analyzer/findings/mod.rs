//! Scanner output parsers.
//!
//! Each supported scanner gets one adapter implementing [`FindingParser`];
//! all of them produce the shared [`Finding`] shape in the order the tool
//! reported its results. Adding a scanner means adding one adapter and one
//! arm in [`parser_for`], nothing else.

pub mod checkov;
pub mod datree;
pub mod kics;
pub mod kubeaudit;
pub mod kubelinter;
pub mod kubescape;
pub mod terrascan;
pub mod types;

pub use types::{Finding, Severity, Tool};

use crate::error::{HardenerError, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Adapter from one scanner's native output to normalized findings.
pub trait FindingParser: Send + Sync {
    /// The scanner this adapter understands.
    fn tool(&self) -> Tool;

    /// Parse raw scanner output. Zero findings is a valid result; output
    /// that does not match the tool's schema is `MalformedOutput`.
    fn parse(&self, raw: &[u8]) -> Result<Vec<Finding>>;

    /// Map the tool's severity vocabulary onto the shared scale.
    fn map_severity(&self, label: &str) -> Severity {
        Severity::from_label(label)
    }
}

/// The adapter for a tool.
pub fn parser_for(tool: Tool) -> Box<dyn FindingParser> {
    match tool {
        Tool::Checkov => Box::new(checkov::CheckovParser),
        Tool::Datree => Box::new(datree::DatreeParser),
        Tool::Kics => Box::new(kics::KicsParser),
        Tool::Kubelinter => Box::new(kubelinter::KubelinterParser),
        Tool::Kubeaudit => Box::new(kubeaudit::KubeauditParser),
        Tool::Kubescape => Box::new(kubescape::KubescapeParser),
        Tool::Terrascan => Box::new(terrascan::TerrascanParser),
    }
}

/// Parse raw output for a tool.
pub fn parse_findings(tool: Tool, raw: &[u8]) -> Result<Vec<Finding>> {
    let findings = parser_for(tool).parse(raw)?;
    log::debug!("{}: parsed {} finding(s)", tool, findings.len());
    Ok(findings)
}

/// Read and parse a tool's result file.
pub fn read_findings(tool: Tool, path: &Path) -> Result<Vec<Finding>> {
    let raw = std::fs::read(path)?;
    parse_findings(tool, &raw)
}

/// Deserialize a tool's JSON document, mapping schema errors to
/// `MalformedOutput`.
pub(crate) fn decode<T: DeserializeOwned>(tool: Tool, raw: &[u8]) -> Result<T> {
    serde_json::from_slice(raw).map_err(|e| HardenerError::malformed(tool, e.to_string()))
}
