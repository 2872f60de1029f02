//! Shared finding representation.
//!
//! - `Tool` - the seven supported scanners
//! - `Severity` - the shared five-level scale
//! - `Finding` - one normalized misconfiguration report

use crate::analyzer::manifest::{FieldPath, ResourceRef};
use crate::error::HardenerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scanners whose output can be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Checkov,
    Datree,
    Kics,
    Kubelinter,
    Kubeaudit,
    Kubescape,
    Terrascan,
}

impl Tool {
    pub const ALL: [Tool; 7] = [
        Tool::Checkov,
        Tool::Datree,
        Tool::Kics,
        Tool::Kubelinter,
        Tool::Kubeaudit,
        Tool::Kubescape,
        Tool::Terrascan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checkov => "checkov",
            Self::Datree => "datree",
            Self::Kics => "kics",
            Self::Kubelinter => "kubelinter",
            Self::Kubeaudit => "kubeaudit",
            Self::Kubescape => "kubescape",
            Self::Terrascan => "terrascan",
        }
    }

    /// Parse a comma-separated tool list such as `checkov,kics`.
    pub fn parse_list(list: &str) -> Result<Vec<Tool>, HardenerError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tool {
    type Err = HardenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "checkov" => Ok(Self::Checkov),
            "datree" => Ok(Self::Datree),
            "kics" => Ok(Self::Kics),
            "kubelinter" | "kube-linter" => Ok(Self::Kubelinter),
            "kubeaudit" => Ok(Self::Kubeaudit),
            "kubescape" => Ok(Self::Kubescape),
            "terrascan" => Ok(Self::Terrascan),
            _ => Err(HardenerError::UnknownTool(s.to_string())),
        }
    }
}

/// Severity on the shared five-level scale, ordered `Info < ... < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All levels, most severe first.
    pub const DESCENDING: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Parse a level name (case-insensitive). Accepts the common aliases
    /// scanners use for the same level.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" | "error" => Some(Self::High),
            "medium" | "moderate" | "warning" => Some(Self::Medium),
            "low" | "note" => Some(Self::Low),
            "info" | "informational" | "trace" => Some(Self::Info),
            _ => None,
        }
    }

    /// Like [`Severity::parse`], mapping unknown words to `Medium`.
    pub fn from_label(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

impl FromStr for Severity {
    type Err = HardenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            HardenerError::Config(format!(
                "unknown severity '{}' (expected critical, high, medium, low or info)",
                s
            ))
        })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One normalized misconfiguration report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub tool: Tool,
    pub rule_id: String,
    pub severity: Severity,
    pub resource: ResourceRef,
    /// `None` when the tool reports at resource granularity only.
    pub field_path: Option<FieldPath>,
    pub message: String,
}

impl Finding {
    pub fn new(tool: Tool, rule_id: impl Into<String>, resource: ResourceRef) -> Self {
        Self {
            tool,
            rule_id: rule_id.into(),
            severity: Severity::default(),
            resource,
            field_path: None,
            message: String::new(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_path(mut self, path: Option<FieldPath>) -> Self {
        self.field_path = path;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_parsing() {
        assert_eq!("Checkov".parse::<Tool>().unwrap(), Tool::Checkov);
        assert_eq!("kube-linter".parse::<Tool>().unwrap(), Tool::Kubelinter);
        assert!(matches!(
            "trivy".parse::<Tool>(),
            Err(HardenerError::UnknownTool(_))
        ));
        assert_eq!(
            Tool::parse_list("kics, terrascan").unwrap(),
            vec![Tool::Kics, Tool::Terrascan]
        );
    }

    #[test]
    fn test_severity_ordering_and_fallback() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low > Severity::Info);
        assert_eq!(Severity::from_label("TRACE"), Severity::Info);
        assert_eq!(Severity::from_label("whatever"), Severity::Medium);
        assert_eq!(Severity::parse("bogus"), None);
    }
}
