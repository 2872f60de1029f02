//! Error types for chart-hardener.
//!
//! Only two conditions are fatal for a pipeline stage: a scanner result file
//! that does not match its tool's schema, and a chart without a functionality
//! profile. Everything else the stages notice (unmapped rules, conflicting
//! re-injections, unresolved resources) is reported as data in the stage
//! summary, not raised as an error.

use crate::analyzer::findings::Tool;
use crate::analyzer::manifest::ResourceRef;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the hardening pipeline.
#[derive(Debug, Error)]
pub enum HardenerError {
    /// A scanner result file does not match the tool's documented schema.
    #[error("malformed {tool} output: {reason}")]
    MalformedOutput {
        /// Tool whose output failed to parse
        tool: Tool,
        /// What was wrong with it
        reason: String,
    },

    /// No functionality profile exists for the chart.
    #[error("no functionality profile for chart '{chart}' (looked in {})", path.display())]
    MissingProfile {
        /// Chart identity
        chart: String,
        /// Path that was probed
        path: PathBuf,
    },

    /// The manifest YAML could not be parsed.
    #[error("failed to parse manifest: {0}")]
    ManifestParse(String),

    /// Two documents in one manifest share the same identity.
    #[error("duplicate resource in manifest: {0}")]
    DuplicateResource(ResourceRef),

    /// A resource named on the command line is not in the manifest.
    #[error("resource {0} not found in manifest")]
    ResourceNotFound(ResourceRef),

    /// A resource lacks a field the operation needs.
    #[error("{resource} has nothing at '{path}'")]
    MissingField {
        /// Resource that was inspected
        resource: ResourceRef,
        /// Path that was expected to hold a value
        path: String,
    },

    /// A field path string could not be parsed.
    #[error("invalid field path '{path}': {reason}")]
    InvalidFieldPath {
        /// The offending path text
        path: String,
        /// Parse failure detail
        reason: String,
    },

    /// A field path runs through a node of the wrong shape.
    #[error("cannot edit '{path}': {reason}")]
    PathConflict {
        /// Concrete path being edited
        path: String,
        /// Shape mismatch detail
        reason: String,
    },

    /// Tool name not recognised.
    #[error("unsupported tool '{0}' (expected one of: checkov, datree, kics, kubelinter, kubeaudit, kubescape, terrascan)")]
    UnknownTool(String),

    /// Iteration selector outside 1..=3.
    #[error("invalid iteration '{0}' (expected 1, 2 or 3)")]
    InvalidIteration(String),

    /// Configuration problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required run selector was not supplied.
    #[error("missing selector: {0}")]
    MissingSelector(&'static str),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure outside of scanner parsing.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl HardenerError {
    /// Shorthand for a `MalformedOutput` error.
    pub fn malformed(tool: Tool, reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            tool,
            reason: reason.into(),
        }
    }
}

/// Result type alias for chart-hardener operations.
pub type Result<T> = std::result::Result<T, HardenerError>;
