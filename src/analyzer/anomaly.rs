//! Non-fatal conditions surfaced in stage summaries.

use crate::analyzer::findings::Tool;
use crate::analyzer::manifest::ResourceRef;
use serde::Serialize;
use serde_yaml::Value;
use std::fmt;

/// Something a stage noticed but did not abort on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// No patch rule matches the finding.
    UnmappedRule {
        tool: Tool,
        rule_id: String,
        resource: ResourceRef,
    },
    /// The finding names a resource the manifest does not contain.
    ResourceNotFound {
        rule_id: String,
        resource: ResourceRef,
    },
    /// Neither the finding nor the rule locate a field to patch.
    NoTargetPath {
        rule_id: String,
        resource: ResourceRef,
    },
    /// A patch ran into a node of the wrong shape and was rolled back.
    PatchConflict {
        rule_id: String,
        resource: ResourceRef,
        detail: String,
    },
    /// A functionality requirement overwrote what remediation left behind.
    ConflictingReinjection {
        resource: ResourceRef,
        path: String,
        required: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        remediated: Option<Value>,
    },
    /// A presence-only requirement is missing and has no source to restore from.
    UnrestorableRequirement {
        resource: ResourceRef,
        path: String,
        reason: String,
    },
    /// A tool's result file could not be parsed; other tools still ran.
    MalformedOutput { tool: Tool, reason: String },
}

impl Anomaly {
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnmappedRule { .. } => "unmapped rule",
            Self::ResourceNotFound { .. } => "resource not found",
            Self::NoTargetPath { .. } => "no target path",
            Self::PatchConflict { .. } => "patch conflict",
            Self::ConflictingReinjection { .. } => "conflicting re-injection",
            Self::UnrestorableRequirement { .. } => "unrestorable requirement",
            Self::MalformedOutput { .. } => "malformed output",
        }
    }
}

fn yaml_inline(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappedRule {
                tool,
                rule_id,
                resource,
            } => write!(f, "{} rule {} has no patch ({})", tool, rule_id, resource),
            Self::ResourceNotFound { rule_id, resource } => {
                write!(f, "{}: {} is not in the manifest", rule_id, resource)
            }
            Self::NoTargetPath { rule_id, resource } => {
                write!(f, "{}: no field path to patch on {}", rule_id, resource)
            }
            Self::PatchConflict {
                rule_id,
                resource,
                detail,
            } => write!(f, "{}: patch on {} rolled back: {}", rule_id, resource, detail),
            Self::ConflictingReinjection {
                resource,
                path,
                required,
                remediated,
            } => {
                let found = remediated
                    .as_ref()
                    .map(yaml_inline)
                    .unwrap_or_else(|| "<absent>".to_string());
                write!(
                    f,
                    "{} {}: restored {} over remediated {}",
                    resource,
                    path,
                    yaml_inline(required),
                    found
                )
            }
            Self::UnrestorableRequirement {
                resource,
                path,
                reason,
            } => write!(f, "{} {}: {}", resource, path, reason),
            Self::MalformedOutput { tool, reason } => write!(f, "{}: {}", tool, reason),
        }
    }
}
