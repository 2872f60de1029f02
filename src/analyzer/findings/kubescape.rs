//! Kubescape JSON output (`kubescape scan --format json`).
//!
//! `results[]` holds one entry per resource; its failed controls carry rule
//! paths (`failedPath`, `fixPath`, `deletePath`, `reviewPath`) in dotted form.
//! Kubescape scores controls rather than labelling them, so severity comes
//! from `summaryDetails.controls[<id>].scoreFactor`.

use super::{Finding, FindingParser, Severity, Tool, decode};
use crate::analyzer::manifest::{FieldPath, ResourceRef};
use crate::error::{HardenerError, Result};
use serde::Deserialize;
use std::collections::HashMap;

pub struct KubescapeParser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    #[serde(default)]
    summary_details: Option<SummaryDetails>,
    #[serde(default)]
    results: Option<Vec<ResourceResult>>,
}

#[derive(Debug, Deserialize)]
struct SummaryDetails {
    #[serde(default)]
    controls: HashMap<String, ControlSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ControlSummary {
    #[serde(default)]
    score_factor: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceResult {
    #[serde(rename = "resourceID")]
    resource_id: String,
    #[serde(default)]
    controls: Vec<Control>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Control {
    #[serde(rename = "controlID")]
    control_id: String,
    #[serde(default)]
    name: String,
    status: Status,
    #[serde(default)]
    rules: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct Rule {
    #[serde(default)]
    paths: Option<Vec<RulePath>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RulePath {
    #[serde(default)]
    fix_path: Option<FixPath>,
    #[serde(default)]
    failed_path: Option<String>,
    #[serde(default)]
    delete_path: Option<String>,
    #[serde(default)]
    review_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FixPath {
    #[serde(default)]
    path: String,
}

impl RulePath {
    fn field_path(&self) -> Option<FieldPath> {
        let text = self
            .fix_path
            .as_ref()
            .map(|f| f.path.as_str())
            .into_iter()
            .chain(self.failed_path.as_deref())
            .chain(self.delete_path.as_deref())
            .chain(self.review_path.as_deref())
            .find(|p| !p.is_empty())?;
        text.parse().ok()
    }
}

/// Resource IDs end in `<namespace>/<Kind>/<name>`, with an empty namespace
/// for cluster-scoped objects.
fn parse_resource_id(id: &str) -> Option<ResourceRef> {
    let parts: Vec<&str> = id.rsplitn(4, '/').collect();
    match parts.as_slice() {
        [name, kind, ns, ..] if !name.is_empty() && !kind.is_empty() => {
            Some(ResourceRef::new(*kind, *name).with_namespace(*ns))
        }
        _ => None,
    }
}

/// scoreFactor runs from 1 to 10.
fn severity_from_score(score: f64) -> Severity {
    if score >= 9.0 {
        Severity::Critical
    } else if score >= 7.0 {
        Severity::High
    } else if score >= 4.0 {
        Severity::Medium
    } else if score >= 1.0 {
        Severity::Low
    } else {
        Severity::Info
    }
}

impl FindingParser for KubescapeParser {
    fn tool(&self) -> Tool {
        Tool::Kubescape
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<Finding>> {
        let report: Report = decode(self.tool(), raw)?;
        let scores: HashMap<String, f64> = report
            .summary_details
            .map(|s| s.controls)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(id, c)| c.score_factor.map(|score| (id, score)))
            .collect();

        let mut findings = Vec::new();
        for result in report.results.unwrap_or_default() {
            let resource = parse_resource_id(&result.resource_id).ok_or_else(|| {
                HardenerError::malformed(
                    self.tool(),
                    format!("unrecognised resourceID '{}'", result.resource_id),
                )
            })?;

            for control in result.controls {
                if control.status.status != "failed" {
                    continue;
                }
                let severity = scores
                    .get(&control.control_id)
                    .map(|score| severity_from_score(*score))
                    .unwrap_or_default();

                // One finding per rule path; a rule without paths still counts once.
                let mut paths: Vec<Option<FieldPath>> = Vec::new();
                for rule in &control.rules {
                    match rule.paths.as_deref() {
                        Some(rule_paths) if !rule_paths.is_empty() => {
                            paths.extend(rule_paths.iter().map(RulePath::field_path));
                        }
                        _ => paths.push(None),
                    }
                }
                if paths.is_empty() {
                    paths.push(None);
                }

                for path in paths {
                    findings.push(
                        Finding::new(self.tool(), &control.control_id, resource.clone())
                            .with_severity(severity)
                            .with_path(path)
                            .with_message(&control.name),
                    );
                }
            }
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
      "summaryDetails": {
        "controls": {
          "C-0017": {"controlID": "C-0017", "name": "Immutable container filesystem", "scoreFactor": 3},
          "C-0057": {"controlID": "C-0057", "name": "Privileged container", "scoreFactor": 8}
        }
      },
      "results": [{
        "resourceID": "path=1234/api=apps/v1/default/Deployment/web",
        "controls": [{
          "controlID": "C-0017",
          "name": "Immutable container filesystem",
          "status": {"status": "failed"},
          "rules": [{
            "name": "immutable-container-filesystem",
            "status": "failed",
            "paths": [{"fixPath": {"path": "spec.template.spec.containers[0].securityContext.readOnlyRootFilesystem", "value": "true"}}]
          }]
        }, {
          "controlID": "C-0057",
          "name": "Privileged container",
          "status": {"status": "passed"},
          "rules": []
        }, {
          "controlID": "C-0030",
          "name": "Ingress and Egress blocked",
          "status": {"status": "failed"},
          "rules": [{"name": "ingress-and-egress-blocked", "status": "failed"}]
        }]
      }]
    }"#;

    #[test]
    fn test_failed_controls_only() {
        let findings = KubescapeParser.parse(REPORT.as_bytes()).unwrap();
        assert_eq!(findings.len(), 2);

        assert_eq!(findings[0].rule_id, "C-0017");
        assert_eq!(findings[0].severity, Severity::Low);
        assert_eq!(findings[0].resource.to_string(), "Deployment/default/web");
        assert_eq!(
            findings[0].field_path.as_ref().unwrap().to_string(),
            "spec.template.spec.containers[0].securityContext.readOnlyRootFilesystem"
        );

        assert_eq!(findings[1].rule_id, "C-0030");
        assert_eq!(findings[1].severity, Severity::Medium);
        assert!(findings[1].field_path.is_none());
    }

    #[test]
    fn test_each_pathless_rule_counts() {
        let raw = r#"{"results": [{
          "resourceID": "apps/v1/default/Deployment/web",
          "controls": [{
            "controlID": "C-0030",
            "name": "Ingress and Egress blocked",
            "status": {"status": "failed"},
            "rules": [
              {"name": "ingress-and-egress-blocked", "paths": []},
              {"name": "ingress-and-egress-blocked-v2"}
            ]
          }]
        }]}"#;
        let findings = KubescapeParser.parse(raw.as_bytes()).unwrap();
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.field_path.is_none()));
    }

    #[test]
    fn test_cluster_scoped_resource_id() {
        let r = parse_resource_id("rbac.authorization.k8s.io/v1//ClusterRole/admin").unwrap();
        assert_eq!(r.kind, "ClusterRole");
        assert!(r.namespace.is_none());
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(severity_from_score(9.0), Severity::Critical);
        assert_eq!(severity_from_score(7.5), Severity::High);
        assert_eq!(severity_from_score(0.0), Severity::Info);
    }
}
