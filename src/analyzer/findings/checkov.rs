//! Checkov JSON output.
//!
//! Checkov prints one report object per framework, or an array of them when
//! several frameworks ran. Failed checks live in `results.failed_checks[]`;
//! the resource is encoded as `Kind.namespace.name` and the first evaluated
//! key is a slash path such as `spec/containers/[0]/securityContext`.

use super::{Finding, FindingParser, Severity, Tool, decode};
use crate::analyzer::manifest::{FieldPath, ResourceRef};
use crate::error::{HardenerError, Result};
use serde::Deserialize;

pub struct CheckovParser;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Report {
    Many(Vec<Run>),
    One(Run),
}

#[derive(Debug, Deserialize)]
struct Run {
    #[serde(default)]
    results: Option<Results>,
}

#[derive(Debug, Deserialize)]
struct Results {
    #[serde(default)]
    failed_checks: Vec<FailedCheck>,
}

#[derive(Debug, Deserialize)]
struct FailedCheck {
    check_id: String,
    #[serde(default)]
    check_name: Option<String>,
    resource: String,
    #[serde(default)]
    check_result: Option<CheckResult>,
    #[serde(default)]
    severity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckResult {
    #[serde(default)]
    evaluated_keys: Option<Vec<String>>,
}

/// `Deployment.default.web` -> `Deployment/default/web`. Names may contain
/// dots, so only the first two separators split.
fn parse_resource(resource: &str) -> Option<ResourceRef> {
    let mut parts = resource.splitn(3, '.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(kind), Some(ns), Some(name)) => Some(ResourceRef::new(kind, name).with_namespace(ns)),
        (Some(kind), Some(name), None) => Some(ResourceRef::new(kind, name)),
        _ => None,
    }
}

impl FindingParser for CheckovParser {
    fn tool(&self) -> Tool {
        Tool::Checkov
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<Finding>> {
        let runs = match decode::<Report>(self.tool(), raw)? {
            Report::Many(runs) => runs,
            Report::One(run) => vec![run],
        };

        let mut findings = Vec::new();
        for check in runs
            .into_iter()
            .filter_map(|run| run.results)
            .flat_map(|results| results.failed_checks)
        {
            let resource = parse_resource(&check.resource).ok_or_else(|| {
                HardenerError::malformed(
                    self.tool(),
                    format!("unrecognised resource '{}'", check.resource),
                )
            })?;
            let path = check
                .check_result
                .and_then(|r| r.evaluated_keys)
                .and_then(|keys| keys.into_iter().next())
                .filter(|key| !key.is_empty())
                .map(|key| FieldPath::from_slash(&key));
            let severity = check
                .severity
                .as_deref()
                .map(|s| self.map_severity(s))
                .unwrap_or(Severity::Medium);

            findings.push(
                Finding::new(self.tool(), check.check_id, resource)
                    .with_severity(severity)
                    .with_path(path)
                    .with_message(check.check_name.unwrap_or_default()),
            );
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
      "check_type": "kubernetes",
      "results": {
        "passed_checks": [],
        "failed_checks": [
          {
            "check_id": "CKV_K8S_23",
            "check_name": "Minimize the admission of root containers",
            "resource": "Deployment.default.web",
            "check_result": {"result": "FAILED", "evaluated_keys": ["spec/template/spec/containers/[0]/securityContext/runAsNonRoot"]},
            "severity": "HIGH"
          },
          {
            "check_id": "CKV_K8S_21",
            "check_name": "The default namespace should not be used",
            "resource": "Service.default.web.v2",
            "check_result": {"result": "FAILED", "evaluated_keys": null},
            "severity": null
          }
        ]
      },
      "summary": {"failed": 2}
    }"#;

    #[test]
    fn test_parse_failed_checks() {
        let findings = CheckovParser.parse(REPORT.as_bytes()).unwrap();
        assert_eq!(findings.len(), 2);

        let first = &findings[0];
        assert_eq!(first.rule_id, "CKV_K8S_23");
        assert_eq!(first.severity, Severity::High);
        assert_eq!(first.resource.to_string(), "Deployment/default/web");
        assert_eq!(
            first.field_path.as_ref().unwrap().to_string(),
            "spec.template.spec.containers[0].securityContext.runAsNonRoot"
        );

        let second = &findings[1];
        assert_eq!(second.resource.name, "web.v2");
        assert_eq!(second.severity, Severity::Medium);
        assert!(second.field_path.is_none());
    }

    #[test]
    fn test_array_of_reports_and_empty_summary() {
        let many = format!("[{}, {{\"passed\": 0, \"failed\": 0}}]", REPORT);
        assert_eq!(CheckovParser.parse(many.as_bytes()).unwrap().len(), 2);
        assert!(CheckovParser.parse(b"{\"passed\": 3}").unwrap().is_empty());
    }

    #[test]
    fn test_missing_check_id_is_malformed() {
        let bad = r#"{"results": {"failed_checks": [{"resource": "Pod.default.a"}]}}"#;
        assert!(CheckovParser.parse(bad.as_bytes()).is_err());
    }
}
