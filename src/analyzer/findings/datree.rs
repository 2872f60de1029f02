//! Datree JSON output.
//!
//! Results nest as `policyValidationResults[].ruleResults[].occurrencesDetails[]`,
//! each occurrence naming a resource by `kind` and `metadataName` and listing
//! failure locations as JSON pointers (`schemaPath`). One finding is produced
//! per occurrence, located at the longest path its failure locations share.

use super::{Finding, FindingParser, Tool, decode};
use crate::analyzer::manifest::{FieldPath, ResourceRef};
use crate::error::Result;
use serde::Deserialize;

pub struct DatreeParser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    policy_validation_results: Option<Vec<PolicyResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyResult {
    #[serde(default)]
    rule_results: Option<Vec<RuleResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleResult {
    identifier: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message_on_failure: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    occurrences_details: Vec<Occurrence>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Occurrence {
    metadata_name: String,
    kind: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    failure_locations: Vec<FailureLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FailureLocation {
    #[serde(default)]
    schema_path: Option<String>,
}

/// Longest common prefix of the failure locations; `None` when there are
/// none or they only share the document root.
fn shared_path(paths: &[FieldPath]) -> Option<FieldPath> {
    let (first, rest) = paths.split_first()?;
    let len = rest.iter().fold(first.len(), |len, path| {
        first.segments()[..len]
            .iter()
            .zip(path.segments())
            .take_while(|(a, b)| a == b)
            .count()
    });
    (len > 0).then(|| FieldPath::from_segments(first.segments()[..len].to_vec()))
}

impl FindingParser for DatreeParser {
    fn tool(&self) -> Tool {
        Tool::Datree
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<Finding>> {
        let report: Report = decode(self.tool(), raw)?;
        let mut findings = Vec::new();

        let rules = report
            .policy_validation_results
            .unwrap_or_default()
            .into_iter()
            .flat_map(|policy| policy.rule_results.unwrap_or_default());

        for rule in rules {
            let severity = rule
                .severity
                .as_deref()
                .map(|s| self.map_severity(s))
                .unwrap_or_default();
            let message = rule
                .message_on_failure
                .clone()
                .or_else(|| rule.name.clone())
                .unwrap_or_default();

            for occurrence in &rule.occurrences_details {
                let mut resource = ResourceRef::new(&occurrence.kind, &occurrence.metadata_name);
                if let Some(ns) = &occurrence.namespace {
                    resource = resource.with_namespace(ns);
                }

                let paths: Vec<FieldPath> = occurrence
                    .failure_locations
                    .iter()
                    .filter_map(|loc| loc.schema_path.as_deref())
                    .filter(|p| !p.is_empty())
                    .map(FieldPath::from_pointer)
                    .collect();

                findings.push(
                    Finding::new(self.tool(), &rule.identifier, resource)
                        .with_severity(severity)
                        .with_path(shared_path(&paths))
                        .with_message(&message),
                );
            }
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::findings::Severity;
    use crate::analyzer::tally::CheckTally;

    const REPORT: &str = r#"{
      "policyValidationResults": [{
        "fileName": "mysql_template.yaml",
        "policyName": "Default",
        "ruleResults": [{
          "identifier": "CONTAINERS_MISSING_READINESSPROBE_KEY",
          "name": "Ensure each container has a configured readiness probe",
          "messageOnFailure": "Missing property object `readinessProbe`",
          "occurrencesDetails": [{
            "metadataName": "mysql",
            "kind": "StatefulSet",
            "failureLocations": [
              {"schemaPath": "/spec/template/spec/containers/0", "failedErrorLine": 40},
              {"schemaPath": "/spec/template/spec/containers/1", "failedErrorLine": 70}
            ]
          }]
        }, {
          "identifier": "WORKLOAD_INCORRECT_NAMESPACE_VALUE_DEFAULT",
          "name": "Prevent workload from using the default namespace",
          "severity": "high",
          "occurrencesDetails": [{"metadataName": "mysql", "kind": "Service", "failureLocations": []}]
        }]
      }],
      "policySummary": {"totalRulesFailed": 2}
    }"#;

    #[test]
    fn test_one_finding_per_occurrence() {
        let findings = DatreeParser.parse(REPORT.as_bytes()).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(
            findings[0].field_path.as_ref().unwrap().to_string(),
            "spec.template.spec.containers"
        );
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].message, "Missing property object `readinessProbe`");

        assert_eq!(findings[1].resource.kind, "Service");
        assert!(findings[1].field_path.is_none());
        assert_eq!(findings[1].severity, Severity::High);

        let tally = CheckTally::from_findings(Tool::Datree, None, Severity::Low, &findings);
        assert_eq!(tally.total, 2);
        assert_eq!(tally.by_rule["CONTAINERS_MISSING_READINESSPROBE_KEY"], 1);
    }

    #[test]
    fn test_single_location_kept_whole() {
        let paths = vec![FieldPath::from_pointer("/spec/template/spec/containers/0/image")];
        assert_eq!(
            shared_path(&paths).unwrap().to_string(),
            "spec.template.spec.containers[0].image"
        );
        assert!(shared_path(&[]).is_none());
        let disjoint = vec![FieldPath::from_pointer("/spec"), FieldPath::from_pointer("/metadata")];
        assert!(shared_path(&disjoint).is_none());
    }

    #[test]
    fn test_null_results_is_empty() {
        let raw = br#"{"policyValidationResults": null, "policySummary": {}}"#;
        assert!(DatreeParser.parse(raw).unwrap().is_empty());
    }
}
