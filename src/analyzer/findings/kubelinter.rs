//! kube-linter JSON output (`kube-linter lint --format json`).
//!
//! `Reports[]` carries one entry per failed check and object. kube-linter has
//! no severity scale, so every finding is `medium`; the affected container is
//! only mentioned in the diagnostic text (`container "nginx" ...`).

use super::{Finding, FindingParser, Severity, Tool, decode};
use crate::analyzer::manifest::{FieldPath, ResourceRef};
use crate::error::Result;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static CONTAINER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"container "([^"]+)""#).unwrap());

pub struct KubelinterParser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Report {
    #[serde(default)]
    reports: Option<Vec<Entry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Entry {
    check: String,
    diagnostic: Diagnostic,
    object: Object,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Diagnostic {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Object {
    k8s_object: K8sObject,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct K8sObject {
    #[serde(default)]
    namespace: String,
    name: String,
    group_version_kind: GroupVersionKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GroupVersionKind {
    kind: String,
}

fn container_path(message: &str) -> Option<FieldPath> {
    let caps = CONTAINER_NAME.captures(message)?;
    let name = caps.get(1)?.as_str();
    Some(FieldPath::template().key("spec").key("containers").named(name))
}

impl FindingParser for KubelinterParser {
    fn tool(&self) -> Tool {
        Tool::Kubelinter
    }

    fn map_severity(&self, _label: &str) -> Severity {
        Severity::Medium
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<Finding>> {
        let report: Report = decode(self.tool(), raw)?;
        let findings = report
            .reports
            .unwrap_or_default()
            .into_iter()
            .map(|entry| {
                let obj = entry.object.k8s_object;
                let resource = ResourceRef::new(obj.group_version_kind.kind, obj.name)
                    .with_namespace(obj.namespace);
                Finding::new(self.tool(), entry.check, resource)
                    .with_severity(self.map_severity(""))
                    .with_path(container_path(&entry.diagnostic.message))
                    .with_message(entry.diagnostic.message)
            })
            .collect();
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reports() {
        let raw = r#"{
          "Checks": [{"name": "no-read-only-root-fs"}],
          "Reports": [{
            "Diagnostic": {"Message": "container \"mysql\" does not have a read-only root file system"},
            "Check": "no-read-only-root-fs",
            "Remediation": "Set readOnlyRootFilesystem to true in the container securityContext.",
            "Object": {
              "Metadata": {"FilePath": "templates/mysql_template.yaml"},
              "K8sObject": {
                "Namespace": "default",
                "Name": "mysql",
                "GroupVersionKind": {"Group": "apps", "Version": "v1", "Kind": "StatefulSet"}
              }
            }
          }, {
            "Diagnostic": {"Message": "object has 1 replica but minimum required replicas is 3"},
            "Check": "minimum-three-replicas",
            "Object": {"K8sObject": {"Namespace": "", "Name": "mysql", "GroupVersionKind": {"Kind": "StatefulSet"}}}
          }],
          "Summary": {"ChecksStatus": "Failed"}
        }"#;
        let findings = KubelinterParser.parse(raw.as_bytes()).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].resource.to_string(), "StatefulSet/default/mysql");
        assert_eq!(
            findings[0].field_path.as_ref().unwrap().to_string(),
            "@template.spec.containers[mysql]"
        );
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[1].resource.namespace.is_none());
        assert!(findings[1].field_path.is_none());
    }

    #[test]
    fn test_null_reports() {
        let raw = br#"{"Checks": [], "Reports": null, "Summary": {"ChecksStatus": "Passed"}}"#;
        assert!(KubelinterParser.parse(raw).unwrap().is_empty());
    }
}
