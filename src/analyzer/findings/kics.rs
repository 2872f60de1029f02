//! KICS JSON output.
//!
//! Each entry of `queries[]` is one rule (identified by a UUID) with the
//! affected `files[]`. A file entry names the resource by `resource_type` and
//! `resource_name` and locates the problem with a search key such as
//! `metadata.name={{web}}.spec.template.spec.containers.name={{nginx}}.securityContext`.

use super::{Finding, FindingParser, Tool, decode};
use crate::analyzer::manifest::{FieldPath, ResourceRef};
use crate::error::Result;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static NAME_SELECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.name=(?:\{\{([^}]*)\}\}|([^.\[]+))").unwrap());

pub struct KicsParser;

#[derive(Debug, Deserialize)]
struct Report {
    queries: Vec<Query>,
}

#[derive(Debug, Deserialize)]
struct Query {
    query_id: String,
    #[serde(default)]
    query_name: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    resource_type: String,
    #[serde(default)]
    resource_name: String,
    #[serde(default)]
    search_key: String,
    #[serde(default)]
    expected_value: Option<String>,
}

/// Convert a search key into a field path. The leading
/// `metadata.name={{...}}` identifies the document and is dropped; every
/// later `.name={{x}}` becomes a `[x]` selector on the preceding list.
fn search_key_to_path(search_key: &str) -> Option<FieldPath> {
    let (_, rest) = search_key.split_once("}}.")?;
    if !search_key.starts_with("metadata.name=") {
        return None;
    }
    let converted = NAME_SELECTOR.replace_all(rest, |caps: &regex::Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        format!("[{}]", name)
    });
    converted.parse().ok()
}

impl FindingParser for KicsParser {
    fn tool(&self) -> Tool {
        Tool::Kics
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<Finding>> {
        let report: Report = decode(self.tool(), raw)?;
        let mut findings = Vec::new();

        for query in report.queries {
            let severity = query
                .severity
                .as_deref()
                .map(|s| self.map_severity(s))
                .unwrap_or_default();
            for file in &query.files {
                let resource = if file.resource_type.is_empty() || file.resource_name.is_empty() {
                    let label = if file.file_name.is_empty() {
                        &file.search_key
                    } else {
                        &file.file_name
                    };
                    log::debug!(
                        "kics: {} entry without a resource ({})",
                        query.query_id,
                        file.search_key
                    );
                    ResourceRef::unresolved(label)
                } else {
                    ResourceRef::new(&file.resource_type, &file.resource_name)
                };
                let message = file
                    .expected_value
                    .clone()
                    .or_else(|| query.query_name.clone())
                    .unwrap_or_default();
                findings.push(
                    Finding::new(self.tool(), &query.query_id, resource)
                        .with_severity(severity)
                        .with_path(search_key_to_path(&file.search_key))
                        .with_message(message),
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

    #[test]
    fn test_search_key_conversion() {
        let path = search_key_to_path(
            "metadata.name={{web}}.spec.template.spec.containers.name={{nginx}}.securityContext",
        )
        .unwrap();
        assert_eq!(
            path.to_string(),
            "spec.template.spec.containers[nginx].securityContext"
        );

        let plain = search_key_to_path("metadata.name={{web}}.spec.template.spec.hostPID").unwrap();
        assert_eq!(plain.to_string(), "spec.template.spec.hostPID");

        assert!(search_key_to_path("kind={{Deployment}}").is_none());
    }

    #[test]
    fn test_parse_queries() {
        let raw = r#"{
          "kics_version": "v1.7.0",
          "queries": [{
            "query_name": "Container Running As Root",
            "query_id": "cf34805e-3872-4c08-bf92-6ff7bb0cfadb",
            "severity": "MEDIUM",
            "files": [{
              "file_name": "templates/mysql_template.yaml",
              "resource_type": "StatefulSet",
              "resource_name": "mysql",
              "search_key": "metadata.name={{mysql}}.spec.template.spec.containers.name={{mysql}}.securityContext.runAsUser",
              "expected_value": "runAsUser should be set"
            }, {
              "file_name": "templates/mysql_template.yaml",
              "resource_type": "",
              "resource_name": "",
              "search_key": "apiVersion={{v1}}"
            }]
          }, {
            "query_name": "Seccomp Profile Is Not Configured",
            "query_id": "f377b83e-bd07-4f48-a591-60c82b14a78b",
            "severity": "TRACE",
            "files": []
          }]
        }"#;
        let findings = KicsParser.parse(raw.as_bytes()).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(
            findings[1].resource,
            ResourceRef::unresolved("templates/mysql_template.yaml")
        );
        assert!(findings[1].field_path.is_none());
        let f = &findings[0];
        assert_eq!(f.rule_id, "cf34805e-3872-4c08-bf92-6ff7bb0cfadb");
        assert_eq!(f.severity, Severity::Medium);
        assert_eq!(f.resource.to_string(), "StatefulSet/mysql");
        assert_eq!(
            f.field_path.as_ref().unwrap().to_string(),
            "spec.template.spec.containers[mysql].securityContext.runAsUser"
        );
    }
}
