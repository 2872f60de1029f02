//! kubeaudit JSON output (`kubeaudit all --format json`).
//!
//! kubeaudit writes one JSON object per line rather than a single document.
//! Files that were already wrapped as `{"checks": [...]}` are accepted too,
//! and an empty file means a clean audit.

use super::{Finding, FindingParser, Tool};
use crate::analyzer::manifest::{FieldPath, ResourceRef};
use crate::error::{HardenerError, Result};
use serde::Deserialize;
use serde_json::Value;

pub struct KubeauditParser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Entry {
    audit_result_name: String,
    resource_kind: String,
    #[serde(default)]
    resource_namespace: String,
    resource_name: String,
    #[serde(default)]
    container: Option<String>,
    #[serde(default, rename = "level")]
    level: String,
    #[serde(default, rename = "msg")]
    msg: String,
}

impl KubeauditParser {
    fn records(&self, raw: &[u8]) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        for value in serde_json::Deserializer::from_slice(raw).into_iter::<Value>() {
            values.push(value.map_err(|e| HardenerError::malformed(self.tool(), e.to_string()))?);
        }

        if let [Value::Object(wrapper)] = values.as_slice()
            && let Some(checks) = wrapper.get("checks")
        {
            return match checks {
                Value::Array(items) => Ok(items.clone()),
                _ => Err(HardenerError::malformed(self.tool(), "'checks' is not an array")),
            };
        }
        Ok(values)
    }
}

impl FindingParser for KubeauditParser {
    fn tool(&self) -> Tool {
        Tool::Kubeaudit
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for record in self.records(raw)? {
            let entry: Entry = serde_json::from_value(record)
                .map_err(|e| HardenerError::malformed(self.tool(), e.to_string()))?;

            let resource = ResourceRef::new(entry.resource_kind, entry.resource_name)
                .with_namespace(entry.resource_namespace);
            let path = entry
                .container
                .filter(|c| !c.is_empty())
                .map(|c| FieldPath::template().key("spec").key("containers").named(c));

            findings.push(
                Finding::new(self.tool(), entry.audit_result_name, resource)
                    .with_severity(self.map_severity(&entry.level))
                    .with_path(path)
                    .with_message(entry.msg),
            );
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::findings::Severity;

    const LINES: &str = r#"{"AuditResultName":"AppArmorAnnotationMissing","Container":"mysql","MissingAnnotation":"container.apparmor.security.beta.kubernetes.io/mysql","ResourceApiVersion":"apps/v1","ResourceKind":"StatefulSet","ResourceName":"mysql","ResourceNamespace":"default","level":"error","msg":"AppArmor annotation missing."}
{"AuditResultName":"AutomountServiceAccountTokenTrueAndDefaultSA","ResourceApiVersion":"apps/v1","ResourceKind":"StatefulSet","ResourceName":"mysql","ResourceNamespace":"default","level":"warning","msg":"Default service account with token mounted."}
"#;

    #[test]
    fn test_newline_delimited_objects() {
        let findings = KubeauditParser.parse(LINES.as_bytes()).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(
            findings[0].field_path.as_ref().unwrap().to_string(),
            "@template.spec.containers[mysql]"
        );
        assert_eq!(findings[1].severity, Severity::Medium);
        assert!(findings[1].field_path.is_none());
    }

    #[test]
    fn test_wrapped_checks() {
        let body: Vec<&str> = LINES.lines().collect();
        let wrapped = format!("{{\"checks\": [{}]}}", body.join(","));
        assert_eq!(KubeauditParser.parse(wrapped.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_output_is_clean() {
        assert!(KubeauditParser.parse(b"").unwrap().is_empty());
        assert!(KubeauditParser.parse(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_stream_is_malformed() {
        let raw = br#"{"AuditResultName":"PrivilegedNil","#;
        assert!(KubeauditParser.parse(raw).is_err());
    }
}
