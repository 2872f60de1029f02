//! Terrascan SARIF 2.1.0 output (`terrascan scan -o sarif`).
//!
//! Resources are identified through SARIF logical locations whose kind is a
//! terraform-style type such as `kubernetes_cluster_role`. Terrascan reports
//! at resource granularity, so findings carry no field path.

use super::{Finding, FindingParser, Tool, decode};
use crate::analyzer::manifest::ResourceRef;
use crate::error::Result;
use serde::Deserialize;
use std::collections::HashMap;

pub struct TerrascanParser;

#[derive(Debug, Deserialize)]
struct Sarif {
    runs: Vec<Run>,
}

#[derive(Debug, Deserialize)]
struct Run {
    #[serde(default)]
    tool: Option<SarifTool>,
    #[serde(default)]
    results: Option<Vec<SarifResult>>,
}

#[derive(Debug, Deserialize)]
struct SarifTool {
    driver: Driver,
}

#[derive(Debug, Deserialize)]
struct Driver {
    #[serde(default)]
    rules: Vec<RuleDescriptor>,
}

#[derive(Debug, Deserialize)]
struct RuleDescriptor {
    id: String,
    #[serde(default)]
    properties: Option<RuleProperties>,
}

#[derive(Debug, Deserialize)]
struct RuleProperties {
    #[serde(default)]
    severity: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    #[serde(default)]
    physical_location: Option<PhysicalLocation>,
    #[serde(default)]
    logical_locations: Vec<LogicalLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhysicalLocation {
    artifact_location: ArtifactLocation,
}

#[derive(Debug, Deserialize)]
struct ArtifactLocation {
    #[serde(default)]
    uri: String,
}

#[derive(Debug, Deserialize)]
struct LogicalLocation {
    name: String,
    kind: String,
}

/// `kubernetes_cluster_role` -> `ClusterRole`.
fn kind_from_sarif(kind: &str) -> String {
    let bare = kind.strip_prefix("kubernetes_").unwrap_or(kind);
    bare.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

impl FindingParser for TerrascanParser {
    fn tool(&self) -> Tool {
        Tool::Terrascan
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<Finding>> {
        let sarif: Sarif = decode(self.tool(), raw)?;
        let mut findings = Vec::new();

        for run in sarif.runs {
            let rule_severity: HashMap<String, String> = run
                .tool
                .map(|t| t.driver.rules)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|r| r.properties.and_then(|p| p.severity).map(|s| (r.id, s)))
                .collect();

            for result in run.results.unwrap_or_default() {
                let label = rule_severity
                    .get(&result.rule_id)
                    .cloned()
                    .or(result.level)
                    .unwrap_or_default();
                let severity = self.map_severity(&label);
                let message = result.message.map(|m| m.text).unwrap_or_default();

                let locations: Vec<&LogicalLocation> = result
                    .locations
                    .iter()
                    .flat_map(|l| &l.logical_locations)
                    .collect();
                if locations.is_empty() {
                    log::debug!("terrascan: {} has no logical location", result.rule_id);
                    let label = result
                        .locations
                        .iter()
                        .filter_map(|l| l.physical_location.as_ref())
                        .map(|p| p.artifact_location.uri.as_str())
                        .find(|uri| !uri.is_empty())
                        .unwrap_or(result.rule_id.as_str());
                    findings.push(
                        Finding::new(self.tool(), &result.rule_id, ResourceRef::unresolved(label))
                            .with_severity(severity)
                            .with_message(&message),
                    );
                }

                for location in locations {
                    let resource = ResourceRef::new(kind_from_sarif(&location.kind), &location.name);
                    findings.push(
                        Finding::new(self.tool(), &result.rule_id, resource)
                            .with_severity(severity)
                            .with_message(&message),
                    );
                }
            }
        }
        Ok(findings)
    }
}
