//! Applies matched patch rules to a manifest.
//!
//! Findings are processed in the order the tool reported them. Each rule is
//! applied to a scratch copy of its document and committed only when every
//! op succeeded, so a shape conflict never leaves a half-patched resource.

use super::ops::PatchOp;
use super::rules::{PatchRule, RuleSet};
use crate::analyzer::anomaly::Anomaly;
use crate::analyzer::findings::{Finding, Tool};
use crate::analyzer::manifest::{FieldPath, Manifest, ResourceRef};
use serde::Serialize;
use serde_yaml::Value;

/// One rule that was applied to one finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedPatch {
    /// Index into the finding sequence.
    pub finding: usize,
    pub rule_id: String,
    pub remedy: String,
    pub resource: ResourceRef,
    /// Paths that changed; empty when the resource already complied.
    pub touched: Vec<String>,
    /// Documents appended to the manifest.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub appended: Vec<ResourceRef>,
}

/// A finding (or one of its rules) that could not be fixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnfixedFinding {
    pub finding: usize,
    pub rule_id: String,
    pub resource: ResourceRef,
    pub reason: Anomaly,
}

/// Outcome of one `--check` pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemediationReport {
    pub tool: Tool,
    pub ruleset_version: String,
    pub findings: usize,
    pub applied: Vec<AppliedPatch>,
    pub unfixed: Vec<UnfixedFinding>,
}

impl RemediationReport {
    pub fn new(tool: Tool, ruleset_version: impl Into<String>) -> Self {
        Self {
            tool,
            ruleset_version: ruleset_version.into(),
            findings: 0,
            applied: Vec::new(),
            unfixed: Vec::new(),
        }
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &Anomaly> {
        self.unfixed.iter().map(|u| &u.reason)
    }

    /// Number of paths changed across all applied patches.
    pub fn touched_count(&self) -> usize {
        self.applied.iter().map(|a| a.touched.len() + a.appended.len()).sum()
    }
}

/// The remediation engine.
pub struct Remediator<'a> {
    rules: &'a RuleSet,
}

impl<'a> Remediator<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    /// Apply every matching rule to `manifest` in place.
    pub fn remediate(
        &self,
        tool: Tool,
        manifest: &mut Manifest,
        findings: &[Finding],
    ) -> RemediationReport {
        let mut report = RemediationReport::new(tool, self.rules.version());
        report.findings = findings.len();

        for (idx, finding) in findings.iter().enumerate() {
            let rules = self.rules.rules_for(finding);
            if rules.is_empty() {
                log::warn!(
                    "{}: no patch rule for {} on {}",
                    finding.tool,
                    finding.rule_id,
                    finding.resource
                );
                report.unfixed.push(unfixed(
                    idx,
                    finding,
                    Anomaly::UnmappedRule {
                        tool: finding.tool,
                        rule_id: finding.rule_id.clone(),
                        resource: finding.resource.clone(),
                    },
                ));
                continue;
            }

            let Some(doc_idx) = manifest.find(&finding.resource) else {
                log::warn!("{}: {} not found in manifest", finding.rule_id, finding.resource);
                report.unfixed.push(unfixed(
                    idx,
                    finding,
                    Anomaly::ResourceNotFound {
                        rule_id: finding.rule_id.clone(),
                        resource: finding.resource.clone(),
                    },
                ));
                continue;
            };

            for rule in rules {
                match apply_rule(manifest, doc_idx, rule, finding) {
                    Ok(patch) => {
                        log::debug!(
                            "{} [{}] on {}: {} path(s) changed",
                            rule.rule_id,
                            rule.remedy,
                            finding.resource,
                            patch.touched.len()
                        );
                        report.applied.push(AppliedPatch {
                            finding: idx,
                            ..patch
                        });
                    }
                    Err(reason) => {
                        log::warn!("{}", reason);
                        report.unfixed.push(unfixed(idx, finding, reason));
                    }
                }
            }
        }
        report
    }
}

fn unfixed(idx: usize, finding: &Finding, reason: Anomaly) -> UnfixedFinding {
    UnfixedFinding {
        finding: idx,
        rule_id: finding.rule_id.clone(),
        resource: finding.resource.clone(),
        reason,
    }
}

/// Apply one rule to the document at `doc_idx`, committing on success.
fn apply_rule(
    manifest: &mut Manifest,
    doc_idx: usize,
    rule: &PatchRule,
    finding: &Finding,
) -> Result<AppliedPatch, Anomaly> {
    let no_target = || Anomaly::NoTargetPath {
        rule_id: rule.rule_id.clone(),
        resource: finding.resource.clone(),
    };
    let base: Option<&FieldPath> = finding.field_path.as_ref().or(rule.default_path.as_ref());
    if rule.needs_path() && base.is_none() {
        return Err(no_target());
    }

    let Some(original) = manifest.document(doc_idx) else {
        return Err(no_target());
    };
    let mut doc = original.clone();
    let mut touched = Vec::new();
    let mut appends = Vec::new();
    let mut located = false;

    for op in &rule.ops {
        if let PatchOp::AppendResource {
            document,
            inherit_namespace,
        } = op
        {
            located = true;
            let new_doc = appended_document(document, *inherit_namespace, &doc);
            match ResourceRef::of(&new_doc) {
                Some(identity) if manifest.contains(&identity) => {}
                _ => appends.push(new_doc),
            }
            continue;
        }

        if let Some(anchor) = op.anchor()
            && !anchor.targets(&doc, base).is_empty()
        {
            located = true;
        }
        let changed = op.apply(&mut doc, base).map_err(|e| Anomaly::PatchConflict {
            rule_id: rule.rule_id.clone(),
            resource: finding.resource.clone(),
            detail: e.to_string(),
        })?;
        touched.extend(changed);
    }

    if !located {
        return Err(no_target());
    }

    if let Some(identity) = ResourceRef::of(&doc)
        && manifest
            .resources()
            .any(|(idx, other)| idx != doc_idx && other.matches(&identity))
    {
        return Err(Anomaly::PatchConflict {
            rule_id: rule.rule_id.clone(),
            resource: finding.resource.clone(),
            detail: format!("patched resource would duplicate {}", identity),
        });
    }

    if let Some(slot) = manifest.document_mut(doc_idx) {
        *slot = doc;
    }
    let mut appended = Vec::new();
    for new_doc in appends {
        let identity = ResourceRef::of(&new_doc);
        if let Err(e) = manifest.push(new_doc) {
            log::debug!("{}: skipped append: {}", rule.rule_id, e);
            continue;
        }
        appended.extend(identity);
    }

    Ok(AppliedPatch {
        finding: 0,
        rule_id: rule.rule_id.clone(),
        remedy: rule.remedy.to_string(),
        resource: finding.resource.clone(),
        touched: touched.iter().map(FieldPath::to_string).collect(),
        appended,
    })
}

/// The document to append, taking the patched resource's namespace when asked.
fn appended_document(template: &Value, inherit_namespace: bool, owner: &Value) -> Value {
    let mut doc = template.clone();
    if inherit_namespace
        && let Some(ns) = owner
            .get("metadata")
            .and_then(|m| m.get("namespace"))
            .and_then(Value::as_str)
    {
        let path = FieldPath::root().key("metadata").key("namespace");
        if let Err(e) = path.set(&mut doc, Value::from(ns)) {
            log::debug!("cannot set namespace on appended document: {}", e);
        }
    }
    doc
}
