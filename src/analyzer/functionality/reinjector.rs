//! Re-applies profile requirements to a remediated manifest.
//!
//! A requirement is checked against every concrete path it denotes. Values
//! that differ are overwritten with the required value; missing
//! presence-only fields are copied back from the original manifest. When
//! the original already satisfied the requirement, the edit undoes a
//! remediation patch and is reported as a conflicting re-injection.

use super::profile::{FunctionalityProfile, Requirement};
use crate::analyzer::anomaly::Anomaly;
use crate::analyzer::manifest::{Manifest, ResourceRef};
use serde::Serialize;
use serde_yaml::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReinjectionKind {
    /// The profile's value was written.
    Injected,
    /// A presence-only field was copied from the original manifest.
    Restored,
}

/// One field the re-injector wrote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reinjection {
    pub resource: ResourceRef,
    pub path: String,
    pub kind: ReinjectionKind,
    pub value: Value,
    /// What remediation left at the path.
    pub previous: Option<Value>,
    /// The write undid a remediation patch.
    pub conflict: bool,
}

/// Outcome of one `--add-func` pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReinjectionReport {
    pub chart: String,
    pub requirements: usize,
    pub satisfied: usize,
    pub reinjected: Vec<Reinjection>,
    pub anomalies: Vec<Anomaly>,
}

impl ReinjectionReport {
    pub fn conflicts(&self) -> usize {
        self.reinjected.iter().filter(|r| r.conflict).count()
    }
}

pub struct Reinjector<'a> {
    profile: &'a FunctionalityProfile,
    original: Option<&'a Manifest>,
}

impl<'a> Reinjector<'a> {
    pub fn new(profile: &'a FunctionalityProfile) -> Self {
        Self {
            profile,
            original: None,
        }
    }

    /// Use the pre-remediation manifest to restore presence-only fields and
    /// to tell whether a re-injection reverses a patch.
    pub fn with_original(mut self, original: &'a Manifest) -> Self {
        self.original = Some(original);
        self
    }

    pub fn reinject(&self, manifest: &mut Manifest) -> ReinjectionReport {
        let mut report = ReinjectionReport {
            chart: self.profile.chart.clone(),
            requirements: self.profile.requirements.len(),
            satisfied: 0,
            reinjected: Vec::new(),
            anomalies: Vec::new(),
        };

        for req in &self.profile.requirements {
            match self.enforce(manifest, req, &mut report) {
                Ok(0) => report.satisfied += 1,
                Ok(n) => log::info!("{} {}: {} field(s) re-injected", req.resource, req.path, n),
                Err(reason) => {
                    log::warn!("{} {}: {}", req.resource, req.path, reason);
                    report.anomalies.push(Anomaly::UnrestorableRequirement {
                        resource: req.resource.clone(),
                        path: req.path.to_string(),
                        reason,
                    });
                }
            }
        }
        report
    }

    /// Returns the number of writes, or why the requirement cannot be met.
    /// Writes go to a copy of the document that replaces the original only
    /// when every target was written.
    fn enforce(
        &self,
        manifest: &mut Manifest,
        req: &Requirement,
        report: &mut ReinjectionReport,
    ) -> Result<usize, String> {
        let not_found = || "resource is not in the manifest".to_string();
        let idx = manifest.find(&req.resource).ok_or_else(not_found)?;
        let mut doc = manifest.document(idx).ok_or_else(not_found)?.clone();
        let original = self
            .original
            .and_then(|o| o.find(&req.resource).and_then(|i| o.document(i)));

        let targets = req.path.expand(&doc);
        if targets.is_empty() {
            return Err("path does not resolve in this resource".to_string());
        }

        let mut writes = Vec::new();
        for target in targets {
            let current = target.get(&doc).filter(|v| !v.is_null()).cloned();
            let original_value = original
                .and_then(|o| target.by_name(&doc).get(o))
                .filter(|v| !v.is_null())
                .cloned();
            let (value, kind) = match &req.value {
                Some(required) if current.as_ref() == Some(required) => continue,
                Some(required) => (required.clone(), ReinjectionKind::Injected),
                None if current.is_some() => continue,
                None => match &original_value {
                    Some(v) => (v.clone(), ReinjectionKind::Restored),
                    None => {
                        return Err(format!(
                            "{} is missing and the original manifest does not hold it",
                            target
                        ));
                    }
                },
            };

            let conflict = match (&req.value, &original_value) {
                (Some(required), Some(orig)) => orig == required,
                (Some(_), None) => self.original.is_none() && current.is_some(),
                (None, _) => true,
            };

            target.set(&mut doc, value.clone()).map_err(|e| e.to_string())?;
            writes.push(Reinjection {
                resource: req.resource.clone(),
                path: target.to_string(),
                kind,
                value,
                previous: current,
                conflict,
            });
        }

        if let Some(slot) = manifest.document_mut(idx) {
            *slot = doc;
        }
        let count = writes.len();
        for write in writes {
            if write.conflict {
                log::warn!(
                    "{} {}: re-injection reverses remediation ({:?} -> {:?})",
                    write.resource,
                    write.path,
                    write.previous,
                    write.value
                );
                report.anomalies.push(Anomaly::ConflictingReinjection {
                    resource: write.resource.clone(),
                    path: write.path.clone(),
                    required: write.value.clone(),
                    remediated: write.previous.clone(),
                });
            }
            report.reinjected.push(write);
        }
        Ok(count)
    }
}
