//! Check counting behind `--count-checks`.
//!
//! A pure reducer over one tool's findings: nothing is read from or written
//! to a manifest. Findings at or above the severity floor fail, the rest
//! pass.

use crate::analyzer::Iteration;
use crate::analyzer::findings::{Finding, Severity, Tool};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TallyStatus {
    Pass,
    Fail,
}

/// Per-tool check counts for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckTally {
    pub tool: Tool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration: Option<Iteration>,
    pub severity_floor: Severity,
    pub status: TallyStatus,
    pub total: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    /// Every level is present, zero counts included.
    pub by_severity: BTreeMap<Severity, usize>,
    /// Occurrences per rule ID, sorted by ID.
    pub by_rule: BTreeMap<String, usize>,
}

impl CheckTally {
    pub fn new(tool: Tool, iteration: Option<Iteration>, severity_floor: Severity) -> Self {
        Self {
            tool,
            iteration,
            severity_floor,
            status: TallyStatus::Pass,
            total: 0,
            pass_count: 0,
            fail_count: 0,
            by_severity: Severity::DESCENDING.iter().map(|s| (*s, 0)).collect(),
            by_rule: BTreeMap::new(),
        }
    }

    pub fn from_findings(
        tool: Tool,
        iteration: Option<Iteration>,
        severity_floor: Severity,
        findings: &[Finding],
    ) -> Self {
        let mut tally = Self::new(tool, iteration, severity_floor);
        for finding in findings {
            tally.record(finding);
        }
        tally
    }

    pub fn record(&mut self, finding: &Finding) {
        self.total += 1;
        *self.by_severity.entry(finding.severity).or_default() += 1;
        *self.by_rule.entry(finding.rule_id.clone()).or_default() += 1;
        if finding.severity >= self.severity_floor {
            self.fail_count += 1;
            self.status = TallyStatus::Fail;
        } else {
            self.pass_count += 1;
        }
    }

    pub fn is_fail(&self) -> bool {
        self.status == TallyStatus::Fail
    }

    /// Rule IDs with repetitions, sorted.
    pub fn checks(&self) -> Vec<&str> {
        self.by_rule
            .iter()
            .flat_map(|(id, n)| std::iter::repeat_n(id.as_str(), *n))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::manifest::ResourceRef;

    fn finding(rule: &str, severity: Severity) -> Finding {
        Finding::new(Tool::Kics, rule, ResourceRef::new("Deployment", "web")).with_severity(severity)
    }

    #[test]
    fn test_floor_splits_pass_and_fail() {
        let findings = vec![
            finding("b", Severity::High),
            finding("a", Severity::Info),
            finding("b", Severity::Low),
        ];
        let tally = CheckTally::from_findings(Tool::Kics, None, Severity::Low, &findings);
        assert_eq!(tally.total, 3);
        assert_eq!(tally.fail_count, 2);
        assert_eq!(tally.pass_count, 1);
        assert!(tally.is_fail());
        assert_eq!(tally.by_severity[&Severity::Critical], 0);
        assert_eq!(tally.checks(), vec!["a", "b", "b"]);
    }

    #[test]
    fn test_empty_is_pass() {
        let tally = CheckTally::from_findings(Tool::Kics, Some(Iteration::Functional), Severity::Low, &[]);
        assert_eq!(tally.status, TallyStatus::Pass);
        assert_eq!(tally.by_severity.len(), 5);
        let json = serde_json::to_value(&tally).unwrap();
        assert_eq!(json["iteration"], 3);
        assert_eq!(json["by_severity"]["critical"], 0);
    }

    #[test]
    fn test_findings_below_floor_pass() {
        let findings = vec![finding("x", Severity::Medium)];
        let tally = CheckTally::from_findings(Tool::Kics, None, Severity::Critical, &findings);
        assert_eq!(tally.status, TallyStatus::Pass);
        assert_eq!(tally.pass_count, 1);
    }
}
