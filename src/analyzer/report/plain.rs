//! Plain text formatter.

use crate::analyzer::anomaly::Anomaly;
use crate::analyzer::findings::Severity;
use crate::analyzer::functionality::{ReinjectionKind, ReinjectionReport};
use crate::analyzer::remediation::RemediationReport;
use crate::analyzer::tally::{CheckTally, TallyStatus};
use colored::*;

fn anomaly_line(anomaly: &Anomaly) -> String {
    let label = match anomaly {
        Anomaly::ConflictingReinjection { .. }
        | Anomaly::PatchConflict { .. }
        | Anomaly::MalformedOutput { .. } => {
            anomaly.label().red().bold()
        }
        _ => anomaly.label().yellow(),
    };
    format!("  {} {}\n", label, anomaly)
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => severity.as_str().red().bold(),
        Severity::High => severity.as_str().red(),
        Severity::Medium => severity.as_str().yellow(),
        Severity::Low => severity.as_str().blue(),
        Severity::Info => severity.as_str().dimmed(),
    }
}

/// Tools whose output could not be processed.
pub fn failures(failures: &[Anomaly]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let mut out = format!("\n{}\n", "Failed".red().bold());
    for anomaly in failures {
        out.push_str(&anomaly_line(anomaly));
    }
    out
}

/// Summary of a `--check` pass.
pub fn remediation(report: &RemediationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {} ({} finding(s), ruleset {})\n",
        "Remediation".bold(),
        report.tool.to_string().cyan(),
        report.findings,
        report.ruleset_version
    ));

    for patch in &report.applied {
        let detail = if patch.touched.is_empty() && patch.appended.is_empty() {
            "already compliant".dimmed().to_string()
        } else {
            patch
                .touched
                .iter()
                .cloned()
                .chain(patch.appended.iter().map(|r| format!("+{}", r)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.push_str(&format!(
            "  {} {} [{}] {}: {}\n",
            "✓".green(),
            patch.rule_id,
            patch.remedy,
            patch.resource,
            detail
        ));
    }

    if !report.unfixed.is_empty() {
        out.push_str(&format!("\n{}\n", "Unfixed".bold()));
        for anomaly in report.anomalies() {
            out.push_str(&anomaly_line(anomaly));
        }
    }

    out.push_str(&format!(
        "\n{} rule application(s), {} path(s) changed, {} unfixed\n",
        report.applied.len(),
        report.touched_count(),
        report.unfixed.len()
    ));
    out
}

/// Summary of an `--add-func` pass.
pub fn reinjection(report: &ReinjectionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {} ({} requirement(s))\n",
        "Functionality".bold(),
        report.chart.cyan(),
        report.requirements
    ));

    for r in &report.reinjected {
        let verb = match r.kind {
            ReinjectionKind::Injected => "injected",
            ReinjectionKind::Restored => "restored",
        };
        let mark = if r.conflict { "!".red().bold() } else { "+".green() };
        out.push_str(&format!("  {} {} {} {}\n", mark, verb, r.resource, r.path));
    }

    if !report.anomalies.is_empty() {
        out.push_str(&format!("\n{}\n", "Anomalies".bold()));
        for anomaly in &report.anomalies {
            out.push_str(&anomaly_line(anomaly));
        }
    }

    out.push_str(&format!(
        "\n{} satisfied, {} re-injected, {} conflict(s)\n",
        report.satisfied,
        report.reinjected.len(),
        report.conflicts()
    ));
    out
}

/// Summary of one `--count-checks` tally.
pub fn tally(tally: &CheckTally) -> String {
    let mut out = String::new();
    let status = match tally.status {
        TallyStatus::Pass => "PASS".green().bold(),
        TallyStatus::Fail => "FAIL".red().bold(),
    };
    let iteration = tally
        .iteration
        .map(|i| format!(" iteration {}", i))
        .unwrap_or_default();
    out.push_str(&format!(
        "{} {}{}: {}\n",
        "Checks".bold(),
        tally.tool.to_string().cyan(),
        iteration,
        status
    ));
    out.push_str(&format!(
        "  total {}, failing {}, passing {} (floor: {})\n",
        tally.total, tally.fail_count, tally.pass_count, tally.severity_floor
    ));

    let levels: Vec<String> = Severity::DESCENDING
        .iter()
        .map(|s| format!("{} {}", severity_label(*s), tally.by_severity.get(s).copied().unwrap_or(0)))
        .collect();
    out.push_str(&format!("  {}\n", levels.join(", ")));

    if !tally.by_rule.is_empty() {
        let rules: Vec<String> = tally
            .by_rule
            .iter()
            .map(|(id, n)| if *n > 1 { format!("{} x{}", id, n) } else { id.clone() })
            .collect();
        out.push_str(&format!("  {}\n", rules.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::findings::{Finding, Tool};
    use crate::analyzer::manifest::ResourceRef;

    #[test]
    fn test_tally_lists_rules() {
        colored::control::set_override(false);
        let findings = vec![
            Finding::new(Tool::Checkov, "CKV_K8S_8", ResourceRef::new("Deployment", "a")),
            Finding::new(Tool::Checkov, "CKV_K8S_8", ResourceRef::new("Deployment", "b")),
        ];
        let t = CheckTally::from_findings(Tool::Checkov, None, Severity::Low, &findings);
        let text = tally(&t);
        assert!(text.contains("FAIL"));
        assert!(text.contains("CKV_K8S_8 x2"));
        assert!(text.contains("medium 2"));
    }

    #[test]
    fn test_remediation_lists_unfixed() {
        colored::control::set_override(false);
        let mut report = RemediationReport::new(Tool::Kics, "1");
        report.unfixed.push(crate::analyzer::remediation::UnfixedFinding {
            finding: 0,
            rule_id: "X".into(),
            resource: ResourceRef::new("Pod", "p"),
            reason: Anomaly::UnmappedRule {
                tool: Tool::Kics,
                rule_id: "X".into(),
                resource: ResourceRef::new("Pod", "p"),
            },
        });
        let text = remediation(&report);
        assert!(text.contains("unmapped rule"));
        assert!(text.contains("1 unfixed"));
    }
}
