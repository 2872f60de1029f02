use super::{Outcome, emit, tool_failure};
use crate::analyzer::findings::{Tool, read_findings};
use crate::analyzer::manifest::Manifest;
use crate::analyzer::remediation::{RemediationReport, Remediator, builtin};
use crate::analyzer::report::{self, json};
use crate::cli::RunContext;
use crate::config::types::Config;
use std::path::PathBuf;

/// `--check`: remediate the stage manifest once per tool.
pub fn handle_check(ctx: &RunContext, config: &Config) -> crate::Result<Outcome> {
    let chart = ctx.chart()?;
    let tools = ctx.require_tools()?;
    let layout = &config.layout;

    let input = match &ctx.manifest {
        Some(path) => path.clone(),
        None => layout.stage_manifest(chart, ctx.iteration(), ctx.first_tool)?,
    };
    let manifest = Manifest::read(&input)?;
    log::info!(
        "remediating {} ({} document(s)) with {}",
        input.display(),
        manifest.len(),
        tools.iter().map(Tool::as_str).collect::<Vec<_>>().join(", ")
    );

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for &tool in tools {
        match remediate_with(ctx, config, chart, tool, &manifest) {
            Ok(report) => reports.push(report),
            Err(e) => failures.push(tool_failure(tool, e)),
        }
    }

    emit(ctx, &report::format_remediations(&reports, &failures, ctx.format))?;
    Ok(if failures.is_empty() {
        Outcome::Success
    } else {
        Outcome::Failed
    })
}

fn results_path(ctx: &RunContext, config: &Config, tool: Tool) -> PathBuf {
    match (&ctx.results, ctx.tools.len()) {
        (Some(path), 1) => path.clone(),
        (Some(path), _) => {
            log::warn!(
                "--results {} ignored for a multi-tool run",
                path.display()
            );
            config.layout.results_file(tool)
        }
        (None, _) => config.layout.results_file(tool),
    }
}

fn remediate_with(
    ctx: &RunContext,
    config: &Config,
    chart: &str,
    tool: Tool,
    input: &Manifest,
) -> crate::Result<RemediationReport> {
    let findings = read_findings(tool, &results_path(ctx, config, tool))?;
    let mut manifest = input.clone();
    let report = Remediator::new(builtin()).remediate(tool, &mut manifest, &findings);

    let fixed = config.layout.fixed_manifest(chart, tool);
    manifest.write(&fixed)?;
    let report_path = config.layout.fixed_report(chart, tool);
    std::fs::write(&report_path, json::to_json(&report))?;
    log::info!(
        "{}: wrote {} and {}",
        tool,
        fixed.display(),
        report_path.display()
    );
    Ok(report)
}
