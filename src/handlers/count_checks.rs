use super::{Outcome, emit, tool_failure};
use crate::analyzer::findings::{Tool, read_findings};
use crate::analyzer::report;
use crate::analyzer::tally::CheckTally;
use crate::cli::RunContext;
use crate::config::types::Config;

/// `--count-checks`: tally each tool's result file.
pub fn handle_count_checks(ctx: &RunContext, config: &Config) -> crate::Result<Outcome> {
    let tools = ctx.require_tools()?;
    let floor = ctx.severity_floor.unwrap_or(config.tally.severity_floor);

    let mut tallies = Vec::new();
    let mut failures = Vec::new();
    for &tool in tools {
        match tally_for(ctx, config, tool, floor) {
            Ok(tally) => tallies.push(tally),
            Err(e) => failures.push(tool_failure(tool, e)),
        }
    }

    emit(ctx, &report::format_tallies(&tallies, &failures, ctx.format))?;

    let threshold_crossed = config.tally.fail_on_findings && tallies.iter().any(CheckTally::is_fail);
    Ok(if failures.is_empty() && !threshold_crossed {
        Outcome::Success
    } else {
        Outcome::Failed
    })
}

fn tally_for(
    ctx: &RunContext,
    config: &Config,
    tool: Tool,
    floor: crate::analyzer::findings::Severity,
) -> crate::Result<CheckTally> {
    let path = match &ctx.results {
        Some(path) if ctx.tools.len() == 1 => path.clone(),
        _ => config.layout.results_file(tool),
    };
    let findings = read_findings(tool, &path)?;
    let tally = CheckTally::from_findings(tool, ctx.iteration, floor, &findings);
    log::info!(
        "{}: {} finding(s) in {}, {} failing",
        tool,
        tally.total,
        path.display(),
        tally.fail_count
    );
    Ok(tally)
}
