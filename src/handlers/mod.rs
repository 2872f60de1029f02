// Handler modules
pub mod add_func;
pub mod check;
pub mod count_checks;
pub mod docker_run;

pub use add_func::handle_add_func;
pub use check::handle_check;
pub use count_checks::handle_count_checks;
pub use docker_run::handle_docker_run;

use crate::analyzer::anomaly::Anomaly;
use crate::analyzer::findings::Tool;
use crate::cli::RunContext;
use crate::error::HardenerError;

/// How a mode finished when it did not return an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Output was produced but at least one tool failed or a configured
    /// threshold was crossed.
    Failed,
}

/// Print a summary, or save it when `--output` is given.
pub(crate) fn emit(ctx: &RunContext, summary: &str) -> crate::Result<()> {
    match &ctx.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, summary)?;
            if !ctx.quiet {
                println!("Summary saved to: {}", path.display());
            }
        }
        None => {
            if !ctx.quiet {
                print!("{}", summary);
            }
        }
    }
    Ok(())
}

/// Turn a per-tool error into a summary entry so the batch can continue.
pub(crate) fn tool_failure(tool: Tool, err: HardenerError) -> Anomaly {
    log::error!("{}: {}", tool, err);
    match err {
        HardenerError::MalformedOutput { tool, reason } => Anomaly::MalformedOutput { tool, reason },
        other => Anomaly::MalformedOutput {
            tool,
            reason: other.to_string(),
        },
    }
}
