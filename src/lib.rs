//! # chart-hardener
//!
//! Hardens rendered Helm chart manifests using the findings of Kubernetes
//! security scanners, then checks that the chart still has what it needs to
//! run.
//!
//! ## Pipeline
//!
//! - **`--check`**: parse a scanner's results and patch the manifest
//! - **`--add-func`**: re-inject the chart's functionality profile
//! - **`--count-checks`**: tally what a fresh scan still reports
//! - **`--docker-run`**: render one container as a `docker run` command
//!
//! ## Example
//!
//! ```rust,no_run
//! use chart_hardener::analyzer::{Manifest, Remediator, Tool, read_findings};
//! use chart_hardener::analyzer::remediation::builtin;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut manifest = Manifest::read(Path::new("templates/mysql_template.yaml"))?;
//! let findings = read_findings(Tool::Checkov, Path::new("checkov_results.json"))?;
//! let report = Remediator::new(builtin()).remediate(Tool::Checkov, &mut manifest, &findings);
//! manifest.write(Path::new("fixed_templates/mysql_checkov_fixed_template.yaml"))?;
//! println!("{} patch(es) applied", report.applied.len());
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;

pub use error::{HardenerError, Result};
pub use handlers::Outcome;
use cli::{Mode, RunContext};
use config::types::Config;

pub fn run_command(ctx: &RunContext, config: &Config) -> Result<Outcome> {
    match ctx.mode {
        Mode::Check => handlers::handle_check(ctx, config),
        Mode::AddFunc => handlers::handle_add_func(ctx, config),
        Mode::CountChecks => handlers::handle_count_checks(ctx, config),
        Mode::DockerRun => handlers::handle_docker_run(ctx, config),
    }
}
