use crate::analyzer::findings::{Severity, Tool};
use crate::analyzer::manifest::{FieldPath, ResourceRef};
use crate::analyzer::report::OutputFormat;
use crate::analyzer::Iteration;
use crate::error::{HardenerError, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chart-hardener")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Remediate Kubernetes manifests from security scanner findings")]
#[command(long_about = "Normalizes the output of seven Kubernetes security scanners, patches the rendered chart manifest to fix what they report, restores the fields a chart needs to keep working, and counts the checks that remain.")]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["check", "add_func", "count_checks", "docker_run"])
))]
pub struct Cli {
    /// Fix the chart manifest from a tool's findings
    #[arg(long)]
    pub check: bool,

    /// Re-inject the chart's required functionality into the fixed manifest
    #[arg(long)]
    pub add_func: bool,

    /// Count the checks in a tool's result file
    #[arg(long)]
    pub count_checks: bool,

    /// Print a docker run command for one container of the manifest
    #[arg(long)]
    pub docker_run: bool,

    /// Chart name
    #[arg(long, env = "chart_folder", value_name = "CHART")]
    pub chart: Option<String>,

    /// Tool (or comma-separated tools) for the selected mode
    #[arg(long, env = "tool", value_name = "TOOLS")]
    pub tool: Option<String>,

    /// Tool whose findings drive remediation
    #[arg(long, env = "first_tool", value_name = "TOOL")]
    pub first_tool: Option<String>,

    /// Tool whose results are counted
    #[arg(long, env = "second_tool", value_name = "TOOLS")]
    pub second_tool: Option<String>,

    /// Pipeline stage: 1 original, 2 remediated, 3 functionality restored
    #[arg(long, env = "iteration", value_name = "N")]
    pub iteration: Option<String>,

    /// Scanner result file (default: <results_dir>/<tool>_results.json)
    #[arg(long, value_name = "FILE")]
    pub results: Option<PathBuf>,

    /// Manifest to read instead of the one the stage layout selects
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Resource for --docker-run (Kind/namespace/name or Kind/name)
    #[arg(long, env = "resource_path", value_name = "RESOURCE")]
    pub resource: Option<String>,

    /// Container path for --docker-run (spec/template/spec/containers/0 or dotted)
    #[arg(long, env = "obj_path", value_name = "PATH")]
    pub container: Option<String>,

    /// Findings at or above this severity fail the tally
    #[arg(long, value_name = "LEVEL")]
    pub severity_floor: Option<String>,

    /// Summary format
    #[arg(long, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    /// Write the summary to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Check,
    AddFunc,
    CountChecks,
    DockerRun,
}

/// Selectors for one invocation, resolved once at the process boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub mode: Mode,
    pub chart: Option<String>,
    /// Tools the mode processes, in the order given.
    pub tools: Vec<Tool>,
    /// The tool whose fixed manifest later stages read.
    pub first_tool: Option<Tool>,
    pub iteration: Option<Iteration>,
    pub results: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub resource: Option<ResourceRef>,
    pub container: Option<FieldPath>,
    pub severity_floor: Option<Severity>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub quiet: bool,
}

fn tool_list(value: Option<&str>) -> Result<Vec<Tool>> {
    value.map(Tool::parse_list).transpose().map(Option::unwrap_or_default)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.check {
            Mode::Check
        } else if self.add_func {
            Mode::AddFunc
        } else if self.count_checks {
            Mode::CountChecks
        } else {
            Mode::DockerRun
        }
    }

    /// Resolve selectors into typed values. `--tool` wins over the
    /// mode-specific `--first-tool` / `--second-tool`.
    pub fn run_context(&self) -> Result<RunContext> {
        let mode = self.mode();
        let tool = tool_list(non_empty(&self.tool))?;
        let first = tool_list(non_empty(&self.first_tool))?;
        let second = tool_list(non_empty(&self.second_tool))?;

        let tools = match (mode, tool.is_empty()) {
            (_, false) => tool,
            (Mode::CountChecks, true) => second,
            (_, true) => first.clone(),
        };
        let first_tool = first.first().copied().or_else(|| match mode {
            Mode::CountChecks => None,
            _ => tools.first().copied(),
        });

        let container = non_empty(&self.container)
            .map(|c| {
                if c.contains('/') {
                    Ok(FieldPath::from_slash(c))
                } else {
                    c.parse()
                }
            })
            .transpose()?;

        Ok(RunContext {
            mode,
            chart: non_empty(&self.chart).map(str::to_string),
            tools,
            first_tool,
            iteration: non_empty(&self.iteration).map(str::parse).transpose()?,
            results: self.results.clone(),
            manifest: self.manifest.clone(),
            resource: non_empty(&self.resource).map(str::parse).transpose()?,
            container,
            severity_floor: non_empty(&self.severity_floor).map(str::parse).transpose()?,
            format: self.format,
            output: self.output.clone(),
            quiet: self.quiet,
        })
    }

    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}

impl RunContext {
    pub fn chart(&self) -> Result<&str> {
        self.chart
            .as_deref()
            .ok_or(HardenerError::MissingSelector("chart (--chart or $chart_folder)"))
    }

    pub fn first_tool(&self) -> Result<Tool> {
        self.first_tool
            .ok_or(HardenerError::MissingSelector("first tool (--first-tool or $first_tool)"))
    }

    pub fn require_tools(&self) -> Result<&[Tool]> {
        if self.tools.is_empty() {
            let name = match self.mode {
                Mode::CountChecks => "tool (--tool, --second-tool or $second_tool)",
                _ => "tool (--tool, --first-tool or $first_tool)",
            };
            return Err(HardenerError::MissingSelector(name));
        }
        Ok(&self.tools)
    }

    pub fn iteration(&self) -> Iteration {
        self.iteration.unwrap_or(Iteration::Original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["chart-hardener"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_mode_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["chart-hardener"]).is_err());
        assert!(Cli::try_parse_from(["chart-hardener", "--check", "--add-func"]).is_err());
    }

    #[test]
    fn test_count_checks_uses_second_tool() {
        let cli = parse(&[
            "--count-checks",
            "--chart",
            "mysql",
            "--first-tool",
            "checkov",
            "--second-tool",
            "kics,terrascan",
            "--iteration",
            "3",
        ]);
        let ctx = cli.run_context().unwrap();
        assert_eq!(ctx.mode, Mode::CountChecks);
        assert_eq!(ctx.tools, vec![Tool::Kics, Tool::Terrascan]);
        assert_eq!(ctx.first_tool, Some(Tool::Checkov));
        assert_eq!(ctx.iteration(), Iteration::Functional);
    }

    #[test]
    fn test_check_falls_back_to_first_tool() {
        let ctx = parse(&["--check", "--first-tool", "kubescape"]).run_context().unwrap();
        assert_eq!(ctx.tools, vec![Tool::Kubescape]);
        assert_eq!(ctx.first_tool, Some(Tool::Kubescape));
        assert!(matches!(ctx.chart(), Err(HardenerError::MissingSelector(_))));
    }

    #[test]
    fn test_bad_selectors() {
        let bad_tool = parse(&["--check", "--tool", "trivy"]).run_context();
        assert!(matches!(bad_tool, Err(HardenerError::UnknownTool(_))));
        let bad_iteration = parse(&["--check", "--iteration", "7"]).run_context();
        assert!(matches!(bad_iteration, Err(HardenerError::InvalidIteration(_))));
    }

    #[test]
    fn test_container_path_forms() {
        let ctx = parse(&[
            "--docker-run",
            "--resource",
            "Deployment/default/web",
            "--container",
            "spec/template/spec/containers/0",
        ])
        .run_context()
        .unwrap();
        assert_eq!(
            ctx.container.unwrap().to_string(),
            "spec.template.spec.containers[0]"
        );
        assert_eq!(ctx.resource.unwrap().namespace.as_deref(), Some("default"));
    }
}
