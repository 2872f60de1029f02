//! # Analyzer Module
//!
//! The hardening pipeline for rendered Kubernetes manifests:
//! - `manifest` - multi-document YAML with addressable resources and fields
//! - `findings` - one parser per scanner, producing a shared `Finding`
//! - `remediation` - the rule-to-patch registry and engine (`--check`)
//! - `functionality` - profile re-injection (`--add-func`)
//! - `tally` - check counting (`--count-checks`)
//! - `docker_run` - container to `docker run` rendering (`--docker-run`)
//! - `report` - plain and JSON stage summaries

pub mod anomaly;
pub mod docker_run;
pub mod findings;
pub mod functionality;
pub mod iteration;
pub mod manifest;
pub mod remediation;
pub mod report;
pub mod tally;

pub use anomaly::Anomaly;
pub use docker_run::DockerRun;
pub use findings::{Finding, FindingParser, Severity, Tool, parse_findings, read_findings};
pub use functionality::{FunctionalityProfile, ReinjectionReport, Reinjector};
pub use iteration::Iteration;
pub use manifest::{FieldPath, Manifest, ResourceRef};
pub use remediation::{RemediationReport, Remediator, RuleSet};
pub use tally::{CheckTally, TallyStatus};
