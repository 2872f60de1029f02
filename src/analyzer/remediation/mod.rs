//! Rule-to-patch registry and the remediation engine behind `--check`.
//!
//! - `ops` - structural edit operations and where they are anchored
//! - `rules` - the versioned `(tool, rule_id)` -> remedy table
//! - `engine` - applies matched rules to a manifest and reports what it did

pub mod engine;
pub mod ops;
pub mod rules;

pub use engine::{AppliedPatch, RemediationReport, Remediator, UnfixedFinding};
pub use ops::{Anchor, FieldValue, ItemMatch, PatchOp};
pub use rules::{PatchRule, RULESET_VERSION, Remedy, RuleSet, builtin};
