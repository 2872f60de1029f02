//! Functionality preservation behind `--add-func`.
//!
//! A chart's [`FunctionalityProfile`] lists the fields it needs to keep
//! working; the [`Reinjector`] puts them back after remediation and reports
//! every place where doing so reverses a security patch.

pub mod profile;
pub mod reinjector;

pub use profile::{FunctionalityProfile, Requirement, profile_path};
pub use reinjector::{Reinjection, ReinjectionKind, ReinjectionReport, Reinjector};
