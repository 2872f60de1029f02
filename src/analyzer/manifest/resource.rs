//! Resource identity and workload helpers.

use super::path::{FieldPath, pod_template_path};
use crate::error::HardenerError;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::str::FromStr;

/// Namespace assumed when a document does not declare one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Kind given to findings a tool did not tie to any resource.
pub const UNRESOLVED_KIND: &str = "Unresolved";

/// Identity of one resource document: `(Kind, Namespace, Name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: None,
            name: name.into(),
        }
    }

    /// A reference no manifest document matches, named after whatever the
    /// tool did report (a file, a search key).
    pub fn unresolved(label: impl Into<String>) -> Self {
        Self::new(UNRESOLVED_KIND, label)
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
        self
    }

    /// Identity of a document, if it has both `kind` and `metadata.name`.
    pub fn of(doc: &Value) -> Option<Self> {
        let kind = doc.get("kind")?.as_str()?;
        let metadata = doc.get("metadata")?;
        let name = metadata.get("name")?.as_str()?;
        let namespace = metadata.get("namespace").and_then(Value::as_str);
        let mut r = Self::new(kind, name);
        if let Some(ns) = namespace {
            r = r.with_namespace(ns);
        }
        Some(r)
    }

    pub fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Exact identity match. Kind is compared case-insensitively and an
    /// absent namespace equals `default`.
    pub fn matches(&self, other: &ResourceRef) -> bool {
        self.kind.eq_ignore_ascii_case(&other.kind)
            && self.name == other.name
            && self.namespace_or_default() == other.namespace_or_default()
    }

    /// Kind and name match, namespace ignored.
    pub fn matches_loosely(&self, other: &ResourceRef) -> bool {
        self.kind.eq_ignore_ascii_case(&other.kind) && self.name == other.name
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

impl FromStr for ResourceRef {
    type Err = HardenerError;

    /// Parses `Kind/namespace/name` or `Kind/name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').map(str::trim).collect();
        match parts.as_slice() {
            [kind, name] if !kind.is_empty() && !name.is_empty() => Ok(Self::new(*kind, *name)),
            [kind, ns, name] if !kind.is_empty() && !name.is_empty() => {
                Ok(Self::new(*kind, *name).with_namespace(*ns))
            }
            _ => Err(HardenerError::Config(format!(
                "invalid resource reference '{}' (expected Kind/namespace/name or Kind/name)",
                s
            ))),
        }
    }
}

/// Concrete paths of every container and init container in a workload
/// document, containers first.
pub fn container_paths(doc: &Value) -> Vec<FieldPath> {
    let Some(template) = pod_template_path(doc) else {
        return Vec::new();
    };
    let spec = template.clone().key("spec");
    let mut paths = Vec::new();
    for list in ["containers", "initContainers"] {
        let list_path = spec.clone().key(list);
        if let Some(seq) = list_path.get(doc).and_then(Value::as_sequence) {
            paths.extend((0..seq.len()).map(|idx| list_path.clone().index(idx)));
        }
    }
    paths
}
