//! Per-chart functionality profiles.

use crate::analyzer::manifest::{FieldPath, ResourceRef};
use crate::error::{HardenerError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Fields a chart needs to keep working after remediation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalityProfile {
    pub chart: String,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

/// One `(resource, path, value | presence)` tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(
        serialize_with = "resource_to_str",
        deserialize_with = "resource_from_str"
    )]
    pub resource: ResourceRef,
    pub path: FieldPath,
    /// Required value; `None` means the field only has to be present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Requirement {
    pub fn is_presence_only(&self) -> bool {
        self.value.is_none()
    }
}

fn resource_to_str<S: Serializer>(resource: &ResourceRef, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(resource)
}

fn resource_from_str<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<ResourceRef, D::Error> {
    let text = String::deserialize(d)?;
    text.parse().map_err(serde::de::Error::custom)
}

/// `<profiles_dir>/<chart>/<chart>_functionality.json`
pub fn profile_path(profiles_dir: &Path, chart: &str) -> PathBuf {
    profiles_dir
        .join(chart)
        .join(format!("{}_functionality.json", chart))
}

impl FunctionalityProfile {
    /// Load the profile for a chart. A missing file is `MissingProfile`.
    pub fn load(profiles_dir: &Path, chart: &str) -> Result<Self> {
        let path = profile_path(profiles_dir, chart);
        if !path.is_file() {
            return Err(HardenerError::MissingProfile {
                chart: chart.to_string(),
                path,
            });
        }
        let content = std::fs::read_to_string(&path)?;
        let profile: Self = serde_json::from_str(&content)?;
        if profile.chart != chart {
            log::warn!(
                "profile {} declares chart '{}', expected '{}'",
                path.display(),
                profile.chart,
                chart
            );
        }
        log::debug!(
            "loaded {} requirement(s) for {} from {}",
            profile.requirements.len(),
            chart,
            path.display()
        );
        Ok(profile)
    }
}
