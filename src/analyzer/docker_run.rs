//! Render a manifest container as an equivalent `docker run` command.
//!
//! Used to reproduce a chart container locally with the same security
//! settings the manifest gives it.

use crate::analyzer::manifest::{FieldPath, Manifest, ResourceRef};
use crate::error::{HardenerError, Result};
use serde_yaml::Value;
use std::fmt;

/// A `docker run -d` invocation, kept as separate arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerRun {
    pub image: String,
    pub args: Vec<String>,
}

impl DockerRun {
    /// Build the command for one container definition.
    pub fn from_container(container: &Value) -> Option<Self> {
        let image = container.get("image")?.as_str()?.to_string();
        let mut args = Vec::new();

        if let Some(name) = str_at(container, &["name"]) {
            args.push(format!("--name={}", name));
        }

        let ctx = container.get("securityContext");
        let ctx_str = |path: &[&str]| ctx.and_then(|c| str_at(c, path));
        let ctx_bool = |key: &str| ctx.and_then(|c| c.get(key)).and_then(Value::as_bool);

        for (flag, key) in [("--cap-add", "add"), ("--cap-drop", "drop")] {
            let caps = ctx
                .and_then(|c| c.get("capabilities"))
                .and_then(|c| c.get(key))
                .and_then(Value::as_sequence);
            for cap in caps.into_iter().flatten().filter_map(Value::as_str) {
                args.push(format!("{}={}", flag, cap));
            }
        }

        if ctx_bool("privileged") == Some(true) {
            args.push("--privileged".to_string());
        }
        if ctx_bool("allowPrivilegeEscalation") == Some(false) {
            args.push("--security-opt=no-new-privileges=true".to_string());
        }
        match ctx_str(&["seccompProfile", "type"]) {
            Some("Unconfined") => args.push("--security-opt=seccomp=unconfined".to_string()),
            Some("Localhost") => {
                if let Some(profile) = ctx_str(&["seccompProfile", "localhostProfile"]) {
                    args.push(format!("--security-opt=seccomp={}", profile));
                }
            }
            _ => {}
        }
        if ctx_bool("readOnlyRootFilesystem") == Some(true) {
            args.push("--read-only".to_string());
        }

        let user = ctx.and_then(|c| c.get("runAsUser")).and_then(scalar);
        let group = ctx.and_then(|c| c.get("runAsGroup")).and_then(scalar);
        match (user, group) {
            (Some(u), Some(g)) => args.push(format!("--user={}:{}", u, g)),
            (Some(u), None) => args.push(format!("--user={}", u)),
            _ => {}
        }

        let env = container.get("env").and_then(Value::as_sequence);
        for var in env.into_iter().flatten() {
            let Some(name) = str_at(var, &["name"]) else {
                continue;
            };
            let value = var
                .get("value")
                .and_then(scalar)
                .or_else(|| str_at(var, &["valueFrom", "secretKeyRef", "key"]).map(str::to_string))
                .or_else(|| str_at(var, &["valueFrom", "configMapKeyRef", "key"]).map(str::to_string))
                .unwrap_or_default();
            args.push(format!("--env={}={}", name, value));
        }

        let ports = container.get("ports").and_then(Value::as_sequence);
        for port in ports.into_iter().flatten() {
            if let Some(p) = port.get("containerPort").and_then(scalar) {
                args.push(format!("--publish={}:{}", p, p));
            }
        }

        if let Some(memory) = str_at(container, &["resources", "limits", "memory"]) {
            args.push(format!("--memory={}", memory));
        }

        Some(Self { image, args })
    }

    /// Locate a container in a manifest and build its command.
    pub fn from_manifest(
        manifest: &Manifest,
        resource: &ResourceRef,
        container: &FieldPath,
    ) -> Result<Self> {
        let idx = manifest
            .find(resource)
            .ok_or_else(|| HardenerError::ResourceNotFound(resource.clone()))?;
        let doc = manifest
            .document(idx)
            .ok_or_else(|| HardenerError::ResourceNotFound(resource.clone()))?;
        let missing = || HardenerError::MissingField {
            resource: resource.clone(),
            path: container.to_string(),
        };
        let path = container.expand(doc).into_iter().next().ok_or_else(missing)?;
        let value = path.get(doc).ok_or_else(missing)?;
        Self::from_container(value).ok_or_else(missing)
    }
}

fn str_at<'a>(node: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(node, |n, key| n.get(*key))
        .and_then(Value::as_str)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Single-quote an argument when the shell would split or expand it.
fn quote(arg: &str) -> String {
    let plain = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_=:/.,@%+".contains(c));
    if plain && !arg.is_empty() {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

impl fmt::Display for DockerRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "docker run -d")?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        write!(f, " {}", quote(&self.image))
    }
}
