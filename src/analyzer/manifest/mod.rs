//! Manifest model: an ordered set of Kubernetes resource documents.
//!
//! A [`Manifest`] is the flattened output of `helm template`. Each document is
//! kept as a `serde_yaml::Value` so mapping key order survives a
//! read-modify-write cycle; documents are addressed by [`ResourceRef`] and
//! fields inside them by [`FieldPath`].

pub mod path;
pub mod resource;

pub use path::{FieldPath, Segment, pod_template_path};
pub use resource::{ResourceRef, container_paths};

use crate::error::{HardenerError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::Path;

/// An ordered sequence of resource documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    documents: Vec<Value>,
}

impl Manifest {
    /// Build a manifest from already parsed documents.
    pub fn from_documents(documents: Vec<Value>) -> Result<Self> {
        let mut manifest = Self::default();
        for doc in documents {
            manifest.push(doc)?;
        }
        Ok(manifest)
    }

    /// Parse a multi-document YAML stream. Null documents are dropped.
    pub fn parse(content: &str) -> Result<Self> {
        let mut documents = Vec::new();
        for de in serde_yaml::Deserializer::from_str(content) {
            let value =
                Value::deserialize(de).map_err(|e| HardenerError::ManifestParse(e.to_string()))?;
            if !value.is_null() {
                documents.push(value);
            }
        }
        Self::from_documents(documents)
    }

    /// Read a manifest file.
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            HardenerError::ManifestParse(reason) => {
                HardenerError::ManifestParse(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Serialize every document, each introduced by a `---` marker.
    pub fn to_yaml(&self) -> Result<String> {
        let mut out = String::new();
        for doc in &self.documents {
            out.push_str("---\n");
            out.push_str(&serde_yaml::to_string(doc)?);
        }
        Ok(out)
    }

    /// Write the manifest, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, idx: usize) -> Option<&Value> {
        self.documents.get(idx)
    }

    pub fn document_mut(&mut self, idx: usize) -> Option<&mut Value> {
        self.documents.get_mut(idx)
    }

    /// Addressable documents with their index and identity.
    pub fn resources(&self) -> impl Iterator<Item = (usize, ResourceRef)> + '_ {
        self.documents
            .iter()
            .enumerate()
            .filter_map(|(idx, doc)| ResourceRef::of(doc).map(|r| (idx, r)))
    }

    /// Locate a document. An exact identity match wins; otherwise a unique
    /// document with the same kind and name is accepted, since scanners
    /// often omit namespaces and remediation may move a resource.
    pub fn find(&self, target: &ResourceRef) -> Option<usize> {
        if let Some((idx, _)) = self.resources().find(|(_, r)| r.matches(target)) {
            return Some(idx);
        }
        let mut loose = self.resources().filter(|(_, r)| r.matches_loosely(target));
        match (loose.next(), loose.next()) {
            (Some((idx, _)), None) => Some(idx),
            _ => None,
        }
    }

    pub fn contains(&self, target: &ResourceRef) -> bool {
        self.resources().any(|(_, r)| r.matches(target))
    }

    /// Append a document, rejecting a second document with the same identity.
    pub fn push(&mut self, doc: Value) -> Result<()> {
        if let Some(identity) = ResourceRef::of(&doc)
            && self.contains(&identity)
        {
            return Err(HardenerError::DuplicateResource(identity));
        }
        self.documents.push(doc);
        Ok(())
    }
}
