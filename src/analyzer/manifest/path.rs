//! Field paths into a single manifest document.
//!
//! The textual form is dotted keys with bracketed selectors:
//!
//! - `spec.template.spec.containers[0].securityContext` - keys and indices
//! - `containers[nginx]` - the sequence element whose `name` is `nginx`
//! - `metadata.annotations["seccomp.security.alpha.kubernetes.io/pod"]` - quoted key
//! - `volumeMounts[*].readOnly` - every element of a sequence
//! - `@template.spec.hostPID` - relative to the resource's pod template
//!
//! `@template` and `[*]` are symbolic and are expanded against a concrete
//! document with [`FieldPath::expand`] before editing. Name selectors are
//! resolved while walking, so `set` can create a missing named element.

use crate::error::{HardenerError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::str::FromStr;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// The pod template of the enclosing resource.
    Template,
    /// A mapping key.
    Key(String),
    /// A sequence index.
    Index(usize),
    /// The sequence element whose `name` field equals this value.
    Named(String),
    /// Every element of a sequence.
    Any,
}

/// An addressable location inside one resource document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build from raw segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse a slash-separated path such as `spec/containers/0/image` or
    /// checkov's `spec/containers/[0]/securityContext`.
    pub fn from_slash(path: &str) -> Self {
        let segments = path
            .split('/')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let bare = part.trim_start_matches('[').trim_end_matches(']');
                if bare.is_empty() || bare == "*" {
                    return Segment::Any;
                }
                match bare.parse::<usize>() {
                    Ok(idx) => Segment::Index(idx),
                    Err(_) => Segment::Key(part.to_string()),
                }
            })
            .collect();
        Self { segments }
    }

    /// Parse an RFC 6901 JSON pointer such as `/spec/template/spec/hostPID`.
    pub fn from_pointer(pointer: &str) -> Self {
        let segments = pointer
            .split('/')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let unescaped = part.replace("~1", "/").replace("~0", "~");
                match unescaped.parse::<usize>() {
                    Ok(idx) => Segment::Index(idx),
                    Err(_) => Segment::Key(unescaped),
                }
            })
            .collect();
        Self { segments }
    }

    /// The pod template anchor (`@template`).
    pub fn template() -> Self {
        Self {
            segments: vec![Segment::Template],
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the path can be edited without expansion.
    pub fn is_concrete(&self) -> bool {
        !self
            .segments
            .iter()
            .any(|s| matches!(s, Segment::Template | Segment::Any))
    }

    /// Append a mapping key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    /// Append a sequence index.
    pub fn index(mut self, idx: usize) -> Self {
        self.segments.push(Segment::Index(idx));
        self
    }

    /// Append a name selector.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.segments.push(Segment::Named(name.into()));
        self
    }

    /// Append an every-element selector.
    pub fn any(mut self) -> Self {
        self.segments.push(Segment::Any);
        self
    }

    /// Concatenate two paths.
    pub fn join(&self, other: &FieldPath) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        FieldPath { segments }
    }

    /// Split off the last segment.
    pub fn split_last(&self) -> Option<(FieldPath, &Segment)> {
        let (last, rest) = self.segments.split_last()?;
        Some((
            FieldPath {
                segments: rest.to_vec(),
            },
            last,
        ))
    }

    /// The same location with each index into a named element replaced by a
    /// name selector, so it resolves to the same element in another revision
    /// of `doc`. Unnamed elements keep their index.
    pub fn by_name(&self, doc: &Value) -> FieldPath {
        let mut node = Some(doc);
        let mut segments = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let seq = node.and_then(Value::as_sequence);
            let (resolved, child) = match segment {
                Segment::Key(key) => (segment.clone(), node.and_then(|n| n.get(key.as_str()))),
                Segment::Index(idx) => {
                    let item = seq.and_then(|s| s.get(*idx));
                    match item.and_then(|i| i.get("name")).and_then(Value::as_str) {
                        Some(name) => (Segment::Named(name.to_string()), item),
                        None => (segment.clone(), item),
                    }
                }
                Segment::Named(name) => (
                    segment.clone(),
                    seq.and_then(|s| find_named(s, name).and_then(|idx| s.get(idx))),
                ),
                Segment::Template | Segment::Any => (segment.clone(), None),
            };
            segments.push(resolved);
            node = child;
        }
        FieldPath { segments }
    }

    /// The prefix addressing the innermost container on this path, e.g.
    /// `spec.containers[0]` for `spec.containers[0].securityContext.privileged`.
    pub fn container_prefix(&self) -> Option<FieldPath> {
        let mut found = None;
        for (i, pair) in self.segments.windows(2).enumerate() {
            if let [Segment::Key(key), selector] = pair
                && (key == "containers" || key == "initContainers")
                && matches!(
                    selector,
                    Segment::Index(_) | Segment::Named(_) | Segment::Any
                )
            {
                found = Some(i + 2);
            }
        }
        found.map(|end| FieldPath {
            segments: self.segments[..end].to_vec(),
        })
    }

    /// Expand symbolic segments (`@template`, `[*]`) against a document,
    /// producing every concrete path they denote. Name selectors are kept
    /// when the named element does not exist yet so that `set` can create it.
    pub fn expand(&self, doc: &Value) -> Vec<FieldPath> {
        let mut out = Vec::new();
        expand_from(doc, Some(doc), &self.segments, FieldPath::root(), &mut out);
        out
    }

    /// Read the value at this path.
    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        let mut node = doc;
        for segment in &self.segments {
            node = match segment {
                Segment::Key(key) => node.as_mapping()?.get(key.as_str())?,
                Segment::Index(idx) => node.as_sequence()?.get(*idx)?,
                Segment::Named(name) => find_named(node.as_sequence()?, name)
                    .and_then(|idx| node.as_sequence()?.get(idx))?,
                Segment::Template => {
                    let template = pod_template_path(doc)?;
                    template.get(doc)?
                }
                Segment::Any => return None,
            };
        }
        Some(node)
    }

    /// Whether a non-null value exists at this path.
    pub fn exists(&self, doc: &Value) -> bool {
        matches!(self.get(doc), Some(v) if !v.is_null())
    }

    /// Overwrite the value at this path, creating intermediate nodes. New
    /// mapping keys are appended at the end of their mapping; existing keys
    /// keep their position.
    pub fn set(&self, doc: &mut Value, value: Value) -> Result<()> {
        self.require_concrete()?;
        set_in(doc, &self.segments, value, self)
    }

    /// Remove the value at this path, returning it if it existed.
    pub fn remove(&self, doc: &mut Value) -> Result<Option<Value>> {
        self.require_concrete()?;
        let Some((parent, last)) = self.split_last() else {
            return Ok(None);
        };
        let Some(node) = get_mut_in(doc, &parent.segments) else {
            return Ok(None);
        };
        let removed = match (last, node) {
            (Segment::Key(key), Value::Mapping(map)) => map.shift_remove(key.as_str()),
            (Segment::Index(idx), Value::Sequence(seq)) if *idx < seq.len() => {
                Some(seq.remove(*idx))
            }
            (Segment::Named(name), Value::Sequence(seq)) => {
                find_named(seq, name).map(|idx| seq.remove(idx))
            }
            _ => None,
        };
        Ok(removed)
    }

    /// Mutable access to the value at this path.
    pub fn get_mut<'a>(&self, doc: &'a mut Value) -> Option<&'a mut Value> {
        if !self.is_concrete() {
            return None;
        }
        get_mut_in(doc, &self.segments)
    }

    fn require_concrete(&self) -> Result<()> {
        if self.is_concrete() {
            Ok(())
        } else {
            Err(HardenerError::PathConflict {
                path: self.to_string(),
                reason: "symbolic path must be expanded before editing".to_string(),
            })
        }
    }
}

/// Path of the pod template inside a workload document, if it has one.
///
/// Pods are their own template; controllers keep it under `spec.template`
/// and CronJobs under `spec.jobTemplate.spec.template`.
pub fn pod_template_path(doc: &Value) -> Option<FieldPath> {
    let kind = doc.get("kind").and_then(Value::as_str).unwrap_or_default();
    if kind == "Pod" {
        return Some(FieldPath::root());
    }
    let spec = doc.get("spec")?;
    if spec.get("template").is_some_and(|t| !t.is_null()) {
        return Some(FieldPath::root().key("spec").key("template"));
    }
    if spec.get("jobTemplate").is_some_and(|t| !t.is_null()) {
        return Some(
            FieldPath::root()
                .key("spec")
                .key("jobTemplate")
                .key("spec")
                .key("template"),
        );
    }
    None
}

fn find_named(seq: &[Value], name: &str) -> Option<usize> {
    seq.iter()
        .position(|item| item.get("name").and_then(Value::as_str) == Some(name))
}

fn expand_from(
    doc: &Value,
    node: Option<&Value>,
    rest: &[Segment],
    prefix: FieldPath,
    out: &mut Vec<FieldPath>,
) {
    let Some((first, tail)) = rest.split_first() else {
        out.push(prefix);
        return;
    };
    match first {
        Segment::Template => {
            if let Some(template) = pod_template_path(doc) {
                let node = template.get(doc);
                expand_from(doc, node, tail, prefix.join(&template), out);
            }
        }
        Segment::Any => {
            if let Some(seq) = node.and_then(Value::as_sequence) {
                for (idx, item) in seq.iter().enumerate() {
                    expand_from(doc, Some(item), tail, prefix.clone().index(idx), out);
                }
            }
        }
        Segment::Key(key) => {
            let child = node.and_then(|n| n.get(key.as_str()));
            expand_from(doc, child, tail, prefix.key(key.clone()), out);
        }
        Segment::Index(idx) => {
            let child = node.and_then(|n| n.as_sequence()).and_then(|s| s.get(*idx));
            expand_from(doc, child, tail, prefix.index(*idx), out);
        }
        Segment::Named(name) => {
            let seq = node.and_then(Value::as_sequence);
            match seq.and_then(|s| find_named(s, name).map(|idx| (s, idx))) {
                Some((s, idx)) => {
                    expand_from(doc, s.get(idx), tail, prefix.index(idx), out);
                }
                None => expand_from(doc, None, tail, prefix.named(name.clone()), out),
            }
        }
    }
}

fn get_mut_in<'a>(node: &'a mut Value, segments: &[Segment]) -> Option<&'a mut Value> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(node);
    };
    let child = match first {
        Segment::Key(key) => node.as_mapping_mut()?.get_mut(key.as_str())?,
        Segment::Index(idx) => node.as_sequence_mut()?.get_mut(*idx)?,
        Segment::Named(name) => {
            let seq = node.as_sequence_mut()?;
            let idx = find_named(seq, name)?;
            seq.get_mut(idx)?
        }
        Segment::Template | Segment::Any => return None,
    };
    get_mut_in(child, rest)
}

fn placeholder_for(next: Option<&Segment>) -> Value {
    match next {
        Some(Segment::Index(_)) | Some(Segment::Named(_)) | Some(Segment::Any) => {
            Value::Sequence(Vec::new())
        }
        _ => Value::Mapping(Mapping::new()),
    }
}

fn set_in(node: &mut Value, segments: &[Segment], value: Value, full: &FieldPath) -> Result<()> {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return Ok(());
    };

    if node.is_null() {
        *node = placeholder_for(Some(first));
    }

    let conflict = |reason: &str| HardenerError::PathConflict {
        path: full.to_string(),
        reason: reason.to_string(),
    };

    let child: &mut Value = match first {
        Segment::Key(key) => {
            let map = node
                .as_mapping_mut()
                .ok_or_else(|| conflict(&format!("'{}' is not inside a mapping", key)))?;
            if rest.is_empty() {
                map.insert(Value::String(key.clone()), value);
                return Ok(());
            }
            let needs_placeholder = map.get(key.as_str()).is_none_or(Value::is_null);
            if needs_placeholder {
                map.insert(Value::String(key.clone()), placeholder_for(rest.first()));
            }
            map.get_mut(key.as_str())
                .ok_or_else(|| conflict("key vanished during insert"))?
        }
        Segment::Index(idx) => {
            let seq = node
                .as_sequence_mut()
                .ok_or_else(|| conflict(&format!("index [{}] applied to a non-sequence", idx)))?;
            if *idx == seq.len() {
                seq.push(placeholder_for(rest.first()));
            }
            seq.get_mut(*idx)
                .ok_or_else(|| conflict(&format!("index [{}] out of range", idx)))?
        }
        Segment::Named(name) => {
            let seq = node
                .as_sequence_mut()
                .ok_or_else(|| conflict(&format!("selector [{}] applied to a non-sequence", name)))?;
            let idx = match find_named(seq, name) {
                Some(idx) => idx,
                None => {
                    let mut entry = Mapping::new();
                    entry.insert(Value::String("name".into()), Value::String(name.clone()));
                    seq.push(Value::Mapping(entry));
                    seq.len() - 1
                }
            };
            &mut seq[idx]
        }
        Segment::Template | Segment::Any => {
            return Err(conflict("symbolic path must be expanded before editing"));
        }
    };
    set_in(child, rest, value, full)
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('@')
        && !key
            .chars()
            .any(|c| matches!(c, '.' | '[' | ']' | '"' | ' '))
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Template => write!(f, "@template")?,
                Segment::Key(key) if is_plain_key(key) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", key)?;
                }
                Segment::Key(key) => write!(f, "[\"{}\"]", key)?,
                Segment::Index(idx) => write!(f, "[{}]", idx)?,
                Segment::Named(name) => write!(f, "[{}]", name)?,
                Segment::Any => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = HardenerError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| HardenerError::InvalidFieldPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = s.trim();

        if let Some(after) = rest.strip_prefix("@template") {
            segments.push(Segment::Template);
            rest = after;
        }

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('.') {
                rest = after;
                if rest.is_empty() || rest.starts_with('.') {
                    return Err(invalid("empty key"));
                }
                continue;
            }
            if let Some(after) = rest.strip_prefix('[') {
                if let Some(quoted) = after.strip_prefix('"') {
                    let end = quoted
                        .find("\"]")
                        .ok_or_else(|| invalid("unterminated quoted key"))?;
                    segments.push(Segment::Key(quoted[..end].to_string()));
                    rest = &quoted[end + 2..];
                    continue;
                }
                let end = after.find(']').ok_or_else(|| invalid("unterminated '['"))?;
                let inner = after[..end].trim();
                let segment = if inner == "*" {
                    Segment::Any
                } else if let Ok(idx) = inner.parse::<usize>() {
                    Segment::Index(idx)
                } else if inner.is_empty() {
                    return Err(invalid("empty selector"));
                } else {
                    Segment::Named(inner.to_string())
                };
                segments.push(segment);
                rest = &after[end + 1..];
                continue;
            }
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            let key = &rest[..end];
            if key.contains(']') || key.contains('"') {
                return Err(invalid("unexpected bracket or quote"));
            }
            segments.push(Segment::Key(key.to_string()));
            rest = &rest[end..];
        }

        Ok(Self { segments })
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment() -> Value {
        serde_yaml::from_str(
            r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  template:
    spec:
      containers:
        - name: nginx
          image: nginx:1.25
          env:
            - name: MODE
              value: prod
        - name: sidecar
          image: busybox
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let text = "spec.template.spec.containers[0].securityContext.runAsNonRoot";
        let path: FieldPath = text.parse().unwrap();
        assert_eq!(path.len(), 7);
        assert_eq!(path.to_string(), text);

        let quoted: FieldPath = r#"metadata.annotations["seccomp.security.alpha.kubernetes.io/pod"]"#
            .parse()
            .unwrap();
        assert_eq!(
            quoted.segments()[2],
            Segment::Key("seccomp.security.alpha.kubernetes.io/pod".into())
        );

        let symbolic: FieldPath = "@template.spec.containers[nginx].volumeMounts[*].readOnly"
            .parse()
            .unwrap();
        assert_eq!(symbolic.segments()[0], Segment::Template);
        assert_eq!(symbolic.segments()[3], Segment::Named("nginx".into()));
        assert_eq!(symbolic.segments()[5], Segment::Any);
        assert!(!symbolic.is_concrete());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("spec..template".parse::<FieldPath>().is_err());
        assert!("spec.containers[0".parse::<FieldPath>().is_err());
        assert!("spec[]".parse::<FieldPath>().is_err());
    }

    #[test]
    fn test_slash_and_pointer_forms() {
        let checkov = FieldPath::from_slash("spec/template/spec/containers/[0]/securityContext");
        assert_eq!(
            checkov.to_string(),
            "spec.template.spec.containers[0].securityContext"
        );
        let pointer = FieldPath::from_pointer("/metadata/annotations/a~1b");
        assert_eq!(pointer.segments()[2], Segment::Key("a/b".into()));
    }

    #[test]
    fn test_container_prefix() {
        let path: FieldPath = "spec.template.spec.initContainers[1].securityContext.privileged"
            .parse()
            .unwrap();
        assert_eq!(
            path.container_prefix().unwrap().to_string(),
            "spec.template.spec.initContainers[1]"
        );
        let pod_level: FieldPath = "spec.template.spec.hostPID".parse().unwrap();
        assert!(pod_level.container_prefix().is_none());
    }

    #[test]
    fn test_expand_template_and_wildcard() {
        let doc = deployment();
        let path: FieldPath = "@template.spec.containers[*].image".parse().unwrap();
        let expanded: Vec<String> = path.expand(&doc).iter().map(|p| p.to_string()).collect();
        assert_eq!(
            expanded,
            vec![
                "spec.template.spec.containers[0].image",
                "spec.template.spec.containers[1].image"
            ]
        );

        let named: FieldPath = "@template.spec.containers[sidecar]".parse().unwrap();
        assert_eq!(
            named.expand(&doc)[0].to_string(),
            "spec.template.spec.containers[1]"
        );
    }

    #[test]
    fn test_expand_template_on_service_is_empty() {
        let svc: Value = serde_yaml::from_str("kind: Service\nmetadata: {name: s}\nspec: {}").unwrap();
        assert!(FieldPath::template().expand(&svc).is_empty());
    }

    #[test]
    fn test_get_by_name() {
        let doc = deployment();
        let path: FieldPath = "spec.template.spec.containers[nginx].env[MODE].value"
            .parse()
            .unwrap();
        assert_eq!(path.get(&doc).and_then(Value::as_str), Some("prod"));
    }

    #[test]
    fn test_set_creates_intermediates_at_end() {
        let mut doc = deployment();
        let path: FieldPath = "spec.template.spec.containers[0].securityContext.runAsNonRoot"
            .parse()
            .unwrap();
        path.set(&mut doc, Value::Bool(true)).unwrap();
        assert_eq!(path.get(&doc), Some(&Value::Bool(true)));

        let container = doc["spec"]["template"]["spec"]["containers"][0]
            .as_mapping()
            .unwrap();
        let keys: Vec<&str> = container.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["name", "image", "env", "securityContext"]);
    }

    #[test]
    fn test_set_creates_named_element() {
        let mut doc = deployment();
        let path: FieldPath = "spec.template.spec.containers[nginx].env[DB].value"
            .parse()
            .unwrap();
        path.set(&mut doc, Value::String("main".into())).unwrap();
        let env = doc["spec"]["template"]["spec"]["containers"][0]["env"]
            .as_sequence()
            .unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env[1]["name"], Value::String("DB".into()));
        assert_eq!(env[1]["value"], Value::String("main".into()));
    }

    #[test]
    fn test_set_through_scalar_conflicts() {
        let mut doc = deployment();
        let path: FieldPath = "metadata.name.first".parse().unwrap();
        assert!(matches!(
            path.set(&mut doc, Value::Null),
            Err(HardenerError::PathConflict { .. })
        ));
    }

    #[test]
    fn test_remove_preserves_sibling_order() {
        let mut doc: Value = serde_yaml::from_str("a: 1\nb: 2\nc: 3\nd: 4").unwrap();
        let removed = FieldPath::root().key("b").remove(&mut doc).unwrap();
        assert_eq!(removed, Some(Value::Number(2.into())));
        let keys: Vec<&str> = doc
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(keys, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_by_name_follows_element_names() {
        let doc: Value = serde_yaml::from_str(
            "spec:\n  containers:\n    - name: a\n    - name: b\n  volumes:\n    - emptyDir: {}\n",
        )
        .unwrap();
        let path: FieldPath = "spec.containers[1].ports".parse().unwrap();
        assert_eq!(path.by_name(&doc).to_string(), "spec.containers[b].ports");
        let unnamed: FieldPath = "spec.volumes[0].emptyDir".parse().unwrap();
        assert_eq!(unnamed.by_name(&doc), unnamed);

        let reordered: Value =
            serde_yaml::from_str("spec:\n  containers:\n    - name: b\n      ports: [9090]\n").unwrap();
        assert_eq!(
            path.by_name(&doc).get(&reordered),
            Some(&serde_yaml::from_str::<Value>("[9090]").unwrap())
        );
    }
}
