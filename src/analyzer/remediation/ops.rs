//! Patch operations and their application to one resource document.

use crate::analyzer::manifest::{FieldPath, Segment, container_paths};
use crate::error::{HardenerError, Result};
use serde_yaml::{Mapping, Value};

/// Where an operation's relative path is rooted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The finding's own field path (or the rule's default path).
    Exact,
    /// The container element on the finding's path, or every container and
    /// init container when the path names none.
    Container,
    /// The pod spec inside the resource's pod template.
    PodSpec,
    /// The pod template itself (metadata and spec).
    PodTemplate,
    /// The document root.
    Resource,
}

impl Anchor {
    /// Concrete anchor locations in `doc`. `base` is the finding's path or
    /// the rule's default; only `Exact` requires it.
    pub fn targets(&self, doc: &Value, base: Option<&FieldPath>) -> Vec<FieldPath> {
        match self {
            Self::Exact => base.map(|b| b.expand(doc)).unwrap_or_default(),
            Self::Container => match base.and_then(FieldPath::container_prefix) {
                Some(prefix) => resolve_container(doc, &prefix),
                None => container_paths(doc),
            },
            Self::PodSpec => FieldPath::template().key("spec").expand(doc),
            Self::PodTemplate => FieldPath::template().expand(doc),
            Self::Resource => vec![FieldPath::root()],
        }
    }
}

/// Resolve a container prefix to existing container elements. A name that
/// is not among `containers` is looked up among `initContainers`, since some
/// scanners do not distinguish the two.
fn resolve_container(doc: &Value, prefix: &FieldPath) -> Vec<FieldPath> {
    let existing: Vec<FieldPath> = prefix
        .expand(doc)
        .into_iter()
        .filter(|p| p.is_concrete() && p.exists(doc))
        .collect();
    if !existing.is_empty() {
        return existing;
    }

    let swapped: Vec<Segment> = prefix
        .segments()
        .iter()
        .map(|s| match s {
            Segment::Key(k) if k == "containers" => Segment::Key("initContainers".into()),
            other => other.clone(),
        })
        .collect();
    FieldPath::from_segments(swapped)
        .expand(doc)
        .into_iter()
        .filter(|p| p.exists(doc))
        .collect()
}

/// A value written by an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Literal(Value),
    /// Copy the value at `source` (relative to the same anchor) when it is
    /// set, otherwise use `fallback`.
    MirrorOr { source: FieldPath, fallback: Value },
}

impl FieldValue {
    fn resolve(&self, doc: &Value, anchor: &FieldPath) -> Value {
        match self {
            Self::Literal(v) => v.clone(),
            Self::MirrorOr { source, fallback } => anchor
                .join(source)
                .get(doc)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| fallback.clone()),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

/// Predicate over sequence elements for [`PatchOp::RemoveItems`].
#[derive(Debug, Clone, PartialEq)]
pub enum ItemMatch {
    /// The element has this key with a non-null value.
    HasKey(String),
    /// The string at `field` contains `needle`.
    Contains { field: FieldPath, needle: String },
    /// The value at `field` equals `value`.
    Equals { field: FieldPath, value: Value },
}

impl ItemMatch {
    fn matches(&self, item: &Value) -> bool {
        match self {
            Self::HasKey(key) => item.get(key.as_str()).is_some_and(|v| !v.is_null()),
            Self::Contains { field, needle } => field
                .get(item)
                .and_then(Value::as_str)
                .is_some_and(|s| s.contains(needle.as_str())),
            Self::Equals { field, value } => field.get(item) == Some(value),
        }
    }
}

/// A structural edit. Every variant except `AppendResource` edits a single
/// document and is idempotent.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Overwrite, creating intermediate nodes.
    SetField {
        anchor: Anchor,
        path: FieldPath,
        value: FieldValue,
    },
    /// Set only when absent or null.
    SetDefault {
        anchor: Anchor,
        path: FieldPath,
        value: FieldValue,
    },
    DeleteField { anchor: Anchor, path: FieldPath },
    /// Insert `key` next to `path` (in the mapping holding it) when absent.
    AddSibling {
        anchor: Anchor,
        path: FieldPath,
        key: String,
        value: Value,
    },
    /// Set-union into each container's `securityContext.capabilities.drop`.
    EnsureCapabilityDrop { capabilities: Vec<String> },
    /// Drop matching elements from a sequence; an emptied sequence is removed.
    RemoveItems {
        anchor: Anchor,
        path: FieldPath,
        matcher: ItemMatch,
    },
    /// Append a new document unless one with the same identity exists. With
    /// `inherit_namespace` the new document takes the finding resource's
    /// namespace.
    AppendResource {
        document: Value,
        inherit_namespace: bool,
    },
    /// Set `<prefix><container name>: value` in the pod template annotations
    /// for each targeted container.
    AnnotateContainers { prefix: String, value: String },
}

impl PatchOp {
    pub fn set(anchor: Anchor, path: &str, value: impl Into<Value>) -> Self {
        Self::SetField {
            anchor,
            path: rel(path),
            value: FieldValue::Literal(value.into()),
        }
    }

    pub fn default_to(anchor: Anchor, path: &str, value: impl Into<Value>) -> Self {
        Self::SetDefault {
            anchor,
            path: rel(path),
            value: FieldValue::Literal(value.into()),
        }
    }

    /// `SetDefault` copying `source` when present.
    pub fn mirror_or(anchor: Anchor, path: &str, source: &str, fallback: impl Into<Value>) -> Self {
        Self::SetDefault {
            anchor,
            path: rel(path),
            value: FieldValue::MirrorOr {
                source: rel(source),
                fallback: fallback.into(),
            },
        }
    }

    pub fn delete(anchor: Anchor, path: &str) -> Self {
        Self::DeleteField {
            anchor,
            path: rel(path),
        }
    }

    pub fn add_sibling(anchor: Anchor, path: &str, key: &str, value: impl Into<Value>) -> Self {
        Self::AddSibling {
            anchor,
            path: rel(path),
            key: key.to_string(),
            value: value.into(),
        }
    }

    pub fn remove_items(anchor: Anchor, path: &str, matcher: ItemMatch) -> Self {
        Self::RemoveItems {
            anchor,
            path: rel(path),
            matcher,
        }
    }

    /// The anchor this op is rooted at, if it edits within a document.
    pub fn anchor(&self) -> Option<Anchor> {
        match self {
            Self::SetField { anchor, .. }
            | Self::SetDefault { anchor, .. }
            | Self::DeleteField { anchor, .. }
            | Self::AddSibling { anchor, .. }
            | Self::RemoveItems { anchor, .. } => Some(*anchor),
            Self::EnsureCapabilityDrop { .. } | Self::AnnotateContainers { .. } => {
                Some(Anchor::Container)
            }
            Self::AppendResource { .. } => None,
        }
    }

    /// Apply to one document, returning the concrete paths that changed.
    pub fn apply(&self, doc: &mut Value, base: Option<&FieldPath>) -> Result<Vec<FieldPath>> {
        let Some(anchor) = self.anchor() else {
            return Ok(Vec::new());
        };
        let targets = anchor.targets(doc, base);
        let mut touched = Vec::new();

        match self {
            Self::SetField { path, value, .. } => {
                for target in &targets {
                    for full in target.join(path).expand(doc) {
                        let v = value.resolve(doc, target);
                        if full.get(doc) != Some(&v) {
                            full.set(doc, v)?;
                            touched.push(full);
                        }
                    }
                }
            }
            Self::SetDefault { path, value, .. } => {
                for target in &targets {
                    for full in target.join(path).expand(doc) {
                        if !full.exists(doc) {
                            let v = value.resolve(doc, target);
                            full.set(doc, v)?;
                            touched.push(full);
                        }
                    }
                }
            }
            Self::DeleteField { path, .. } => {
                for target in &targets {
                    for full in target.join(path).expand(doc) {
                        if full.remove(doc)?.is_some() {
                            touched.push(full);
                        }
                    }
                }
            }
            Self::AddSibling {
                path, key, value, ..
            } => {
                for target in &targets {
                    for full in target.join(path).expand(doc) {
                        let parent = full.split_last().map(|(p, _)| p).unwrap_or_default();
                        let sibling = parent.key(key.clone());
                        if !sibling.exists(doc) {
                            sibling.set(doc, value.clone())?;
                            touched.push(sibling);
                        }
                    }
                }
            }
            Self::EnsureCapabilityDrop { capabilities } => {
                for target in &targets {
                    let drop_path = target
                        .clone()
                        .key("securityContext")
                        .key("capabilities")
                        .key("drop");
                    let mut current: Vec<Value> = drop_path
                        .get(doc)
                        .and_then(Value::as_sequence)
                        .cloned()
                        .unwrap_or_default();
                    let before = current.len();
                    for cap in capabilities {
                        if !current.iter().any(|c| c.as_str() == Some(cap.as_str())) {
                            current.push(Value::String(cap.clone()));
                        }
                    }
                    if current.len() != before || !drop_path.exists(doc) {
                        drop_path.set(doc, Value::Sequence(current))?;
                        touched.push(drop_path);
                    }
                }
            }
            Self::RemoveItems { path, matcher, .. } => {
                for target in &targets {
                    for full in target.join(path).expand(doc) {
                        let Some(Value::Sequence(items)) = full.get_mut(doc) else {
                            continue;
                        };
                        let before = items.len();
                        items.retain(|item| !matcher.matches(item));
                        if items.len() == before {
                            continue;
                        }
                        if items.is_empty() {
                            full.remove(doc)?;
                        }
                        touched.push(full);
                    }
                }
            }
            Self::AnnotateContainers { prefix, value } => {
                let Some(template) = FieldPath::template().expand(doc).into_iter().next() else {
                    return Ok(touched);
                };
                for target in &targets {
                    let Some(name) = target
                        .clone()
                        .key("name")
                        .get(doc)
                        .and_then(Value::as_str)
                        .map(str::to_string)
                    else {
                        continue;
                    };
                    let annotation = template
                        .clone()
                        .key("metadata")
                        .key("annotations")
                        .key(format!("{}{}", prefix, name));
                    let v = Value::String(value.clone());
                    if annotation.get(doc) != Some(&v) {
                        annotation.set(doc, v)?;
                        touched.push(annotation);
                    }
                }
            }
            Self::AppendResource { .. } => {}
        }
        Ok(touched)
    }
}

/// Parse a relative path written in the rule table.
fn rel(path: &str) -> FieldPath {
    path.parse().unwrap_or_else(|e: HardenerError| {
        log::error!("rule table: {}", e);
        FieldPath::root().key(path)
    })
}

/// Build a mapping value from key/value pairs.
pub fn map<const N: usize>(entries: [(&str, Value); N]) -> Value {
    let mut m = Mapping::new();
    for (k, v) in entries {
        m.insert(Value::String(k.to_string()), v);
    }
    Value::Mapping(m)
}

/// Build a sequence value.
pub fn seq<const N: usize>(items: [Value; N]) -> Value {
    Value::Sequence(items.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statefulset() -> Value {
        serde_yaml::from_str(
            r#"
apiVersion: apps/v1
kind: StatefulSet
metadata:
  name: mysql
spec:
  template:
    metadata:
      labels: {app: mysql}
    spec:
      initContainers:
        - name: init
          image: busybox
      containers:
        - name: mysql
          image: mysql:8
          resources:
            requests:
              cpu: 500m
          securityContext:
            capabilities:
              add: [NET_ADMIN]
              drop: [NET_RAW]
          ports:
            - containerPort: 3306
            - containerPort: 22
          volumeMounts:
            - name: data
              mountPath: /var/lib/mysql
            - name: cfg
              mountPath: /etc/mysql/conf.d/my.cnf
              subPath: my.cnf
      volumes:
        - name: sock
          hostPath: {path: /var/run/docker.sock}
        - name: logs
          hostPath: {path: /var/log}
"#,
        )
        .unwrap()
    }

    fn container0() -> FieldPath {
        "spec.template.spec.containers[0]".parse().unwrap()
    }

    #[test]
    fn test_set_field_on_every_container_without_base() {
        let mut doc = statefulset();
        let op = PatchOp::set(Anchor::Container, "securityContext.privileged", false);
        let touched = op.apply(&mut doc, None).unwrap();
        assert_eq!(touched.len(), 2);
        assert_eq!(
            doc["spec"]["template"]["spec"]["initContainers"][0]["securityContext"]["privileged"],
            Value::Bool(false)
        );
    }

    #[test]
    fn test_container_anchor_narrows_to_finding() {
        let mut doc = statefulset();
        let base: FieldPath = "@template.spec.containers[init]".parse().unwrap();
        let op = PatchOp::set(Anchor::Container, "imagePullPolicy", "Always");
        let touched = op.apply(&mut doc, Some(&base)).unwrap();
        assert_eq!(
            touched[0].to_string(),
            "spec.template.spec.initContainers[0].imagePullPolicy"
        );
        assert!(doc["spec"]["template"]["spec"]["containers"][0]
            .get("imagePullPolicy")
            .is_none());
    }

    #[test]
    fn test_mirror_limit_from_request() {
        let mut doc = statefulset();
        let op = PatchOp::mirror_or(
            Anchor::Container,
            "resources.limits.cpu",
            "resources.requests.cpu",
            "250m",
        );
        op.apply(&mut doc, Some(&container0())).unwrap();
        let resources = &doc["spec"]["template"]["spec"]["containers"][0]["resources"];
        assert_eq!(resources["limits"]["cpu"], Value::String("500m".into()));
    }

    #[test]
    fn test_set_default_keeps_existing() {
        let mut doc = statefulset();
        let op = PatchOp::default_to(Anchor::Container, "resources.requests.cpu", "250m");
        let touched = op.apply(&mut doc, Some(&container0())).unwrap();
        assert!(touched.is_empty());
    }

    #[test]
    fn test_capability_drop_is_a_union() {
        let mut doc = statefulset();
        let op = PatchOp::EnsureCapabilityDrop {
            capabilities: vec!["ALL".into()],
        };
        op.apply(&mut doc, Some(&container0())).unwrap();
        let drop = &doc["spec"]["template"]["spec"]["containers"][0]["securityContext"]["capabilities"]["drop"];
        assert_eq!(drop, &seq([Value::from("NET_RAW"), Value::from("ALL")]));

        let again = op.apply(&mut doc, Some(&container0())).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_add_sibling_only_when_absent() {
        let mut doc = statefulset();
        let base: FieldPath = "spec.template.spec.securityContext.runAsNonRoot"
            .parse()
            .unwrap();
        PatchOp::set(Anchor::Exact, "", true)
            .apply(&mut doc, Some(&base))
            .unwrap();
        let op = PatchOp::add_sibling(Anchor::Exact, "", "runAsUser", 25000);
        assert_eq!(op.apply(&mut doc, Some(&base)).unwrap().len(), 1);
        assert!(op.apply(&mut doc, Some(&base)).unwrap().is_empty());
        assert_eq!(
            doc["spec"]["template"]["spec"]["securityContext"]["runAsUser"],
            Value::from(25000)
        );
    }

    #[test]
    fn test_remove_items() {
        let mut doc = statefulset();
        let sock = PatchOp::remove_items(
            Anchor::PodSpec,
            "volumes",
            ItemMatch::Contains {
                field: "hostPath.path".parse().unwrap(),
                needle: "docker.sock".into(),
            },
        );
        sock.apply(&mut doc, None).unwrap();
        assert_eq!(
            doc["spec"]["template"]["spec"]["volumes"]
                .as_sequence()
                .unwrap()
                .len(),
            1
        );

        let host = PatchOp::remove_items(Anchor::PodSpec, "volumes", ItemMatch::HasKey("hostPath".into()));
        host.apply(&mut doc, None).unwrap();
        assert!(doc["spec"]["template"]["spec"].get("volumes").is_none());

        let ssh = PatchOp::remove_items(
            Anchor::Container,
            "ports",
            ItemMatch::Equals {
                field: "containerPort".parse().unwrap(),
                value: Value::from(22),
            },
        );
        ssh.apply(&mut doc, None).unwrap();
        assert_eq!(
            doc["spec"]["template"]["spec"]["containers"][0]["ports"]
                .as_sequence()
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_wildcard_read_only_mounts() {
        let mut doc = statefulset();
        let op = PatchOp::set(Anchor::Container, "volumeMounts[*].readOnly", true);
        let touched = op.apply(&mut doc, Some(&container0())).unwrap();
        assert_eq!(touched.len(), 2);
    }

    #[test]
    fn test_annotate_containers() {
        let mut doc = statefulset();
        let op = PatchOp::AnnotateContainers {
            prefix: "container.apparmor.security.beta.kubernetes.io/".into(),
            value: "runtime/default".into(),
        };
        op.apply(&mut doc, None).unwrap();
        let annotations = doc["spec"]["template"]["metadata"]["annotations"]
            .as_mapping()
            .unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(
            annotations.get("container.apparmor.security.beta.kubernetes.io/mysql"),
            Some(&Value::from("runtime/default"))
        );
    }

    #[test]
    fn test_pod_spec_anchor_on_service_targets_nothing() {
        let mut doc: Value = serde_yaml::from_str("kind: Service\nmetadata: {name: s}\nspec: {type: NodePort}").unwrap();
        let op = PatchOp::set(Anchor::PodSpec, "hostPID", false);
        assert!(Anchor::PodSpec.targets(&doc, None).is_empty());
        assert!(op.apply(&mut doc, None).unwrap().is_empty());
    }
}
