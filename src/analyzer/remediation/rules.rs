//! The rule-to-patch registry.
//!
//! Scanner rule IDs map onto named [`Remedy`] values; each remedy expands to
//! a fixed list of [`PatchOp`]s. The table is data, so extending coverage to
//! another rule is a one-line change here and never touches the engine.

use super::ops::{Anchor, ItemMatch, PatchOp, map, seq};
use crate::analyzer::findings::{Finding, Tool};
use crate::analyzer::manifest::FieldPath;
use once_cell::sync::Lazy;
use serde_yaml::Value;
use std::collections::HashMap;

/// Version of the built-in table, printed in every `--check` summary.
pub const RULESET_VERSION: &str = "2024.3";

const RUN_AS_ID: i64 = 25000;
const DEFAULT_CPU: &str = "250m";
const DEFAULT_MEMORY: &str = "128Mi";
const DEFAULT_NAMESPACE: &str = "test-ns";

/// Named fixes shared across scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Remedy {
    LivenessProbe,
    ReadinessProbe,
    MemoryRequest,
    MemoryLimit,
    CpuRequest,
    CpuLimit,
    HostPid,
    HostIpc,
    HostNetwork,
    RunAsNonRoot,
    RunAsUser,
    Privileged,
    PrivilegeEscalation,
    DropCapabilities,
    ImagePullPolicy,
    Namespace,
    ReadOnlyRootFs,
    Seccomp,
    AppArmor,
    ServiceAccountToken,
    NetworkPolicy,
    Replicas,
    HostPathVolumes,
    DockerSocket,
    LimitRange,
    ResourceQuota,
    SubPathMounts,
    ReadOnlyVolumeMounts,
    NodePortService,
    ServiceAccountSubjects,
    CronJobDeadline,
    ClusterAdminBinding,
    SshPort,
}

impl Remedy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LivenessProbe => "liveness-probe",
            Self::ReadinessProbe => "readiness-probe",
            Self::MemoryRequest => "memory-request",
            Self::MemoryLimit => "memory-limit",
            Self::CpuRequest => "cpu-request",
            Self::CpuLimit => "cpu-limit",
            Self::HostPid => "host-pid",
            Self::HostIpc => "host-ipc",
            Self::HostNetwork => "host-network",
            Self::RunAsNonRoot => "run-as-non-root",
            Self::RunAsUser => "run-as-user",
            Self::Privileged => "privileged",
            Self::PrivilegeEscalation => "privilege-escalation",
            Self::DropCapabilities => "drop-capabilities",
            Self::ImagePullPolicy => "image-pull-policy",
            Self::Namespace => "namespace",
            Self::ReadOnlyRootFs => "read-only-root-fs",
            Self::Seccomp => "seccomp",
            Self::AppArmor => "apparmor",
            Self::ServiceAccountToken => "service-account-token",
            Self::NetworkPolicy => "network-policy",
            Self::Replicas => "replicas",
            Self::HostPathVolumes => "host-path-volumes",
            Self::DockerSocket => "docker-socket",
            Self::LimitRange => "limit-range",
            Self::ResourceQuota => "resource-quota",
            Self::SubPathMounts => "subpath-mounts",
            Self::ReadOnlyVolumeMounts => "read-only-volume-mounts",
            Self::NodePortService => "nodeport-service",
            Self::ServiceAccountSubjects => "service-account-subjects",
            Self::CronJobDeadline => "cronjob-deadline",
            Self::ClusterAdminBinding => "cluster-admin-binding",
            Self::SshPort => "ssh-port",
        }
    }

    /// Kinds the remedy applies to; `None` means any.
    pub fn kinds(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Replicas => Some(&["Deployment", "StatefulSet", "ReplicaSet"]),
            Self::NodePortService => Some(&["Service"]),
            Self::CronJobDeadline => Some(&["CronJob"]),
            Self::ServiceAccountSubjects | Self::ClusterAdminBinding => {
                Some(&["RoleBinding", "ClusterRoleBinding"])
            }
            _ => None,
        }
    }

    pub fn ops(&self) -> Vec<PatchOp> {
        use Anchor::*;
        match self {
            Self::LivenessProbe => vec![PatchOp::default_to(Container, "livenessProbe", probe())],
            Self::ReadinessProbe => vec![PatchOp::default_to(Container, "readinessProbe", probe())],
            Self::MemoryRequest => vec![PatchOp::mirror_or(
                Container,
                "resources.requests.memory",
                "resources.limits.memory",
                DEFAULT_MEMORY,
            )],
            Self::MemoryLimit => vec![PatchOp::mirror_or(
                Container,
                "resources.limits.memory",
                "resources.requests.memory",
                DEFAULT_MEMORY,
            )],
            Self::CpuRequest => vec![PatchOp::mirror_or(
                Container,
                "resources.requests.cpu",
                "resources.limits.cpu",
                DEFAULT_CPU,
            )],
            Self::CpuLimit => vec![PatchOp::mirror_or(
                Container,
                "resources.limits.cpu",
                "resources.requests.cpu",
                DEFAULT_CPU,
            )],
            Self::HostPid => vec![PatchOp::set(PodSpec, "hostPID", false)],
            Self::HostIpc => vec![PatchOp::set(PodSpec, "hostIPC", false)],
            Self::HostNetwork => vec![PatchOp::set(PodSpec, "hostNetwork", false)],
            Self::RunAsNonRoot => vec![
                PatchOp::set(PodSpec, "securityContext.runAsNonRoot", true),
                PatchOp::add_sibling(PodSpec, "securityContext.runAsNonRoot", "runAsUser", RUN_AS_ID),
                PatchOp::add_sibling(PodSpec, "securityContext.runAsNonRoot", "runAsGroup", RUN_AS_ID),
            ],
            Self::RunAsUser => vec![
                PatchOp::set(PodSpec, "securityContext.runAsUser", RUN_AS_ID),
                PatchOp::set(Container, "securityContext.runAsUser", RUN_AS_ID),
            ],
            Self::Privileged => vec![PatchOp::set(Container, "securityContext.privileged", false)],
            Self::PrivilegeEscalation => vec![PatchOp::set(
                Container,
                "securityContext.allowPrivilegeEscalation",
                false,
            )],
            Self::DropCapabilities => vec![
                PatchOp::EnsureCapabilityDrop {
                    capabilities: vec!["ALL".to_string()],
                },
                PatchOp::delete(Container, "securityContext.capabilities.add"),
            ],
            Self::ImagePullPolicy => vec![PatchOp::set(Container, "imagePullPolicy", "Always")],
            Self::Namespace => vec![PatchOp::set(Resource, "metadata.namespace", DEFAULT_NAMESPACE)],
            Self::ReadOnlyRootFs => vec![PatchOp::set(
                Container,
                "securityContext.readOnlyRootFilesystem",
                true,
            )],
            Self::Seccomp => vec![
                PatchOp::set(
                    Resource,
                    r#"metadata.annotations["seccomp.security.alpha.kubernetes.io/pod"]"#,
                    "runtime/default",
                ),
                PatchOp::set(
                    PodSpec,
                    "securityContext.seccompProfile",
                    map([("type", Value::from("RuntimeDefault"))]),
                ),
            ],
            Self::AppArmor => vec![PatchOp::AnnotateContainers {
                prefix: "container.apparmor.security.beta.kubernetes.io/".to_string(),
                value: "runtime/default".to_string(),
            }],
            Self::ServiceAccountToken => {
                vec![PatchOp::set(PodSpec, "automountServiceAccountToken", false)]
            }
            Self::NetworkPolicy => vec![PatchOp::AppendResource {
                document: network_policy(),
                inherit_namespace: true,
            }],
            Self::Replicas => vec![PatchOp::set(Resource, "spec.replicas", 2)],
            Self::HostPathVolumes => vec![PatchOp::remove_items(
                PodSpec,
                "volumes",
                ItemMatch::HasKey("hostPath".to_string()),
            )],
            Self::DockerSocket => vec![PatchOp::remove_items(
                PodSpec,
                "volumes",
                ItemMatch::Contains {
                    field: FieldPath::root().key("hostPath").key("path"),
                    needle: "docker.sock".to_string(),
                },
            )],
            Self::LimitRange => vec![PatchOp::AppendResource {
                document: limit_range(),
                inherit_namespace: true,
            }],
            Self::ResourceQuota => vec![PatchOp::AppendResource {
                document: resource_quota(),
                inherit_namespace: true,
            }],
            Self::SubPathMounts => vec![PatchOp::remove_items(
                Container,
                "volumeMounts",
                ItemMatch::HasKey("subPath".to_string()),
            )],
            Self::ReadOnlyVolumeMounts => {
                vec![PatchOp::set(Container, "volumeMounts[*].readOnly", true)]
            }
            Self::NodePortService => vec![
                PatchOp::set(Resource, "spec.type", "LoadBalancer"),
                PatchOp::set(
                    Resource,
                    r#"metadata.annotations["networking.gke.io/load-balancer-type"]"#,
                    "Internal",
                ),
            ],
            Self::ServiceAccountSubjects => vec![PatchOp::delete(Resource, "subjects")],
            Self::CronJobDeadline => vec![PatchOp::set(Resource, "spec.startingDeadlineSeconds", 100)],
            Self::ClusterAdminBinding => vec![PatchOp::set(Resource, "roleRef.name", "view")],
            Self::SshPort => vec![PatchOp::remove_items(
                Container,
                "ports",
                ItemMatch::Equals {
                    field: FieldPath::root().key("containerPort"),
                    value: Value::from(22),
                },
            )],
        }
    }
}

fn probe() -> Value {
    map([
        (
            "exec",
            map([("command", seq([Value::from("ls"), Value::from("/")]))]),
        ),
        ("initialDelaySeconds", Value::from(30)),
        ("periodSeconds", Value::from(10)),
    ])
}

fn network_policy() -> Value {
    map([
        ("apiVersion", Value::from("networking.k8s.io/v1")),
        ("kind", Value::from("NetworkPolicy")),
        ("metadata", map([("name", Value::from("test-network-policy"))])),
        (
            "spec",
            map([
                ("podSelector", map([])),
                ("ingress", seq([map([])])),
                ("policyTypes", seq([Value::from("Ingress")])),
            ]),
        ),
    ])
}

fn limit_range() -> Value {
    map([
        ("apiVersion", Value::from("v1")),
        ("kind", Value::from("LimitRange")),
        ("metadata", map([("name", Value::from("cpu-min-max-demo-lr"))])),
        (
            "spec",
            map([(
                "limits",
                seq([map([
                    ("max", map([("cpu", Value::from("800m"))])),
                    ("min", map([("cpu", Value::from("250m"))])),
                    ("type", Value::from("Container")),
                ])]),
            )]),
        ),
    ])
}

fn resource_quota() -> Value {
    map([
        ("apiVersion", Value::from("v1")),
        ("kind", Value::from("ResourceQuota")),
        ("metadata", map([("name", Value::from("pods-high"))])),
        (
            "spec",
            map([
                (
                    "hard",
                    map([
                        ("cpu", Value::from("1000")),
                        ("memory", Value::from("200Gi")),
                        ("pods", Value::from("10")),
                    ]),
                ),
                (
                    "scopeSelector",
                    map([(
                        "matchExpressions",
                        seq([map([
                            ("operator", Value::from("In")),
                            ("scopeName", Value::from("PriorityClass")),
                            ("values", seq([Value::from("high")])),
                        ])]),
                    )]),
                ),
            ]),
        ),
    ])
}

/// One row of the registry: a scanner rule mapped to one remedy.
#[derive(Debug, Clone)]
pub struct PatchRule {
    pub tool: Tool,
    pub rule_id: String,
    pub remedy: &'static str,
    /// Kinds this rule applies to; `None` means any.
    pub kinds: Option<Vec<String>>,
    pub ops: Vec<PatchOp>,
    /// Target for `Exact` ops when the finding carries no path.
    pub default_path: Option<FieldPath>,
}

impl PatchRule {
    /// Build a rule from a named remedy.
    pub fn from_remedy(tool: Tool, rule_id: &str, remedy: Remedy) -> Self {
        Self {
            tool,
            rule_id: rule_id.to_string(),
            remedy: remedy.name(),
            kinds: remedy
                .kinds()
                .map(|ks| ks.iter().map(|k| k.to_string()).collect()),
            ops: remedy.ops(),
            default_path: None,
        }
    }

    /// Build an ad-hoc rule from raw operations.
    pub fn custom(tool: Tool, rule_id: &str, remedy: &'static str, ops: Vec<PatchOp>) -> Self {
        Self {
            tool,
            rule_id: rule_id.to_string(),
            remedy,
            kinds: None,
            ops,
            default_path: None,
        }
    }

    pub fn with_default_path(mut self, path: FieldPath) -> Self {
        self.default_path = Some(path);
        self
    }

    /// Whether this rule applies to a finding.
    pub fn matches(&self, finding: &Finding) -> bool {
        finding.tool == self.tool
            && finding.rule_id == self.rule_id
            && self.kinds.as_ref().is_none_or(|kinds| {
                kinds
                    .iter()
                    .any(|k| k.eq_ignore_ascii_case(&finding.resource.kind))
            })
    }

    /// Whether any op needs a concrete base path.
    pub fn needs_path(&self) -> bool {
        self.ops.iter().any(|op| op.anchor() == Some(Anchor::Exact))
    }
}

/// A versioned table of patch rules keyed by `(tool, rule_id)`.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    version: String,
    rules: HashMap<(Tool, String), Vec<PatchRule>>,
}

impl RuleSet {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            rules: HashMap::new(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn insert(&mut self, rule: PatchRule) {
        self.rules
            .entry((rule.tool, rule.rule_id.clone()))
            .or_default()
            .push(rule);
    }

    /// Rules matching a finding, in table order.
    pub fn rules_for(&self, finding: &Finding) -> Vec<&PatchRule> {
        self.rules
            .get(&(finding.tool, finding.rule_id.clone()))
            .map(|rules| rules.iter().filter(|r| r.matches(finding)).collect())
            .unwrap_or_default()
    }
}

type Table = &'static [(&'static str, &'static [Remedy])];

const CHECKOV: Table = {
    use Remedy::*;
    &[
        ("CKV_K8S_8", &[LivenessProbe]),
        ("CKV_K8S_9", &[ReadinessProbe]),
        ("CKV_K8S_10", &[CpuRequest]),
        ("CKV_K8S_11", &[CpuLimit]),
        ("CKV_K8S_12", &[MemoryRequest]),
        ("CKV_K8S_13", &[MemoryLimit]),
        ("CKV_K8S_15", &[ImagePullPolicy]),
        ("CKV_K8S_16", &[Privileged]),
        ("CKV_K8S_17", &[HostPid]),
        ("CKV_K8S_18", &[HostIpc]),
        ("CKV_K8S_19", &[HostNetwork]),
        ("CKV_K8S_20", &[PrivilegeEscalation]),
        ("CKV_K8S_21", &[Namespace]),
        ("CKV_K8S_22", &[ReadOnlyRootFs]),
        ("CKV_K8S_23", &[RunAsNonRoot]),
        ("CKV_K8S_25", &[DropCapabilities]),
        ("CKV_K8S_27", &[DockerSocket]),
        ("CKV_K8S_28", &[DropCapabilities]),
        ("CKV_K8S_29", &[RunAsNonRoot]),
        ("CKV_K8S_30", &[RunAsNonRoot]),
        ("CKV_K8S_31", &[Seccomp]),
        ("CKV_K8S_37", &[DropCapabilities]),
        ("CKV_K8S_38", &[ServiceAccountToken]),
        ("CKV_K8S_39", &[DropCapabilities]),
        ("CKV_K8S_40", &[RunAsUser]),
        ("CKV_K8S_41", &[ServiceAccountToken]),
        ("CKV_K8S_42", &[ServiceAccountToken]),
        ("CKV2_K8S_5", &[ServiceAccountSubjects]),
        ("CKV2_K8S_6", &[NetworkPolicy]),
    ]
};

const DATREE: Table = {
    use Remedy::*;
    &[
        ("CONTAINERS_MISSING_LIVENESSPROBE_KEY", &[LivenessProbe]),
        ("CONTAINERS_MISSING_READINESSPROBE_KEY", &[ReadinessProbe]),
        ("CONTAINERS_MISSING_CPU_REQUEST_KEY", &[CpuRequest]),
        ("CONTAINERS_MISSING_CPU_LIMIT_KEY", &[CpuLimit]),
        ("CONTAINERS_MISSING_MEMORY_REQUEST_KEY", &[MemoryRequest]),
        ("CONTAINERS_MISSING_MEMORY_LIMIT_KEY", &[MemoryLimit]),
        ("CONTAINERS_INCORRECT_PRIVILEGED_VALUE_TRUE", &[Privileged]),
        ("CONTAINERS_INCORRECT_HOSTPID_VALUE_TRUE", &[HostPid]),
        ("CONTAINERS_INCORRECT_HOSTIPC_VALUE_TRUE", &[HostIpc]),
        ("CONTAINERS_INCORRECT_HOSTNETWORK_VALUE_TRUE", &[HostNetwork]),
        ("CONTAINERS_MISSING_KEY_ALLOWPRIVILEGEESCALATION", &[PrivilegeEscalation]),
        ("WORKLOAD_INCORRECT_NAMESPACE_VALUE_DEFAULT", &[Namespace]),
        ("CONTAINERS_INCORRECT_READONLYROOTFILESYSTEM_VALUE", &[ReadOnlyRootFs]),
        ("CONTAINERS_INCORRECT_RUNASNONROOT_VALUE", &[RunAsNonRoot]),
        ("CIS_MISSING_KEY_SECURITYCONTEXT", &[RunAsNonRoot]),
        ("CONTAINERS_INCORRECT_SECCOMP_PROFILE", &[Seccomp]),
        ("CIS_INVALID_VALUE_SECCOMP_PROFILE", &[Seccomp]),
        ("CONTAINERS_INVALID_CAPABILITIES_VALUE", &[DropCapabilities]),
        ("CIS_MISSING_VALUE_DROP_NET_RAW", &[DropCapabilities]),
        ("EKS_INVALID_CAPABILITIES_EKS", &[DropCapabilities]),
        ("CIS_INVALID_VALUE_AUTOMOUNTSERVICEACCOUNTTOKEN", &[ServiceAccountToken]),
        ("SRVACC_INCORRECT_AUTOMOUNTSERVICEACCOUNTTOKEN_VALUE", &[ServiceAccountToken]),
        ("DEPLOYMENT_INCORRECT_REPLICAS_VALUE", &[Replicas]),
        ("SERVICE_INCORRECT_TYPE_VALUE_NODEPORT", &[NodePortService]),
        ("CONTAINERS_INCORRECT_RUNASUSER_VALUE_LOWUID", &[RunAsUser]),
        ("CONTAINER_CVE2021_25741_INCORRECT_SUBPATH_KEY", &[SubPathMounts]),
        ("CONTAINERS_INCORRECT_KEY_HOSTPATH", &[HostPathVolumes]),
        ("CIS_INVALID_ROLE_CLUSTER_ADMIN", &[ClusterAdminBinding]),
    ]
};

const KICS: Table = {
    use Remedy::*;
    &[
        ("5572cc5e-1e4c-4113-92a6-7a8a3bd25e6d", &[PrivilegeEscalation]),
        ("4ac0e2b7-d2d2-4af7-8799-e8de6721ccda", &[CpuLimit]),
        ("ca469dd4-c736-448f-8ac1-30a642705e0a", &[CpuRequest]),
        ("cf34805e-3872-4c08-bf92-6ff7bb0cfadb", &[RunAsUser]),
        ("02323c00-cdc3-4fdc-a310-4f2b3e7a1660", &[RunAsUser]),
        ("e3aa0612-4351-4a0d-983f-aefea25cf203", &[RunAsUser]),
        ("b14d1bc4-a208-45db-92f0-e21f8e2588e9", &[MemoryLimit]),
        ("229588ef-8fde-40c8-8756-f4f2b5825ded", &[MemoryRequest]),
        ("dbbc6705-d541-43b0-b166-dd4be8208b54", &[DropCapabilities]),
        ("a659f3b5-9bf0-438a-bd9a-7d3a6427f1e3", &[ReadinessProbe]),
        ("f377b83e-bd07-4f48-a591-60c82b14a78b", &[Seccomp]),
        ("48471392-d4d0-47c0-b135-cdec95eb3eef", &[ServiceAccountToken]),
        ("611ab018-c4aa-4ba2-b0f6-a448337509a6", &[Namespace]),
        ("ade74944-a674-4e00-859e-c6eab5bde441", &[LivenessProbe]),
        ("8b36775e-183d-4d46-b0f7-96a6f34a723f", &[AppArmor]),
        ("268ca686-7fb7-4ae9-b129-955a2a89064e", &[DropCapabilities]),
        ("4a20ebac-1060-4c81-95d1-1f7f620e983b", &[LimitRange]),
        ("48a5beba-e4c0-4584-a2aa-e6894e4cf424", &[ResourceQuota]),
        ("a97a340a-0063-418e-b3a1-3028941d0995", &[RunAsNonRoot]),
        ("a9c2f49d-0671-4fc9-9ece-f4e261e128d0", &[ReadOnlyRootFs]),
        ("dd29336b-fe57-445b-a26e-e6aa867ae609", &[Privileged]),
        ("2f1a0619-b12b-48a0-825f-993bb6f01d58", &[DropCapabilities]),
        ("235236ee-ad78-4065-bd29-61b061f28ce0", &[DropCapabilities]),
        ("19ebaa28-fc86-4a58-bcfa-015c9e22fe40", &[DropCapabilities]),
        ("302736f4-b16c-41b8-befe-c0baffa0bd9d", &[HostPid]),
        ("cd290efd-6c82-4e9d-a698-be12ae31d536", &[HostIpc]),
        ("6b6bdfb3-c3ae-44cb-88e4-7405c1ba2c8a", &[HostNetwork]),
        ("caa3479d-885d-4882-9aac-95e5e78ef5c2", &[ImagePullPolicy]),
        ("b7652612-de4e-4466-a0bf-1cd81f0c6063", &[ReadOnlyVolumeMounts]),
        ("845acfbe-3e10-4b8e-b656-3b404d36dfb2", &[NodePortService]),
        ("26763a1c-5dda-4772-b507-5fca7fb5f165", &[NodePortService]),
        ("aa8f7a35-9923-4cad-bd61-a19b7f6aac91", &[HostPathVolumes]),
        ("5308a7a8-06f8-45ac-bf10-791fe21de46e", &[HostPathVolumes]),
        ("192fe40b-b1c3-448a-aba2-6cc19a300fe3", &[CronJobDeadline]),
        ("249328b8-5f0f-409f-b1dd-029f07882e11", &[ClusterAdminBinding]),
        ("a6f34658-fdfb-4154-9536-56d516f65828", &[DockerSocket]),
    ]
};

const KUBELINTER: Table = {
    use Remedy::*;
    &[
        ("unset-memory-requirements", &[MemoryRequest, MemoryLimit]),
        ("unset-cpu-requirements", &[CpuRequest, CpuLimit]),
        ("no-readiness-probe", &[ReadinessProbe]),
        ("host-pid", &[HostPid]),
        ("host-ipc", &[HostIpc]),
        ("host-network", &[HostNetwork]),
        ("docker-sock", &[DockerSocket]),
        ("privileged-container", &[Privileged]),
        (
            "privilege-escalation-container",
            &[PrivilegeEscalation, Privileged, DropCapabilities],
        ),
        ("drop-net-raw-capability", &[DropCapabilities]),
        ("no-read-only-root-fs", &[ReadOnlyRootFs]),
        ("run-as-non-root", &[RunAsNonRoot]),
        ("sensitive-host-mounts", &[HostPathVolumes]),
    ]
};

const KUBEAUDIT: Table = {
    use Remedy::*;
    &[
        ("AppArmorAnnotationMissing", &[AppArmor]),
        ("CapabilityOrSecurityContextMissing", &[DropCapabilities]),
        ("LimitsCPUNotSet", &[CpuLimit]),
        ("LimitsMemoryNotSet", &[MemoryLimit]),
        ("AllowPrivilegeEscalationNil", &[PrivilegeEscalation]),
        ("PrivilegedNil", &[Privileged]),
        ("ReadOnlyRootFilesystemNil", &[ReadOnlyRootFs]),
        ("SeccompProfileMissing", &[Seccomp]),
        ("AutomountServiceAccountTokenTrueAndDefaultSA", &[ServiceAccountToken]),
        ("RunAsNonRootPSCNilCSCNil", &[RunAsNonRoot]),
    ]
};

const KUBESCAPE: Table = {
    use Remedy::*;
    &[
        ("C-0004", &[MemoryRequest, MemoryLimit]),
        ("C-0009", &[MemoryLimit, CpuLimit]),
        ("C-0050", &[CpuRequest, CpuLimit]),
        ("C-0056", &[LivenessProbe]),
        ("C-0018", &[ReadinessProbe]),
        ("C-0038", &[HostPid, HostIpc]),
        ("C-0041", &[HostNetwork]),
        ("C-0074", &[DockerSocket]),
        ("C-0057", &[Privileged]),
        ("C-0016", &[PrivilegeEscalation]),
        ("C-0086", &[PrivilegeEscalation]),
        ("C-0046", &[DropCapabilities]),
        ("C-0061", &[Namespace]),
        ("C-0017", &[ReadOnlyRootFs]),
        ("C-0013", &[RunAsNonRoot]),
        ("C-0055", &[Seccomp, AppArmor, DropCapabilities]),
        ("C-0034", &[ServiceAccountToken]),
        ("C-0030", &[NetworkPolicy]),
    ]
};

const TERRASCAN: Table = {
    use Remedy::*;
    &[
        ("AC_K8S_0099", &[MemoryRequest]),
        ("AC_K8S_0100", &[MemoryLimit]),
        ("AC_K8S_0097", &[CpuRequest]),
        ("AC_K8S_0098", &[CpuLimit]),
        ("AC_K8S_0085", &[PrivilegeEscalation]),
        ("AC_K8S_0086", &[Namespace]),
        ("AC_K8S_0078", &[ReadOnlyRootFs]),
        ("AC_K8S_0080", &[Seccomp]),
        ("AC_K8S_0073", &[AppArmor]),
        ("AC_K8S_0045", &[ServiceAccountToken]),
        ("AC_K8S_0087", &[RunAsNonRoot]),
        ("AC_K8S_0070", &[LivenessProbe]),
        ("AC_K8S_0064", &[RunAsNonRoot]),
        ("AC_K8S_0072", &[ReadinessProbe]),
        ("AC_K8S_0079", &[RunAsUser]),
        ("AC_K8S_0084", &[HostNetwork]),
        ("AC_K8S_0111", &[NodePortService]),
        ("AC_K8S_0076", &[HostPathVolumes]),
        ("AC_K8S_0081", &[ReadOnlyVolumeMounts]),
        ("AC_K8S_0082", &[HostPid]),
        ("AC_K8S_0088", &[DockerSocket]),
    ]
};

fn table(tool: Tool) -> Table {
    match tool {
        Tool::Checkov => CHECKOV,
        Tool::Datree => DATREE,
        Tool::Kics => KICS,
        Tool::Kubelinter => KUBELINTER,
        Tool::Kubeaudit => KUBEAUDIT,
        Tool::Kubescape => KUBESCAPE,
        Tool::Terrascan => TERRASCAN,
    }
}

/// The built-in rule set.
pub fn builtin() -> &'static RuleSet {
    static BUILTIN: Lazy<RuleSet> = Lazy::new(|| {
        let mut set = RuleSet::new(RULESET_VERSION);
        for tool in Tool::ALL {
            for (rule_id, remedies) in table(tool) {
                for remedy in *remedies {
                    set.insert(PatchRule::from_remedy(tool, rule_id, *remedy));
                }
            }
        }
        set
    });
    &BUILTIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::manifest::ResourceRef;

    fn finding(tool: Tool, rule: &str, kind: &str) -> Finding {
        Finding::new(tool, rule, ResourceRef::new(kind, "x"))
    }

    #[test]
    fn test_every_tool_has_rules() {
        let rules = builtin();
        for tool in Tool::ALL {
            assert!(
                rules.rules.keys().any(|(t, _)| *t == tool),
                "{} has no rules",
                tool
            );
        }
        assert_eq!(rules.version(), RULESET_VERSION);
    }

    #[test]
    fn test_multi_remedy_rule_keeps_table_order() {
        let f = finding(Tool::Kubelinter, "privilege-escalation-container", "Deployment");
        let remedies: Vec<&str> = builtin().rules_for(&f).iter().map(|r| r.remedy).collect();
        assert_eq!(
            remedies,
            vec!["privilege-escalation", "privileged", "drop-capabilities"]
        );
    }

    #[test]
    fn test_kind_filter() {
        let svc = finding(Tool::Kics, "845acfbe-3e10-4b8e-b656-3b404d36dfb2", "Service");
        assert_eq!(builtin().rules_for(&svc).len(), 1);
        let deploy = finding(Tool::Kics, "845acfbe-3e10-4b8e-b656-3b404d36dfb2", "Deployment");
        assert!(builtin().rules_for(&deploy).is_empty());
        assert!(
            builtin()
                .rules
                .contains_key(&(Tool::Kics, "845acfbe-3e10-4b8e-b656-3b404d36dfb2".to_string()))
        );
    }

    #[test]
    fn test_image_pinning_is_unmapped() {
        for (tool, id) in [
            (Tool::Checkov, "CKV_K8S_14"),
            (Tool::Checkov, "CKV_K8S_43"),
            (Tool::Kubelinter, "latest-tag"),
            (Tool::Terrascan, "AC_K8S_0068"),
        ] {
            assert!(
                !table(tool).iter().any(|(rule, _)| *rule == id),
                "{} {} should be unmapped",
                tool,
                id
            );
        }
    }

    #[test]
    fn test_generated_documents_have_identity() {
        for doc in [network_policy(), limit_range(), resource_quota()] {
            assert!(ResourceRef::of(&doc).is_some());
        }
    }
}
