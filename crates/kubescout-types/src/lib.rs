//! Shared record types for kubescout
//!
//! This crate contains the read-only snapshots produced by the cluster
//! inspection layer and consumed by the renderers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Resource Records
// ============================================================================

/// Kubeconfig context information
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContextRecord {
    pub name: String,
    pub cluster: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub is_current: bool,
}

impl ContextRecord {
    pub fn new(
        name: String,
        cluster: String,
        user: String,
        namespace: Option<String>,
        is_current: bool,
    ) -> Self {
        Self {
            name,
            cluster,
            user,
            namespace,
            is_current,
        }
    }
}

/// Namespace snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NamespaceRecord {
    pub name: String,
    pub status: String,
    pub labels: BTreeMap<String, String>,
    /// Annotations with system-managed keys removed; `None` when nothing is left
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    pub created_at: Option<DateTime<Utc>>,
    pub age: String,
}

impl NamespaceRecord {
    pub fn new(name: String, status: String) -> Self {
        Self {
            name,
            status,
            labels: BTreeMap::new(),
            annotations: None,
            created_at: None,
            age: String::new(),
        }
    }
}

/// Pod snapshot with a derived display status
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PodRecord {
    pub name: String,
    pub namespace: String,
    pub phase: String,
    /// Single status word derived from phase, container states and deletion
    pub status: String,
    /// `"<ready>/<total>"` over main containers only
    pub ready: String,
    /// Restart count summed over main and init containers
    pub restarts: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_ip: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub containers: Vec<ContainerStateSummary>,
    pub init_containers: Vec<ContainerStateSummary>,
    pub conditions: Vec<ConditionSummary>,
    pub created_at: Option<DateTime<Utc>>,
    pub age: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qos_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerRef>,
}

impl PodRecord {
    pub fn new(name: String, namespace: String) -> Self {
        Self {
            name,
            namespace,
            phase: "Unknown".to_string(),
            status: "Unknown".to_string(),
            ready: "0/0".to_string(),
            restarts: 0,
            node: None,
            pod_ip: None,
            labels: BTreeMap::new(),
            containers: Vec::new(),
            init_containers: Vec::new(),
            conditions: Vec::new(),
            created_at: None,
            age: String::new(),
            qos_class: None,
            owner: None,
        }
    }
}

/// Which state a container currently reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ContainerStateKind {
    Running,
    Waiting,
    Terminated,
    /// No state reported yet
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl ContainerStateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Waiting => "Waiting",
            Self::Terminated => "Terminated",
            Self::Unknown => "",
        }
    }
}

/// Details of the most recent previous termination of a container
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LastTermination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub exit_code: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContainerStateSummary {
    pub name: String,
    pub image: String,
    pub ready: bool,
    pub restart_count: i32,
    pub state: ContainerStateKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_termination: Option<LastTermination>,
}

impl ContainerStateSummary {
    pub fn new(name: String, image: String) -> Self {
        Self {
            name,
            image,
            ready: false,
            restart_count: 0,
            state: ContainerStateKind::Unknown,
            detail: String::new(),
            last_termination: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConditionSummary {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// First owner reference of an object
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

/// Custom workload resource served through the dynamic client
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkloadRecord {
    pub name: String,
    pub namespace: String,
    pub kind: String,
    pub api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_replicas: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub age: String,
}

impl WorkloadRecord {
    pub fn new(name: String, namespace: String, kind: String, api_version: String) -> Self {
        Self {
            name,
            namespace,
            kind,
            api_version,
            replicas: None,
            ready_replicas: None,
            created_at: None,
            age: String::new(),
        }
    }

    /// Format replica status as "ready/desired", or "-" when unknown
    pub fn replica_status(&self) -> String {
        match self.replicas {
            Some(desired) => format!("{}/{}", self.ready_replicas.unwrap_or(0), desired),
            None => "-".to_string(),
        }
    }
}

// ============================================================================
// Query Options
// ============================================================================

/// Per-call options for pod listing
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PodListOptions {
    /// Standard Kubernetes label selector, passed through verbatim
    pub label_selector: Option<String>,
    /// Standard Kubernetes field selector, passed through verbatim
    pub field_selector: Option<String>,
    /// Keep only pods classified as unhealthy
    pub only_unhealthy: bool,
}

impl PodListOptions {
    pub fn with_labels(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    pub fn with_fields(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = Some(selector.into());
        self
    }

    pub fn unhealthy_only(mut self) -> Self {
        self.only_unhealthy = true;
        self
    }
}

// ============================================================================
// Age Formatting
// ============================================================================

/// Format an elapsed duration in seconds the way kubectl prints ages.
///
/// `45s`, `12m`, `3h`, `3h20m`, `2d`, `2d4h`. Negative input (clock skew)
/// is clamped to zero.
pub fn format_age(seconds: i64) -> String {
    let secs = seconds.max(0);
    if secs < 60 {
        return format!("{}s", secs);
    }
    if secs < 3600 {
        return format!("{}m", secs / 60);
    }
    if secs < 86_400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        return if mins == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h{}m", hours, mins)
        };
    }
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    if hours == 0 {
        format!("{}d", days)
    } else {
        format!("{}d{}h", days, hours)
    }
}

/// Age of `created` relative to `now`, or `"<unknown>"` without a timestamp
pub fn age_since(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match created {
        Some(ts) => format_age((now - ts).num_seconds()),
        None => "<unknown>".to_string(),
    }
}
