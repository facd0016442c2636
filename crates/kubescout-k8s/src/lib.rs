//! Kubernetes cluster inspection for kubescout
//!
//! This crate resolves how to reach a cluster and provides read-only,
//! point-in-time listings of namespaces, pods, kubeconfig contexts and
//! extended workload custom resources.

mod client;
mod context;
mod error;
mod namespaces;
mod pods;
mod workloads;

pub use client::{
    ClusterSession, ConfigSource, ConnectOptions, KUBECONFIG_ENV, RESOLUTION_ORDER,
    SERVICE_ACCOUNT_DIR, SERVICE_HOST_ENV, SourceKind, list_contexts,
};
pub use context::CallContext;
pub use error::{Error, Result};
pub use namespaces::{SYSTEM_ANNOTATION_MARKERS, filter_annotations, list_namespaces, namespace_record};
pub use pods::{
    MAX_HEALTHY_RESTARTS, derive_status, is_healthy, list_pod_status, pod_record, sort_by_severity,
    status_rank,
};
pub use workloads::{
    ARGO_ROLLOUT, EXTENDED_WORKLOADS, KRUISE_CLONESET, WorkloadKind, list_extended_workloads,
    workload_record,
};

// Re-export types that are used in our public API
pub use kubescout_types::{
    ContainerStateKind, ContainerStateSummary, ContextRecord, NamespaceRecord, PodListOptions,
    PodRecord, WorkloadRecord,
};
