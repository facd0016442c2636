//! Extended workload custom resources, queried through the dynamic client

use chrono::{DateTime, Utc};
use kube::api::ListParams;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kubescout_types::{WorkloadRecord, age_since};
use tracing::debug;

use crate::client::ClusterSession;
use crate::context::CallContext;
use crate::error::{Error, Result};

/// A custom workload type addressed by group/version/kind plus plural
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkloadKind {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
}

impl WorkloadKind {
    pub fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(self.group, self.version, self.kind);
        ApiResource::from_gvk_with_plural(&gvk, self.plural)
    }

    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }
}

/// OpenKruise CloneSet
pub const KRUISE_CLONESET: WorkloadKind = WorkloadKind {
    group: "apps.kruise.io",
    version: "v1alpha1",
    kind: "CloneSet",
    plural: "clonesets",
};

/// Argo Rollouts Rollout
pub const ARGO_ROLLOUT: WorkloadKind = WorkloadKind {
    group: "argoproj.io",
    version: "v1alpha1",
    kind: "Rollout",
    plural: "rollouts",
};

/// Workload identities queried by [`list_extended_workloads`]
pub const EXTENDED_WORKLOADS: [WorkloadKind; 2] = [KRUISE_CLONESET, ARGO_ROLLOUT];

/// List extended workloads in `namespace`, sorted by kind then name.
///
/// A workload type whose API is not served by the cluster (404) is skipped.
pub async fn list_extended_workloads(
    session: &ClusterSession,
    namespace: &str,
    ctx: &CallContext,
) -> Result<Vec<WorkloadRecord>> {
    if namespace.is_empty() {
        return Err(Error::MissingArgument("namespace"));
    }

    let now = Utc::now();
    let mut records = Vec::new();

    for kind in EXTENDED_WORKLOADS {
        let resource = kind.api_resource();
        let api = session.dynamic(namespace, &resource);
        let listed = ctx
            .run(async {
                api.list(&ListParams::default()).await.map_err(|e| {
                    let context = format!("failed to list {} in namespace {}", kind.plural, namespace);
                    Error::api(context, e)
                })
            })
            .await;

        match listed {
            Ok(list) => {
                records.extend(list.items.iter().map(|obj| workload_record(obj, &kind, now)));
            }
            Err(e) if e.status_code() == Some(404) => {
                debug!(kind = kind.kind, group = kind.group, "Workload API not served, skipping");
            }
            Err(e) => return Err(e),
        }
    }

    for record in records.iter_mut().filter(|r| r.namespace.is_empty()) {
        record.namespace = namespace.to_string();
    }
    records.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
    Ok(records)
}

/// Build a record from an untyped object; replica counts come from
/// `spec.replicas` and `status.readyReplicas` when present.
pub fn workload_record(
    obj: &DynamicObject,
    kind: &WorkloadKind,
    now: DateTime<Utc>,
) -> WorkloadRecord {
    let meta = &obj.metadata;
    let mut record = WorkloadRecord::new(
        meta.name.clone().unwrap_or_default(),
        meta.namespace.clone().unwrap_or_default(),
        kind.kind.to_string(),
        kind.api_version(),
    );

    record.replicas = obj.data.pointer("/spec/replicas").and_then(|v| v.as_i64());
    record.ready_replicas = obj
        .data
        .pointer("/status/readyReplicas")
        .and_then(|v| v.as_i64());
    record.created_at = meta.creation_timestamp.as_ref().map(|t| t.0);
    record.age = age_since(record.created_at, now);
    record
}
