//! Pod listing with kubectl-style status derivation

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{ContainerState, ContainerStatus, Pod};
use kubescout_types::{
    ConditionSummary, ContainerStateKind, ContainerStateSummary, LastTermination, OwnerRef,
    PodListOptions, PodRecord, age_since,
};
use tracing::debug;

use crate::client::{ClusterSession, list_params};
use crate::context::CallContext;
use crate::error::{Error, Result};

/// Restart count above which a container no longer counts as healthy
pub const MAX_HEALTHY_RESTARTS: i32 = 5;

const PHASE_RUNNING: &str = "Running";
const PHASE_UNKNOWN: &str = "Unknown";

/// Fetch the pods of `namespace` and return them most urgent first.
///
/// An empty namespace is rejected before any request is made.
pub async fn list_pod_status(
    session: &ClusterSession,
    namespace: &str,
    opts: &PodListOptions,
    ctx: &CallContext,
) -> Result<Vec<PodRecord>> {
    if namespace.is_empty() {
        return Err(Error::MissingArgument("namespace"));
    }

    let api = session.pods(namespace);
    let params = list_params(opts.label_selector.as_deref(), opts.field_selector.as_deref());
    let list = ctx
        .run(async {
            api.list(&params).await.map_err(|e| {
                Error::api(format!("failed to list pods in namespace {}", namespace), e)
            })
        })
        .await?;

    let now = Utc::now();
    let total = list.items.len();
    let mut records: Vec<PodRecord> = list
        .items
        .iter()
        .map(|pod| {
            let mut record = pod_record(pod, now);
            if record.namespace.is_empty() {
                record.namespace = namespace.to_string();
            }
            record
        })
        .filter(|record| !opts.only_unhealthy || !is_healthy(record))
        .collect();
    sort_by_severity(&mut records);

    debug!(namespace, total, returned = records.len(), "Listed pods");
    Ok(records)
}

/// Build the record for one pod, computing ages against `now`
pub fn pod_record(pod: &Pod, now: DateTime<Utc>) -> PodRecord {
    let meta = &pod.metadata;
    let mut record = PodRecord::new(
        meta.name.clone().unwrap_or_default(),
        meta.namespace.clone().unwrap_or_default(),
    );

    let status = pod.status.as_ref();
    let main = status
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();
    let init = status
        .and_then(|s| s.init_container_statuses.as_deref())
        .unwrap_or_default();

    record.phase = status
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| PHASE_UNKNOWN.to_string());
    record.status = derive_status(pod);
    record.ready = ready_ratio(pod);
    record.restarts = main.iter().chain(init).map(|c| c.restart_count).sum();
    record.node = pod.spec.as_ref().and_then(|s| s.node_name.clone());
    record.pod_ip = status.and_then(|s| s.pod_ip.clone());
    record.labels = meta.labels.clone().unwrap_or_default();
    record.containers = main.iter().map(container_summary).collect();
    record.init_containers = init.iter().map(container_summary).collect();
    record.conditions = status
        .and_then(|s| s.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .map(|c| ConditionSummary {
                    kind: c.type_.clone(),
                    status: c.status.clone(),
                    reason: c.reason.clone(),
                    message: c.message.clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    record.created_at = meta.creation_timestamp.as_ref().map(|t| t.0);
    record.age = age_since(record.created_at, now);
    record.qos_class = status.and_then(|s| s.qos_class.clone());
    record.owner = meta
        .owner_references
        .as_ref()
        .and_then(|owners| owners.first())
        .map(|o| OwnerRef {
            kind: o.kind.clone(),
            name: o.name.clone(),
        });

    record
}

/// Derive the single status word kubectl would print for a pod.
///
/// Each pass assigns to one running value and later matches win, so the
/// last container in a list with something to report decides the result.
pub fn derive_status(pod: &Pod) -> String {
    let status = pod.status.as_ref();
    let phase = status
        .and_then(|s| s.phase.as_deref())
        .unwrap_or(PHASE_UNKNOWN);

    let mut reason = status
        .and_then(|s| s.reason.as_deref())
        .filter(|r| !r.is_empty())
        .unwrap_or(phase)
        .to_string();

    let init = status
        .and_then(|s| s.init_container_statuses.as_deref())
        .unwrap_or_default();
    for container in init {
        let Some(state) = container.state.as_ref() else {
            continue;
        };
        if state.terminated.as_ref().is_some_and(|t| t.exit_code != 0) {
            reason = "Init:Error".to_string();
        } else if let Some(waiting) = waiting_reason(state) {
            reason = format!("Init:{}", waiting);
        }
    }

    let mut has_running = false;
    let main = status
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();
    for container in main {
        let Some(state) = container.state.as_ref() else {
            continue;
        };
        if let Some(waiting) = waiting_reason(state) {
            reason = waiting.to_string();
        } else if let Some(terminated) = state.terminated.as_ref() {
            reason = match non_empty(terminated.reason.as_deref()) {
                Some(r) => r.to_string(),
                None => match terminated.signal.filter(|s| *s != 0) {
                    Some(signal) => format!("Signal:{}", signal),
                    None => format!("ExitCode:{}", terminated.exit_code),
                },
            };
        } else if state.running.is_some() {
            has_running = true;
        }
    }

    if phase == PHASE_RUNNING && has_running && reason == phase {
        reason = PHASE_RUNNING.to_string();
    }

    if pod.metadata.deletion_timestamp.is_some() {
        reason = "Terminating".to_string();
    }

    reason
}

/// Severity rank of a derived status; lower sorts first.
///
/// Rank 7 is left unused.
pub fn status_rank(status: &str) -> u8 {
    match status {
        "CrashLoopBackOff" => 0,
        "Error" | "OOMKilled" => 1,
        "ImagePullBackOff" | "ErrImagePull" => 2,
        "Init:Error" | "Init:CrashLoopBackOff" => 3,
        "Pending" => 4,
        "Terminating" => 5,
        "Running" => 8,
        "Completed" | "Succeeded" => 9,
        _ => 6,
    }
}

/// Order by status severity, then by name
pub fn sort_by_severity(records: &mut [PodRecord]) {
    records.sort_by(|a, b| {
        status_rank(&a.status)
            .cmp(&status_rank(&b.status))
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// A pod is healthy when it is Running or Succeeded and every main container
/// is ready, not waiting, and has restarted at most [`MAX_HEALTHY_RESTARTS`] times.
pub fn is_healthy(record: &PodRecord) -> bool {
    matches!(record.phase.as_str(), "Running" | "Succeeded")
        && record.containers.iter().all(|c| {
            c.ready
                && c.restart_count <= MAX_HEALTHY_RESTARTS
                && c.state != ContainerStateKind::Waiting
        })
}

/// `"<ready>/<total>"` over main containers
fn ready_ratio(pod: &Pod) -> String {
    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();
    let declared = pod.spec.as_ref().map(|s| s.containers.len()).unwrap_or(0);
    let total = declared.max(statuses.len());
    let ready = statuses.iter().filter(|c| c.ready).count();
    format!("{}/{}", ready, total)
}

fn container_summary(status: &ContainerStatus) -> ContainerStateSummary {
    let mut summary = ContainerStateSummary::new(status.name.clone(), status.image.clone());
    summary.ready = status.ready;
    summary.restart_count = status.restart_count;

    if let Some(state) = &status.state {
        let (kind, detail) = describe_state(state);
        summary.state = kind;
        summary.detail = detail;
    }

    summary.last_termination = status
        .last_state
        .as_ref()
        .and_then(|s| s.terminated.as_ref())
        .map(|t| LastTermination {
            reason: t.reason.clone(),
            message: t.message.clone(),
            exit_code: t.exit_code,
        });

    summary
}

fn describe_state(state: &ContainerState) -> (ContainerStateKind, String) {
    if let Some(running) = &state.running {
        let detail = running
            .started_at
            .as_ref()
            .map(|t| format!("started {}", t.0.to_rfc3339()))
            .unwrap_or_default();
        return (ContainerStateKind::Running, detail);
    }

    if let Some(waiting) = &state.waiting {
        let detail = [waiting.reason.as_deref(), waiting.message.as_deref()]
            .into_iter()
            .filter_map(non_empty)
            .collect::<Vec<_>>()
            .join(": ");
        return (ContainerStateKind::Waiting, detail);
    }

    if let Some(terminated) = &state.terminated {
        let mut detail = format!(
            "{} (exit code {})",
            non_empty(terminated.reason.as_deref()).unwrap_or("Terminated"),
            terminated.exit_code
        );
        if let Some(signal) = terminated.signal.filter(|s| *s != 0) {
            detail.push_str(&format!(", signal {}", signal));
        }
        return (ContainerStateKind::Terminated, detail);
    }

    (ContainerStateKind::Unknown, String::new())
}

fn waiting_reason(state: &ContainerState) -> Option<&str> {
    non_empty(state.waiting.as_ref().and_then(|w| w.reason.as_deref()))
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
