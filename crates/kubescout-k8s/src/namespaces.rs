//! Namespace listing

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Namespace;
use kubescout_types::{NamespaceRecord, age_since};
use tracing::debug;

use crate::client::{ClusterSession, list_params};
use crate::context::CallContext;
use crate::error::{Error, Result};

/// Annotation key fragments owned by the control plane and kubectl
pub const SYSTEM_ANNOTATION_MARKERS: [&str; 2] = ["kubernetes.io/", "kubectl.kubernetes.io/"];

/// Fetch namespaces, optionally narrowed by a label selector, sorted by name
pub async fn list_namespaces(
    session: &ClusterSession,
    label_selector: Option<&str>,
    ctx: &CallContext,
) -> Result<Vec<NamespaceRecord>> {
    let api = session.namespaces();
    let params = list_params(label_selector, None);
    let list = ctx
        .run(async {
            api.list(&params)
                .await
                .map_err(|e| Error::api("failed to list namespaces", e))
        })
        .await?;

    let now = Utc::now();
    let mut records: Vec<NamespaceRecord> = list
        .items
        .iter()
        .map(|ns| namespace_record(ns, now))
        .collect();
    records.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(count = records.len(), "Listed namespaces");
    Ok(records)
}

/// Build the record for one namespace, computing its age against `now`
pub fn namespace_record(ns: &Namespace, now: DateTime<Utc>) -> NamespaceRecord {
    let meta = &ns.metadata;
    let status = ns
        .status
        .as_ref()
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut record = NamespaceRecord::new(meta.name.clone().unwrap_or_default(), status);
    record.labels = meta.labels.clone().unwrap_or_default();
    record.annotations = filter_annotations(meta.annotations.as_ref());
    record.created_at = meta.creation_timestamp.as_ref().map(|t| t.0);
    record.age = age_since(record.created_at, now);
    record
}

/// Drop system-managed annotations; `None` when nothing user-defined remains
pub fn filter_annotations(
    annotations: Option<&BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    let kept: BTreeMap<String, String> = annotations?
        .iter()
        .filter(|(key, _)| {
            !SYSTEM_ANNOTATION_MARKERS
                .iter()
                .any(|marker| key.contains(marker))
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    (!kept.is_empty()).then_some(kept)
}
