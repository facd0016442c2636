use std::collections::BTreeMap;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use kubescout_types::{ContextRecord, NamespaceRecord, PodRecord, WorkloadRecord};

/// Marker appended to truncated cells
const ELLIPSIS: &str = "..";

/// Gap between columns
const GAP: &str = "  ";

struct Column {
    header: &'static str,
    width: usize,
}

const fn col(header: &'static str, width: usize) -> Column {
    Column { header, width }
}

const NAMESPACE_COLUMNS: [Column; 4] = [
    col("NAME", 40),
    col("STATUS", 12),
    col("AGE", 8),
    col("LABELS", 60),
];

const POD_COLUMNS: [Column; 7] = [
    col("NAME", 40),
    col("READY", 7),
    col("STATUS", 22),
    col("RESTARTS", 8),
    col("AGE", 8),
    col("NODE", 24),
    col("IP", 15),
];

const CONTEXT_COLUMNS: [Column; 5] = [
    col("CURRENT", 7),
    col("NAME", 32),
    col("CLUSTER", 32),
    col("USER", 24),
    col("NAMESPACE", 24),
];

const WORKLOAD_COLUMNS: [Column; 5] = [
    col("NAME", 40),
    col("KIND", 12),
    col("READY", 8),
    col("AGE", 8),
    col("API VERSION", 32),
];

/// Cut `s` to at most `width` display columns, ending in `..` when shortened
pub fn truncate(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    if width <= ELLIPSIS.len() {
        return ELLIPSIS[..width].to_string();
    }

    let budget = width - ELLIPSIS.len();
    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push_str(ELLIPSIS);
    out
}

fn pad(s: &str, width: usize) -> String {
    let mut out = s.to_string();
    out.extend(std::iter::repeat_n(' ', width.saturating_sub(s.width())));
    out
}

fn render(columns: &[Column], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    let headers: Vec<String> = columns.iter().map(|c| c.header.to_string()).collect();

    for row in std::iter::once(&headers).chain(rows) {
        let last = columns.len().saturating_sub(1);
        let line = columns
            .iter()
            .zip(row)
            .enumerate()
            .map(|(i, (column, cell))| {
                let cell = truncate(cell, column.width);
                if i == last { cell } else { pad(&cell, column.width) }
            })
            .collect::<Vec<_>>()
            .join(GAP);
        lines.push(line.trim_end().to_string());
    }

    lines.join("\n")
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

pub fn namespaces_table(records: &[NamespaceRecord]) -> String {
    if records.is_empty() {
        return "No namespaces found.".to_string();
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|ns| {
            let labels = ns
                .labels
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(",");
            vec![
                ns.name.clone(),
                ns.status.clone(),
                ns.age.clone(),
                or_dash(Some(&labels)),
            ]
        })
        .collect();

    format!("{}\n\nTotal: {} namespaces", render(&NAMESPACE_COLUMNS, &rows), records.len())
}

pub fn pods_table(records: &[PodRecord]) -> String {
    if records.is_empty() {
        return format!("No pods found.\n\n{}", status_summary(records));
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|pod| {
            vec![
                pod.name.clone(),
                pod.ready.clone(),
                pod.status.clone(),
                pod.restarts.to_string(),
                pod.age.clone(),
                or_dash(pod.node.as_deref()),
                or_dash(pod.pod_ip.as_deref()),
            ]
        })
        .collect();

    format!("{}\n\n{}", render(&POD_COLUMNS, &rows), status_summary(records))
}

/// `Total: N pods (A: x, B: y)` with statuses in lexicographic order,
/// or `Total: 0 pods` for an empty list
pub fn status_summary(records: &[PodRecord]) -> String {
    if records.is_empty() {
        return "Total: 0 pods".to_string();
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for pod in records {
        *counts.entry(pod.status.as_str()).or_default() += 1;
    }

    let breakdown = counts
        .iter()
        .map(|(status, count)| format!("{}: {}", status, count))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Total: {} pods ({})", records.len(), breakdown)
}

pub fn contexts_table(records: &[ContextRecord]) -> String {
    if records.is_empty() {
        return "No contexts found.".to_string();
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|ctx| {
            vec![
                if ctx.is_current { "*" } else { "" }.to_string(),
                ctx.name.clone(),
                ctx.cluster.clone(),
                ctx.user.clone(),
                or_dash(ctx.namespace.as_deref()),
            ]
        })
        .collect();

    render(&CONTEXT_COLUMNS, &rows)
}

pub fn workloads_table(records: &[WorkloadRecord]) -> String {
    if records.is_empty() {
        return "No extended workloads found.".to_string();
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|w| {
            vec![
                w.name.clone(),
                w.kind.clone(),
                w.replica_status(),
                w.age.clone(),
                w.api_version.clone(),
            ]
        })
        .collect();

    format!("{}\n\nTotal: {} workloads", render(&WORKLOAD_COLUMNS, &rows), records.len())
}
