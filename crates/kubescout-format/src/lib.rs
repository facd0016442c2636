//! Rendering for kubescout records
//!
//! Records render either as fixed-width text tables or as pretty-printed
//! JSON. Rendering never fails.

mod table;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub use table::{
    contexts_table, namespaces_table, pods_table, status_summary, truncate, workloads_table,
};

use kubescout_types::{ContextRecord, NamespaceRecord, PodRecord, WorkloadRecord};

/// Output format requested by the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown output format '{0}' (expected 'json' or 'table')")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
        }
    }
}

pub fn render_namespaces(format: OutputFormat, records: &[NamespaceRecord]) -> String {
    match format {
        OutputFormat::Table => namespaces_table(records),
        OutputFormat::Json => to_json(records),
    }
}

pub fn render_pods(format: OutputFormat, records: &[PodRecord]) -> String {
    match format {
        OutputFormat::Table => pods_table(records),
        OutputFormat::Json => to_json(records),
    }
}

pub fn render_contexts(format: OutputFormat, records: &[ContextRecord]) -> String {
    match format {
        OutputFormat::Table => contexts_table(records),
        OutputFormat::Json => to_json(records),
    }
}

pub fn render_workloads(format: OutputFormat, records: &[WorkloadRecord]) -> String {
    match format {
        OutputFormat::Table => workloads_table(records),
        OutputFormat::Json => to_json(records),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {}\"}}", e))
}
