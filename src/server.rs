//! MCP tool server exposing the read-only cluster queries

use std::time::Duration;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    service::RequestContext,
    tool, tool_handler, tool_router,
    transport::stdio,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use kubescout_format::{
    OutputFormat, render_contexts, render_namespaces, render_pods, render_workloads,
};
use kubescout_k8s::{
    CallContext, ClusterSession, ConnectOptions, Error, PodListOptions, list_contexts,
    list_extended_workloads, list_namespaces, list_pod_status,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListNamespacesParams {
    /// Label selector such as "env=prod,team=payments"; empty lists all namespaces
    #[serde(default)]
    pub label_selector: Option<String>,
    /// "table" (default) or "json"
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPodsParams {
    /// Namespace to inspect (required)
    #[serde(default)]
    pub namespace: String,
    /// Label selector such as "app=web"
    #[serde(default)]
    pub label_selector: Option<String>,
    /// Field selector such as "spec.nodeName=node-1"
    #[serde(default)]
    pub field_selector: Option<String>,
    /// Only return pods that are not healthy
    #[serde(default)]
    pub only_unhealthy: Option<bool>,
    /// "table" (default) or "json"
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListWorkloadsParams {
    /// Namespace to inspect (required)
    #[serde(default)]
    pub namespace: String,
    /// "table" (default) or "json"
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FormatParams {
    /// "table" (default) or "json"
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Clone)]
pub struct KubescoutServer {
    session: ClusterSession,
    connect: ConnectOptions,
    timeout: Option<Duration>,
    default_format: OutputFormat,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl KubescoutServer {
    pub fn new(
        session: ClusterSession,
        connect: ConnectOptions,
        timeout: Option<Duration>,
        default_format: OutputFormat,
    ) -> Self {
        Self {
            session,
            connect,
            timeout,
            default_format,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "List Kubernetes namespaces sorted by name, with status, labels, user annotations and age. Optionally filter by label selector."
    )]
    async fn list_namespaces(
        &self,
        Parameters(params): Parameters<ListNamespacesParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let format = self.output_format(params.format.as_deref())?;
        let call = self.call_context(ctx.ct);
        let result = list_namespaces(&self.session, params.label_selector.as_deref(), &call).await;
        respond(result, |records| render_namespaces(format, records))
    }

    #[tool(
        description = "List pods in a namespace with a kubectl-style status, ready count, restarts, node and age. Unhealthy pods (CrashLoopBackOff, errors, image pull failures, pending) are listed first. Set only_unhealthy to hide healthy pods."
    )]
    async fn list_pods(
        &self,
        Parameters(params): Parameters<ListPodsParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let format = self.output_format(params.format.as_deref())?;
        let opts = PodListOptions {
            label_selector: params.label_selector,
            field_selector: params.field_selector,
            only_unhealthy: params.only_unhealthy.unwrap_or(false),
        };
        let call = self.call_context(ctx.ct);
        let result = list_pod_status(&self.session, &params.namespace, &opts, &call).await;
        respond(result, |records| render_pods(format, records))
    }

    #[tool(description = "List the contexts defined in the active kubeconfig, marking the current one.")]
    async fn list_contexts(
        &self,
        Parameters(params): Parameters<FormatParams>,
    ) -> Result<CallToolResult, McpError> {
        let format = self.output_format(params.format.as_deref())?;
        respond(list_contexts(&self.connect), |records| {
            render_contexts(format, records)
        })
    }

    #[tool(
        description = "List extended workload custom resources (OpenKruise CloneSets, Argo Rollouts) in a namespace with replica readiness."
    )]
    async fn list_workloads(
        &self,
        Parameters(params): Parameters<ListWorkloadsParams>,
        ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let format = self.output_format(params.format.as_deref())?;
        let call = self.call_context(ctx.ct);
        let result = list_extended_workloads(&self.session, &params.namespace, &call).await;
        respond(result, |records| render_workloads(format, records))
    }
}

impl KubescoutServer {
    fn call_context(&self, token: CancellationToken) -> CallContext {
        let ctx = CallContext::new().with_cancellation(token);
        match self.timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    fn output_format(&self, requested: Option<&str>) -> Result<OutputFormat, McpError> {
        match requested.filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse()
                .map_err(|e: kubescout_format::UnknownFormat| {
                    McpError::invalid_params(e.to_string(), None)
                }),
            None => Ok(self.default_format),
        }
    }
}

/// Turn a query result into a tool response.
///
/// Missing arguments are protocol-level invalid params; every other failure
/// is reported to the model as a tool error it can read.
fn respond<T>(
    result: kubescout_k8s::Result<Vec<T>>,
    render: impl FnOnce(&[T]) -> String,
) -> Result<CallToolResult, McpError> {
    match result {
        Ok(records) => Ok(CallToolResult::success(vec![Content::text(render(&records))])),
        Err(e @ Error::MissingArgument(_)) => Err(McpError::invalid_params(e.to_string(), None)),
        Err(e) => {
            tracing::warn!(error = %e, "Tool call failed");
            Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
        }
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for KubescoutServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Read-only Kubernetes inspection. Use list_namespaces to discover namespaces, \
                 list_pods to find unhealthy workloads (most severe first), list_workloads for \
                 OpenKruise/Argo custom workloads and list_contexts to see kubeconfig contexts."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Serve the tools over stdio until the client disconnects
pub async fn run(server: KubescoutServer) -> anyhow::Result<()> {
    tracing::info!("Starting kubescout MCP server on stdio");

    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("MCP serve error: {:?}", e);
    })?;

    service.waiting().await?;
    Ok(())
}
