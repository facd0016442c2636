//! Cluster connection resolution and the session handle

use std::fmt;
use std::path::{Path, PathBuf};

use k8s_openapi::api::core::v1::{Namespace, Pod};
use kube::Api;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::core::{ApiResource, DynamicObject};
use tracing::{debug, info, warn};

use kubescout_types::ContextRecord;

use crate::error::{Error, Result};

/// Environment variable naming kubeconfig file(s)
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Set by the kubelet in every pod; its absence means we are not in a cluster
pub const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";

/// Where the kubelet mounts the pod's service account credentials
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Sources tried when connecting, highest priority first
pub const RESOLUTION_ORDER: [SourceKind; 4] = [
    SourceKind::Explicit,
    SourceKind::EnvVar,
    SourceKind::DefaultPath,
    SourceKind::InCluster,
];

/// One step of the resolution chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Explicit,
    EnvVar,
    DefaultPath,
    InCluster,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit path"),
            Self::EnvVar => write!(f, "${}", KUBECONFIG_ENV),
            Self::DefaultPath => write!(f, "default kubeconfig"),
            Self::InCluster => write!(f, "in-cluster"),
        }
    }
}

/// Where the session configuration came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    EnvVar(PathBuf),
    DefaultPath(PathBuf),
    InCluster,
    /// Configuration built by the caller
    Custom,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(path) => write!(f, "explicit kubeconfig {}", path.display()),
            Self::EnvVar(path) => write!(f, "${} ({})", KUBECONFIG_ENV, path.display()),
            Self::DefaultPath(path) => write!(f, "default kubeconfig {}", path.display()),
            Self::InCluster => write!(f, "in-cluster service account"),
            Self::Custom => write!(f, "caller-provided config"),
        }
    }
}

/// Connection parameters supplied by the caller
#[derive(Clone, Debug, Default)]
pub struct ConnectOptions {
    /// Explicit kubeconfig path; a load failure here is fatal
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the file's current context
    pub context: Option<String>,
}

/// Process environment the resolver reads from
#[derive(Clone, Debug, Default)]
pub(crate) struct Environment {
    pub kubeconfig_env: Option<String>,
    pub home: Option<PathBuf>,
    pub service_host: Option<String>,
    pub service_account_dir: PathBuf,
}

impl Environment {
    pub fn current() -> Self {
        Self {
            kubeconfig_env: std::env::var(KUBECONFIG_ENV).ok(),
            home: dirs::home_dir(),
            service_host: std::env::var(SERVICE_HOST_ENV).ok(),
            service_account_dir: PathBuf::from(SERVICE_ACCOUNT_DIR),
        }
    }

    /// Kubeconfig file paths for a file-based source, if that source applies
    fn paths_for(&self, kind: SourceKind, opts: &ConnectOptions) -> Option<Vec<PathBuf>> {
        match kind {
            SourceKind::Explicit => opts
                .kubeconfig
                .as_ref()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| vec![p.clone()]),
            SourceKind::EnvVar => {
                let value = self.kubeconfig_env.as_deref().filter(|v| !v.is_empty())?;
                let paths: Vec<PathBuf> = std::env::split_paths(value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect();
                (!paths.is_empty()).then_some(paths)
            }
            SourceKind::DefaultPath => self
                .home
                .as_ref()
                .map(|home| vec![home.join(".kube").join("config")]),
            SourceKind::InCluster => None,
        }
    }
}

enum Attempt {
    Found(kube::Config, ConfigSource),
    Skipped(String),
    Failed(String),
}

fn source_for(kind: SourceKind, path: &Path) -> ConfigSource {
    let path = path.to_path_buf();
    match kind {
        SourceKind::Explicit => ConfigSource::Explicit(path),
        SourceKind::EnvVar => ConfigSource::EnvVar(path),
        _ => ConfigSource::DefaultPath(path),
    }
}

/// Read and merge kubeconfig files in order
fn read_kubeconfig(paths: &[PathBuf]) -> Result<Kubeconfig, KubeconfigError> {
    let mut merged = Kubeconfig::default();
    for path in paths {
        merged = merged.merge(Kubeconfig::read_from(path)?)?;
    }
    Ok(merged)
}

async fn config_from_files(
    paths: &[PathBuf],
    context: Option<&str>,
) -> Result<kube::Config, KubeconfigError> {
    let kubeconfig = read_kubeconfig(paths)?;
    kube::Config::from_custom_kubeconfig(
        kubeconfig,
        &KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        },
    )
    .await
}

async fn attempt(kind: SourceKind, opts: &ConnectOptions, env: &Environment) -> Result<Attempt> {
    if kind == SourceKind::InCluster {
        return Ok(in_cluster(env));
    }

    let Some(paths) = env.paths_for(kind, opts) else {
        return Ok(Attempt::Skipped("not set".to_string()));
    };
    let first = paths[0].clone();

    if kind == SourceKind::DefaultPath && !first.exists() {
        return Ok(Attempt::Skipped(format!("{} does not exist", first.display())));
    }

    match config_from_files(&paths, opts.context.as_deref()).await {
        Ok(config) => Ok(Attempt::Found(config, source_for(kind, &first))),
        Err(source) if kind == SourceKind::Explicit => Err(Error::ExplicitConfig {
            path: first,
            source,
        }),
        Err(e) => Ok(Attempt::Failed(format!("{}: {}", first.display(), e))),
    }
}

fn in_cluster(env: &Environment) -> Attempt {
    if env.service_host.as_deref().is_none_or(str::is_empty) {
        return Attempt::Skipped(format!("{} not set", SERVICE_HOST_ENV));
    }

    let token = env.service_account_dir.join("token");
    if !token.exists() {
        return Attempt::Failed(format!("{} does not exist", token.display()));
    }

    match kube::Config::incluster() {
        Ok(config) => Attempt::Found(config, ConfigSource::InCluster),
        Err(e) => Attempt::Failed(e.to_string()),
    }
}

/// Walk `order` until one source yields a config.
///
/// An explicit path that fails to load stops the walk immediately. Every
/// other failure is recorded and the next source is tried.
pub(crate) async fn resolve_config(
    opts: &ConnectOptions,
    env: &Environment,
    order: &[SourceKind],
) -> Result<(kube::Config, ConfigSource)> {
    let mut attempts = Vec::with_capacity(order.len());

    for &kind in order {
        match attempt(kind, opts, env).await? {
            Attempt::Found(config, source) => {
                info!(source = %source, cluster = %config.cluster_url, "Resolved kubernetes configuration");
                return Ok((config, source));
            }
            Attempt::Skipped(reason) => {
                debug!(source = %kind, %reason, "Skipping configuration source");
                attempts.push(format!("{}: {}", kind, reason));
            }
            Attempt::Failed(reason) => {
                warn!(source = %kind, %reason, "Configuration source failed");
                attempts.push(format!("{}: {}", kind, reason));
            }
        }
    }

    Err(Error::NoValidConfig { attempts })
}

/// Authenticated handle to one Kubernetes API server.
///
/// Cloning is cheap and clones share the underlying transport. The same
/// client serves typed resources and dynamic (group/version/resource) queries.
#[derive(Clone)]
pub struct ClusterSession {
    client: kube::Client,
    source: ConfigSource,
}

impl ClusterSession {
    /// Resolve a configuration and build a session from it
    pub async fn connect(opts: &ConnectOptions) -> Result<Self> {
        let (config, source) =
            resolve_config(opts, &Environment::current(), &RESOLUTION_ORDER).await?;
        Self::from_config(config, source)
    }

    /// Build a session from an already resolved configuration
    pub fn from_config(config: kube::Config, source: ConfigSource) -> Result<Self> {
        let client = kube::Client::try_from(config).map_err(Error::Client)?;
        Ok(Self { client, source })
    }

    pub fn client(&self) -> &kube::Client {
        &self.client
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    pub fn namespaces(&self) -> Api<Namespace> {
        Api::all(self.client.clone())
    }

    pub fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Dynamic client for a resource type unknown at compile time
    pub fn dynamic(&self, namespace: &str, resource: &ApiResource) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }
}

impl fmt::Debug for ClusterSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterSession")
            .field("source", &self.source)
            .finish()
    }
}

/// List parameters with the caller's selectors passed through verbatim
pub(crate) fn list_params(labels: Option<&str>, fields: Option<&str>) -> ListParams {
    let mut params = ListParams::default();
    if let Some(labels) = labels.filter(|s| !s.is_empty()) {
        params = params.labels(labels);
    }
    if let Some(fields) = fields.filter(|s| !s.is_empty()) {
        params = params.fields(fields);
    }
    params
}

/// List the contexts of the kubeconfig the resolver would read, sorted by name
pub fn list_contexts(opts: &ConnectOptions) -> Result<Vec<ContextRecord>> {
    list_contexts_in(opts, &Environment::current())
}

pub(crate) fn list_contexts_in(
    opts: &ConnectOptions,
    env: &Environment,
) -> Result<Vec<ContextRecord>> {
    let mut attempts = Vec::new();

    for kind in [SourceKind::Explicit, SourceKind::EnvVar, SourceKind::DefaultPath] {
        let Some(paths) = env.paths_for(kind, opts) else {
            attempts.push(format!("{}: not set", kind));
            continue;
        };
        match read_kubeconfig(&paths) {
            Ok(kubeconfig) => return Ok(contexts_of(&kubeconfig)),
            Err(source) if kind == SourceKind::Explicit => {
                return Err(Error::ExplicitConfig {
                    path: paths[0].clone(),
                    source,
                });
            }
            Err(e) => attempts.push(format!("{}: {}", kind, e)),
        }
    }

    Err(Error::NoValidConfig { attempts })
}

fn contexts_of(kubeconfig: &Kubeconfig) -> Vec<ContextRecord> {
    let current = kubeconfig.current_context.as_ref();
    let mut contexts: Vec<ContextRecord> = kubeconfig
        .contexts
        .iter()
        .map(|ctx| {
            let context = ctx.context.as_ref();
            ContextRecord::new(
                ctx.name.clone(),
                context.map(|c| c.cluster.clone()).unwrap_or_default(),
                context.and_then(|c| c.user.clone()).unwrap_or_default(),
                context.and_then(|c| c.namespace.clone()),
                Some(&ctx.name) == current,
            )
        })
        .collect();
    contexts.sort_by(|a, b| a.name.cmp(&b.name));
    contexts
}
