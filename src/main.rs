mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use kubescout_format::{render_contexts, render_namespaces, render_pods, render_workloads};
use kubescout_k8s::{
    CallContext, ClusterSession, PodListOptions, list_contexts, list_extended_workloads,
    list_namespaces, list_pod_status,
};

use config::{GlobalArgs, RuntimeConfig, Settings};
use server::KubescoutServer;

/// Kubescout - read-only Kubernetes inspection over MCP
#[derive(Parser, Debug)]
#[command(name = "kubescout")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the MCP tools over stdio (default)
    Serve,

    /// List namespaces
    Namespaces {
        /// Label selector, e.g. "env=prod"
        #[arg(short = 'l', long = "selector")]
        selector: Option<String>,
    },

    /// List pods in a namespace, most severe first
    Pods {
        #[arg(value_name = "NAMESPACE")]
        namespace: String,

        /// Label selector, e.g. "app=web"
        #[arg(short = 'l', long = "selector")]
        selector: Option<String>,

        /// Field selector, e.g. "spec.nodeName=node-1"
        #[arg(long)]
        field_selector: Option<String>,

        /// Only show pods that are not healthy
        #[arg(long)]
        unhealthy: bool,
    },

    /// List kubeconfig contexts
    Contexts,

    /// List OpenKruise and Argo Rollouts workloads in a namespace
    Workloads {
        #[arg(value_name = "NAMESPACE")]
        namespace: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let runtime = Settings::load(args.global.config.as_deref())?.merge(&args.global)?;

    // stdout carries the MCP protocol, so logs always go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&runtime.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args.command.unwrap_or(Command::Serve), runtime).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(command: Command, runtime: RuntimeConfig) -> Result<()> {
    let token = CancellationToken::new();
    let on_interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut ctx = CallContext::new().with_cancellation(token);
    if let Some(timeout) = runtime.timeout {
        ctx = ctx.with_timeout(timeout);
    }

    let output = match command {
        Command::Serve => {
            let session = ClusterSession::connect(&runtime.connect).await?;
            let server = KubescoutServer::new(
                session,
                runtime.connect.clone(),
                runtime.timeout,
                runtime.format,
            );
            return server::run(server).await;
        }
        Command::Contexts => {
            let records = list_contexts(&runtime.connect)?;
            render_contexts(runtime.format, &records)
        }
        Command::Namespaces { selector } => {
            let session = ClusterSession::connect(&runtime.connect).await?;
            let records = list_namespaces(&session, selector.as_deref(), &ctx).await?;
            render_namespaces(runtime.format, &records)
        }
        Command::Pods {
            namespace,
            selector,
            field_selector,
            unhealthy,
        } => {
            let session = ClusterSession::connect(&runtime.connect).await?;
            let opts = PodListOptions {
                label_selector: selector,
                field_selector,
                only_unhealthy: unhealthy,
            };
            let records = list_pod_status(&session, &namespace, &opts, &ctx).await?;
            render_pods(runtime.format, &records)
        }
        Command::Workloads { namespace } => {
            let session = ClusterSession::connect(&runtime.connect).await?;
            let records = list_extended_workloads(&session, &namespace, &ctx).await?;
            render_workloads(runtime.format, &records)
        }
    };

    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_serve_is_default() {
        let args = Args::try_parse_from(["kubescout", "--context", "prod"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.global.context.as_deref(), Some("prod"));
    }

    #[test]
    fn test_pods_subcommand() {
        let args = Args::try_parse_from([
            "kubescout",
            "pods",
            "shop",
            "-l",
            "app=web",
            "--unhealthy",
            "--format",
            "json",
        ])
        .unwrap();

        match args.command {
            Some(Command::Pods {
                namespace,
                selector,
                unhealthy,
                ..
            }) => {
                assert_eq!(namespace, "shop");
                assert_eq!(selector.as_deref(), Some("app=web"));
                assert!(unhealthy);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(args.global.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_pods_requires_namespace() {
        assert!(Args::try_parse_from(["kubescout", "pods"]).is_err());
    }
}
