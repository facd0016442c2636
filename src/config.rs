//! Settings file and command-line overrides

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use kubescout_format::OutputFormat;
use kubescout_k8s::ConnectOptions;

/// Log directive used when neither RUST_LOG, the CLI nor the file set one
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Options shared by every subcommand
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Settings file (defaults to ~/.config/kubescout/config.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Kubeconfig file; failing to load it is an error
    #[arg(long, global = true, value_name = "FILE")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true, value_name = "NAME")]
    pub context: Option<String>,

    /// Per-request timeout in seconds (0 disables it)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output format: table or json
    #[arg(long, global = true, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Log filter directive, e.g. "info" or "kubescout_k8s=debug"
    #[arg(long, global = true, value_name = "DIRECTIVE")]
    pub log_level: Option<String>,
}

/// Contents of the settings file
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub default_format: Option<String>,
    pub log_level: Option<String>,
}

/// Effective configuration after merging file and flags
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub connect: ConnectOptions,
    pub timeout: Option<Duration>,
    pub format: OutputFormat,
    pub log_level: String,
}

impl Settings {
    /// Default settings location under the user's home directory
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".config").join("kubescout").join("config.toml"))
    }

    /// Load an explicitly named file, or the default file if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    /// Apply command-line overrides on top of the file values
    pub fn merge(self, args: &GlobalArgs) -> Result<RuntimeConfig> {
        let format = match args.format.as_deref().or(self.default_format.as_deref()) {
            Some(raw) => raw.parse::<OutputFormat>()?,
            None => OutputFormat::default(),
        };

        let timeout = args
            .timeout
            .or(self.request_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(RuntimeConfig {
            connect: ConnectOptions {
                kubeconfig: args.kubeconfig.clone().or(self.kubeconfig),
                context: args.context.clone().or(self.context),
            },
            timeout,
            format,
            log_level: args
                .log_level
                .clone()
                .or(self.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}
