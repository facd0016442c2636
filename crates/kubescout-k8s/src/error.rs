use std::path::PathBuf;

use kube::config::KubeconfigError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by cluster inspection calls
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// None of the configuration sources produced a usable config
    #[error("no valid kubeconfig found (tried: {})", .attempts.join("; "))]
    NoValidConfig { attempts: Vec<String> },

    /// The explicitly requested kubeconfig could not be loaded
    #[error("failed to load kubeconfig {}: {source}", .path.display())]
    ExplicitConfig {
        path: PathBuf,
        #[source]
        source: KubeconfigError,
    },

    #[error("failed to create kubernetes client: {0}")]
    Client(#[source] kube::Error),

    /// A required argument was empty; raised before any API call
    #[error("{0} is required")]
    MissingArgument(&'static str),

    #[error("{context}: {source}")]
    Api {
        context: String,
        #[source]
        source: kube::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded before the API server responded")]
    DeadlineExceeded,
}

impl Error {
    pub(crate) fn api(context: impl Into<String>, source: kube::Error) -> Self {
        Self::Api {
            context: context.into(),
            source,
        }
    }

    /// True for caller-side cancellation or deadline expiry
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// HTTP status code reported by the API server, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api {
                source: kube::Error::Api(response),
                ..
            } => Some(response.code),
            _ => None,
        }
    }
}
