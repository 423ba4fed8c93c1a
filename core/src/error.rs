use adshard_common::config::ConfigError;
use adshard_common::directory::DirectoryError;
use thiserror::Error;

/// Errors that abort a whole pass.
///
/// Per-machine failures never surface here; they end up as
/// [`Outcome::AddFailed`](crate::reconciler::Outcome::AddFailed).
#[derive(Debug, Error)]
pub enum ShardError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("group inventory under '{container}' failed")]
    Inventory {
        container: String,
        #[source]
        source: DirectoryError,
    },

    #[error("machine enumeration under '{container}' failed")]
    Enumeration {
        container: String,
        #[source]
        source: DirectoryError,
    },
}
