use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory service unreachable: {0}")]
    Unreachable(String),

    #[error("authentication rejected for '{0}'")]
    AuthenticationFailed(String),

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("more than one security group named '{0}'")]
    AmbiguousGroup(String),

    #[error("{operation} failed: {message}")]
    OperationFailed {
        operation: &'static str,
        message: String,
    },

    #[error("malformed entry '{dn}': {reason}")]
    MalformedEntry { dn: String, reason: String },
}

impl DirectoryError {
    pub fn operation(operation: &'static str, message: impl Into<String>) -> Self {
        DirectoryError::OperationFailed {
            operation,
            message: message.into(),
        }
    }
}
