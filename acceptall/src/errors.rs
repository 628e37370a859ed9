use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Bridge error: {0}")]
    BridgeError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Element is detached from the page: {0}")]
    ElementDetached(String),

    #[error("Element is not enabled: {0}")]
    ElementNotEnabled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AutomationError {
    fn from(e: std::io::Error) -> Self {
        AutomationError::StorageError(e.to_string())
    }
}

impl From<serde_json::Error> for AutomationError {
    fn from(e: serde_json::Error) -> Self {
        AutomationError::StorageError(e.to_string())
    }
}
