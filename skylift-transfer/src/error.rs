use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error aggregation")]
    Aggregate(Vec<AppError>),
    #[error("Batch is already running")]
    BatchRunning,
    #[error("Building http client failed")]
    ClientBuildFailed(#[from] reqwest::Error),
    #[error("File operation failed")]
    FileOperationFailed(#[from] std::io::Error),
    #[error("Path target is invalid")]
    InvalidTargetPath,
    #[error("Selection contains no uploadable files")]
    NothingToUpload,
    #[error("Upload item {0} does not exist")]
    UnknownItem(usize),
}

/// Failures of a single transfer. These never leave the transfer unit, they
/// resolve the item to `error` and get logged.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransferError {
    #[error("Issuing upload url failed: {0}")]
    UrlIssueFailed(String),
    #[error("Transport failed: {0}")]
    TransportFailed(String),
    #[error("Server rejected upload with status {0}")]
    ServerRejected(u16),
}
