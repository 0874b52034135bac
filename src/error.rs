// nexus-fabric-core/src/error.rs - Error taxonomy for the coordination core

use tonic::Status;

pub type FabricResult<T> = Result<T, FabricError>;

#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("unknown target: {0}")]
    UnknownTarget(String),
    #[error("stale update for {0}")]
    Stale(String),
    #[error("agent {0} is terminated and cannot transition")]
    TerminalLocked(String),
    #[error("command queue for proxy {0} is full")]
    Congested(String),
    #[error("no node satisfies the placement constraints")]
    NoCapacity,
    #[error("deadline exceeded")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
}

impl FabricError {
    /// Short machine-readable code surfaced to callers and event attributes.
    pub fn code(&self) -> &'static str {
        match self {
            FabricError::Validation(_) => "INVALID_ARGUMENT",
            FabricError::UnknownTarget(_) => "UNKNOWN_TARGET",
            FabricError::Stale(_) => "STALE",
            FabricError::TerminalLocked(_) => "TERMINAL_LOCKED",
            FabricError::Congested(_) => "PROXY_CONGESTED",
            FabricError::NoCapacity => "NO_CAPACITY",
            FabricError::Timeout => "TIMEOUT",
            FabricError::Transport(_) => "TRANSPORT",
        }
    }
}

// Boundary mapping for handlers that surface errors as gRPC statuses. No
// internal detail beyond the display string crosses the wire.
impl From<FabricError> for Status {
    fn from(err: FabricError) -> Self {
        match &err {
            FabricError::Validation(_) => Status::invalid_argument(err.to_string()),
            FabricError::UnknownTarget(_) => Status::not_found(err.to_string()),
            FabricError::Stale(_) => Status::failed_precondition(err.to_string()),
            FabricError::TerminalLocked(_) => Status::failed_precondition(err.to_string()),
            FabricError::Congested(_) => Status::resource_exhausted(err.to_string()),
            FabricError::NoCapacity => Status::resource_exhausted(err.to_string()),
            FabricError::Timeout => Status::deadline_exceeded(err.to_string()),
            FabricError::Transport(_) => Status::unavailable(err.to_string()),
        }
    }
}
