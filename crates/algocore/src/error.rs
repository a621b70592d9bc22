use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("node error: {0}")]
    Node(#[from] NodeError),

    #[error("propagation error: {0}")]
    Propagation(#[from] PropagationError),

    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure raised by a node's own computation. A node that returns one of
/// these never reaches `Finished` and writes no output slot.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("missing required input: {0}")]
    MissingInput(String),

    #[error("invalid input type for '{field}': expected {expected}")]
    InvalidInputType { field: String, expected: String },

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl NodeError {
    pub fn validation(message: impl Into<String>) -> Self {
        NodeError::Validation(message.into())
    }
}

/// Why one (source, destination) pair failed during a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    SourceUnreadable,
    NoSuchDestination,
    TypeMismatch,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SourceUnreadable => write!(f, "source unreadable"),
            FailureReason::NoSuchDestination => write!(f, "no such destination slot"),
            FailureReason::TypeMismatch => write!(f, "destination type mismatch"),
        }
    }
}

/// One failed slot pair recorded by the propagation bus.
#[derive(Debug, Clone)]
pub struct SlotFailure {
    pub source: String,
    pub destination: String,
    pub reason: FailureReason,
}

impl fmt::Display for SlotFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.source, self.destination, self.reason)
    }
}

/// Best-effort pull outcome: every failed pair is recorded while the
/// remaining pairs are still applied.
#[derive(Debug, Clone)]
pub struct PropagationError {
    pub failures: Vec<SlotFailure>,
}

impl fmt::Display for PropagationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} slot pair(s) failed to propagate: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for PropagationError {}
