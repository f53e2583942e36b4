//! Structured error types for a computation run
//!
//! Distinguishes fatal setup failures (channels, spawning, inputs) from
//! protocol-level failures detected while collecting results, so the
//! orchestrator can abort with a diagnostic naming the failing component
//! and partition/product instead of hanging.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for computation runs
#[derive(Debug, Error)]
pub enum TallyError {
    // Resource creation errors
    #[error("named channel {name} could not be created: {reason}")]
    ChannelCreation { name: String, reason: String },

    #[error("named channel {name} does not exist")]
    ChannelMissing { name: String },

    #[error("failed to start {role} for {target}: {reason}")]
    Spawn {
        role: String,
        target: String,
        reason: String,
    },

    #[error("{role} for {target} terminated abnormally: {reason}")]
    TaskFailure {
        role: String,
        target: String,
        reason: String,
    },

    // Input errors
    #[error("failed to load product catalog from {path}")]
    CatalogLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("product catalog at {path} is empty")]
    CatalogEmpty { path: PathBuf },

    #[error("no warehouse partitions found under {path}")]
    NoPartitions { path: PathBuf },

    #[error("failed to read warehouse partition {partition}")]
    PartitionLoad {
        partition: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid product selection: {reason}")]
    InvalidSelection { reason: String },

    // Protocol errors
    #[error(
        "aggregator for {product} received {received} of {expected} contributions before end of input"
    )]
    ShortCount {
        product: String,
        received: usize,
        expected: usize,
    },

    #[error("channel to {endpoint} closed before its message arrived")]
    ChannelClosed { endpoint: String },

    #[error("timed out after {waited_secs}s waiting on {endpoint}")]
    CollectTimeout { endpoint: String, waited_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TallyError {
    /// Short counts degrade the run but do not abort it; everything else is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TallyError::ShortCount { .. })
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;
