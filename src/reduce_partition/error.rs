use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReduceError {
    #[error("Invalid reduce task: {message}")]
    InvalidTask { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Intermediate file for map task {map_task} unavailable: {}", .path.display())]
    InputUnavailable {
        map_task: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode record {record_index} in {}", .path.display())]
    Decode {
        path: PathBuf,
        record_index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create output for {}", .path.display())]
    OutputCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write output for {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to publish output to {}", .path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Reduce function failed for key {key:?}")]
    Reduce {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Accumulated records exceed memory limit: {used_bytes} bytes used, limit {limit_bytes} bytes")]
    MemoryLimitExceeded { used_bytes: usize, limit_bytes: usize },
}

impl ReduceError {
    pub fn invalid_task(message: impl Into<String>) -> Self {
        Self::InvalidTask { message: message.into() }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }
}
