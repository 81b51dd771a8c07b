use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use anyhow::Result;
use crate::constants::{BYTES_PER_KB, BYTES_PER_MB, PERCENT_100};
use crate::reduce_partition::constants::*;
use crate::reduce_partition::ReduceError;

/// What to do when a map task's intermediate file cannot be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingInputPolicy {
    /// Abort the partition with `ReduceError::InputUnavailable`.
    Fail,
    /// Reduce without that map task's records and list it in the stats.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    pub intermediate_directory: PathBuf,
    pub io_buffer_size_kb: usize,
    pub output_buffer_size_kb: usize,
    pub memory_usage_percent: f64,
    pub max_accumulator_mb: Option<usize>,
    pub missing_input_policy: MissingInputPolicy,
    pub sync_output: bool,
    pub progress_interval_records: usize,
    pub verbosity: String,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            intermediate_directory: PathBuf::from("."),
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            output_buffer_size_kb: DEFAULT_OUTPUT_BUFFER_SIZE_KB,
            memory_usage_percent: DEFAULT_MEMORY_USAGE_PERCENT,
            max_accumulator_mb: None,
            missing_input_policy: MissingInputPolicy::Fail,
            sync_output: true,
            progress_interval_records: DEFAULT_PROGRESS_INTERVAL_RECORDS,
            verbosity: DEFAULT_VERBOSITY.to_string(),
        }
    }
}

impl ReduceConfig {
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ReduceError> {
        if self.memory_usage_percent < MIN_MEMORY_USAGE_PERCENT
            || self.memory_usage_percent > MAX_MEMORY_USAGE_PERCENT {
            return Err(ReduceError::invalid_config(format!(
                "Memory usage percent must be between {} and {}",
                MIN_MEMORY_USAGE_PERCENT, MAX_MEMORY_USAGE_PERCENT
            )));
        }

        for (name, value) in [
            ("IO buffer", self.io_buffer_size_kb),
            ("Output buffer", self.output_buffer_size_kb),
        ] {
            if value < MIN_IO_BUFFER_SIZE_KB || value > MAX_IO_BUFFER_SIZE_KB {
                return Err(ReduceError::invalid_config(format!(
                    "{} size must be between {} and {} KB",
                    name, MIN_IO_BUFFER_SIZE_KB, MAX_IO_BUFFER_SIZE_KB
                )));
            }
        }

        if let Some(cap) = self.max_accumulator_mb {
            if cap < MIN_ACCUMULATOR_MB || cap > MAX_ACCUMULATOR_MB {
                return Err(ReduceError::invalid_config(format!(
                    "Accumulator cap must be between {} and {} MB",
                    MIN_ACCUMULATOR_MB, MAX_ACCUMULATOR_MB
                )));
            }
        }

        if self.progress_interval_records < MIN_PROGRESS_INTERVAL_RECORDS {
            return Err(ReduceError::invalid_config(
                "Progress interval must be at least one record",
            ));
        }

        if !matches!(self.verbosity.as_str(), "silent" | "normal" | "verbose") {
            return Err(ReduceError::invalid_config(format!(
                "Unknown verbosity {:?}, expected silent, normal or verbose",
                self.verbosity
            )));
        }

        Ok(())
    }

    /// Upper bound for the in-memory record buffer of one invocation.
    pub fn memory_limit_bytes(&self) -> usize {
        if let Some(cap) = self.max_accumulator_mb {
            return cap.saturating_mul(BYTES_PER_MB);
        }

        use sysinfo::System;
        let mut system = System::new();
        system.refresh_memory();

        let total_memory = system.total_memory();
        if total_memory == 0 {
            // Memory size unknown on this platform; leave the buffer unbounded.
            return usize::MAX;
        }
        (total_memory as f64 * self.memory_usage_percent / PERCENT_100) as usize
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * BYTES_PER_KB
    }

    pub fn output_buffer_size_bytes(&self) -> usize {
        self.output_buffer_size_kb * BYTES_PER_KB
    }
}
