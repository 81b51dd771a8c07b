pub mod config;
pub mod constants;
pub mod error;
pub mod grouper;
pub mod naming;
pub mod processor;
pub mod record;
pub mod reducer;


pub use config::{MissingInputPolicy, ReduceConfig};
pub use error::ReduceError;
pub use naming::{IntermediateLocator, MrTmpNaming};
pub use processor::{ReducePartitionProcessor, ReduceTask};
pub use record::KeyValue;
pub use reducer::{BuiltinReducer, ReduceFn};

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInput {
    pub map_task: usize,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReduceStats {
    pub map_tasks: usize,
    pub inputs_read: usize,
    pub skipped_inputs: Vec<SkippedInput>,
    pub records_read: usize,
    pub keys_reduced: usize,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub read_time_ms: u64,
    pub sort_time_ms: u64,
    pub reduce_time_ms: u64,
    pub processing_time_ms: u64,
}

impl ReduceStats {
    pub fn is_complete(&self) -> bool {
        self.skipped_inputs.is_empty()
    }
}

/// Reduces with default settings, reading intermediate files from the directory of `out_file`.
pub fn do_reduce<R: ReduceFn + ?Sized>(
    job_name: &str,
    reduce_task: usize,
    out_file: &Path,
    n_map: usize,
    reducer: &R,
) -> Result<ReduceStats, ReduceError> {
    let config = ReduceConfig {
        intermediate_directory: processor::output_directory(out_file).to_path_buf(),
        ..ReduceConfig::default()
    };
    let task = ReduceTask::new(job_name, reduce_task, out_file, n_map);
    ReducePartitionProcessor::new(config)?.process(&task, reducer)
}
