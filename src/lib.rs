// Reduce phase: merge and aggregate one partition
pub mod reduce_partition;

// Unit constants shared by config and formatting
pub mod constants;

// Logging setup and formatting helpers
pub mod utils;

// Re-export main types for convenience
pub use reduce_partition::{
    do_reduce, BuiltinReducer, KeyValue, MissingInputPolicy, ReduceConfig, ReduceError,
    ReduceFn, ReducePartitionProcessor, ReduceStats, ReduceTask,
};
