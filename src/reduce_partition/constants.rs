pub const DEFAULT_MEMORY_USAGE_PERCENT: f64 = 60.0;
pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 64;
pub const DEFAULT_OUTPUT_BUFFER_SIZE_KB: usize = 512;
pub const DEFAULT_PROGRESS_INTERVAL_RECORDS: usize = 100000;
pub const DEFAULT_VERBOSITY: &str = "normal";

pub const MIN_MEMORY_USAGE_PERCENT: f64 = 10.0;
pub const MAX_MEMORY_USAGE_PERCENT: f64 = 90.0;
pub const MIN_IO_BUFFER_SIZE_KB: usize = 4;
pub const MAX_IO_BUFFER_SIZE_KB: usize = 65536;
pub const MIN_ACCUMULATOR_MB: usize = 1;
pub const MAX_ACCUMULATOR_MB: usize = 1_048_576;
pub const MIN_PROGRESS_INTERVAL_RECORDS: usize = 1;

// Per-record bookkeeping on top of key and value bytes: two String headers
// plus the KeyValue slot in the buffer.
pub const RECORD_OVERHEAD_BYTES: usize = 56;

pub const INTERMEDIATE_FILE_PREFIX: &str = "mrtmp.";
pub const RESULT_FILE_MARKER: &str = "res";
pub const STAGED_OUTPUT_PREFIX: &str = ".reduce-staging-";

pub const RECORD_SEPARATOR: u8 = b'\n';
pub const CONCAT_SEPARATOR: &str = ",";

// Matches a plainly created file under a typical 022 umask.
pub const OUTPUT_FILE_MODE: u32 = 0o644;
