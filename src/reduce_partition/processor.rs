use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::reduce_partition::config::{MissingInputPolicy, ReduceConfig};
use crate::reduce_partition::constants::*;
use crate::reduce_partition::grouper::KeyGroups;
use crate::reduce_partition::naming::{IntermediateLocator, MrTmpNaming};
use crate::reduce_partition::record::{KeyValue, RecordReader, RecordWriter};
use crate::reduce_partition::reducer::ReduceFn;
use crate::reduce_partition::{ReduceError, ReduceStats, SkippedInput};
use crate::utils::format_bytes;

#[derive(Debug, Clone)]
pub struct ReduceTask {
    pub job_name: String,
    pub reduce_task: usize,
    pub output_file: PathBuf,
    pub n_map: usize,
    pub n_reduce: Option<usize>,
}

impl ReduceTask {
    pub fn new(
        job_name: impl Into<String>,
        reduce_task: usize,
        output_file: impl Into<PathBuf>,
        n_map: usize,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            reduce_task,
            output_file: output_file.into(),
            n_map,
            n_reduce: None,
        }
    }

    pub fn with_reduce_count(mut self, n_reduce: usize) -> Self {
        self.n_reduce = Some(n_reduce);
        self
    }

    pub fn validate(&self) -> Result<(), ReduceError> {
        if self.job_name.is_empty() {
            return Err(ReduceError::invalid_task("job name must not be empty"));
        }

        if let Some(n_reduce) = self.n_reduce {
            if self.reduce_task >= n_reduce {
                return Err(ReduceError::invalid_task(format!(
                    "partition {} out of range for {} reduce partitions",
                    self.reduce_task, n_reduce
                )));
            }
        }

        if self.output_file.file_name().is_none() {
            return Err(ReduceError::invalid_task(format!(
                "output path {} does not name a file",
                self.output_file.display()
            )));
        }

        Ok(())
    }
}

pub struct ReducePartitionProcessor<L = MrTmpNaming> {
    config: ReduceConfig,
    locator: L,
}

impl ReducePartitionProcessor<MrTmpNaming> {
    pub fn new(config: ReduceConfig) -> Result<Self, ReduceError> {
        let locator = MrTmpNaming::new(config.intermediate_directory.clone());
        Self::with_locator(config, locator)
    }
}

impl<L: IntermediateLocator> ReducePartitionProcessor<L> {
    pub fn with_locator(config: ReduceConfig, locator: L) -> Result<Self, ReduceError> {
        config.validate()?;
        Ok(Self { config, locator })
    }

    pub fn process<R: ReduceFn + ?Sized>(
        &self,
        task: &ReduceTask,
        reducer: &R,
    ) -> Result<ReduceStats, ReduceError> {
        task.validate()?;
        let start_time = Instant::now();
        let mut stats = ReduceStats {
            map_tasks: task.n_map,
            ..ReduceStats::default()
        };

        info!(
            "Reducing partition {} of job {} from {} map tasks into {}",
            task.reduce_task,
            task.job_name,
            task.n_map,
            task.output_file.display()
        );

        let read_start = Instant::now();
        let mut records = self.collect_records(task, &mut stats)?;
        stats.read_time_ms = read_start.elapsed().as_millis() as u64;

        let sort_start = Instant::now();
        records.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        stats.sort_time_ms = sort_start.elapsed().as_millis() as u64;

        let reduce_start = Instant::now();
        self.reduce_and_publish(task, records, reducer, &mut stats)?;
        stats.reduce_time_ms = reduce_start.elapsed().as_millis() as u64;
        stats.processing_time_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Partition {} done: {} records, {} keys, {} written in {}ms",
            task.reduce_task,
            stats.records_read,
            stats.keys_reduced,
            format_bytes(stats.bytes_written),
            stats.processing_time_ms
        );

        if !stats.is_complete() {
            warn!(
                "Partition {} published without {} of {} map tasks",
                task.reduce_task,
                stats.skipped_inputs.len(),
                task.n_map
            );
        }

        Ok(stats)
    }

    fn collect_records(
        &self,
        task: &ReduceTask,
        stats: &mut ReduceStats,
    ) -> Result<Vec<KeyValue>, ReduceError> {
        let memory_limit = self.config.memory_limit_bytes();
        let progress_interval = self.config.progress_interval_records;
        let mut records = Vec::new();
        let mut buffered_bytes: usize = 0;

        for map_task in 0..task.n_map {
            let path = self
                .locator
                .intermediate_path(&task.job_name, map_task, task.reduce_task);

            let file = match File::open(&path) {
                Ok(file) => file,
                Err(source) => match self.config.missing_input_policy {
                    MissingInputPolicy::Fail => {
                        return Err(ReduceError::InputUnavailable {
                            map_task,
                            path,
                            source,
                        });
                    }
                    MissingInputPolicy::Skip => {
                        warn!(
                            "Skipping map task {}: cannot open {}: {}",
                            map_task,
                            path.display(),
                            source
                        );
                        stats.skipped_inputs.push(SkippedInput {
                            map_task,
                            path,
                            reason: source.to_string(),
                        });
                        continue;
                    }
                },
            };

            let mut reader = RecordReader::new(&path, file, self.config.io_buffer_size_bytes());
            for record in reader.by_ref() {
                let record = record?;
                buffered_bytes = buffered_bytes.saturating_add(record.estimated_size());
                if buffered_bytes > memory_limit {
                    return Err(ReduceError::MemoryLimitExceeded {
                        used_bytes: buffered_bytes,
                        limit_bytes: memory_limit,
                    });
                }
                records.push(record);

                if records.len() % progress_interval == 0 {
                    debug!(
                        "Buffered {} records ({})",
                        records.len(),
                        format_bytes(buffered_bytes as u64)
                    );
                }
            }

            stats.inputs_read += 1;
            stats.records_read += reader.records_read();
            stats.bytes_read += reader.byte_offset() as u64;
            debug!(
                "Read {} records from {}",
                reader.records_read(),
                path.display()
            );
        }

        Ok(records)
    }

    fn reduce_and_publish<R: ReduceFn + ?Sized>(
        &self,
        task: &ReduceTask,
        records: Vec<KeyValue>,
        reducer: &R,
        stats: &mut ReduceStats,
    ) -> Result<(), ReduceError> {
        let output_file = &task.output_file;
        let mut staged = stage_output(output_file)?;

        let mut writer = RecordWriter::new(
            output_file,
            staged.as_file_mut(),
            self.config.output_buffer_size_bytes(),
        );
        for group in KeyGroups::new(records.into_iter()) {
            let value = reducer
                .reduce(&group.key, &group.values)
                .map_err(|source| ReduceError::Reduce {
                    key: group.key.clone(),
                    source,
                })?;
            writer.write_record(&KeyValue {
                key: group.key,
                value,
            })?;
        }
        let (keys_reduced, bytes_written) = writer.finish()?;

        if self.config.sync_output {
            staged
                .as_file()
                .sync_all()
                .map_err(|source| ReduceError::Write {
                    path: output_file.clone(),
                    source,
                })?;
        }

        staged
            .persist(output_file)
            .map_err(|e| ReduceError::Publish {
                path: output_file.clone(),
                source: e.error,
            })?;

        if self.config.sync_output {
            sync_directory(output_directory(output_file)).map_err(|source| {
                ReduceError::Publish {
                    path: output_file.clone(),
                    source,
                }
            })?;
        }

        stats.keys_reduced = keys_reduced;
        stats.bytes_written = bytes_written;
        Ok(())
    }
}

// Staged files must share the output's filesystem.
pub(crate) fn output_directory(output_file: &Path) -> &Path {
    output_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

// Makes the rename itself durable.
#[cfg(unix)]
fn sync_directory(directory: &Path) -> std::io::Result<()> {
    File::open(directory)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) -> std::io::Result<()> {
    Ok(())
}

fn stage_output(output_file: &Path) -> Result<tempfile::NamedTempFile, ReduceError> {
    let create_error = |source| ReduceError::OutputCreate {
        path: output_file.to_path_buf(),
        source,
    };

    let directory = output_directory(output_file);
    fs::create_dir_all(directory).map_err(create_error)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(STAGED_OUTPUT_PREFIX);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(OUTPUT_FILE_MODE));
    }

    builder.tempfile_in(directory).map_err(create_error)
}
