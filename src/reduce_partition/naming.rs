use std::path::{Path, PathBuf};

use crate::reduce_partition::constants::*;

/// Resolves where the map phase left its output for one reduce partition.
pub trait IntermediateLocator {
    fn intermediate_path(&self, job_name: &str, map_task: usize, reduce_task: usize) -> PathBuf;
}

/// `mrtmp.<job>-<map>-<reduce>` files in a single directory.
#[derive(Debug, Clone)]
pub struct MrTmpNaming {
    directory: PathBuf,
}

impl MrTmpNaming {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn reduce_name(job_name: &str, map_task: usize, reduce_task: usize) -> String {
        format!("{}{}-{}-{}", INTERMEDIATE_FILE_PREFIX, job_name, map_task, reduce_task)
    }

    pub fn merge_name(job_name: &str, reduce_task: usize) -> String {
        format!("{}{}-{}-{}", INTERMEDIATE_FILE_PREFIX, job_name, RESULT_FILE_MARKER, reduce_task)
    }

    /// Output file for one reduce partition, which the final merge reads.
    pub fn result_path(&self, job_name: &str, reduce_task: usize) -> PathBuf {
        self.directory.join(Self::merge_name(job_name, reduce_task))
    }
}

impl IntermediateLocator for MrTmpNaming {
    fn intermediate_path(&self, job_name: &str, map_task: usize, reduce_task: usize) -> PathBuf {
        self.directory.join(Self::reduce_name(job_name, map_task, reduce_task))
    }
}

impl<F> IntermediateLocator for F
where
    F: Fn(&str, usize, usize) -> PathBuf,
{
    fn intermediate_path(&self, job_name: &str, map_task: usize, reduce_task: usize) -> PathBuf {
        self(job_name, map_task, reduce_task)
    }
}
