use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use partition_reduce::reduce_partition::record::{decode_all, RecordWriter};
use partition_reduce::reduce_partition::{
    BuiltinReducer, KeyValue, MrTmpNaming, ReduceConfig, ReducePartitionProcessor, ReduceTask,
};

/// Helper to write one map task's intermediate file for a partition
fn write_intermediate(dir: &Path, job: &str, map_task: usize, reduce_task: usize, records: &[(&str, &str)]) -> Result<PathBuf> {
    let path = dir.join(MrTmpNaming::reduce_name(job, map_task, reduce_task));
    let file = fs::File::create(&path)?;
    let mut writer = RecordWriter::new(&path, file, 4096);
    for (key, value) in records {
        writer.write_record(&KeyValue::new(*key, *value))?;
    }
    writer.finish()?;
    Ok(path)
}

/// Helper to build a processor reading from `dir`
fn processor_for(dir: &Path) -> ReducePartitionProcessor {
    let mut config = ReduceConfig::default();
    config.intermediate_directory = dir.to_path_buf();
    config.sync_output = false;
    ReducePartitionProcessor::new(config).unwrap()
}

fn read_output(path: &Path) -> Vec<KeyValue> {
    decode_all(path, &fs::read(path).unwrap()).unwrap()
}

fn sum_values(_key: &str, values: &[String]) -> Result<String> {
    let mut total = 0i64;
    for value in values {
        total += value.parse::<i64>()?;
    }
    Ok(total.to_string())
}

#[test]
fn test_sum_across_two_map_tasks() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_intermediate(temp_dir.path(), "sum", 0, 0, &[("a", "1"), ("b", "2")])?;
    write_intermediate(temp_dir.path(), "sum", 1, 0, &[("a", "3")])?;

    let output = temp_dir.path().join("out-0");
    let task = ReduceTask::new("sum", 0, &output, 2);
    let stats = processor_for(temp_dir.path()).process(&task, &sum_values)?;

    assert_eq!(read_output(&output), vec![KeyValue::new("a", "4"), KeyValue::new("b", "2")]);
    assert_eq!(stats.records_read, 3);
    assert_eq!(stats.keys_reduced, 2);
    assert!(stats.is_complete());
    Ok(())
}

#[test]
fn test_count_values_from_one_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_intermediate(temp_dir.path(), "count", 0, 2, &[("x", "v1"), ("x", "v2"), ("x", "v3")])?;

    let output = temp_dir.path().join("out-2");
    let task = ReduceTask::new("count", 2, &output, 1).with_reduce_count(3);
    processor_for(temp_dir.path()).process(&task, &BuiltinReducer::Count)?;

    assert_eq!(read_output(&output), vec![KeyValue::new("x", "3")]);
    Ok(())
}

#[test]
fn test_only_reads_own_partition() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_intermediate(temp_dir.path(), "wc", 0, 0, &[("mine", "1")])?;
    write_intermediate(temp_dir.path(), "wc", 0, 1, &[("other", "1")])?;

    let output = temp_dir.path().join("out");
    processor_for(temp_dir.path()).process(&ReduceTask::new("wc", 0, &output, 1), &BuiltinReducer::Count)?;

    assert_eq!(read_output(&output), vec![KeyValue::new("mine", "1")]);
    Ok(())
}

#[test]
fn test_grouping_and_order_match_reference() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let n_map = 5;
    let mut expected: BTreeMap<String, usize> = BTreeMap::new();

    // Small LCG so the data is scattered but reproducible.
    let mut state: u64 = 0x2545_f491;
    for map_task in 0..n_map {
        let mut owned = Vec::new();
        for _ in 0..400 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let key = format!("k{}", (state >> 33) % 97);
            *expected.entry(key.clone()).or_default() += 1;
            owned.push((key, format!("m{}", map_task)));
        }
        let borrowed: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        write_intermediate(temp_dir.path(), "scatter", map_task, 0, &borrowed)?;
    }

    let output = temp_dir.path().join("out");
    let stats = processor_for(temp_dir.path())
        .process(&ReduceTask::new("scatter", 0, &output, n_map), &BuiltinReducer::Count)?;

    let written = read_output(&output);
    let expected: Vec<KeyValue> = expected
        .into_iter()
        .map(|(key, count)| KeyValue::new(key, count.to_string()))
        .collect();
    assert_eq!(written, expected);
    assert!(written.windows(2).all(|w| w[0].key < w[1].key));
    assert_eq!(stats.records_read, n_map * 400);
    Ok(())
}

#[test]
fn test_keys_sort_by_bytes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_intermediate(temp_dir.path(), "bytes", 0, 0, &[("ä", "1"), ("a", "1"), ("Z", "1")])?;
    write_intermediate(temp_dir.path(), "bytes", 1, 0, &[("B", "1"), ("", "1"), ("a", "1")])?;

    let output = temp_dir.path().join("out");
    processor_for(temp_dir.path()).process(&ReduceTask::new("bytes", 0, &output, 2), &BuiltinReducer::Count)?;

    let keys: Vec<String> = read_output(&output).into_iter().map(|kv| kv.key).collect();
    assert_eq!(keys, vec!["", "B", "Z", "a", "ä"]);
    Ok(())
}

#[test]
fn test_zero_map_tasks_publishes_empty_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().join("out");

    let stats = processor_for(temp_dir.path()).process(&ReduceTask::new("none", 0, &output, 0), &BuiltinReducer::Count)?;

    assert!(output.exists());
    assert_eq!(fs::metadata(&output)?.len(), 0);
    assert_eq!(stats.keys_reduced, 0);
    Ok(())
}

#[test]
fn test_empty_intermediate_files_publish_empty_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_intermediate(temp_dir.path(), "empty", 0, 0, &[])?;
    write_intermediate(temp_dir.path(), "empty", 1, 0, &[])?;

    let output = temp_dir.path().join("out");
    let stats = processor_for(temp_dir.path()).process(&ReduceTask::new("empty", 0, &output, 2), &BuiltinReducer::Count)?;

    assert!(output.exists());
    assert!(read_output(&output).is_empty());
    assert_eq!(stats.inputs_read, 2);
    Ok(())
}

#[test]
fn test_rerun_is_byte_identical() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_intermediate(temp_dir.path(), "idem", 0, 0, &[("b", "x"), ("a", "y"), ("b", "z")])?;
    write_intermediate(temp_dir.path(), "idem", 1, 0, &[("c", "q"), ("a", "r")])?;

    let processor = processor_for(temp_dir.path());
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");
    processor.process(&ReduceTask::new("idem", 0, &first, 2), &BuiltinReducer::Concat)?;
    processor.process(&ReduceTask::new("idem", 0, &second, 2), &BuiltinReducer::Concat)?;
    // Re-running onto an existing output replaces it with the same bytes.
    processor.process(&ReduceTask::new("idem", 0, &first, 2), &BuiltinReducer::Concat)?;

    assert_eq!(fs::read(&first)?, fs::read(&second)?);
    assert_eq!(
        read_output(&first),
        vec![KeyValue::new("a", "r,y"), KeyValue::new("b", "x,z"), KeyValue::new("c", "q")]
    );
    Ok(())
}

#[test]
fn test_output_is_valid_merge_input() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_intermediate(temp_dir.path(), "chain", 0, 0, &[("w", "1"), ("w", "1"), ("v", "1")])?;

    // A later stage can consume the result with the same decoder and naming.
    let result = MrTmpNaming::new(temp_dir.path()).result_path("chain", 0);
    processor_for(temp_dir.path()).process(&ReduceTask::new("chain", 0, &result, 1), &BuiltinReducer::Count)?;

    let staged_as_input = MrTmpNaming::new(temp_dir.path()).directory().join(MrTmpNaming::reduce_name("merge", 0, 0));
    fs::copy(&result, &staged_as_input)?;
    let output = temp_dir.path().join("merged");
    processor_for(temp_dir.path()).process(&ReduceTask::new("merge", 0, &output, 1), &sum_values)?;

    assert_eq!(read_output(&output), vec![KeyValue::new("v", "1"), KeyValue::new("w", "2")]);
    Ok(())
}

#[test]
fn test_creates_missing_output_directory() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_intermediate(temp_dir.path(), "nested", 0, 0, &[("a", "1")])?;

    let output = temp_dir.path().join("results").join("deep").join("out");
    processor_for(temp_dir.path()).process(&ReduceTask::new("nested", 0, &output, 1), &BuiltinReducer::Count)?;

    assert_eq!(read_output(&output), vec![KeyValue::new("a", "1")]);
    Ok(())
}
