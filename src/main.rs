use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

use partition_reduce::constants::DEFAULT_CONFIG_FILE;
use partition_reduce::reduce_partition::{
    BuiltinReducer, MissingInputPolicy, MrTmpNaming, ReduceConfig, ReducePartitionProcessor,
    ReduceTask,
};
use partition_reduce::utils::{format_bytes, format_duration, setup_logging};

#[derive(Parser)]
#[command(name = "partition-reduce")]
#[command(about = "Reduce one MapReduce partition: group intermediate records by key and aggregate them")]
#[command(version)]
struct Args {
    #[arg(short, long, help = "Job name used in intermediate file names")]
    job: String,

    #[arg(short, long, help = "Reduce partition index")]
    partition: usize,

    #[arg(short = 'm', long, help = "Number of map tasks that ran")]
    map_tasks: usize,

    #[arg(short = 'r', long, help = "Number of reduce partitions, checked against --partition")]
    reduce_tasks: Option<usize>,

    #[arg(short, long, help = "Output file (defaults to mrtmp.<job>-res-<partition>)")]
    output: Option<PathBuf>,

    #[arg(short, long, help = "Directory holding intermediate files")]
    input_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = BuiltinReducer::Count, help = "Reduce function")]
    reducer: BuiltinReducer,

    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, help = "Configuration file")]
    config: PathBuf,

    #[arg(long, help = "Continue without unreadable intermediate files")]
    skip_missing: bool,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let created_default = !args.config.exists();
    let mut config = if created_default {
        let default_config = ReduceConfig::default();
        default_config.to_file(&args.config)?;
        default_config
    } else {
        ReduceConfig::from_file(&args.config)?
    };

    if args.verbose {
        config.verbosity = "verbose".to_string();
    }
    if let Some(input_dir) = args.input_dir {
        config.intermediate_directory = input_dir;
    }
    if args.skip_missing {
        config.missing_input_policy = MissingInputPolicy::Skip;
    }

    setup_logging(&config.verbosity)?;

    if created_default {
        info!("Config file not found, created default: {}", args.config.display());
    }

    if !config.intermediate_directory.is_dir() {
        anyhow::bail!(
            "Intermediate directory does not exist: {}",
            config.intermediate_directory.display()
        );
    }

    let output_file = args.output.unwrap_or_else(|| {
        MrTmpNaming::new(config.intermediate_directory.clone()).result_path(&args.job, args.partition)
    });

    let mut task = ReduceTask::new(args.job, args.partition, output_file, args.map_tasks);
    if let Some(n_reduce) = args.reduce_tasks {
        task = task.with_reduce_count(n_reduce);
    }

    info!("Intermediate directory: {}", config.intermediate_directory.display());
    info!("Output file: {}", task.output_file.display());
    info!("Reducer: {:?}", args.reducer);

    let processor = ReducePartitionProcessor::new(config)?;
    let reducer = args.reducer;
    let start_time = Instant::now();

    let outcome = tokio::task::spawn_blocking(move || processor.process(&task, &reducer)).await?;
    let stats = match outcome {
        Ok(stats) => stats,
        Err(e) => {
            let e = anyhow::Error::from(e);
            error!("Reduce failed: {:#}", e);
            return Err(e);
        }
    };

    info!("Reduce completed successfully");
    info!("Map tasks read: {}/{}", stats.inputs_read, stats.map_tasks);
    info!("Records read: {} ({})", stats.records_read, format_bytes(stats.bytes_read));
    info!("Keys reduced: {} ({})", stats.keys_reduced, format_bytes(stats.bytes_written));
    info!("Total time: {}", format_duration(start_time.elapsed().as_secs_f64()));

    for skipped in &stats.skipped_inputs {
        warn!(
            "Missing map task {} ({}): {}",
            skipped.map_task,
            skipped.path.display(),
            skipped.reason
        );
    }

    Ok(())
}
