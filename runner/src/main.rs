use anyhow::Result;
use clap::Parser;
use kvbench::alloc::CountingAllocator;
use kvbench::config::default_workers;
use kvbench::{Backend, BenchTime, BenchmarkConfig, StoreOptions, Workload, run_workload};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

/// compares embedded key-value engines under read, write and disk usage workloads
#[derive(Parser, Debug)]
#[command(name = "kvbench")]
struct Args {
    /// engines to benchmark
    #[arg(short, long, value_delimiter = ',', default_values_t = Backend::ALL)]
    backend: Vec<Backend>,

    /// workloads to run against every engine
    #[arg(short = 'W', long, value_delimiter = ',', default_values_t = Workload::ALL)]
    workload: Vec<Workload>,

    /// number of pre-loaded keys
    #[arg(short, long, default_value_t = 1_000_000)]
    threshold: u64,

    /// key space of the write workload [default: 10 x threshold]
    #[arg(long)]
    write_threshold: Option<u64>,

    #[arg(long, default_value_t = 50)]
    batch_size: usize,

    /// value size in KiB
    #[arg(long, default_value_t = 4)]
    value_kb: usize,

    #[arg(short, long, default_value = "./bench-data")]
    data_dir: PathBuf,

    /// concurrent workers [default: available parallelism]
    #[arg(short, long)]
    workers: Option<usize>,

    /// `1s`, `500ms` or a fixed iteration count like `1000x`
    #[arg(long, default_value = "1s")]
    bench_time: BenchTime,

    #[arg(long, default_value_t = 3)]
    sample_interval_secs: u64,

    /// fixes the random key sequence of the read workload
    #[arg(long)]
    seed: Option<u64>,

    /// data file rotation size of the cask engine, in bytes
    #[arg(long, default_value_t = 1 << 30)]
    cask_file_limit: u64,

    /// make every batch durable before it is acknowledged
    #[arg(long)]
    sync_writes: bool,

    /// print one json object per result
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_config(self) -> BenchmarkConfig {
        BenchmarkConfig {
            threshold: self.threshold,
            write_threshold: self
                .write_threshold
                .unwrap_or(self.threshold.saturating_mul(10)),
            batch_size: self.batch_size,
            value_kb: self.value_kb,
            backends: self.backend,
            workloads: self.workload,
            data_dir: self.data_dir,
            workers: self.workers.unwrap_or_else(default_workers),
            bench_time: self.bench_time,
            sample_interval: Duration::from_secs(self.sample_interval_secs),
            seed: self.seed,
            store: StoreOptions {
                cask_file_limit: self.cask_file_limit,
                sync_writes: self.sync_writes,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let json = args.json;
    let cfg = args.into_config();
    cfg.validate()?;
    debug!("config: {}", serde_json::to_string(&cfg)?);

    info!(
        "kvbench: {} keys, {} KiB values, {} workers, data in {}",
        cfg.threshold,
        cfg.value_kb,
        cfg.workers,
        cfg.data_root().display()
    );

    for &workload in &cfg.workloads {
        for &backend in &cfg.backends {
            let result = run_workload(&cfg, backend, workload).await?;
            if json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                println!("{result}");
            }
        }
    }

    Ok(())
}
