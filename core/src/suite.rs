use crate::bencher::Bencher;
use crate::config::{BenchmarkConfig, Workload};
use crate::disk::disk_usage_metric;
use crate::driver::{Driver, Phase};
use crate::load::{LoadStats, load};
use crate::metrics::BenchResult;
use crate::rss::StatmReader;
use crate::store::{Backend, Store, open_store};
use crate::value::value_of_size;
use anyhow::{Context, Result};
use bytes::Bytes;
use log::info;
use std::sync::Arc;

/// runs `workload` against a freshly opened `backend`
pub async fn run_workload(
    cfg: &BenchmarkConfig,
    backend: Backend,
    workload: Workload,
) -> Result<BenchResult> {
    cfg.validate()?;

    let name = cfg.bench_name(backend, workload);
    let dir = cfg.dir_for(backend);
    info!("{name}: starting in {}", dir.display());

    let store = {
        let open_dir = dir.clone();
        let opts = cfg.store.clone();
        blocking(move || open_store(backend, &open_dir, &opts))
            .await
            .with_context(|| format!("opening {backend} in {}", dir.display()))?
    };
    let value = value_of_size(cfg.value_kb);

    let result = match workload {
        Workload::Read => {
            preload(Arc::clone(&store), cfg.threshold, cfg.batch_size, value.clone()).await?;
            let phase = Phase::Read {
                threshold: cfg.threshold,
            };
            measure(cfg, &name, store, value, phase).await?
        }
        Workload::Write => {
            let phase = Phase::Write {
                threshold: cfg.write_threshold,
                batch_size: cfg.batch_size,
            };
            measure(cfg, &name, store, value, phase).await?
        }
        Workload::DiskUsage => {
            preload(Arc::clone(&store), cfg.threshold, cfg.batch_size, value).await?;
            blocking(move || store.sync())
                .await
                .with_context(|| format!("{backend}: sync"))?;

            let mut r = BenchResult::new(&name, 1);
            r.report_metric(disk_usage_metric(&dir).await);
            r
        }
    };

    info!("{name}: done");
    Ok(result)
}

// engine calls block on disk, keep them off the async workers
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("blocking store task panicked")?
}

async fn preload(
    store: Arc<dyn Store>,
    threshold: u64,
    batch_size: usize,
    value: Bytes,
) -> Result<LoadStats> {
    blocking(move || load(store.as_ref(), threshold, batch_size, &value)).await
}

async fn measure(
    cfg: &BenchmarkConfig,
    name: &str,
    store: Arc<dyn Store>,
    value: Bytes,
    phase: Phase,
) -> Result<BenchResult> {
    let driver = Driver::new(store, value, cfg.workers)
        .with_sampler(StatmReader::new(), cfg.sample_interval)
        .with_seed(cfg.seed);
    let driver = &driver;

    let out = Bencher::new(cfg.bench_time)
        .run(move |n| driver.run(phase, n))
        .await
        .with_context(|| format!("{name} failed"))?;

    Ok(BenchResult::from_outcome(name, cfg.workers, &out))
}
