use crate::alloc::AllocSnapshot;
use crate::batch::Batch;
use crate::budget::Budget;
use crate::keygen::{new_key, random_key};
use crate::rss::StatmReader;
use crate::sampler::{RssSampler, RssSamples};
use crate::store::Store;
use anyhow::{Context, Result, anyhow, bail};
use bytes::Bytes;
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// random gets over `0..threshold`; every key must exist
    Read { threshold: u64 },
    /// sequential puts, flushed every `batch_size` iterations per worker
    Write { threshold: u64, batch_size: usize },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub ops: u64,
    pub flushes: u64,
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, rhs: Self) {
        self.ops += rhs.ops;
        self.flushes += rhs.flushes;
    }
}

/// what one run of a phase measured
#[derive(Debug, Clone)]
pub struct PhaseOutcome {
    pub iterations: u64,
    pub elapsed: Duration,
    pub flushes: u64,
    pub allocs: AllocSnapshot,
    pub rss: RssSamples,
}

/// runs measurement phases concurrently against one shared store
pub struct Driver {
    store: Arc<dyn Store>,
    value: Bytes,
    workers: usize,
    reader: StatmReader,
    sample_interval: Duration,
    seed: Option<u64>,
}

impl Driver {
    pub fn new(store: Arc<dyn Store>, value: Bytes, workers: usize) -> Self {
        Self {
            store,
            value,
            workers,
            reader: StatmReader::new(),
            sample_interval: Duration::from_secs(3),
            seed: None,
        }
    }

    pub fn with_sampler(mut self, reader: StatmReader, interval: Duration) -> Self {
        self.reader = reader;
        self.sample_interval = interval;
        self
    }

    /// seeds each read worker's rng with `seed + worker id`
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// executes exactly `n` iterations of `phase` spread over the workers.
    ///
    /// the sampler is started before the first operation and stopped after
    /// the last worker returned; timing and allocation counters cover only
    /// the window in between. the first worker or sampler error drains the
    /// budget and is returned once every worker has stopped.
    pub async fn run(&self, phase: Phase, n: u64) -> Result<PhaseOutcome> {
        let budget = Arc::new(Budget::new(n));
        let sampler = RssSampler::start(
            self.reader.clone(),
            self.sample_interval,
            Arc::clone(&budget),
        );

        let alloc_start = AllocSnapshot::now();
        let start = Instant::now();

        let mut handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let store = Arc::clone(&self.store);
            let budget = Arc::clone(&budget);
            let value = self.value.clone();
            let seed = self.seed.map(|s| s.wrapping_add(id as u64));

            handles.push(tokio::task::spawn_blocking(move || {
                let res = match phase {
                    Phase::Read { threshold } => read_worker(store.as_ref(), &budget, threshold, seed),
                    Phase::Write {
                        threshold,
                        batch_size,
                    } => write_worker(store.as_ref(), &budget, &value, threshold, batch_size),
                };
                if res.is_err() {
                    budget.abort();
                }
                res
            }));
        }

        let mut total = WorkerStats::default();
        let mut failure = None;
        for h in handles {
            match h.await {
                Ok(Ok(stats)) => total += stats,
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    failure.get_or_insert(anyhow!(e).context("benchmark worker panicked"));
                }
            }
        }

        let elapsed = start.elapsed();
        let allocs = AllocSnapshot::now().since(&alloc_start);
        let rss = sampler.stop().await;

        if let Some(e) = failure {
            return Err(e);
        }
        let rss = rss?;

        debug!(
            "{} iterations on {} in {elapsed:?}, {} flushes, {} rss samples",
            total.ops,
            self.store.name(),
            total.flushes,
            rss.len()
        );

        Ok(PhaseOutcome {
            iterations: total.ops,
            elapsed,
            flushes: total.flushes,
            allocs,
            rss,
        })
    }
}

fn read_worker(
    store: &dyn Store,
    budget: &Budget,
    threshold: u64,
    seed: Option<u64>,
) -> Result<WorkerStats> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };
    let mut stats = WorkerStats::default();

    while budget.next() {
        let key = random_key(&mut rng, threshold);
        let found = store
            .get(&key)
            .with_context(|| format!("{}: get", store.name()))?;
        if found.is_none() {
            bail!(
                "{}: key {} not found",
                store.name(),
                String::from_utf8_lossy(&key)
            );
        }
        stats.ops += 1;
    }

    Ok(stats)
}

// each worker counts from 1 on its own, so workers overwrite each other's keys
fn write_worker(
    store: &dyn Store,
    budget: &Budget,
    value: &Bytes,
    threshold: u64,
    batch_size: usize,
) -> Result<WorkerStats> {
    let mut batch = Batch::with_capacity(batch_size);
    let mut stats = WorkerStats::default();
    let mut iteration: u64 = 1;

    while budget.next() {
        store.put(&mut batch, new_key(iteration, threshold), value.clone());

        if iteration % batch_size as u64 == 0 {
            store
                .write_batch(&batch)
                .with_context(|| format!("{}: write flush at iteration {iteration}", store.name()))?;
            store.clear(&mut batch);
            stats.flushes += 1;
        }

        iteration += 1;
        stats.ops += 1;
    }

    Ok(stats)
}
