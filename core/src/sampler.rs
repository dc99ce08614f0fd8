use crate::budget::Budget;
use crate::rss::StatmReader;
use anyhow::{Context, Result};
use log::{debug, error};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// enough room for six minutes of 3s ticks without reallocating
const INITIAL_CAPACITY: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RssSample {
    /// time since the sampler started
    pub at: Duration,
    pub bytes: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RssSamples(Vec<RssSample>);

impl RssSamples {
    pub fn new() -> Self {
        Self(Vec::with_capacity(INITIAL_CAPACITY))
    }

    pub fn push(&mut self, sample: RssSample) {
        self.0.push(sample);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RssSample> {
        self.0.iter()
    }

    /// zero when there are no samples
    pub fn peak(&self) -> u64 {
        self.0.iter().map(|s| s.bytes).max().unwrap_or(0)
    }

    /// integer mean, zero when there are no samples
    pub fn avg(&self) -> u64 {
        if self.0.is_empty() {
            return 0;
        }
        let total: u128 = self.0.iter().map(|s| s.bytes as u128).sum();
        (total / self.0.len() as u128) as u64
    }
}

impl FromIterator<RssSample> for RssSamples {
    fn from_iter<I: IntoIterator<Item = RssSample>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// background RSS sampling for one measurement phase.
///
/// the task owns a fresh sample sequence; `stop` waits for it to finish and
/// hands the samples back, so the sequence is never read while the task can
/// still append to it. dropping the sampler without `stop` loses the samples.
pub struct RssSampler {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<Result<RssSamples>>,
}

impl RssSampler {
    /// spawns the sampling task on the current tokio runtime. the first sample
    /// is taken one `interval` after start. a failed read drains `budget` so
    /// the phase stops at once.
    pub fn start(reader: StatmReader, interval: Duration, budget: Arc<Budget>) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(sample(reader, interval, budget, stop_rx));
        Self { stop_tx, handle }
    }

    /// signals the task and waits for it to observe the signal
    pub async fn stop(self) -> Result<RssSamples> {
        // the receiver is gone only if the task already failed; the join
        // below surfaces that error
        let _ = self.stop_tx.send(());
        self.handle.await.context("rss sampler task panicked")?
    }
}

async fn sample(
    reader: StatmReader,
    interval: Duration,
    budget: Arc<Budget>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<RssSamples> {
    let started = Instant::now();
    let mut ticker = time::interval_at(started + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut samples = RssSamples::new();

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                let bytes = reader.read_rss().await.inspect_err(|e| {
                    error!("rss sample failed, aborting phase: {e:#}");
                    budget.abort();
                })?;
                debug!("rss sample {bytes} bytes");
                samples.push(RssSample {
                    at: started.elapsed(),
                    bytes,
                });
            }
        }
    }

    Ok(samples)
}
