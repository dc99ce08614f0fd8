use crate::config::BenchTime;
use crate::driver::PhaseOutcome;
use anyhow::Result;
use log::debug;
use std::future::Future;
use std::time::Duration;

const MAX_N: u64 = 1_000_000_000;

/// next iteration count when ramping towards `goal`.
///
/// aims 20% past the goal, grows at most 100x per round and at least by one.
pub fn predict_n(goal: Duration, prev_elapsed: Duration, prev_n: u64) -> u64 {
    let prev_ns = prev_elapsed.as_nanos().max(1);
    let mut n = goal.as_nanos() * prev_n as u128 / prev_ns;
    n += n / 5;
    n = n.min(100 * prev_n as u128);
    n = n.max(prev_n as u128 + 1);
    n.min(MAX_N as u128) as u64
}

/// decides how many iterations a phase gets
#[derive(Debug, Clone, Copy)]
pub struct Bencher {
    bench_time: BenchTime,
}

impl Bencher {
    pub fn new(bench_time: BenchTime) -> Self {
        Self { bench_time }
    }

    /// calls `phase(n)` until a run satisfies the bench time and returns that
    /// run. every call is a complete phase with its own sampler.
    pub async fn run<F, Fut>(&self, mut phase: F) -> Result<PhaseOutcome>
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = Result<PhaseOutcome>>,
    {
        let goal = match self.bench_time {
            BenchTime::Iterations(n) => return phase(n).await,
            BenchTime::Duration(goal) => goal,
        };

        let mut n = 1;
        loop {
            let out = phase(n).await?;
            if out.elapsed >= goal || n >= MAX_N {
                return Ok(out);
            }
            n = predict_n(goal, out.elapsed, n);
            debug!("ramping to {n} iterations");
        }
    }
}
