use crate::driver::PhaseOutcome;
use crate::sampler::{RssSample, RssSamples};
use serde::Serialize;
use std::fmt;

pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub fn to_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// `AvgRSS(GB)` and `PeakRSS(GB)`; both zero without samples
pub fn rss_metrics(samples: &RssSamples) -> [Metric; 2] {
    [
        Metric::new("AvgRSS(GB)", to_gib(samples.avg())),
        Metric::new("PeakRSS(GB)", to_gib(samples.peak())),
    ]
}

/// one finished benchmark
#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub name: String,
    pub workers: usize,
    pub iterations: u64,
    pub elapsed_ns: u128,
    pub ns_per_op: f64,
    pub ops_per_sec: f64,
    pub bytes_per_op: u64,
    pub allocs_per_op: u64,
    pub metrics: Vec<Metric>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rss_samples: Vec<RssSample>,
}

impl BenchResult {
    /// a result carrying only named metrics
    pub fn new(name: impl Into<String>, workers: usize) -> Self {
        Self {
            name: name.into(),
            workers,
            iterations: 0,
            elapsed_ns: 0,
            ns_per_op: 0.0,
            ops_per_sec: 0.0,
            bytes_per_op: 0,
            allocs_per_op: 0,
            metrics: Vec::new(),
            rss_samples: Vec::new(),
        }
    }

    /// derives per-op figures and the RSS metrics from a phase run
    pub fn from_outcome(name: impl Into<String>, workers: usize, out: &PhaseOutcome) -> Self {
        let mut r = Self::new(name, workers);
        let n = out.iterations.max(1);
        let ns = out.elapsed.as_nanos();

        r.iterations = out.iterations;
        r.elapsed_ns = ns;
        r.ns_per_op = ns as f64 / n as f64;
        r.ops_per_sec = if ns == 0 {
            0.0
        } else {
            out.iterations as f64 / out.elapsed.as_secs_f64()
        };
        r.bytes_per_op = out.allocs.bytes / n;
        r.allocs_per_op = out.allocs.allocs / n;
        r.metrics.extend(rss_metrics(&out.rss));
        r.rss_samples = out.rss.iter().copied().collect();
        r
    }

    pub fn report_metric(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.iter().find(|m| m.name == name).map(|m| m.value)
    }
}

impl fmt::Display for BenchResult {
    /// `Read/cask/read4K-8    123456    8123 ns/op    0.51 AvgRSS(GB) ...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}\t{:>10}", self.name, self.workers, self.iterations)?;
        if self.iterations > 0 {
            write!(f, "\t{:>12.1} ns/op", self.ns_per_op)?;
        }
        for m in &self.metrics {
            write!(f, "\t{:>10.4} {}", m.value, m.name)?;
        }
        if self.iterations > 0 {
            write!(
                f,
                "\t{:>8} B/op\t{:>6} allocs/op",
                self.bytes_per_op, self.allocs_per_op
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BenchResult, GIB, Metric, rss_metrics, to_gib};
    use crate::alloc::AllocSnapshot;
    use crate::driver::PhaseOutcome;
    use crate::sampler::{RssSample, RssSamples};
    use std::time::Duration;

    #[test]
    fn test_rss_metrics_empty() {
        let [avg, peak] = rss_metrics(&RssSamples::new());
        assert_eq!(avg, Metric::new("AvgRSS(GB)", 0.0));
        assert_eq!(peak, Metric::new("PeakRSS(GB)", 0.0));
    }

    #[test]
    fn test_rss_metrics() {
        let samples: RssSamples = [1u64 << 30, 3 << 30]
            .into_iter()
            .map(|bytes| RssSample {
                at: Duration::from_secs(3),
                bytes,
            })
            .collect();
        let [avg, peak] = rss_metrics(&samples);
        assert_eq!(avg.value, 2.0);
        assert_eq!(peak.value, 3.0);
    }

    #[test]
    fn test_to_gib() {
        assert_eq!(to_gib(0), 0.0);
        assert_eq!(to_gib(1 << 30), 1.0);
        assert!((to_gib(12345) - 12345.0 / GIB).abs() < 1e-15);
    }

    #[test]
    fn test_from_outcome() {
        let out = PhaseOutcome {
            iterations: 1_000,
            elapsed: Duration::from_millis(2),
            flushes: 20,
            allocs: AllocSnapshot {
                allocs: 3_000,
                bytes: 4_096_000,
            },
            rss: RssSamples::new(),
        };
        let r = BenchResult::from_outcome("Write/cask/write4K", 8, &out);

        assert_eq!(r.ns_per_op, 2_000.0);
        assert_eq!(r.ops_per_sec, 500_000.0);
        assert_eq!(r.bytes_per_op, 4_096);
        assert_eq!(r.allocs_per_op, 3);
        assert_eq!(r.metric("AvgRSS(GB)"), Some(0.0));
        assert_eq!(r.metric("DiskUsage(GB)"), None);

        let line = r.to_string();
        assert!(line.starts_with("Write/cask/write4K-8\t"));
        assert!(line.contains("ns/op"));
        assert!(line.contains("PeakRSS(GB)"));
        assert!(line.ends_with("allocs/op"));
    }

    #[test]
    fn test_metric_only_result() {
        let mut r = BenchResult::new("DiskUsage/redb/1000 keys", 1);
        r.report_metric(Metric::new("DiskUsage(GB)", 1.5));
        let line = r.to_string();
        assert!(line.contains("1.5000 DiskUsage(GB)"));
        assert!(!line.contains("ns/op"));

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["metrics"][0]["name"], "DiskUsage(GB)");
        assert!(json.get("rss_samples").is_none());
    }
}
