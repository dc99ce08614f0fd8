use crate::store::{Backend, StoreOptions};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Workload {
    /// random gets against a pre-loaded dataset
    Read,
    /// batched sequential puts
    Write,
    /// on-disk size after the load phase
    DiskUsage,
}

impl Workload {
    pub const ALL: [Workload; 3] = [Workload::Read, Workload::Write, Workload::DiskUsage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Workload::Read => "read",
            Workload::Write => "write",
            Workload::DiskUsage => "disk-usage",
        }
    }

    /// top level benchmark name
    pub fn title(&self) -> &'static str {
        match self {
            Workload::Read => "Read",
            Workload::Write => "Write",
            Workload::DiskUsage => "DiskUsage",
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Workload {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Workload::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown workload `{s}` (expected read, write or disk-usage)"))
    }
}

/// how long the host runs a measurement phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchTime {
    /// grow the iteration count until one run lasts at least this long
    Duration(Duration),
    /// run exactly this many iterations once
    Iterations(u64),
}

impl Default for BenchTime {
    fn default() -> Self {
        BenchTime::Duration(Duration::from_secs(1))
    }
}

impl FromStr for BenchTime {
    type Err = String;

    /// accepts `500x`, `10s`, `250ms` or `2m`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || format!("invalid bench time `{s}` (expected e.g. 500x, 10s, 250ms)");

        if let Some(n) = s.strip_suffix('x') {
            let n = n.parse::<u64>().map_err(|_| bad())?;
            if n == 0 {
                return Err(bad());
            }
            return Ok(BenchTime::Iterations(n));
        }

        let (num, unit) = s
            .find(|c: char| !c.is_ascii_digit())
            .map(|i| s.split_at(i))
            .ok_or_else(bad)?;
        let n = num.parse::<u64>().map_err(|_| bad())?;
        let d = match unit {
            "ms" => Duration::from_millis(n),
            "s" => Duration::from_secs(n),
            "m" => Duration::from_secs(n * 60),
            _ => return Err(bad()),
        };
        Ok(BenchTime::Duration(d))
    }
}

/// everything one run needs. immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// key space of the load and read phases
    pub threshold: u64,
    /// key space of the write phase
    pub write_threshold: u64,
    pub batch_size: usize,
    pub value_kb: usize,
    pub backends: Vec<Backend>,
    pub workloads: Vec<Workload>,
    /// each backend gets its own subdirectory
    pub data_dir: PathBuf,
    pub workers: usize,
    pub bench_time: BenchTime,
    pub sample_interval: Duration,
    /// fixes the read workers' key sequence
    pub seed: Option<u64>,
    pub store: StoreOptions,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            threshold: 1_000_000,
            write_threshold: 10_000_000,
            batch_size: 50,
            value_kb: 4,
            backends: Backend::ALL.to_vec(),
            workloads: Workload::ALL.to_vec(),
            data_dir: PathBuf::from("./bench-data"),
            workers: default_workers(),
            bench_time: BenchTime::default(),
            sample_interval: Duration::from_secs(3),
            seed: None,
            store: StoreOptions::default(),
        }
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl BenchmarkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            bail!("threshold must be at least 1");
        }
        if self.write_threshold == 0 {
            bail!("write threshold must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch size must be at least 1");
        }
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.sample_interval.is_zero() {
            bail!("sample interval must be non-zero");
        }
        if self.backends.is_empty() || self.workloads.is_empty() {
            bail!("nothing to run: no backend or no workload selected");
        }
        Ok(())
    }

    pub fn dir_for(&self, backend: Backend) -> PathBuf {
        self.data_dir.join(backend.as_str())
    }

    /// sub-benchmark label, `read4K` / `write4K`
    pub fn label(&self, workload: Workload) -> String {
        match workload {
            Workload::Read => format!("read{}K", self.value_kb),
            Workload::Write => format!("write{}K", self.value_kb),
            Workload::DiskUsage => format!("{} keys", self.threshold),
        }
    }

    /// `Read/cask/read4K`
    pub fn bench_name(&self, backend: Backend, workload: Workload) -> String {
        format!("{}/{backend}/{}", workload.title(), self.label(workload))
    }

    pub fn data_root(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::{BenchTime, BenchmarkConfig, Workload};
    use crate::store::Backend;
    use std::time::Duration;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = BenchmarkConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.threshold, 1_000_000);
        assert_eq!(cfg.write_threshold, 10 * cfg.threshold);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.value_kb, 4);
        assert_eq!(cfg.sample_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let mut cfg = BenchmarkConfig::default();
        cfg.threshold = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = BenchmarkConfig::default();
        cfg.batch_size = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = BenchmarkConfig::default();
        cfg.workers = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = BenchmarkConfig::default();
        cfg.backends.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_bench_time() {
        assert_eq!("500x".parse(), Ok(BenchTime::Iterations(500)));
        assert_eq!(
            "10s".parse(),
            Ok(BenchTime::Duration(Duration::from_secs(10)))
        );
        assert_eq!(
            "250ms".parse(),
            Ok(BenchTime::Duration(Duration::from_millis(250)))
        );
        assert_eq!(
            "2m".parse(),
            Ok(BenchTime::Duration(Duration::from_secs(120)))
        );
        assert!("0x".parse::<BenchTime>().is_err());
        assert!("10".parse::<BenchTime>().is_err());
        assert!("fast".parse::<BenchTime>().is_err());
        assert!("5h".parse::<BenchTime>().is_err());
    }

    #[test]
    fn test_parse_workload() {
        assert_eq!("disk-usage".parse(), Ok(Workload::DiskUsage));
        assert_eq!("READ".parse(), Ok(Workload::Read));
        assert!("scan".parse::<Workload>().is_err());
    }

    #[test]
    fn test_dir_per_backend() {
        let cfg = BenchmarkConfig::default();
        assert_eq!(cfg.dir_for(Backend::Redb), cfg.data_root().join("redb"));
        assert_eq!(cfg.label(Workload::Read), "read4K");
        assert_eq!(cfg.label(Workload::Write), "write4K");
        assert_eq!(cfg.bench_name(Backend::Cask, Workload::Read), "Read/cask/read4K");
        assert_eq!(
            cfg.bench_name(Backend::Fjall, Workload::DiskUsage),
            "DiskUsage/fjall/1000000 keys"
        );
    }
}
