use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;

const STATM: &str = "/proc/self/statm";

#[cfg(target_os = "linux")]
fn host_page_size() -> u64 {
    procfs::page_size()
}

#[cfg(not(target_os = "linux"))]
fn host_page_size() -> u64 {
    4096
}

/// parses the resident page count out of a statm line
/// (`size resident shared text lib data dt`, all in pages)
pub fn parse_statm(s: &str) -> Result<u64> {
    let field = s
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow!("invalid statm data: {s:?}"))?;
    field
        .parse::<u64>()
        .with_context(|| format!("invalid resident page count {field:?}"))
}

/// reads the resident set size of the current process
#[derive(Debug, Clone)]
pub struct StatmReader {
    path: PathBuf,
    page_size: u64,
}

impl Default for StatmReader {
    fn default() -> Self {
        Self {
            path: PathBuf::from(STATM),
            page_size: host_page_size(),
        }
    }
}

impl StatmReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// reads from `path` instead of `/proc/self/statm`
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// current RSS in bytes
    pub async fn read_rss(&self) -> Result<u64> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        Ok(parse_statm(&data)? * self.page_size)
    }
}
