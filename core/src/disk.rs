use crate::metrics::{Metric, to_gib};
use log::warn;
use std::path::Path;
use tokio::process::Command;

/// parses the byte count `du -sb` prints before the path
pub fn parse_du_output(out: &str) -> Option<u64> {
    out.split_whitespace().next()?.parse().ok()
}

/// apparent size of everything under `path`, zero if `du` fails
pub async fn disk_usage_bytes(path: &Path) -> u64 {
    let out = match Command::new("du").arg("-sb").arg(path).output().await {
        Ok(out) => out,
        Err(e) => {
            warn!("running du on {}: {e}", path.display());
            return 0;
        }
    };

    if !out.status.success() {
        warn!(
            "du on {} exited with {}: {}",
            path.display(),
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        );
        return 0;
    }

    let stdout = String::from_utf8_lossy(&out.stdout);
    parse_du_output(&stdout).unwrap_or_else(|| {
        warn!("unparseable du output for {}: {stdout:?}", path.display());
        0
    })
}

/// `DiskUsage(GB)` for `path`
pub async fn disk_usage_metric(path: &Path) -> Metric {
    Metric::new("DiskUsage(GB)", to_gib(disk_usage_bytes(path).await))
}
