mod cask_store;
mod fjall_store;
#[cfg(test)]
pub(crate) mod mem_store;
mod redb_store;
mod sled_store;

pub use cask_store::CaskStore;
pub use fjall_store::FjallStore;
pub use redb_store::RedbStore;
pub use sled_store::SledStore;

use crate::batch::Batch;
use anyhow::{Context, Result};
use bytes::Bytes;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// capability set every backend exposes to the driver.
///
/// implementations are shared by all workers of a phase, so they must be safe
/// for concurrent use. errors from the engine are returned as is; the driver
/// treats every one of them as fatal.
pub trait Store: Send + Sync {
    fn name(&self) -> &'static str;

    /// gets the value, if present, for the given key
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>>;

    /// writes every record of `batch` with the engine's atomic write primitive.
    /// either the whole batch is written or an error is returned.
    fn write_batch(&self, batch: &Batch) -> Result<()>;

    fn put(&self, batch: &mut Batch, key: Bytes, value: Bytes) {
        batch.put(key, value);
    }

    fn clear(&self, batch: &mut Batch) {
        batch.clear();
    }

    /// forces buffered engine state to disk
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Cask,
    Sled,
    Redb,
    Fjall,
}

impl Backend {
    pub const ALL: [Backend; 4] = [Backend::Cask, Backend::Sled, Backend::Redb, Backend::Fjall];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cask => "cask",
            Backend::Sled => "sled",
            Backend::Redb => "redb",
            Backend::Fjall => "fjall",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown backend `{s}` (expected cask, sled, redb or fjall)"))
    }
}

/// engine specific knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreOptions {
    pub cask_file_limit: u64,
    pub sync_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cask_file_limit: 1 << 30,
            sync_writes: false,
        }
    }
}

/// removes anything left in `dir` by an earlier run and recreates it
pub fn prepare_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| format!("removing {}", dir.display())),
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
}

/// opens `backend` on a clean `dir`
pub fn open_store(backend: Backend, dir: &Path, opts: &StoreOptions) -> Result<Arc<dyn Store>> {
    prepare_dir(dir)?;
    info!("opening {backend} in {}", dir.display());

    let store: Arc<dyn Store> = match backend {
        Backend::Cask => Arc::new(CaskStore::open(dir, opts)?),
        Backend::Sled => Arc::new(SledStore::open(dir)?),
        Backend::Redb => Arc::new(RedbStore::open(dir, opts)?),
        Backend::Fjall => Arc::new(FjallStore::open(dir)?),
    };
    Ok(store)
}
