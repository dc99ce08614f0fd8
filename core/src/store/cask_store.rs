use super::{Store, StoreOptions};
use crate::batch::Batch;
use crate::cask::{Cask, CaskBuilder};
use anyhow::Result;
use bytes::Bytes;
use std::path::Path;

/// log-structured backend: a batch becomes one buffered log append
pub struct CaskStore {
    db: Cask,
}

impl CaskStore {
    pub fn open(dir: &Path, opts: &StoreOptions) -> Result<Self> {
        let db = CaskBuilder::new()
            .with_dir(dir)
            .with_file_limit(opts.cask_file_limit)
            .build()?;
        Ok(Self { db })
    }
}

impl Store for CaskStore {
    fn name(&self) -> &'static str {
        "cask"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        self.db.get(key)
    }

    fn write_batch(&self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.db.write_batch(batch.records())
    }

    fn sync(&self) -> Result<()> {
        self.db.sync()
    }
}
