use super::Store;
use crate::batch::Batch;
use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::Path;

pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(dir: &Path) -> Result<Self> {
        let db = sled::open(dir).with_context(|| format!("opening sled in {}", dir.display()))?;
        Ok(Self { db })
    }
}

impl Store for SledStore {
    fn name(&self) -> &'static str {
        "sled"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.db.get(key)?.map(|v| Bytes::copy_from_slice(&v)))
    }

    fn write_batch(&self, batch: &Batch) -> Result<()> {
        let mut b = sled::Batch::default();
        for r in batch.records() {
            b.insert(r.key.as_ref(), r.value.as_ref());
        }
        self.db.apply_batch(b)?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
