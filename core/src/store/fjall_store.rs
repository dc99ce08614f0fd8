use super::Store;
use crate::batch::Batch;
use anyhow::{Context, Result};
use bytes::Bytes;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;

/// LSM backend: a batch is one atomic keyspace write batch
pub struct FjallStore {
    keyspace: Keyspace,
    items: PartitionHandle,
}

impl FjallStore {
    pub fn open(dir: &Path) -> Result<Self> {
        let keyspace = Config::new(dir)
            .open()
            .with_context(|| format!("opening fjall in {}", dir.display()))?;
        let items = keyspace.open_partition("benchmark", PartitionCreateOptions::default())?;
        Ok(Self { keyspace, items })
    }
}

impl Store for FjallStore {
    fn name(&self) -> &'static str {
        "fjall"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.items.get(key)?.map(|v| Bytes::copy_from_slice(&v)))
    }

    fn write_batch(&self, batch: &Batch) -> Result<()> {
        let mut b = self.keyspace.batch();
        for r in batch.records() {
            b.insert(&self.items, r.key.as_ref(), r.value.as_ref());
        }
        b.commit()?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}
