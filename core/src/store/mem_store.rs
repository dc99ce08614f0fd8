use super::Store;
use crate::batch::Batch;
use anyhow::{Result, bail};
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// in-memory store that counts flushes and can be told to fail them
#[derive(Debug, Default)]
pub struct MemStore {
    data: DashMap<Bytes, Bytes>,
    flushes: AtomicU64,
    fail_after: Option<u64>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// the flush after `n` successful ones fails
    pub fn failing_after(n: u64) -> Self {
        Self {
            fail_after: Some(n),
            ..Default::default()
        }
    }

    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl Store for MemStore {
    fn name(&self) -> &'static str {
        "mem"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.data.get(key).map(|v| v.clone()))
    }

    fn write_batch(&self, batch: &Batch) -> Result<()> {
        let n = self.flushes.fetch_add(1, Ordering::Relaxed);
        if self.fail_after.is_some_and(|limit| n >= limit) {
            bail!("injected flush failure");
        }
        for r in batch.records() {
            self.data.insert(r.key.clone(), r.value.clone());
        }
        Ok(())
    }
}
