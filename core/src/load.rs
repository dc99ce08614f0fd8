use crate::batch::Batch;
use crate::keygen::new_key;
use crate::store::Store;
use anyhow::{Context, Result};
use bytes::Bytes;
use log::{debug, info};
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub records: u64,
    pub flushes: u64,
    pub elapsed: Duration,
}

/// writes keys `1..=threshold`, each mapped to `value`, in batches of
/// `batch_size`. runs before (and outside) any measured window.
pub fn load(store: &dyn Store, threshold: u64, batch_size: usize, value: &Bytes) -> Result<LoadStats> {
    info!(
        "loading {threshold} records of {} bytes into {}",
        value.len(),
        store.name()
    );
    let start = Instant::now();
    let mut stats = LoadStats::default();
    let mut batch = Batch::with_capacity(batch_size);

    for i in 1..=threshold {
        store.put(&mut batch, new_key(i, threshold), value.clone());
        stats.records += 1;

        if batch.len() == batch_size {
            flush(store, &mut batch, &mut stats)?;
        }
    }

    if !batch.is_empty() {
        debug!(
            "flushing trailing batch of {} records ({} bytes)",
            batch.len(),
            batch.payload_size()
        );
        flush(store, &mut batch, &mut stats)?;
    }

    stats.elapsed = start.elapsed();
    info!(
        "loaded {} records into {} in {:?} ({} flushes)",
        stats.records,
        store.name(),
        stats.elapsed,
        stats.flushes
    );
    Ok(stats)
}

fn flush(store: &dyn Store, batch: &mut Batch, stats: &mut LoadStats) -> Result<()> {
    store
        .write_batch(batch)
        .with_context(|| format!("{}: load flush after {} records", store.name(), stats.records))?;
    store.clear(batch);
    stats.flushes += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::load;
    use crate::keygen::new_key;
    use crate::store::mem_store::MemStore;
    use crate::store::{Backend, StoreOptions, open_store};
    use crate::value::value_of_size;

    #[test]
    fn test_full_batches() {
        let store = MemStore::new();
        let value = value_of_size(1);
        let stats = load(&store, 1_000, 50, &value).unwrap();

        assert_eq!(stats.records, 1_000);
        assert_eq!(stats.flushes, 20);
        assert_eq!(store.len(), 1_000);
    }

    #[test]
    fn test_trailing_partial_batch_is_flushed() {
        let store = MemStore::new();
        let value = value_of_size(1);
        let stats = load(&store, 120, 50, &value).unwrap();

        assert_eq!(stats.flushes, 3);
        assert_eq!(store.flushes(), 3);
        assert_eq!(store.len(), 120);
    }

    #[test]
    fn test_flush_error_aborts_load() {
        let store = MemStore::failing_after(2);
        let value = value_of_size(1);
        let err = load(&store, 1_000, 50, &value).unwrap_err();

        assert!(format!("{err:#}").contains("injected flush failure"));
        // the third flush failed and nothing after it was attempted
        assert_eq!(store.flushes(), 3);
        assert_eq!(store.len(), 100);
    }

    #[test]
    fn test_loaded_keys_round_trip() {
        let _ = env_logger::builder().is_test(true).try_init();
        let tmp = tempfile::tempdir().unwrap();
        let threshold = 1_000;
        let value = value_of_size(4);

        for backend in Backend::ALL {
            let store = open_store(
                backend,
                &tmp.path().join(backend.as_str()),
                &StoreOptions::default(),
            )
            .unwrap();
            load(store.as_ref(), threshold, 50, &value).unwrap();

            // keys 1..=T reduce onto every value of 0..T exactly once
            for i in 0..threshold {
                let v = store.get(&new_key(i, threshold)).unwrap();
                assert_eq!(v.map(|v| v.len()), Some(4096), "{backend} key {i}");
            }
            assert_eq!(store.get(b"key=0000001000,0000001000").unwrap(), None);
        }
    }

    /// the full-size dataset: one million 4 KiB records per backend
    #[test]
    #[ignore]
    fn test_million_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let threshold = 1_000_000;
        let value = value_of_size(4);

        for backend in Backend::ALL {
            let store = open_store(
                backend,
                &tmp.path().join(backend.as_str()),
                &StoreOptions::default(),
            )
            .unwrap();
            let stats = load(store.as_ref(), threshold, 50, &value).unwrap();
            assert_eq!(stats.flushes, 20_000);

            for i in (0..threshold).step_by(997) {
                let v = store.get(&new_key(i, threshold)).unwrap();
                assert_eq!(v.map(|v| v.len()), Some(4096), "{backend} key {i}");
            }
        }
    }
}
