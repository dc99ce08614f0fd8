mod entry;
mod key_dir;

use crate::batch::Record;
use anyhow::{Context, Result, anyhow, bail};
use bytes::Bytes;
use dashmap::DashMap;
use entry::{HEADER_SZ, write_entry};
use key_dir::{KeyDir, KeyDirEntry};
use log::debug;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug)]
struct WriterState {
    writer: BufWriter<File>,
    // tracks the val positions in the active file
    // so that we avoid seeking to calculate them
    last_val_offset: u64,
    cur_file_size: u64,
}

/// bitcask style log-structured store: appends to the active data file and
/// keeps the latest location of every key in memory
#[derive(Debug)]
pub struct Cask {
    dir: PathBuf,
    cur_id: AtomicUsize,
    key_dir: KeyDir,
    max_file_size_threshold: u64,
    writer: Mutex<WriterState>,
    file_cache: DashMap<usize, Arc<File>>,
}

fn data_file(dir: &Path, id: usize) -> PathBuf {
    dir.join(id.to_string())
}

fn open_for_append(path: &Path) -> Result<BufWriter<File>> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening data file {}", path.display()))?;
    Ok(BufWriter::new(file))
}

impl Cask {
    /// opens a fresh cask in `dir`. the directory is created if missing and
    /// must not already hold data files.
    pub fn open(dir: impl Into<PathBuf>, max_file_size_threshold: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating cask directory {}", dir.display()))?;

        if fs::read_dir(&dir)?.next().is_some() {
            bail!("cask directory {} is not empty", dir.display());
        }

        let writer = open_for_append(&data_file(&dir, 0))?;

        Ok(Self {
            dir,
            cur_id: AtomicUsize::new(0),
            key_dir: KeyDir::new(),
            max_file_size_threshold,
            writer: Mutex::new(WriterState {
                writer,
                last_val_offset: 0,
                cur_file_size: 0,
            }),
            file_cache: DashMap::new(),
        })
    }

    fn active_file(&self) -> usize {
        self.cur_id.load(Ordering::Relaxed)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, WriterState>> {
        self.writer
            .lock()
            .map_err(|_| anyhow!("cask writer lock poisoned"))
    }

    fn reader_for(&self, file_id: usize) -> Result<Arc<File>> {
        let cached = self.file_cache.get(&file_id).map(|f| Arc::clone(&f));
        if let Some(file) = cached {
            return Ok(file);
        }

        let path = data_file(&self.dir, file_id);
        let file = self
            .file_cache
            .entry(file_id)
            .or_try_insert_with(|| File::options().read(true).open(&path).map(Arc::new))
            .with_context(|| format!("opening data file {}", path.display()))?;
        Ok(Arc::clone(&file))
    }

    /// gets the value, if present, for the given key `k`
    pub fn get(&self, k: impl AsRef<[u8]>) -> Result<Option<Bytes>> {
        let Some(KeyDirEntry {
            file_id,
            val_sz,
            val_pos,
            tstamp: _,
        }) = self.key_dir.get(k)
        else {
            return Ok(None);
        };

        let file = self.reader_for(file_id)?;
        let mut v = vec![0; val_sz as usize];
        file.read_exact_at(&mut v, val_pos)?;

        Ok(Some(v.into()))
    }

    /// puts a single key-value pair
    pub fn put(&self, k: impl Into<Bytes>, v: impl Into<Bytes>) -> Result<()> {
        self.write_batch(&[Record::new(k, v)])
    }

    /// appends all records to the log and flushes them before any of them
    /// becomes visible through `get`
    pub fn write_batch(&self, records: &[Record]) -> Result<()> {
        let mut state = self.lock_writer()?;
        let tstamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as u32;
        let mut located = Vec::with_capacity(records.len());

        for Record { key, value } in records {
            let entry_sz = HEADER_SZ + key.len() as u64 + value.len() as u64;
            if state.cur_file_size > 0
                && state.cur_file_size + entry_sz > self.max_file_size_threshold
            {
                self.rotate(&mut state)?;
            }

            let val_pos = state.last_val_offset + HEADER_SZ + key.len() as u64;
            let written = write_entry(&mut state.writer, tstamp, key, value)?;
            state.last_val_offset += written;
            state.cur_file_size += written;

            located.push(KeyDirEntry::new(
                self.active_file(),
                value.len() as u32,
                val_pos,
                tstamp,
            ));
        }

        state.writer.flush()?;

        // still under the writer lock so concurrent batches land in log order
        for (r, entry) in records.iter().zip(located) {
            self.key_dir.put(r.key.clone(), entry);
        }

        Ok(())
    }

    /// flushes the active file and the OS buffers behind it
    pub fn sync(&self) -> Result<()> {
        let mut state = self.lock_writer()?;
        state.writer.flush()?;
        state.writer.get_ref().sync_all()?;
        Ok(())
    }

    fn rotate(&self, state: &mut WriterState) -> Result<()> {
        state.writer.flush()?;
        let next = self.cur_id.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("rotating cask {} to data file {next}", self.dir.display());

        *state = WriterState {
            writer: open_for_append(&data_file(&self.dir, next))?,
            last_val_offset: 0,
            cur_file_size: 0,
        };
        Ok(())
    }

    /// returns the num of live keys
    pub fn len(&self) -> usize {
        self.key_dir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_dir.is_empty()
    }
}

pub struct CaskBuilder {
    max_file_size_threshold: u64,
    dir: Option<PathBuf>,
}

impl Default for CaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CaskBuilder {
    pub fn new() -> Self {
        Self {
            max_file_size_threshold: 1 << 30,
            dir: None,
        }
    }

    pub fn with_file_limit(mut self, l: u64) -> Self {
        self.max_file_size_threshold = l;
        self
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<Cask> {
        let dir = self.dir.ok_or_else(|| anyhow!("cask directory not set"))?;
        Cask::open(dir, self.max_file_size_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::CaskBuilder;
    use crate::batch::Record;
    use std::fs;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_logging_and_reading() {
        let _ = env_logger::builder().is_test(true).try_init();
        let tmp = tempfile::tempdir().unwrap();
        let db = CaskBuilder::new().with_dir(tmp.path()).build().unwrap();
        db.put("pooja", "kalyaninagar").unwrap();
        db.put("abhi", "baner").unwrap();
        db.put("pads", "hinjewadi").unwrap();
        db.put("ashu", "baner").unwrap();
        db.put("swap", "usa").unwrap();
        db.put("jane", "mk").unwrap();

        assert_eq!(db.len(), 6);
        let e = db.key_dir.get("pooja").unwrap();
        assert_eq!(e.file_id, 0);
        assert_eq!(e.val_pos, 21);
        let e = db.key_dir.get("abhi").unwrap();
        assert_eq!(e.val_pos, 53);

        assert_eq!(db.get("pooja").unwrap(), Some("kalyaninagar".into()));
        assert_eq!(db.get("jane").unwrap(), Some("mk".into()));
        assert_eq!(db.get("ashu").unwrap(), Some("baner".into()));
        assert_eq!(db.get("nobody").unwrap(), None);
    }

    #[test]
    fn test_split_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db = CaskBuilder::new()
            .with_dir(tmp.path())
            .with_file_limit(60)
            .build()
            .unwrap();
        db.put("abhi", "rust").unwrap();
        db.put("pads", "java").unwrap();
        assert_eq!(db.active_file(), 0);

        db.put("swap", ".net").unwrap();
        assert_eq!(db.active_file(), 1);

        assert_eq!(db.get("abhi").unwrap(), Some("rust".into()));
        assert_eq!(db.get("swap").unwrap(), Some(".net".into()));
    }

    #[test]
    fn test_batch_spanning_files() {
        let tmp = tempfile::tempdir().unwrap();
        let db = CaskBuilder::new()
            .with_dir(tmp.path())
            .with_file_limit(60)
            .build()
            .unwrap();
        let records: Vec<_> = ["abhi", "pads", "swap", "pooj", "jane"]
            .iter()
            .map(|k| Record::new(*k, format!("{k}-v")))
            .collect();
        db.write_batch(&records).unwrap();

        assert_eq!(db.active_file(), 2);
        for k in ["abhi", "pads", "swap", "pooj", "jane"] {
            assert_eq!(db.get(k).unwrap(), Some(format!("{k}-v").into()));
        }
    }

    #[test]
    fn test_overwrite_returns_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let db = CaskBuilder::new().with_dir(tmp.path()).build().unwrap();
        db.put("ashu", "java").unwrap();
        db.put("ashu", "scal").unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db.get("ashu").unwrap(), Some("scal".into()));
    }

    #[test]
    fn test_sync_persists_log() {
        let tmp = tempfile::tempdir().unwrap();
        let db = CaskBuilder::new().with_dir(tmp.path()).build().unwrap();
        db.put("abhi", "rust").unwrap();
        db.sync().unwrap();
        let len = fs::metadata(tmp.path().join("0")).unwrap().len();
        assert_eq!(len, 16 + 4 + 4);
    }

    #[test]
    fn test_rejects_non_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("0"), b"stale").unwrap();
        assert!(CaskBuilder::new().with_dir(tmp.path()).build().is_err());
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        assert!(CaskBuilder::new().build().is_err());
    }

    #[test]
    fn test_concurrent_batches() {
        let tmp = tempfile::tempdir().unwrap();
        let db = Arc::new(
            CaskBuilder::new()
                .with_dir(tmp.path())
                .with_file_limit(4096)
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for i in 0..25 {
                        let records: Vec<_> = (0..10)
                            .map(|j| Record::new(format!("t{t}-{i}-{j}"), format!("v{j}")))
                            .collect();
                        db.write_batch(&records).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(db.len(), 4 * 25 * 10);
        assert_eq!(db.get("t3-24-9").unwrap(), Some("v9".into()));
        assert_eq!(db.get("t0-0-0").unwrap(), Some("v0".into()));
    }
}
