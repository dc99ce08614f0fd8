use bytes::Bytes;
use dashmap::DashMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyDirEntry {
    pub file_id: usize,
    pub val_sz: u32,
    pub val_pos: u64,
    pub tstamp: u32,
}

impl KeyDirEntry {
    pub fn new(file_id: usize, val_sz: u32, val_pos: u64, tstamp: u32) -> Self {
        Self {
            file_id,
            val_sz,
            val_pos,
            tstamp,
        }
    }
}

/// in-mem index from key to the location of its latest value
#[derive(Debug, Default)]
pub struct KeyDir {
    entries: DashMap<Bytes, KeyDirEntry>,
}

impl KeyDir {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// points `k` at `v`, replacing any older location
    pub fn put(&self, k: Bytes, v: KeyDirEntry) {
        self.entries.insert(k, v);
    }

    /// gets the location for given key `k`
    pub fn get(&self, k: impl AsRef<[u8]>) -> Option<KeyDirEntry> {
        self.entries.get(k.as_ref()).map(|e| *e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
