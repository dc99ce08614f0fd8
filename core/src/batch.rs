use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// client side buffer of pending writes.
///
/// a batch is owned by exactly one worker. `clear` keeps the allocation so a
/// worker can reuse the same batch for the whole phase.
#[derive(Debug, Default)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            records: Vec::with_capacity(n),
        }
    }

    /// appends a record to the batch
    pub fn put(&mut self, k: impl Into<Bytes>, v: impl Into<Bytes>) {
        self.records.push(Record::new(k, v));
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// total bytes of keys and values in the batch
    pub fn payload_size(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.key.len() + r.value.len())
            .sum()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
