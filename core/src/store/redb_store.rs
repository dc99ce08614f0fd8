use super::{Store, StoreOptions};
use crate::batch::Batch;
use anyhow::{Context, Result};
use bytes::Bytes;
use redb::{Database, Durability, TableDefinition};
use std::path::Path;

const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("benchmark");

/// B-tree backend: a batch is one write transaction
pub struct RedbStore {
    db: Database,
    durability: Durability,
}

impl RedbStore {
    pub fn open(dir: &Path, opts: &StoreOptions) -> Result<Self> {
        let path = dir.join("redb");
        let db = Database::create(&path)
            .with_context(|| format!("creating redb at {}", path.display()))?;

        // create the table up front so readers never race its creation
        let txn = db.begin_write()?;
        txn.open_table(TABLE)?;
        txn.commit()?;

        let durability = if opts.sync_writes {
            Durability::Immediate
        } else {
            Durability::None
        };

        Ok(Self { db, durability })
    }
}

impl Store for RedbStore {
    fn name(&self) -> &'static str {
        "redb"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(TABLE)?;
        Ok(table.get(key)?.map(|v| Bytes::copy_from_slice(v.value())))
    }

    fn write_batch(&self, batch: &Batch) -> Result<()> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(self.durability);
        {
            let mut table = txn.open_table(TABLE)?;
            for r in batch.records() {
                table.insert(r.key.as_ref(), r.value.as_ref())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        // an immediate commit makes every earlier non-durable commit durable
        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::Immediate);
        txn.commit()?;
        Ok(())
    }
}
