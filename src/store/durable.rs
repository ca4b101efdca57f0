//! ACID-durable holon store backed by redb.
//!
//! Records are bincode-encoded and keyed by holon id. Every write is its own
//! transaction; reads use MVCC snapshots, so each gating check sees the latest
//! committed state.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;
use crate::holon::{HolonRecord, Layer, LayerCount};

use super::{HolonStore, StoreResult};

/// Holon id → bincode-encoded [`HolonRecord`].
const HOLONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("holons");

/// File name of the database inside the project's FPF directory.
pub const STORE_FILE_NAME: &str = "holons.redb";

fn redb_err(context: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Redb {
        message: format!("{context} failed: {e}"),
    }
}

/// ACID-durable holon store using redb.
pub struct DurableHolonStore {
    db: Arc<Database>,
}

impl DurableHolonStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io { source: e })?;
        }
        let db = Database::create(path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", path.display()),
        })?;

        // Make sure the table exists so read transactions never miss it.
        let txn = db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        txn.open_table(HOLONS_TABLE)
            .map_err(|e| redb_err("open_table", e))?;
        txn.commit().map_err(|e| redb_err("commit", e))?;

        tracing::info!(path = %path.display(), "opened holon store");
        Ok(Self { db: Arc::new(db) })
    }

    /// Insert or replace a holon record.
    pub fn put_holon(&self, record: &HolonRecord) -> StoreResult<()> {
        let encoded = bincode::serialize(record).map_err(|e| StoreError::Serialization {
            message: format!("failed to encode holon {}: {e}", record.id),
        })?;
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        {
            let mut table = txn
                .open_table(HOLONS_TABLE)
                .map_err(|e| redb_err("open_table", e))?;
            table
                .insert(record.id.as_str(), encoded.as_slice())
                .map_err(|e| redb_err("insert", e))?;
        }
        txn.commit().map_err(|e| redb_err("commit", e))?;
        Ok(())
    }

    /// Move an existing holon to `layer`.
    pub fn set_layer(&self, id: &str, layer: Layer) -> StoreResult<HolonRecord> {
        let mut record = self.get_holon(id)?;
        record.layer = layer;
        self.put_holon(&record)?;
        Ok(record)
    }

    /// Delete a holon. Returns whether it existed.
    pub fn remove_holon(&self, id: &str) -> StoreResult<bool> {
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        let existed = {
            let mut table = txn
                .open_table(HOLONS_TABLE)
                .map_err(|e| redb_err("open_table", e))?;
            table
                .remove(id)
                .map_err(|e| redb_err("remove", e))?
                .is_some()
        };
        txn.commit().map_err(|e| redb_err("commit", e))?;
        Ok(existed)
    }

    /// Every record in the store, in key order.
    pub fn all_holons(&self) -> StoreResult<Vec<HolonRecord>> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let table = txn
            .open_table(HOLONS_TABLE)
            .map_err(|e| redb_err("open_table", e))?;
        let mut records = Vec::new();
        for entry in table.iter().map_err(|e| redb_err("iter", e))? {
            let (_, value) = entry.map_err(|e| redb_err("iter", e))?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }
}

fn decode(bytes: &[u8]) -> StoreResult<HolonRecord> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: format!("failed to decode holon record: {e}"),
    })
}

impl HolonStore for DurableHolonStore {
    fn get_holon(&self, id: &str) -> StoreResult<HolonRecord> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let table = txn
            .open_table(HOLONS_TABLE)
            .map_err(|e| redb_err("open_table", e))?;
        let guard = table
            .get(id)
            .map_err(|e| redb_err("get", e))?
            .ok_or_else(|| StoreError::NotFound { id: id.into() })?;
        decode(guard.value())
    }

    fn count_holons_by_layer(&self, context_id: &str) -> StoreResult<Vec<LayerCount>> {
        let records = self.all_holons()?;
        Ok(super::tally(&records, context_id))
    }
}

impl std::fmt::Debug for DurableHolonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableHolonStore").finish()
    }
}
