//! Registry persistence
//!
//! The registry itself is purely in-memory. Hosts that need durability keep
//! the committed operation log and a materialized snapshot in a store.

use crate::errors::Result;
use crate::operation::Operation;
use crate::types::RegistrySnapshot;
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::path::Path;
use tracing::debug;

const SNAPSHOT_KEY: &[u8] = b"registry_snapshot";

/// Abstract registry store
pub trait RegistryStore {
    fn load(&self) -> Result<Option<RegistrySnapshot>>;
    fn save(&self, snapshot: &RegistrySnapshot) -> Result<()>;
    /// Append a committed operation, returning its 0-based log position
    fn append_operation(&self, operation: &Operation) -> Result<u64>;
    /// All committed operations in log order
    fn operations(&self) -> Result<Vec<Operation>>;
    /// Make everything written so far durable
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Sled-backed registry store
pub struct SledRegistryStore {
    db: Db,
    metadata: Tree,
    operations: Tree,
}

impl SledRegistryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let metadata = db.open_tree("metadata")?;
        let operations = db.open_tree("operations")?;
        Ok(Self {
            db,
            metadata,
            operations,
        })
    }
}

impl RegistryStore for SledRegistryStore {
    fn load(&self) -> Result<Option<RegistrySnapshot>> {
        match self.metadata.get(SNAPSHOT_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        let data = serde_json::to_vec(snapshot)?;
        self.metadata.insert(SNAPSHOT_KEY, data)?;
        debug!("Saved registry snapshot with {} parcels", snapshot.parcels.len());
        Ok(())
    }

    fn append_operation(&self, operation: &Operation) -> Result<u64> {
        let position = self.operations.len() as u64;
        let data = serde_json::to_vec(operation)?;
        self.operations.insert(position.to_be_bytes(), data)?;
        Ok(position)
    }

    fn operations(&self) -> Result<Vec<Operation>> {
        let mut ops = Vec::new();
        for item in self.operations.iter() {
            let (_, value) = item?;
            ops.push(serde_json::from_slice(&value)?);
        }
        Ok(ops)
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// In-memory registry store
#[derive(Default)]
pub struct MemoryRegistryStore {
    snapshot: RwLock<Option<RegistrySnapshot>>,
    operations: RwLock<Vec<Operation>>,
}

impl MemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryRegistryStore {
    fn load(&self) -> Result<Option<RegistrySnapshot>> {
        Ok(self.snapshot.read().clone())
    }

    fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        *self.snapshot.write() = Some(snapshot.clone());
        Ok(())
    }

    fn append_operation(&self, operation: &Operation) -> Result<u64> {
        let mut ops = self.operations.write();
        ops.push(operation.clone());
        Ok(ops.len() as u64 - 1)
    }

    fn operations(&self) -> Result<Vec<Operation>> {
        Ok(self.operations.read().clone())
    }
}
