use redb::{ReadableTable, ReadableTableMetadata};

use super::db::{Database, DatabaseError};
use super::models::BlobRecord;
use super::tables::*;

impl Database {
    // ========================================================================
    // Blob operations
    // ========================================================================

    /// Insert a blob record. Keys are unique: an existing row is left
    /// untouched and `DatabaseError::Duplicate` is returned.
    pub fn insert_blob(&self, record: &BlobRecord) -> Result<(), DatabaseError> {
        debug_assert!(!record.key.is_empty(), "blob key must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(BLOBS)?;
            if table.get(record.key.as_str())?.is_some() {
                return Err(DatabaseError::Duplicate(record.key.clone()));
            }
            let data = rmp_serde::to_vec_named(record)?;
            table.insert(record.key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a blob record by asset key
    pub fn get_blob(&self, key: &str) -> Result<Option<BlobRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(BLOBS)?;

        match table.get(key)? {
            Some(data) => {
                let record: BlobRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Number of stored blobs
    pub fn count_blobs(&self) -> Result<u64, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(BLOBS)?;
        Ok(table.len()?)
    }
}
