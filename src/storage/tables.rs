use redb::TableDefinition;

/// Blob records: asset key -> BlobRecord (msgpack)
pub const BLOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("blobs");
