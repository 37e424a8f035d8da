use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::encoding::decode_data_url;

/// One asset row in the durable blob store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobRecord {
    pub key: String,
    /// `data:<mime>;base64,<payload>`, same encoding as the mapping file
    pub data: String,
    pub mime_type: String,
    pub size: u64,
    #[serde(default)]
    pub related_product_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BlobRecord {
    /// Decoded payload, or `None` if `data` is not valid base64.
    pub fn decode(&self) -> Option<Vec<u8>> {
        decode_data_url(&self.data).map(|(_, bytes)| bytes)
    }
}
