//! Serve path: ordered fallback across every tier, ending at a placeholder.
//!
//! Order is disk candidates, mapping document, durable blob store, then the
//! synthetic placeholder. Tier errors are logged and treated as misses, so a
//! valid key always resolves to some image.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::asset::encoding::decode_data_url;
use crate::asset::{placeholder, AssetKey, KeyError};
use crate::blob_store::BlobStore;
use crate::mapping::MappingStore;
use crate::object_store::{LocalStore, ObjectStore, ObjectStoreError};

/// Cache lifetime for real tiers; their content never changes once present.
pub const LONG_CACHE: &str = "public, max-age=31536000, immutable";
/// Cache lifetime for placeholders, so a late-arriving asset shows up soon.
pub const SHORT_CACHE: &str = "public, max-age=60";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    MalformedKey(#[from] KeyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Disk,
    Mapping,
    BlobStore,
    Placeholder,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Disk => "disk",
            Tier::Mapping => "mapping",
            Tier::BlobStore => "blob-store",
            Tier::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tiers that hold real bytes, as opposed to the synthetic placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageTier {
    Disk,
    Mapping,
    BlobStore,
}

impl From<StorageTier> for Tier {
    fn from(tier: StorageTier) -> Self {
        match tier {
            StorageTier::Disk => Tier::Disk,
            StorageTier::Mapping => Tier::Mapping,
            StorageTier::BlobStore => Tier::BlobStore,
        }
    }
}

/// Probe order, cheapest first.
const STORAGE_TIERS: [StorageTier; 3] =
    [StorageTier::Disk, StorageTier::Mapping, StorageTier::BlobStore];

/// Result of probing a single tier.
#[derive(Debug)]
pub enum ResolutionOutcome {
    Hit {
        bytes: Bytes,
        mime_type: String,
        tier: Tier,
    },
    Miss(Tier),
}

#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub key: AssetKey,
    pub bytes: Bytes,
    pub mime_type: String,
    pub tier: Tier,
}

impl ResolvedAsset {
    pub fn is_placeholder(&self) -> bool {
        self.tier == Tier::Placeholder
    }

    pub fn cache_control(&self) -> &'static str {
        if self.is_placeholder() {
            SHORT_CACHE
        } else {
            LONG_CACHE
        }
    }
}

pub struct Resolver {
    candidates: Vec<LocalStore>,
    mapping: Arc<MappingStore>,
    blob_store: Option<Arc<dyn BlobStore>>,
}

impl Resolver {
    /// `candidates` are probed in order; see `Environment::disk_roots`.
    pub fn new(
        candidates: Vec<LocalStore>,
        mapping: Arc<MappingStore>,
        blob_store: Option<Arc<dyn BlobStore>>,
    ) -> Self {
        Self {
            candidates,
            mapping,
            blob_store,
        }
    }

    pub fn candidates(&self) -> &[LocalStore] {
        &self.candidates
    }

    pub async fn resolve(&self, raw: &str) -> Result<ResolvedAsset, ResolveError> {
        let key = AssetKey::parse(raw)?;

        match self.first_hit(&key).await {
            Some((bytes, mime_type, tier)) => {
                tracing::debug!(key = %key, tier = %tier, "Resolved asset");
                Ok(ResolvedAsset {
                    mime_type,
                    key,
                    bytes,
                    tier,
                })
            }
            None => {
                tracing::warn!(key = %key, "Asset missing from every tier, serving placeholder");
                let (svg, mime_type) = placeholder::render(key.as_str());
                Ok(ResolvedAsset {
                    key,
                    bytes: Bytes::from(svg),
                    mime_type: mime_type.to_string(),
                    tier: Tier::Placeholder,
                })
            }
        }
    }

    async fn first_hit(&self, key: &AssetKey) -> Option<(Bytes, String, Tier)> {
        for tier in STORAGE_TIERS {
            match self.probe(tier, key).await {
                ResolutionOutcome::Hit {
                    bytes,
                    mime_type,
                    tier,
                } => return Some((bytes, mime_type, tier)),
                ResolutionOutcome::Miss(tier) => {
                    tracing::trace!(key = %key, tier = %tier, "Tier miss");
                }
            }
        }
        None
    }

    async fn probe(&self, tier: StorageTier, key: &AssetKey) -> ResolutionOutcome {
        match tier {
            StorageTier::Disk => self.from_disk(key).await,
            StorageTier::Mapping => self.from_mapping(key).await,
            StorageTier::BlobStore => self.from_blob_store(key).await,
        }
    }

    async fn from_disk(&self, key: &AssetKey) -> ResolutionOutcome {
        for store in &self.candidates {
            match store.get(key.as_str()).await {
                Ok(bytes) => {
                    return ResolutionOutcome::Hit {
                        bytes,
                        mime_type: key.mime_type(),
                        tier: Tier::Disk,
                    }
                }
                Err(ObjectStoreError::NotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        dir = %store.base_path().display(),
                        error = %e,
                        "Disk candidate unreadable"
                    );
                }
            }
        }
        ResolutionOutcome::Miss(Tier::Disk)
    }

    async fn from_mapping(&self, key: &AssetKey) -> ResolutionOutcome {
        let Some(entry) = self.mapping.get(key.as_str()).await else {
            return ResolutionOutcome::Miss(Tier::Mapping);
        };

        match decode_data_url(&entry.data) {
            Some((_, bytes)) => ResolutionOutcome::Hit {
                bytes: Bytes::from(bytes),
                mime_type: key.mime_type(),
                tier: Tier::Mapping,
            },
            None => {
                tracing::warn!(key = %key, "Mapping entry payload is not valid base64");
                ResolutionOutcome::Miss(Tier::Mapping)
            }
        }
    }

    async fn from_blob_store(&self, key: &AssetKey) -> ResolutionOutcome {
        let Some(store) = &self.blob_store else {
            return ResolutionOutcome::Miss(Tier::BlobStore);
        };

        match store.get(key.as_str()).await {
            Ok(Some(record)) => match record.decode() {
                Some(bytes) => ResolutionOutcome::Hit {
                    bytes: Bytes::from(bytes),
                    mime_type: key.mime_type(),
                    tier: Tier::BlobStore,
                },
                None => {
                    tracing::warn!(key = %key, "Blob record payload is not valid base64");
                    ResolutionOutcome::Miss(Tier::BlobStore)
                }
            },
            Ok(None) => ResolutionOutcome::Miss(Tier::BlobStore),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Blob store unavailable");
                ResolutionOutcome::Miss(Tier::BlobStore)
            }
        }
    }
}
