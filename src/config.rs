use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Largest accepted upload: 5 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub environment: Environment,
    pub storage: StorageConfig,
    pub blob_store: BlobStoreConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

/// Deployment target. Decides where uploads may have landed on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    LocalDev,
    GenericProduction,
    /// Local disk is not shared between invocations.
    EphemeralServerless,
}

/// Root a candidate upload directory is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskRoot {
    Static,
    Ephemeral,
}

impl Environment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "local-dev" | "local" | "development" | "dev" => Some(Environment::LocalDev),
            "generic-production" | "production" | "prod" => Some(Environment::GenericProduction),
            "ephemeral-serverless" | "serverless" | "ephemeral" => {
                Some(Environment::EphemeralServerless)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::LocalDev => "local-dev",
            Environment::GenericProduction => "generic-production",
            Environment::EphemeralServerless => "ephemeral-serverless",
        }
    }

    /// Ordered roots to probe for uploaded files. The first one is also where
    /// new uploads are written.
    pub fn disk_roots(&self) -> &'static [DiskRoot] {
        match self {
            Environment::LocalDev => &[DiskRoot::Static],
            Environment::GenericProduction => &[DiskRoot::Static, DiskRoot::Ephemeral],
            Environment::EphemeralServerless => &[DiskRoot::Ephemeral, DiskRoot::Static],
        }
    }

    /// Classify the current process from well-known platform variables.
    fn detect() -> Self {
        let set = |name: &str| std::env::var_os(name).is_some_and(|v| !v.is_empty());

        if set("VERCEL") || set("AWS_LAMBDA_FUNCTION_NAME") || set("NETLIFY") {
            Environment::EphemeralServerless
        } else if std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false)
        {
            Environment::GenericProduction
        } else {
            Environment::LocalDev
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Service static-asset root (persistent in long-lived deployments)
    pub static_root: String,
    /// Writable scratch root (the only writable disk in serverless mode)
    pub ephemeral_root: String,
    /// Upload directory name under either root
    pub uploads_dir: String,
    /// Location of the mapping document
    pub mapping_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            static_root: "./public".to_string(),
            ephemeral_root: "/tmp".to_string(),
            uploads_dir: "uploads".to_string(),
            mapping_file: "./public/image-mapping.json".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn root(&self, root: DiskRoot) -> PathBuf {
        let base = match root {
            DiskRoot::Static => &self.static_root,
            DiskRoot::Ephemeral => &self.ephemeral_root,
        };
        PathBuf::from(base).join(&self.uploads_dir)
    }

    /// Candidate upload directories for `env`, in probe order.
    pub fn candidate_dirs(&self, env: Environment) -> Vec<PathBuf> {
        env.disk_roots().iter().map(|r| self.root(*r)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobStoreBackend {
    Disabled,
    Embedded,
    Rest,
}

#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub backend: BlobStoreBackend,
    /// Directory for the embedded database
    pub data_dir: String,
    /// Service URL (required when backend is rest)
    pub url: Option<String>,
    /// Service credential (required when backend is rest)
    pub api_key: Option<String>,
    pub table: String,
    /// Mirror new uploads into the blob store
    pub mirror_writes: bool,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            backend: BlobStoreBackend::Disabled,
            data_dir: "./data".to_string(),
            url: None,
            api_key: None,
            table: "asset_blobs".to_string(),
            mirror_writes: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let environment = match std::env::var("ASSET_ENV") {
            Ok(value) => Environment::parse(&value).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "ASSET_ENV must be one of local-dev, generic-production, ephemeral-serverless (got {value:?})"
                ))
            })?,
            Err(_) => Environment::detect(),
        };

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE);

        let static_root = std::env::var("STATIC_ROOT").unwrap_or_else(|_| "./public".to_string());
        let ephemeral_root =
            std::env::var("EPHEMERAL_ROOT").unwrap_or_else(|_| "/tmp".to_string());
        let uploads_dir = std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string());
        let mapping_file = std::env::var("MAPPING_FILE").unwrap_or_else(|_| {
            PathBuf::from(&static_root)
                .join("image-mapping.json")
                .to_string_lossy()
                .to_string()
        });

        let blob_url = std::env::var("BLOB_STORE_URL").ok().filter(|s| !s.is_empty());
        let blob_key = std::env::var("BLOB_STORE_KEY").ok().filter(|s| !s.is_empty());
        let blob_path = std::env::var("BLOB_STORE_PATH").ok().filter(|s| !s.is_empty());

        let backend = match std::env::var("BLOB_STORE_BACKEND")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "rest" => BlobStoreBackend::Rest,
            "embedded" | "redb" => BlobStoreBackend::Embedded,
            "none" | "disabled" => BlobStoreBackend::Disabled,
            _ if blob_url.is_some() => BlobStoreBackend::Rest,
            _ if blob_path.is_some() => BlobStoreBackend::Embedded,
            _ => BlobStoreBackend::Disabled,
        };

        let table = std::env::var("BLOB_STORE_TABLE")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| BlobStoreConfig::default().table);

        let mirror_writes = std::env::var("BLOB_STORE_MIRROR")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let config = Config {
            bind_address,
            environment,
            storage: StorageConfig {
                static_root,
                ephemeral_root,
                uploads_dir,
                mapping_file,
            },
            blob_store: BlobStoreConfig {
                backend,
                data_dir: blob_path.unwrap_or_else(|| "./data".to_string()),
                url: blob_url,
                api_key: blob_key,
                table,
                mirror_writes,
            },
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.storage.uploads_dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "UPLOADS_DIR cannot be empty".to_string(),
            ));
        }

        if self.blob_store.backend == BlobStoreBackend::Rest
            && (self.blob_store.url.is_none() || self.blob_store.api_key.is_none())
        {
            return Err(ConfigError::ValidationError(
                "BLOB_STORE_URL and BLOB_STORE_KEY are required when BLOB_STORE_BACKEND=rest"
                    .to_string(),
            ));
        }

        if self.environment == Environment::EphemeralServerless
            && self.blob_store.backend == BlobStoreBackend::Disabled
        {
            tracing::warn!(
                "No durable blob store configured in ephemeral-serverless mode. \
                 Uploads survive only as long as the mapping document does."
            );
        }

        Ok(())
    }

    /// Candidate upload directories for the configured environment.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        self.storage.candidate_dirs(self.environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("local-dev"), Some(Environment::LocalDev));
        assert_eq!(
            Environment::parse("Generic-Production"),
            Some(Environment::GenericProduction)
        );
        assert_eq!(
            Environment::parse("ephemeral-serverless"),
            Some(Environment::EphemeralServerless)
        );
        assert_eq!(Environment::parse("staging"), None);
    }

    #[test]
    fn test_candidate_order_per_environment() {
        let storage = StorageConfig {
            static_root: "/srv/public".to_string(),
            ephemeral_root: "/tmp".to_string(),
            uploads_dir: "uploads".to_string(),
            mapping_file: "/srv/public/image-mapping.json".to_string(),
        };

        assert_eq!(
            storage.candidate_dirs(Environment::LocalDev),
            vec![PathBuf::from("/srv/public/uploads")]
        );
        assert_eq!(
            storage.candidate_dirs(Environment::GenericProduction),
            vec![
                PathBuf::from("/srv/public/uploads"),
                PathBuf::from("/tmp/uploads")
            ]
        );
        assert_eq!(
            storage.candidate_dirs(Environment::EphemeralServerless),
            vec![
                PathBuf::from("/tmp/uploads"),
                PathBuf::from("/srv/public/uploads")
            ]
        );
    }

    #[test]
    fn test_rest_backend_requires_credentials() {
        let config = Config {
            bind_address: "127.0.0.1:0".to_string(),
            environment: Environment::LocalDev,
            storage: StorageConfig::default(),
            blob_store: BlobStoreConfig {
                backend: BlobStoreBackend::Rest,
                url: Some("https://db.example.com".to_string()),
                ..Default::default()
            },
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        };
        assert!(config.validate().is_err());
    }
}
