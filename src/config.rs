use thiserror::Error;

use crate::vault::DEFAULT_MAX_UPLOAD_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Directory holding the redb metadata database
    pub data_dir: String,
    /// Request header carrying the authenticated user id, set by the upstream auth proxy
    pub user_id_header: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// GCS bucket name (required when backend is gcs)
    pub gcs_bucket: Option<String>,
    /// Path to GCS service account JSON (optional, defaults to ADC)
    pub gcs_credentials_file: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            user_id_header: "x-user-id".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./files".to_string(),
            gcs_bucket: None,
            gcs_credentials_file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let max_upload_size = match lookup("MAX_UPLOAD_SIZE") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "MAX_UPLOAD_SIZE must be a byte count, got {raw:?}"
                ))
            })?,
            None => defaults.max_upload_size,
        };

        let backend = match lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "gcs" => StorageBackend::Gcs,
            "local" => StorageBackend::Local,
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "STORAGE_BACKEND must be 'local' or 'gcs', got '{other}'"
                )))
            }
        };

        let config = Config {
            server: ServerConfig {
                bind_address: lookup("BIND_ADDRESS").unwrap_or(defaults.server.bind_address),
                data_dir: lookup("DATA_DIR").unwrap_or(defaults.server.data_dir),
                user_id_header: lookup("USER_ID_HEADER")
                    .map(|h| h.trim().to_lowercase())
                    .unwrap_or(defaults.server.user_id_header),
            },
            storage: StorageConfig {
                backend,
                local_storage_path: lookup("LOCAL_STORAGE_PATH")
                    .unwrap_or(defaults.storage.local_storage_path),
                gcs_bucket: lookup("GCS_BUCKET").filter(|b| !b.trim().is_empty()),
                gcs_credentials_file: lookup("GCS_CREDENTIALS_FILE"),
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

        if axum::http::HeaderName::from_bytes(self.server.user_id_header.as_bytes()).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "USER_ID_HEADER '{}' is not a valid header name",
                self.server.user_id_header
            )));
        }

        if self.storage.backend == StorageBackend::Gcs && self.storage.gcs_bucket.is_none() {
            return Err(ConfigError::ValidationError(
                "GCS_BUCKET is required when STORAGE_BACKEND=gcs".to_string(),
            ));
        }

        if self.max_upload_size > DEFAULT_MAX_UPLOAD_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "MAX_UPLOAD_SIZE must not exceed {DEFAULT_MAX_UPLOAD_SIZE} bytes, got {}",
                self.max_upload_size
            )));
        }

        Ok(())
    }
}
