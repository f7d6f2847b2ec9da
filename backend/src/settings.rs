//! Runtime configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `REGISTRY_*` environment variables and config
//! files, in that order of precedence. Apart from `reconcile_enabled`,
//! everything is optional at load time; the accessors below apply defaults
//! and reject inconsistent combinations.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::inbound::http::state::DEFAULT_MAX_IMAGE_BYTES;
use crate::outbound::storage::DEFAULT_GCS_ENDPOINT;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BLOB_DIR: &str = "data/images";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080/images";
const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;
const DEFAULT_RECONCILE_GRACE_SECS: u64 = 900;

/// Errors raised while resolving loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The bind address is not a socket address.
    #[error("invalid bind address `{value}`: {message}")]
    BindAddr {
        /// Rejected input.
        value: String,
        /// Parser message.
        message: String,
    },
    /// The blob backend name is not recognised.
    #[error("unknown blob backend `{value}`; expected memory, filesystem or gcs")]
    BlobBackend {
        /// Rejected input.
        value: String,
    },
    /// The `gcs` backend was chosen without a bucket.
    #[error("the gcs blob backend requires REGISTRY_GCS_BUCKET")]
    MissingBucket,
    /// The object storage endpoint is not a URL.
    #[error("invalid object storage endpoint `{value}`: {message}")]
    Endpoint {
        /// Rejected input.
        value: String,
        /// Parser message.
        message: String,
    },
    /// A duration or size setting was zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Offending setting.
        field: &'static str,
    },
}

/// Raw settings as loaded.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "REGISTRY")]
pub struct AppSettings {
    /// Socket address the HTTP server binds.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; without it records and intents live in memory.
    pub database_url: Option<String>,
    /// `memory`, `filesystem` or `gcs`.
    pub blob_backend: Option<String>,
    /// Root directory of the filesystem blob store.
    pub blob_dir: Option<PathBuf>,
    /// Base URL image locators are built from for memory and filesystem blobs.
    pub public_base_url: Option<String>,
    /// Bucket holding profile images for the `gcs` backend.
    pub gcs_bucket: Option<String>,
    /// Bearer token sent with object storage requests.
    pub gcs_access_token: Option<String>,
    /// Object storage API root, for emulators and compatible services.
    pub gcs_endpoint: Option<String>,
    /// Per-request object storage timeout in seconds.
    pub storage_timeout_secs: Option<u64>,
    /// Largest decoded profile image accepted by create.
    pub max_image_bytes: Option<usize>,
    /// Record upload intents and run the orphan reconciler.
    #[ortho_config(default = true)]
    pub reconcile_enabled: bool,
    /// Seconds between reconciler passes.
    pub reconcile_interval_secs: Option<u64>,
    /// Age an upload intent must reach before the reconciler acts on it.
    pub reconcile_grace_secs: Option<u64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind_addr: None,
            database_url: None,
            blob_backend: None,
            blob_dir: None,
            public_base_url: None,
            gcs_bucket: None,
            gcs_access_token: None,
            gcs_endpoint: None,
            storage_timeout_secs: None,
            max_image_bytes: None,
            reconcile_enabled: true,
            reconcile_interval_secs: None,
            reconcile_grace_secs: None,
        }
    }
}

/// Resolved blob store selection.
#[derive(Debug)]
pub enum BlobBackend {
    /// Process-local map; images are lost on restart.
    Memory {
        /// Base URL of served images.
        public_base_url: String,
    },
    /// Files under a root directory.
    Filesystem {
        /// Directory holding one file per blob key.
        dir: PathBuf,
        /// Base URL of served images.
        public_base_url: String,
    },
    /// Google Cloud Storage JSON API.
    Gcs {
        /// Bucket holding the images.
        bucket: String,
        /// API root.
        endpoint: Url,
        /// Optional bearer token.
        access_token: Option<Zeroizing<String>>,
        /// Per-request timeout.
        timeout: Duration,
    },
}

fn positive(value: Option<u64>, default: u64, field: &'static str) -> Result<u64, SettingsError> {
    match value.unwrap_or(default) {
        0 => Err(SettingsError::Zero { field }),
        value => Ok(value),
    }
}

impl AppSettings {
    /// Address to bind, defaulting to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value is not a socket
    /// address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: value.to_owned(),
            message: err.to_string(),
        })
    }

    fn public_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_owned())
    }

    /// Resolve the blob store selection.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for an unknown backend, a missing bucket, an
    /// unparseable endpoint or a zero timeout.
    pub fn blob_backend(&self) -> Result<BlobBackend, SettingsError> {
        let backend = self
            .blob_backend
            .as_deref()
            .map(str::trim)
            .unwrap_or("memory")
            .to_ascii_lowercase();
        match backend.as_str() {
            "memory" => Ok(BlobBackend::Memory {
                public_base_url: self.public_base_url(),
            }),
            "filesystem" => Ok(BlobBackend::Filesystem {
                dir: self
                    .blob_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_BLOB_DIR)),
                public_base_url: self.public_base_url(),
            }),
            "gcs" => {
                let bucket = self
                    .gcs_bucket
                    .clone()
                    .filter(|bucket| !bucket.trim().is_empty())
                    .ok_or(SettingsError::MissingBucket)?;
                let raw_endpoint = self.gcs_endpoint.as_deref().unwrap_or(DEFAULT_GCS_ENDPOINT);
                let endpoint = Url::parse(raw_endpoint).map_err(|err| SettingsError::Endpoint {
                    value: raw_endpoint.to_owned(),
                    message: err.to_string(),
                })?;
                Ok(BlobBackend::Gcs {
                    bucket,
                    endpoint,
                    access_token: self.gcs_access_token.clone().map(Zeroizing::new),
                    timeout: self.storage_timeout()?,
                })
            }
            _ => Err(SettingsError::BlobBackend { value: backend }),
        }
    }

    /// Timeout applied to each object storage request.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Zero`] for a zero timeout.
    pub fn storage_timeout(&self) -> Result<Duration, SettingsError> {
        positive(
            self.storage_timeout_secs,
            DEFAULT_STORAGE_TIMEOUT_SECS,
            "storage_timeout_secs",
        )
        .map(Duration::from_secs)
    }

    /// Largest decoded image accepted by create.
    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes.unwrap_or(DEFAULT_MAX_IMAGE_BYTES)
    }

    /// Pause between reconciler passes.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Zero`] for a zero interval.
    pub fn reconcile_interval(&self) -> Result<Duration, SettingsError> {
        positive(
            self.reconcile_interval_secs,
            DEFAULT_RECONCILE_INTERVAL_SECS,
            "reconcile_interval_secs",
        )
        .map(Duration::from_secs)
    }

    /// Minimum intent age before the reconciler treats its blob as orphaned.
    pub fn reconcile_grace(&self) -> Duration {
        Duration::from_secs(
            self.reconcile_grace_secs
                .unwrap_or(DEFAULT_RECONCILE_GRACE_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 13] = [
        "REGISTRY_BIND_ADDR",
        "REGISTRY_DATABASE_URL",
        "REGISTRY_BLOB_BACKEND",
        "REGISTRY_BLOB_DIR",
        "REGISTRY_PUBLIC_BASE_URL",
        "REGISTRY_GCS_BUCKET",
        "REGISTRY_GCS_ACCESS_TOKEN",
        "REGISTRY_GCS_ENDPOINT",
        "REGISTRY_STORAGE_TIMEOUT_SECS",
        "REGISTRY_MAX_IMAGE_BYTES",
        "REGISTRY_RECONCILE_ENABLED",
        "REGISTRY_RECONCILE_INTERVAL_SECS",
        "REGISTRY_RECONCILE_GRACE_SECS",
    ];

    fn load_with(overrides: &[(&str, &str)]) -> AppSettings {
        let _guard = lock_env(VARS.map(|name| {
            let value = overrides
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned());
            (name, value)
        }));
        AppSettings::load_from_iter([OsString::from("profile-registry")])
            .expect("settings should load")
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let settings = load_with(&[]);

        assert_eq!(
            settings.bind_addr(),
            Ok("0.0.0.0:8080".parse().expect("addr"))
        );
        assert!(settings.database_url.is_none());
        assert!(matches!(
            settings.blob_backend(),
            Ok(BlobBackend::Memory { public_base_url }) if public_base_url == DEFAULT_PUBLIC_BASE_URL
        ));
        assert_eq!(settings.max_image_bytes(), DEFAULT_MAX_IMAGE_BYTES);
        assert!(settings.reconcile_enabled);
        assert_eq!(settings.reconcile_interval(), Ok(Duration::from_secs(300)));
        assert_eq!(settings.reconcile_grace(), Duration::from_secs(900));
    }

    #[rstest]
    fn loaded_defaults_match_the_default_value() {
        let loaded = load_with(&[]);
        let built = AppSettings::default();

        assert_eq!(loaded.reconcile_enabled, built.reconcile_enabled);
        assert_eq!(loaded.bind_addr, built.bind_addr);
        assert_eq!(loaded.blob_backend, built.blob_backend);
    }

    #[rstest]
    fn environment_disables_reconciliation() {
        let settings = load_with(&[("REGISTRY_RECONCILE_ENABLED", "false")]);
        assert!(!settings.reconcile_enabled);
    }

    #[rstest]
    fn environment_selects_gcs() {
        let settings = load_with(&[
            ("REGISTRY_BLOB_BACKEND", "GCS"),
            ("REGISTRY_GCS_BUCKET", "users-images"),
            ("REGISTRY_GCS_ACCESS_TOKEN", "secret"),
            ("REGISTRY_STORAGE_TIMEOUT_SECS", "3"),
        ]);

        match settings.blob_backend().expect("backend") {
            BlobBackend::Gcs {
                bucket,
                endpoint,
                access_token,
                timeout,
            } => {
                assert_eq!(bucket, "users-images");
                assert_eq!(endpoint.as_str(), "https://storage.googleapis.com/");
                assert_eq!(access_token.as_deref().map(String::as_str), Some("secret"));
                assert_eq!(timeout, Duration::from_secs(3));
            }
            other => panic!("expected gcs backend, got {other:?}"),
        }
    }

    #[rstest]
    fn environment_selects_filesystem() {
        let settings = load_with(&[
            ("REGISTRY_BLOB_BACKEND", "filesystem"),
            ("REGISTRY_BLOB_DIR", "/srv/images"),
        ]);

        assert!(matches!(
            settings.blob_backend(),
            Ok(BlobBackend::Filesystem { dir, .. }) if dir == PathBuf::from("/srv/images")
        ));
    }

    #[rstest]
    #[case::unknown_backend(
        &[("REGISTRY_BLOB_BACKEND", "s3")],
        SettingsError::BlobBackend { value: "s3".to_owned() }
    )]
    #[case::missing_bucket(&[("REGISTRY_BLOB_BACKEND", "gcs")], SettingsError::MissingBucket)]
    #[case::zero_timeout(
        &[
            ("REGISTRY_BLOB_BACKEND", "gcs"),
            ("REGISTRY_GCS_BUCKET", "b"),
            ("REGISTRY_STORAGE_TIMEOUT_SECS", "0"),
        ],
        SettingsError::Zero { field: "storage_timeout_secs" }
    )]
    fn invalid_blob_settings_are_rejected(
        #[case] overrides: &[(&str, &str)],
        #[case] expected: SettingsError,
    ) {
        let settings = load_with(overrides);
        assert_eq!(settings.blob_backend().expect_err("invalid"), expected);
    }

    #[rstest]
    fn malformed_bind_address_is_rejected() {
        let settings = load_with(&[("REGISTRY_BIND_ADDR", "not an address")]);
        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::BindAddr { .. })
        ));
    }
}
