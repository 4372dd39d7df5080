use std::env;
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::{BlobError, BlobResult};

/// Default host for the Falkenstein (`de`) storage region
pub const DEFAULT_STORAGE_HOST: &str = "storage.bunnycdn.com";

/// Options every storage service accepts, regardless of backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceOptions {
    /// Service name, set by the registry when not given explicitly
    pub name: Option<String>,

    /// Whether `url()` hands out public URLs instead of private ones
    pub public: bool,
}

impl ServiceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }
}

/// Connection parameters for a Bunny storage zone.
///
/// Built once and never mutated; the HTTP client is created from it at construction.
#[derive(Clone, Deserialize)]
pub struct BunnyConfig {
    /// Storage zone name (the first path segment of every object URL)
    pub storage_zone: String,

    /// Storage region code (`de`, `uk`, `ny`, `la`, `sg`, `se`, `br`, `jh`, `syd`)
    #[serde(default)]
    pub region: String,

    /// Storage zone password, sent as the `AccessKey` header
    pub access_key: String,

    /// Pull zone used to compose public URLs (`https://<cdn_zone>.b-cdn.net`)
    pub cdn_zone: String,

    /// Explicit storage endpoint, overrides the region derived host
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout handed to the HTTP client, in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(flatten)]
    pub options: ServiceOptions,
}

impl fmt::Debug for BunnyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BunnyConfig")
            .field("storage_zone", &self.storage_zone)
            .field("region", &self.region)
            .field("access_key", &"<redacted>")
            .field("cdn_zone", &self.cdn_zone)
            .field("endpoint", &self.endpoint)
            .field("timeout_ms", &self.timeout_ms)
            .field("options", &self.options)
            .finish()
    }
}

impl BunnyConfig {
    /// Create a config for the default region
    pub fn new<Z, K, C>(storage_zone: Z, access_key: K, cdn_zone: C) -> Self
    where
        Z: Into<String>,
        K: Into<String>,
        C: Into<String>,
    {
        Self {
            storage_zone: storage_zone.into(),
            region: String::new(),
            access_key: access_key.into(),
            cdn_zone: cdn_zone.into(),
            endpoint: None,
            timeout_ms: None,
            options: ServiceOptions::default(),
        }
    }

    /// Load from `BUNNY_*` environment variables
    pub fn from_env() -> BlobResult<Self> {
        fn get_env(key: &str) -> BlobResult<String> {
            env::var(key)
                .map_err(|_| BlobError::invalid(format!("{} environment variable required", key)))
        }

        let config = Self {
            storage_zone: get_env("BUNNY_STORAGE_ZONE")?,
            region: env::var("BUNNY_STORAGE_REGION").unwrap_or_default(),
            access_key: get_env("BUNNY_ACCESS_KEY")?,
            cdn_zone: get_env("BUNNY_CDN_ZONE")?,
            endpoint: env::var("BUNNY_STORAGE_ENDPOINT").ok(),
            timeout_ms: None,
            options: ServiceOptions::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Set storage region
    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = region.into();
        self
    }

    /// Override the storage endpoint
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set HTTP request timeout, kept at millisecond precision
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Set generic service options
    pub fn with_options(mut self, options: ServiceOptions) -> Self {
        self.options = options;
        self
    }

    /// Check that every required field is usable
    pub fn validate(&self) -> BlobResult<()> {
        let required = [
            ("storage_zone", &self.storage_zone),
            ("access_key", &self.access_key),
            ("cdn_zone", &self.cdn_zone),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(BlobError::invalid(format!("{} must not be empty", field)));
            }
        }

        if self.storage_zone.contains('/') {
            return Err(BlobError::invalid("storage_zone must not contain '/'"));
        }
        if self.cdn_zone.contains(['/', '.']) {
            return Err(BlobError::invalid("cdn_zone must be a bare pull zone name"));
        }
        if !self.region.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(BlobError::invalid(format!("invalid storage region: {}", self.region)));
        }
        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
                return Err(BlobError::invalid("endpoint must be an http(s) URL"));
            }
        }
        if self.timeout_ms == Some(0) {
            return Err(BlobError::invalid("timeout_ms must be at least one millisecond"));
        }
        Ok(())
    }

    /// Base URL of the storage API, without trailing slash
    pub fn storage_endpoint(&self) -> String {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }

        let region = self.region.to_ascii_lowercase();
        if region.is_empty() || region == "de" {
            format!("https://{}", DEFAULT_STORAGE_HOST)
        } else {
            format!("https://{}.{}", region, DEFAULT_STORAGE_HOST)
        }
    }

    /// Request timeout, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
