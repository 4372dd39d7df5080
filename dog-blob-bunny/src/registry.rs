use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::{
    BlobError, BlobResult, BunnyConfig, BunnyService, MemoryBlobStore, MirrorService,
    ServiceOptions, StorageService,
};

/// Declarative description of one named storage service
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "service")]
pub enum ServiceConfig {
    /// Bunny Edge Storage behind a pull zone
    Bunny(BunnyConfig),

    /// In-process storage with Bunny style URLs
    Memory {
        cdn_zone: String,
        #[serde(flatten)]
        options: ServiceOptions,
    },

    /// Fan-out over other configured services, referenced by name
    Mirror {
        primary: String,
        #[serde(default)]
        mirrors: Vec<String>,
        #[serde(flatten)]
        options: ServiceOptions,
    },
}

/// Maps service names to configured storage services
pub struct ServiceRegistry {
    services: HashMap<String, Arc<dyn StorageService>>,
}

impl ServiceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Build every service in `configs`. Mirrors may only reference non-mirror services.
    pub fn configure(configs: BTreeMap<String, ServiceConfig>) -> BlobResult<Self> {
        let mut registry = Self::new();
        let mut mirrors = Vec::new();

        for (name, config) in configs {
            match config {
                ServiceConfig::Mirror { primary, mirrors: names, options } => {
                    mirrors.push((name, primary, names, options));
                }
                other => {
                    let service = build_service(&name, other)?;
                    registry.register(name, service);
                }
            }
        }

        for (name, primary, names, options) in mirrors {
            let primary = registry.resolve(&name, &primary)?;
            let targets = names
                .iter()
                .map(|target| registry.resolve(&name, target))
                .collect::<BlobResult<Vec<_>>>()?;

            let service = MirrorService::new(primary, targets, named(options, &name));
            registry.register(name, Arc::new(service));
        }

        info!("Configured {} storage services", registry.services.len());
        Ok(registry)
    }

    /// Parse a JSON object of `name -> ServiceConfig` and build it
    pub fn from_json(json: &str) -> BlobResult<Self> {
        let configs: BTreeMap<String, ServiceConfig> = serde_json::from_str(json)?;
        Self::configure(configs)
    }

    /// Register a service under a given name.
    pub fn register<S>(&mut self, name: S, service: Arc<dyn StorageService>)
    where
        S: Into<String>,
    {
        self.services.insert(name.into(), service);
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn StorageService>> {
        self.services.get(name)
    }

    /// Registered service names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn resolve(&self, mirror: &str, target: &str) -> BlobResult<Arc<dyn StorageService>> {
        self.get(target).cloned().ok_or_else(|| {
            BlobError::invalid(format!(
                "mirror service {} references unknown service {}",
                mirror, target
            ))
        })
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn named(mut options: ServiceOptions, name: &str) -> ServiceOptions {
    if options.name.is_none() {
        options.name = Some(name.to_string());
    }
    options
}

/// Build a single non-mirror service
pub fn build_service(name: &str, config: ServiceConfig) -> BlobResult<Arc<dyn StorageService>> {
    match config {
        ServiceConfig::Bunny(mut config) => {
            config.options = named(config.options, name);
            Ok(Arc::new(BunnyService::new(config)?))
        }
        ServiceConfig::Memory { cdn_zone, options } => Ok(Arc::new(BunnyService::with_store(
            MemoryBlobStore::new(),
            cdn_zone,
            named(options, name),
        ))),
        ServiceConfig::Mirror { .. } => Err(BlobError::invalid(format!(
            "mirror service {} must be built through ServiceRegistry::configure",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "bunny": {
            "service": "Bunny",
            "storage_zone": "assets",
            "region": "ny",
            "access_key": "k",
            "cdn_zone": "assets-cdn",
            "public": true
        },
        "local": { "service": "Memory", "cdn_zone": "local-cdn" },
        "mirror": { "service": "Mirror", "primary": "local", "mirrors": ["bunny"] }
    }"#;

    #[test]
    fn test_from_json_builds_named_services() {
        let registry = ServiceRegistry::from_json(CONFIG).unwrap();
        assert_eq!(registry.names(), vec!["bunny", "local", "mirror"]);

        let bunny = registry.get("bunny").unwrap();
        assert_eq!(bunny.name(), Some("bunny"));
        assert!(bunny.is_public());

        let mirror = registry.get("mirror").unwrap();
        assert_eq!(mirror.name(), Some("mirror"));
        assert_eq!(mirror.public_url("a/b.png"), "https://local-cdn.b-cdn.net/a/b.png");
    }

    #[test]
    fn test_mirror_with_unknown_target_fails() {
        let json = r#"{ "mirror": { "service": "Mirror", "primary": "nope" } }"#;
        assert!(matches!(ServiceRegistry::from_json(json), Err(BlobError::Invalid { .. })));
    }

    #[test]
    fn test_invalid_bunny_config_fails() {
        let json = r#"{
            "b": { "service": "Bunny", "storage_zone": "z", "access_key": "", "cdn_zone": "c" }
        }"#;
        assert!(matches!(ServiceRegistry::from_json(json), Err(BlobError::Invalid { .. })));
    }

    #[test]
    fn test_malformed_json_is_a_serialization_error() {
        assert!(matches!(
            ServiceRegistry::from_json("{ not json"),
            Err(BlobError::Serialization { .. })
        ));
    }
}
