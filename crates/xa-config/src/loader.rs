//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "extended-api.toml",
    "./config/config.toml",
    "/etc/extended-api/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Load configuration resolving overrides through `lookup` instead of the
    /// process environment.
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file(&lookup) {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, &lookup);
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file<F>(&self, lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Some(path) = lookup("EXTENDED_API_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

/// Apply environment variable overrides
fn apply_overrides<F>(config: &mut AppConfig, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(val) = lookup("EXTENDED_API_HOST") {
        config.http.host = val;
    }
    if let Some(port) = lookup("EXTENDED_API_PORT").and_then(|v| v.parse().ok()) {
        config.http.port = port;
    }

    // Namespaces
    if let Some(val) = lookup("PLATFORM_NAMESPACE") {
        config.namespaces.platform = val;
    }
    if let Some(val) = lookup("SYSTEM_NAMESPACE") {
        config.namespaces.system = val;
    }

    // MongoDB
    if let Some(val) = lookup("MONGO_URI") {
        config.mongodb.uri = Some(val);
    }
    if let Some(val) = lookup("MONGO_HOST") {
        config.mongodb.host = Some(val);
    }
    if let Some(val) = lookup("MONGO_USERNAME") {
        config.mongodb.username = val;
    }
    if let Some(val) = lookup("MONGO_PASSWORD") {
        config.mongodb.password = Some(val);
    }
    if let Some(val) = lookup("MONGO_DB_NAME") {
        config.mongodb.database = val;
    }
    if let Some(val) = lookup("MONGO_AUTH_SOURCE") {
        config.mongodb.auth_source = Some(val);
    }

    // Nucleus
    if let Some(val) = lookup("DOMINO_NUCLEUS_URI") {
        config.nucleus.uri = val;
    }

    // Keycloak
    if let Some(val) = lookup("KEYCLOAK_URL") {
        config.keycloak.server_url = val;
    }
    if let Some(val) = lookup("KEYCLOAK_REALM") {
        config.keycloak.realm = val;
    }
    if let Some(val) = lookup("KEYCLOAK_USERNAME") {
        config.keycloak.username = Some(val);
    }
    if let Some(val) = lookup("KEYCLOAK_PASSWORD") {
        config.keycloak.password = Some(val);
    }

    // Logging
    if let Some(val) = lookup("LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = lookup("LOG_FORMAT") {
        config.logging.format = val;
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_apply() {
        let loader = ConfigLoader::with_path("/nonexistent/extended-api.toml");
        let config = loader
            .load_with(lookup_from(&[
                ("PLATFORM_NAMESPACE", "custom-platform"),
                ("MONGO_PASSWORD", "pw"),
                ("MONGO_DB_NAME", "other"),
                ("EXTENDED_API_PORT", "8088"),
                ("LOG_LEVEL", "DEBUG"),
            ]))
            .unwrap();

        assert_eq!(config.namespaces.platform, "custom-platform");
        assert_eq!(config.mongodb.password.as_deref(), Some("pw"));
        assert_eq!(config.mongodb.database, "other");
        assert_eq!(config.http.port, 8088);
        assert_eq!(config.logging.level, "DEBUG");
    }

    #[test]
    fn test_unparseable_port_is_ignored() {
        let loader = ConfigLoader::with_path("/nonexistent/extended-api.toml");
        let config = loader
            .load_with(lookup_from(&[("EXTENDED_API_PORT", "not-a-port")]))
            .unwrap();
        assert_eq!(config.http.port, 5000);
    }

    #[test]
    fn test_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[nucleus]\nuri = \"http://from-file:80\"\n[http]\nport = 7000").unwrap();

        let loader = ConfigLoader::with_path(file.path());
        let config = loader
            .load_with(lookup_from(&[("DOMINO_NUCLEUS_URI", "http://from-env:80")]))
            .unwrap();

        assert_eq!(config.nucleus.uri, "http://from-env:80");
        assert_eq!(config.http.port, 7000);
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let loader = ConfigLoader::with_path("/nonexistent/extended-api.toml");
        let result = loader.load_with(lookup_from(&[("SYSTEM_NAMESPACE", " ")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
