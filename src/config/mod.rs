//! Application configuration.
//!
//! Configuration lives in a single flat JSON object. The keys below are understood
//! by the framework itself; every other key is kept verbatim and can be read by the
//! application through [`AppConfig::setting`].
//!
//! | Key                 | Default          | Meaning                                   |
//! |---------------------|------------------|-------------------------------------------|
//! | `bind`              | `127.0.0.1:8080` | listen address                            |
//! | `base_path`         | `""`             | URL prefix stripped before routing        |
//! | `match_policy`      | `"first"`        | `"first"` or `"last"` matching route wins |
//! | `max_request_bytes` | 8 MiB            | largest request the server will buffer    |
//! | `routes`            | *(none)*         | path to a JSON route table                |

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::router::MatchPolicy;

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Default request size limit (8 MiB).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 8 * 1024 * 1024;

fn default_bind() -> String {
    "127.0.0.1:8080".to_owned()
}

fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

/// Framework settings plus free-form application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub base_path: String,

    #[serde(default)]
    pub match_policy: MatchPolicy,

    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    #[serde(default)]
    pub routes: Option<PathBuf>,

    #[serde(flatten)]
    settings: Map<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_path: String::new(),
            match_policy: MatchPolicy::default(),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            routes: None,
            settings: Map::new(),
        }
    }
}

impl AppConfig {
    /// Read and parse the JSON config file at `path`.
    ///
    /// A relative `routes` path is resolved against the config file's directory.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Json`] if it
    /// is not a valid config object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&json)?;

        config.routes = config.routes.map(|routes| match path.parent() {
            Some(dir) if routes.is_relative() => dir.join(routes),
            _ => routes,
        });

        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse a config object from a JSON string.
    ///
    /// # Examples
    ///
    /// ```
    /// use watamelo::config::AppConfig;
    ///
    /// let config = AppConfig::from_json(r#"{ "base_path": "/app", "site_name": "Demo" }"#).unwrap();
    /// assert_eq!(config.base_path, "/app");
    /// assert_eq!(config.setting_str("site_name"), Some("Demo"));
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Application setting `key`, if present.
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Application setting `key` when it is a string.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.setting(key).and_then(Value::as_str)
    }

    /// `base_path` without a trailing slash; empty when routing from the root.
    pub fn mount_prefix(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.base_path, "");
        assert_eq!(config.match_policy, MatchPolicy::First);
        assert_eq!(config.max_request_bytes, DEFAULT_MAX_REQUEST_BYTES);
        assert!(config.routes.is_none());
        assert!(config.setting("anything").is_none());
    }

    #[test]
    fn default_matches_empty_object() {
        let parsed = AppConfig::from_json("{}").unwrap();
        let built = AppConfig::default();
        assert_eq!(parsed.bind, built.bind);
        assert_eq!(parsed.max_request_bytes, built.max_request_bytes);
    }

    #[test]
    fn framework_keys_and_settings() {
        let config = AppConfig::from_json(
            r#"{
                "bind": "0.0.0.0:9000",
                "base_path": "/admin/",
                "match_policy": "last",
                "max_request_bytes": 1024,
                "routes": "routes.json",
                "site_name": "Watamelo",
                "page_size": 25
            }"#,
        )
        .unwrap();

        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.mount_prefix(), "/admin");
        assert_eq!(config.match_policy, MatchPolicy::Last);
        assert_eq!(config.max_request_bytes, 1024);
        assert_eq!(config.routes.as_deref(), Some(Path::new("routes.json")));
        assert_eq!(config.setting_str("site_name"), Some("Watamelo"));
        assert_eq!(config.setting("page_size").and_then(Value::as_u64), Some(25));
        assert_eq!(config.setting_str("page_size"), None);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(matches!(
            AppConfig::from_json(r#"{ "match_policy": "best" }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn load_resolves_routes_next_to_config() {
        let dir = std::env::temp_dir().join(format!("watamelo-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("app.json");
        std::fs::write(&file, r#"{ "routes": "routes.json" }"#).unwrap();

        let config = AppConfig::load(&file).unwrap();
        assert_eq!(config.routes, Some(dir.join("routes.json")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(matches!(
            AppConfig::load("/nonexistent/watamelo/app.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
