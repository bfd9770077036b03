//! Client configuration: defaults, an optional TOML file, the
//! `TURING_BATTLE_URL` environment variable, then the `--url` flag.
//! Validation runs once, after every layer is applied.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::BattleError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";
pub const BASE_URL_ENV: &str = "TURING_BATTLE_URL";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server root, without a trailing slash (e.g. `http://localhost:5001`).
    pub base_url: String,
    /// TCP connection timeout.
    pub connect_timeout: Duration,
    /// Per-request timeout for the JSON endpoints. The play stream has none.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// On-disk shape. Every key is optional.
///
/// ```toml
/// base_url = "http://battle.example:5001"
/// connect_timeout_secs = 5
/// request_timeout_secs = 20
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load defaults, then `path` if given, then the environment, then
    /// `url_override`, and validate the result.
    pub fn load(path: Option<&Path>, url_override: Option<&str>) -> Result<Self, BattleError> {
        let mut config = Self::default();
        if let Some(path) = path {
            let text = std::fs::read_to_string(path).map_err(|e| {
                BattleError::Config(format!("cannot read {}: {}", path.display(), e))
            })?;
            config.merge_toml(&text)?;
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        if let Some(url) = url_override {
            config.base_url = url.to_string();
        }
        config.validated()
    }

    /// Overlay values from a TOML document.
    pub fn merge_toml(&mut self, text: &str) -> Result<(), BattleError> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| BattleError::Config(e.to_string()))?;
        if let Some(url) = file.base_url {
            self.base_url = url;
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Normalise the base URL and reject values reqwest cannot use.
    pub fn validated(mut self) -> Result<Self, BattleError> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(BattleError::Config(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(BattleError::Config("timeouts must be greater than zero".into()));
        }
        self.base_url = trimmed;
        Ok(self)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("turing-battle.toml");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url, "http://localhost:5001");
        assert_eq!(c.connect_timeout, Duration::from_secs(3));
        assert_eq!(c.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_merge_toml_partial() {
        let mut c = ClientConfig::default();
        let text = "base_url = \"https://arena.example\"\nrequest_timeout_secs = 30\n";
        c.merge_toml(text).unwrap();
        assert_eq!(c.base_url, "https://arena.example");
        assert_eq!(c.request_timeout, Duration::from_secs(30));
        assert_eq!(c.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_merge_toml_rejects_unknown_keys() {
        let mut c = ClientConfig::default();
        let err = c.merge_toml("base_uri = \"x\"").unwrap_err();
        assert!(matches!(err, BattleError::Config(_)));
    }

    #[test]
    fn test_validated_strips_trailing_slash() {
        let c = ClientConfig::new("http://host:5001/").validated().unwrap();
        assert_eq!(c.endpoint("/api/models"), "http://host:5001/api/models");
    }

    #[test]
    fn test_validated_rejects_scheme() {
        assert!(ClientConfig::new("host:5001").validated().is_err());
    }

    #[test]
    fn test_validated_rejects_zero_timeout() {
        let mut c = ClientConfig::default();
        c.connect_timeout = Duration::ZERO;
        assert!(c.validated().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = ClientConfig::load(Some(&missing), None).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "connect_timeout_secs = 7\n");
        let c = ClientConfig::load(Some(&path), None).unwrap();
        assert_eq!(c.connect_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_url_override_applied_before_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "base_url = \"not a url\"\n");
        assert!(ClientConfig::load(Some(&path), None).is_err());

        let c = ClientConfig::load(Some(&path), Some("http://arena:9000/")).unwrap();
        assert_eq!(c.base_url, "http://arena:9000");
    }
}
