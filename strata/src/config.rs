use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::entry::DEFAULT_TTL_MS;

/// Deployment environment, informational only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

/// Tuning for the advisory adaptive-TTL signal
///
/// The watermarks and history cap default to the values the heuristic was
/// shipped with; they are configuration, not load-bearing constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveTtlConfig {
    /// Volatility samples retained per key (oldest dropped first)
    pub history_limit: usize,
    /// Mean volatility above this halves the suggested TTL
    pub high_watermark: f64,
    /// Mean volatility below this doubles the suggested TTL
    pub low_watermark: f64,
}

impl Default for AdaptiveTtlConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            high_watermark: 0.8,
            low_watermark: 0.2,
        }
    }
}

/// Cache manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default entry lifetime in milliseconds
    pub default_ttl_ms: u64,
    /// Capacity of the in-process level (entries)
    pub max_size: usize,
    /// Prefix applied to every key before it reaches a provider
    pub namespace: String,
    pub environment: Environment,
    #[serde(default)]
    pub adaptive: AdaptiveTtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: DEFAULT_TTL_MS,
            max_size: 1000,
            namespace: "strata".to_string(),
            environment: Environment::Development,
            adaptive: AdaptiveTtlConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CacheConfig = serde_yaml::from_str(&content)?;
        Ok(config.normalized())
    }

    /// Clamp unusable values back to the defaults
    ///
    /// A zero TTL or capacity would make every write a no-op; treat both as
    /// "not configured" rather than leaving the behavior undefined.
    pub fn normalized(mut self) -> Self {
        if self.default_ttl_ms == 0 {
            self.default_ttl_ms = DEFAULT_TTL_MS;
        }
        if self.max_size == 0 {
            self.max_size = Self::default().max_size;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl_ms, 3_600_000);
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.namespace, "strata");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.adaptive.history_limit, 10);
        assert_eq!(config.adaptive.high_watermark, 0.8);
        assert_eq!(config.adaptive.low_watermark, 0.2);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
default_ttl_ms: 30000
max_size: 500
namespace: catalog
environment: production
adaptive:
  history_limit: 20
  high_watermark: 0.9
  low_watermark: 0.1
"#;
        let config: CacheConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.default_ttl_ms, 30_000);
        assert_eq!(config.max_size, 500);
        assert_eq!(config.namespace, "catalog");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.adaptive.history_limit, 20);
    }

    #[test]
    fn test_config_yaml_adaptive_defaults() {
        let yaml = r#"
default_ttl_ms: 30000
max_size: 500
namespace: catalog
environment: test
"#;
        let config: CacheConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.adaptive.history_limit, 10);
    }

    #[test]
    fn test_config_normalized_clamps_zeros() {
        let config = CacheConfig {
            default_ttl_ms: 0,
            max_size: 0,
            ..Default::default()
        }
        .normalized();

        assert_eq!(config.default_ttl_ms, 3_600_000);
        assert_eq!(config.max_size, 1000);
    }
}
