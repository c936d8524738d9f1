//! Cache configuration, loadable from JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geometry::{self, CacheGeometry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub capacity_kb: u32,
    pub block_size: u32,
    pub associativity: u32,
    pub miss_latency: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity_kb: 1,
            block_size: 32,
            associativity: 2,
            miss_latency: 100,
        }
    }
}

impl CacheConfig {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("malformed cache configuration")
    }

    /// Validates the raw numbers into a usable geometry; all power-of-two
    /// and divisibility checks happen here, before any cache exists.
    pub fn to_geometry(&self) -> geometry::Result<CacheGeometry> {
        CacheGeometry::new(
            self.capacity_kb,
            self.block_size,
            self.associativity,
            self.miss_latency,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let g = CacheConfig::default().to_geometry().unwrap();
        assert_eq!(g.num_sets(), 16);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c = CacheConfig::from_json(r#"{ "capacity_kb": 4, "associativity": 4 }"#).unwrap();
        assert_eq!(c.capacity_kb, 4);
        assert_eq!(c.associativity, 4);
        assert_eq!(c.block_size, 32);
        assert_eq!(c.miss_latency, 100);
    }

    #[test]
    fn test_rejects_unknown_field() {
        assert!(CacheConfig::from_json(r#"{ "capacity": 4 }"#).is_err());
    }

    #[test]
    fn test_invalid_geometry_reported() {
        let c = CacheConfig {
            associativity: 3,
            ..Default::default()
        };
        assert!(c.to_geometry().is_err());
    }
}
