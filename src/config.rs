//! Serializable configuration for clustering tiers and the nearby service.
//!
//! # Example
//!
//! ```rust
//! use geogrid::{Config, Meters};
//!
//! let json = r#"{
//!     "clustering": { "street_threshold": 30000.0 },
//!     "nearby": { "max_search_results": 10 }
//! }"#;
//! let config = Config::from_json(json).unwrap();
//!
//! assert_eq!(config.clustering.street_threshold, Meters::km(30.0));
//! assert_eq!(config.clustering.city_resolution, Meters::km(10.0));
//! assert_eq!(config.nearby.max_search_results, 10);
//! ```

use crate::error::{GeoGridError, Result};
use geogrid_types::units::{Meters, Minutes};
use serde::{Deserialize, Serialize};

/// Resolutions and span thresholds of the three clustering tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Cell size of the point-level tier
    pub street_resolution: Meters,

    /// Cell size of the city-level count tier
    pub city_resolution: Meters,

    /// Cell size of the world-level count tier
    pub world_resolution: Meters,

    /// Query spans shorter than this are answered with raw points
    pub street_threshold: Meters,

    /// Query spans shorter than this (and not street level) use the city tier
    pub city_threshold: Meters,

    /// Expire points after this many minutes (None keeps them forever)
    pub expiration: Option<Minutes>,
}

impl ClusterConfig {
    pub fn with_resolutions(mut self, street: Meters, city: Meters, world: Meters) -> Self {
        self.street_resolution = street;
        self.city_resolution = city;
        self.world_resolution = world;
        self
    }

    pub fn with_thresholds(mut self, street: Meters, city: Meters) -> Self {
        self.street_threshold = street;
        self.city_threshold = city;
        self
    }

    pub fn with_expiration(mut self, expiration: Minutes) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let resolutions = [
            ("street_resolution", self.street_resolution),
            ("city_resolution", self.city_resolution),
            ("world_resolution", self.world_resolution),
        ];
        for (name, resolution) in resolutions {
            if !resolution.value().is_finite() || resolution.value() <= 0.0 {
                return Err(GeoGridError::Config(format!(
                    "{name} must be a positive number of meters, got {resolution}"
                )));
            }
        }

        if !(self.street_threshold.value() > 0.0 && self.street_threshold < self.city_threshold) {
            return Err(GeoGridError::Config(format!(
                "street_threshold ({}) must be positive and below city_threshold ({})",
                self.street_threshold, self.city_threshold
            )));
        }

        if self.expiration == Some(Minutes(0)) {
            return Err(GeoGridError::Config(
                "expiration must be at least one minute".to_string(),
            ));
        }

        if !(self.street_resolution < self.city_resolution
            && self.city_resolution < self.world_resolution)
        {
            log::warn!(
                "clustering resolutions are not increasing ({} / {} / {})",
                self.street_resolution,
                self.city_resolution,
                self.world_resolution
            );
        }

        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            street_resolution: Meters::km(0.5),
            city_resolution: Meters::km(10.0),
            world_resolution: Meters::km(500.0),
            street_threshold: Meters::km(45.0),
            city_threshold: Meters::km(1000.0),
            expiration: None,
        }
    }
}

/// Limits applied by [`NearbyService`](crate::NearbyService) queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearbyConfig {
    pub max_search_results: usize,
    pub max_search_radius: Meters,
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            max_search_results: 5,
            max_search_radius: Meters::km(10.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub clustering: ClusterConfig,

    #[serde(default)]
    pub nearby: NearbyConfig,
}

impl Config {
    pub fn with_clustering(mut self, clustering: ClusterConfig) -> Self {
        self.clustering = clustering;
        self
    }

    pub fn with_max_search_results(mut self, results: usize) -> Self {
        self.nearby.max_search_results = results;
        self
    }

    pub fn with_max_search_radius(mut self, radius: Meters) -> Self {
        self.nearby.max_search_radius = radius;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.clustering.validate()?;

        if self.nearby.max_search_results == 0 {
            return Err(GeoGridError::Config(
                "max_search_results must be greater than zero".to_string(),
            ));
        }

        let radius = self.nearby.max_search_radius;
        if !radius.value().is_finite() || radius.value() <= 0.0 {
            return Err(GeoGridError::Config(format!(
                "max_search_radius must be a positive number of meters, got {radius}"
            )));
        }

        if radius > self.clustering.city_threshold {
            log::warn!(
                "max_search_radius {radius} exceeds the city threshold; \
                 nearby queries will scan many cells"
            );
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
