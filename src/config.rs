//! Static trail configuration.
//!
//! Values are scene/profile level: set once before the first trail is built
//! and never changed while trails are live. Configs can be round-tripped
//! through JSON so they can live next to other scene assets.
//!
//! # Example
//!
//! ```ignore
//! let config = TrailConfig::new()
//!     .with_width(0.25)
//!     .with_segment_length(10.0)
//!     .with_min_angle(5.0);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

fn default_width() -> f32 {
    0.5
}

fn default_offset() -> f32 {
    0.5
}

fn default_segment_length() -> f32 {
    20.0
}

fn default_min_angle() -> f32 {
    15.0
}

fn default_show_time() -> f32 {
    0.3
}

/// Trail appearance and tessellation settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrailConfig {
    /// Width of a trail in world units.
    #[serde(default = "default_width")]
    pub width: f32,
    /// How far the trail stands behind the projectile.
    #[serde(default = "default_offset")]
    pub trail_offset: f32,
    /// Target length of one ribbon segment. Shorter segments give smoother
    /// but more complex trails.
    #[serde(default = "default_segment_length")]
    pub segment_length: f32,
    /// A waypoint becomes a new segment only if the direction turned by at
    /// least this many degrees since the last emitted waypoint.
    #[serde(default = "default_min_angle")]
    pub min_between_segment_angle: f32,
    /// Seconds after which an instanced trail fades.
    #[serde(default = "default_show_time")]
    pub show_time: f32,
    /// Hard ceiling on pooled buffers. `None` allocates on demand.
    #[serde(default)]
    pub max_pool_buffers: Option<usize>,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            trail_offset: default_offset(),
            segment_length: default_segment_length(),
            min_between_segment_angle: default_min_angle(),
            show_time: default_show_time(),
            max_pool_buffers: None,
        }
    }
}

impl TrailConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.trail_offset = offset;
        self
    }

    pub fn with_segment_length(mut self, length: f32) -> Self {
        self.segment_length = length;
        self
    }

    /// Set the decimation threshold in degrees.
    pub fn with_min_angle(mut self, degrees: f32) -> Self {
        self.min_between_segment_angle = degrees;
        self
    }

    pub fn with_show_time(mut self, seconds: f32) -> Self {
        self.show_time = seconds;
        self
    }

    /// Cap the total number of buffers the pool may ever hold.
    pub fn with_max_pool_buffers(mut self, max: usize) -> Self {
        self.max_pool_buffers = Some(max);
        self
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("width", self.width),
            ("segment_length", self.segment_length),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue { field, value });
            }
        }

        let non_negative = [
            ("trail_offset", self.trail_offset),
            ("min_between_segment_angle", self.min_between_segment_angle),
            ("show_time", self.show_time),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidValue { field, value });
            }
        }

        if self.min_between_segment_angle > 180.0 {
            return Err(ConfigError::InvalidValue {
                field: "min_between_segment_angle",
                value: self.min_between_segment_angle,
            });
        }

        Ok(())
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
