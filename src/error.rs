//! Error types for projectile trails.
//!
//! Lifecycle violations by the upstream event source, pool rejections,
//! configuration problems and GPU setup failures each get their own enum.

use std::fmt;

/// Errors raised while processing trail lifecycle events.
///
/// Every variant is returned before any pool or index state is touched, so a
/// failed call leaves the component exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailError {
    /// Slot index is outside `[0, capacity)`.
    SlotOutOfRange { slot: usize, capacity: usize },
    /// `created` arrived for a slot that already has a live trail.
    SlotAlreadyActive(usize),
    /// `moved` or `removed` arrived for a slot with no live trail.
    SlotNotActive(usize),
    /// The pool hit its configured buffer ceiling.
    PoolExhausted { segment_count: u32, max_buffers: usize },
}

impl fmt::Display for TrailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrailError::SlotOutOfRange { slot, capacity } => {
                write!(f, "Projectile slot {} is out of range (capacity {})", slot, capacity)
            }
            TrailError::SlotAlreadyActive(slot) => {
                write!(f, "Projectile slot {} was created twice without being removed", slot)
            }
            TrailError::SlotNotActive(slot) => {
                write!(f, "Projectile slot {} has no active trail", slot)
            }
            TrailError::PoolExhausted { segment_count, max_buffers } => write!(
                f,
                "Trail buffer pool exhausted: cannot allocate a {}-segment buffer (ceiling {})",
                segment_count, max_buffers
            ),
        }
    }
}

impl std::error::Error for TrailError {}

/// Errors that can occur while loading or validating a trail configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read or write the config file.
    Io(std::io::Error),
    /// Malformed JSON.
    Json(serde_json::Error),
    /// Segment budget cannot be derived from the given values.
    InvalidBudget(String),
    /// A field holds an unusable value.
    InvalidValue { field: &'static str, value: f32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to access trail config: {}", e),
            ConfigError::Json(e) => write!(f, "Failed to parse trail config: {}", e),
            ConfigError::InvalidBudget(msg) => write!(f, "Invalid segment budget: {}", msg),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value {} for trail config field `{}`", value, field)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoAdapter => write!(f, "No GPU adapter available for trail rendering"),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::DeviceCreation(e) => Some(e),
            GpuError::NoAdapter => None,
        }
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}
