//! Configuration structures for Strata.

use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};

/// Default size of a pooled tuple buffer in bytes (4 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

/// Physical arrangement of records inside a tuple buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LayoutStrategy {
    /// Records stored one after another, all fields of a record adjacent.
    #[default]
    Row,
    /// One contiguous column region per field.
    Column,
}

impl std::fmt::Display for LayoutStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutStrategy::Row => write!(f, "row"),
            LayoutStrategy::Column => write!(f, "column"),
        }
    }
}

/// Runtime configuration for buffer management and tuple layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Size of every pooled tuple buffer in bytes.
    pub buffer_size: usize,
    /// Number of buffers preallocated in the pool.
    pub num_pooled_buffers: usize,
    /// Layout used for query buffers.
    pub layout_strategy: LayoutStrategy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            num_pooled_buffers: 1024, // 4 MB with 4 KB buffers
            layout_strategy: LayoutStrategy::Row,
        }
    }
}

impl RuntimeConfig {
    /// Returns the total memory held by the buffer pool in bytes.
    pub fn pool_size_bytes(&self) -> usize {
        self.buffer_size * self.num_pooled_buffers
    }

    /// Rejects configurations the buffer pool cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(StrataError::InvalidParameter {
                name: "buffer_size".to_string(),
                value: self.buffer_size.to_string(),
            });
        }
        if self.num_pooled_buffers == 0 {
            return Err(StrataError::InvalidParameter {
                name: "num_pooled_buffers".to_string(),
                value: self.num_pooled_buffers.to_string(),
            });
        }
        if self.buffer_size.checked_mul(self.num_pooled_buffers).is_none() {
            return Err(StrataError::ConfigError(format!(
                "pool of {} x {} bytes overflows usize",
                self.num_pooled_buffers, self.buffer_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_config_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.num_pooled_buffers, 1024);
        assert_eq!(config.layout_strategy, LayoutStrategy::Row);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pool_size_bytes() {
        let config = RuntimeConfig::default();
        assert_eq!(config.pool_size_bytes(), 4096 * 1024);
        assert_eq!(config.pool_size_bytes(), 4_194_304);

        let config = RuntimeConfig {
            buffer_size: 40 * 1024 * 1024,
            num_pooled_buffers: 10,
            ..Default::default()
        };
        assert_eq!(config.pool_size_bytes(), 419_430_400);
    }

    #[test]
    fn test_validate_rejects_zero_buffer_size() {
        let config = RuntimeConfig {
            buffer_size: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, StrataError::InvalidParameter { ref name, .. } if name == "buffer_size"));
    }

    #[test]
    fn test_validate_rejects_empty_pool() {
        let config = RuntimeConfig {
            num_pooled_buffers: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "Invalid parameter: num_pooled_buffers = 0"
        );
    }

    #[test]
    fn test_validate_rejects_overflow() {
        let config = RuntimeConfig {
            buffer_size: usize::MAX,
            num_pooled_buffers: 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StrataError::ConfigError(_))));
    }

    #[test]
    fn test_layout_strategy_default_and_display() {
        assert_eq!(LayoutStrategy::default(), LayoutStrategy::Row);
        assert_eq!(LayoutStrategy::Row.to_string(), "row");
        assert_eq!(LayoutStrategy::Column.to_string(), "column");
    }

    #[test]
    fn test_runtime_config_serde_roundtrip() {
        let original = RuntimeConfig {
            layout_strategy: LayoutStrategy::Column,
            ..Default::default()
        };
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: RuntimeConfig = serde_json::from_str(&serialized).unwrap();

        assert_eq!(original.buffer_size, deserialized.buffer_size);
        assert_eq!(original.num_pooled_buffers, deserialized.num_pooled_buffers);
        assert_eq!(deserialized.layout_strategy, LayoutStrategy::Column);
    }

    #[test]
    fn test_layout_strategy_from_json() {
        let strategy: LayoutStrategy = serde_json::from_str("\"Column\"").unwrap();
        assert_eq!(strategy, LayoutStrategy::Column);
    }
}
