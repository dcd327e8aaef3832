//! Block arena configuration.
//!
//! Defaults match the batch size the allocator has always used; the other
//! knobs exist for tests and for compilations known to be large up front.

use crate::error::{ConfigError, ConfigResult};

/// Largest accepted batch size, in blocks.
pub const MAX_BATCH_SIZE: usize = 1 << 16;

/// Largest number of blocks an arena can address.
pub const MAX_BLOCKS: usize = u32::MAX as usize;

/// Configuration for a [`BlockArena`](crate::BlockArena).
///
/// # Example
///
/// ```
/// use quartz_arena::ArenaConfig;
///
/// let config = ArenaConfig {
///     initial_blocks: 1024, // big method, reserve up front
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Number of blocks carved out whenever the free list runs dry.
    ///
    /// Default: 50
    pub batch_size: usize,

    /// Blocks of storage to reserve when the arena is created.
    ///
    /// Reserved storage is not placed on the free list; it only avoids
    /// reallocation of the backing vector.
    ///
    /// Default: 0
    pub initial_blocks: usize,

    /// Run consistency checks on sets after bulk operations.
    ///
    /// Default: enabled in debug builds
    pub verify_sets: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            initial_blocks: 0,
            verify_sets: cfg!(debug_assertions),
        }
    }
}

impl ArenaConfig {
    /// Configuration for tests: tiny batches so growth paths are exercised.
    pub fn for_testing() -> Self {
        Self {
            batch_size: 2,
            initial_blocks: 0,
            verify_sets: true,
        }
    }

    /// Check that the configuration can be honored.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::BatchTooLarge {
                size: self.batch_size,
                max: MAX_BATCH_SIZE,
            });
        }
        if self.initial_blocks > MAX_BLOCKS {
            return Err(ConfigError::ReservationTooLarge {
                requested: self.initial_blocks,
                max: MAX_BLOCKS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ArenaConfig::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let config = ArenaConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroBatchSize));
    }

    #[test]
    fn test_huge_batch_rejected() {
        let config = ArenaConfig {
            batch_size: MAX_BATCH_SIZE + 1,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::BatchTooLarge { .. }));
        assert!(err.to_string().contains("exceeds the maximum"));
    }

    #[test]
    fn test_for_testing_uses_small_batches() {
        let config = ArenaConfig::for_testing();
        assert!(config.batch_size < ArenaConfig::default().batch_size);
        assert!(config.verify_sets);
        assert!(config.validate().is_ok());
    }
}
