//! Arena configuration errors.

use thiserror::Error;

/// Errors reported when validating an [`ArenaConfig`](crate::ArenaConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A batch must contain at least one block.
    #[error("arena batch size must be non-zero")]
    ZeroBatchSize,

    /// The batch size is larger than a single growth step may be.
    #[error("arena batch size {size} exceeds the maximum of {max} blocks")]
    BatchTooLarge {
        /// Requested batch size.
        size: usize,
        /// Largest accepted batch size.
        max: usize,
    },

    /// The up-front reservation cannot be addressed by a block id.
    #[error("initial reservation of {requested} blocks exceeds the addressable limit of {max}")]
    ReservationTooLarge {
        /// Requested number of blocks.
        requested: usize,
        /// Largest addressable number of blocks.
        max: usize,
    },
}

/// Result type for arena configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;
