//! Error types shared across the drift crates.
//!
//! Every fallible operation in the engine returns a `DriftError`. The
//! variants mirror the kinds a caller can meaningfully distinguish at the
//! command boundary; the message itself carries the originating component
//! prefix (`migrate - ...`, `catalog - ...`).

use thiserror::Error;

/// Result type alias used throughout the workspace
pub type DriftResult<T> = Result<T, DriftError>;

/// Error kinds surfaced by the migration engine
#[derive(Debug, Error)]
pub enum DriftError {
    /// Missing required parameter or unknown driver name
    #[error("{0}")]
    Config(String),

    /// Broken migration directory state (duplicate files, unreadable dir)
    #[error("{0}")]
    Catalog(String),

    /// `create` called with an empty or all-invalid description
    #[error("{0}")]
    InvalidName(String),

    /// Bad command argument: non-numeric or out-of-range N, unknown version
    #[error("{0}")]
    InvalidArgument(String),

    /// A plan that cannot be executed: gaps, wrong direction, missing file
    #[error("{0}")]
    Plan(String),

    /// Connection, query, or transaction failure; wraps the driver message
    #[error("{0}")]
    Database(String),

    /// The user declined at a confirmation prompt
    #[error("command cancelled")]
    Cancelled,

    /// `fix` invoked while the configuration disallows it
    #[error("fix - the fix command is disabled, enable it with DRIFT_ALLOW_FIX")]
    FixDisabled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
