// SPDX-License-Identifier: MIT OR Apache-2.0
//! Usage errors.
//!
//! These signal a caller bug (wiring, lifecycle) and are returned to the call
//! site. Gesture outcomes that are merely invalid are
//! [`Rejection`](crate::reducer::Rejection)s and never surface as errors.

use crate::port::{PortKey, Role};
use thiserror::Error;

/// Graph usage errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// A port key was registered again with a different role
    #[error("port {key} already registered as {existing}, cannot register it as {requested}")]
    DuplicatePortKey {
        /// Conflicting key
        key: PortKey,
        /// Role of the live registration
        existing: Role,
        /// Role the caller asked for
        requested: Role,
    },

    /// A drag was started on a port that was never registered
    #[error("port not registered: {0}")]
    UnregisteredPort(PortKey),

    /// Graph document could not be parsed
    #[error("invalid graph document: {0}")]
    Document(#[from] ron::error::SpannedError),

    /// Graph document could not be written
    #[error("failed to serialize graph document: {0}")]
    Serialization(#[from] ron::Error),
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
