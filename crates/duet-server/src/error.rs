//! Server error types.

use std::io;

use thiserror::Error;

use crate::{config::ConfigError, store::StoreError};

/// Errors that stop the relay from starting or serving.
///
/// Per-connection failures never surface here; the gateway logs them and
/// closes only the affected connection.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Presence store could not be set up.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Accept loop or socket failure.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_cause() {
        let err = ServerError::from(ConfigError::Missing("REDIS_DB"));
        assert_eq!(err.to_string(), "configuration error: missing required setting REDIS_DB");

        let err = ServerError::Bind {
            addr: "0.0.0.0:1".into(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert!(err.to_string().starts_with("failed to bind 0.0.0.0:1"));
    }
}
