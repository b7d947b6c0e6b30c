//! Unified error type.

use std::net::SocketAddr;

/// The error type returned by promux's fallible server operations.
///
/// Application-level failures are HTTP status codes written by handlers, and
/// writer failures are plain [`std::io::Error`]s returned to the handler. This
/// type surfaces infrastructure failures: binding a port or reading the
/// listener's state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
