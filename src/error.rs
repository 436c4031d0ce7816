use std::io;

/// Convenience alias for fallible client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no servers configured")]
    NoActiveServers,
    #[error("no servers available: every candidate is dead")]
    NoServersAvailable,
    #[error("no connection to {0}")]
    NoConnection(String),
    #[error("client is read-only")]
    ReadOnly,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("usage error: {0}")]
    Usage(String),
}
