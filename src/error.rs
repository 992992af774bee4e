// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while serving files or computing the freshness marker.
///
/// Everything except [`ServeError::PortInUse`] and [`ServeError::Bind`] is
/// contained within a single request: handlers log it and fall back to a
/// not-found response or a zero marker. The bind variants stop startup.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The requested file does not exist under the serving root.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    /// The request path tried to leave the serving root.
    #[error("path escapes serving root: {0}")]
    Traversal(String),

    /// A file could not be read or stat'ed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An HTML file is not valid UTF-8.
    #[error("{path} is not valid UTF-8")]
    Decode { path: PathBuf },

    /// The watched directory could not be listed.
    #[error("failed to scan {dir}: {source}")]
    Scan {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The listen address is already bound by another process.
    #[error("port {port} is already in use ({addr})")]
    PortInUse { addr: String, port: u16 },

    /// Any other failure while binding the listener.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
