//! Error types for package load, write, and codec operations.

use std::path::PathBuf;
use thiserror::Error;

/// Codec failure while encoding or decoding leaf content.
///
/// Decode failures never escape a content accessor (the accessor reports an
/// absent result instead, since asking for the "wrong" interpretation of a
/// leaf is normal in heterogeneous trees). Encode failures surface during
/// writes, wrapped in [`Error::Encode`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CodecError(pub String);

/// Errors surfaced by package load and write operations.
///
/// Failures propagate to the caller unretried; transient I/O issues are the
/// file-I/O collaborator's concern. A failed write may leave some children
/// written and others not, but never a tree with violated invariants.
#[derive(Debug, Error)]
pub enum Error {
    /// The load target does not exist.
    #[error("no entry at {}", .path.display())]
    NotFound { path: PathBuf },

    /// An underlying file-I/O failure during load or write.
    #[error("i/o failure at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A codec refused to re-encode typed content during a write.
    #[error("failed to encode content for {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },
}
