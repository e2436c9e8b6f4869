use chunk_types::Hash;

/// Errors from chunk store operations.
///
/// The in-memory backend cannot fail on I/O. A commit that loses the root
/// race is not an error either: it is reported as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A chunk's payload does not hash to the hash it was put under.
    #[error("hash mismatch: payload of chunk {declared} hashes elsewhere")]
    HashMismatch { declared: Hash },

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error from a configuration file or a fallible backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
