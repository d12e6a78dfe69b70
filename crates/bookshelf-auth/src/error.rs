use bookshelf_cache::CacheError;

/// Failures of token and verification-code operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The entropy source could not produce a secret.
    #[error("Failed to generate secret: {0}")]
    Generation(#[from] rand::Error),

    /// The record is absent or has expired.
    #[error("Record not found")]
    NotFound,

    /// The lifetime pushes the expiry past the representable date range.
    #[error("Lifetime of {0} is out of range")]
    ExpiryOutOfRange(chrono::Duration),

    /// The record store failed or timed out.
    #[error("Storage error: {0}")]
    Storage(#[from] CacheError),
}
