//! Error types for ceremony steps

use thiserror::Error;

/// Result type alias for ceremony operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a ceremony step
///
/// Every variant is raised before anything is written to the private
/// channel, so a failed step leaves nothing behind to clean up.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed hex/base64 or a value of the wrong fixed length
    #[error("Decode error: {0}")]
    Decode(String),

    /// Key aggregation context could not be built
    #[error("Context error: {0}")]
    Context(String),

    /// A returning signer did not bring the secret nonce it generated earlier
    #[error("Missing secret nonce: pass the value saved from your previous step with --musig2-nonce-secret")]
    MissingSecretNonce,

    /// A peer nonce could not be registered, or the nonce set did not complete
    #[error("Nonce registration error: {0}")]
    NonceRegistration(String),

    /// Producing our partial signature failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Combining partial signatures failed or produced an invalid signature
    #[error("Combine error: {0}")]
    Combine(String),

    /// Inconsistent ceremony parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Decode(e.to_string())
    }
}
