pub mod auth;
pub mod jwks;
pub mod jwt;

/// Environment variable holding the JSON Web Key Set the server verifies
/// bearer tokens against.
pub const JWKS_ENV: &str = "JWKS";

/// Environment variable holding the PEM-encoded RSA key the server signs
/// issued tokens with.
pub const SIGNING_KEY_ENV: &str = "SIGNING_KEY";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("OpenSSL error: {0}")]
    OpenSSLError(#[from] openssl::error::ErrorStack),
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    JSONSerializationError(#[from] serde_json::Error),
    #[error("JWT validation error: {0}")]
    JWTVerificationError(#[from] alcoholic_jwt::ValidationError),
    #[error("JWT has no key ID, or not found in key set")]
    JWTMissingKid,
}
