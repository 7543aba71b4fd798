//! Crate-wide error type.
//!
//! One variant per error kind in the protocol design (missing/malformed
//! challenge, invalid credential header, bad preimage, ...), plus wrapper
//! variants for the ambient I/O, database and HTTP failures that a real
//! deployment hits.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum L402Error {
    #[error("402 response has no WWW-Authenticate header")]
    MissingChallenge,

    #[error("WWW-Authenticate header could not be parsed: {0}")]
    MalformedChallenge(String),

    #[error("Authorization header is not a valid L402 credential: {0}")]
    InvalidAuthHeader(String),

    #[error("unsupported L402 identifier version: {0}")]
    UnsupportedVersion(u16),

    #[error("preimage does not hash to the macaroon's payment hash")]
    InvalidPreimage,

    #[error("macaroon failed verification: {0}")]
    InvalidMacaroon(String),

    #[error("invoice provider request failed: {0}")]
    InvoiceProviderError(String),

    #[error("payment could not be completed: {0}")]
    PaymentFailed(String),

    #[error("preimage provider returned a malformed response: {0}")]
    ProviderProtocolError(String),

    #[error("storage backend failed: {0}")]
    StorageError(String),

    #[error("database error")]
    Sqlx(#[from] sqlx::Error),

    #[error("http client error")]
    Reqwest(#[from] reqwest::Error),

    #[error("json error")]
    Json(#[from] serde_json::Error),

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("hex decoding error")]
    Hex(#[from] hex::FromHexError),

    #[error("base64 decoding error")]
    Base64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, L402Error>;
