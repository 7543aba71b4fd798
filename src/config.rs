//! Environment-driven configuration, replacing the scattered `env::var` calls of the
//! original harness with a single typed struct loaded once at startup.

use crate::error::{L402Error, Result};

/// Top-level configuration for either the server or client demo binaries. Values are
/// read from the process environment (optionally populated from a `.env` file via
/// [`Config::load`]).
#[derive(Debug, Clone)]
pub struct Config {
    /// Macaroon location embedded in minted challenges, e.g. the service hostname.
    pub location: String,

    /// `sqlite:...` connection string for the root-key and credential stores.
    pub database_url: String,

    /// LND node gRPC address, e.g. `https://127.0.0.1:10009`.
    pub lnd_address: Option<String>,
    /// Path to the LND admin macaroon used to authenticate gRPC calls.
    pub lnd_macaroon_file: Option<String>,
    /// Path to the LND TLS certificate.
    pub lnd_cert_file: Option<String>,

    /// API key for an Alby-style HTTP Lightning wallet, used when LND is not
    /// configured.
    pub alby_api_key: Option<String>,
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

impl Config {
    /// Load configuration from the process environment, first merging in a `.env`
    /// file if one is present (missing `.env` is not an error).
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let location = std::env::var("L402_LOCATION")
            .map_err(|_| L402Error::StorageError("L402_LOCATION is not set".into()))?;

        Ok(Self {
            location,
            database_url: std::env::var("L402_DATABASE_URL")
                .unwrap_or_else(|_| default_database_url()),
            lnd_address: std::env::var("LND_ADDRESS").ok(),
            lnd_macaroon_file: std::env::var("LND_MACAROON_FILE").ok(),
            lnd_cert_file: std::env::var("LND_CERT_FILE").ok(),
            alby_api_key: std::env::var("ALBY_API_KEY").ok(),
        })
    }
}
