//! The client-side credential and its store (§4.5): a keyed mapping from `location`
//! to the most-recently-stored [`Credential`] for that location.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::header;

/// A client-side L402 credential: the macaroon/invoice pair obtained from a 402
/// challenge, plus the preimage once payment settles. `preimage` is `None` until
/// [`Credential::pay`](Credential::with_preimage) is applied; after that the value is
/// immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub macaroon: String,
    pub invoice: String,
    pub preimage: Option<String>,
    pub location: String,
}

impl Credential {
    /// Build a credential from a parsed challenge, scoped to `location`.
    pub fn from_challenge(challenge: header::Challenge, location: impl Into<String>) -> Self {
        Self {
            macaroon: challenge.macaroon,
            invoice: challenge.invoice,
            preimage: None,
            location: location.into(),
        }
    }

    /// Set the preimage, settling the credential. Consumes `self` because a
    /// credential is meant to be mutated exactly once, at settlement.
    #[must_use]
    pub fn with_preimage(mut self, preimage: impl Into<String>) -> Self {
        self.preimage = Some(preimage.into());
        self
    }

    /// Format the `Authorization` header value for this credential. Panics-free even
    /// if unpaid: callers should not attach an unpaid credential, but this simply
    /// renders an empty preimage rather than fail, mirroring the wire format.
    pub fn to_auth_header(&self) -> String {
        header::format_credential(&self.macaroon, self.preimage.as_deref().unwrap_or(""))
    }
}

/// A stored credential row, carrying the `created_at` timestamp used for
/// most-recent-wins lookups (§3 CredentialRecord).
#[derive(Debug, Clone)]
struct CredentialRecord {
    credential: Credential,
    created_at: DateTime<Utc>,
}

#[async_trait]
pub trait CredentialsStore: Send + Sync {
    /// Append `credential` keyed by `credential.location`. Does not overwrite or
    /// delete any prior credential for the same location.
    async fn store(&self, credential: Credential) -> Result<()>;

    /// Return the credential with the greatest `created_at` for `location`, or `None`.
    async fn get(&self, location: &str) -> Result<Option<Credential>>;
}

/// In-memory `CredentialsStore`. Append-only, most-recent-wins on lookup, matching
/// the SQL implementation's semantics exactly (see SPEC_FULL.md §C for why this
/// departs from the simpler overwrite-on-insert behavior of the original source).
#[derive(Default)]
pub struct InMemoryCredentialsStore {
    records: RwLock<HashMap<String, Vec<CredentialRecord>>>,
}

impl InMemoryCredentialsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialsStore for InMemoryCredentialsStore {
    async fn store(&self, credential: Credential) -> Result<()> {
        let mut records = self.records.write().await;
        records
            .entry(credential.location.clone())
            .or_default()
            .push(CredentialRecord {
                credential,
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn get(&self, location: &str) -> Result<Option<Credential>> {
        let records = self.records.read().await;
        let latest = records
            .get(location)
            .and_then(|rows| rows.iter().max_by_key(|row| row.created_at));
        Ok(latest.map(|row| row.credential.clone()))
    }
}

/// SQL-backed `CredentialsStore`, matching the reference schema in §6:
/// `credentials(id, location, macaroon, preimage, invoice, created_at)` with an index
/// on `location`. `get` is `SELECT ... WHERE location=? ORDER BY created_at DESC LIMIT 1`.
pub struct SqlCredentialsStore {
    pool: SqlitePool,
}

impl SqlCredentialsStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL,
                macaroon TEXT NOT NULL,
                preimage TEXT,
                invoice TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS credentials_location_index ON credentials (location)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CredentialsStore for SqlCredentialsStore {
    async fn store(&self, credential: Credential) -> Result<()> {
        sqlx::query(
            "INSERT INTO credentials (location, macaroon, preimage, invoice, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&credential.location)
        .bind(&credential.macaroon)
        .bind(&credential.preimage)
        .bind(&credential.invoice)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, location: &str) -> Result<Option<Credential>> {
        let row = sqlx::query(
            "SELECT macaroon, preimage, invoice FROM credentials \
             WHERE location = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(location)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Credential {
            macaroon: row.try_get("macaroon")?,
            preimage: row.try_get("preimage")?,
            invoice: row.try_get("invoice")?,
            location: location.to_string(),
        }))
    }
}

pub type SharedCredentialsStore = Arc<dyn CredentialsStore>;
