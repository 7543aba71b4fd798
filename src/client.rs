//! The client request engine (§4.7): look up a stored credential, attach it, send,
//! and on a 402 response parse the challenge, pay it, persist the new credential and
//! resend exactly once.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::{Method, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::credentials::{Credential, SharedCredentialsStore};
use crate::error::{L402Error, Result};
use crate::header;
use crate::preimage_provider::PreimageProvider;

/// Bounded timeout applied to each outbound HTTP call (§5).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The L402-aware HTTP client. One in-flight request per `Client` instance is
/// serialized through `request_lock`, covering the credential-lookup -> send -> pay
/// -> store -> resend sequence (§5): without this, two concurrent requests to the
/// same URL could both observe "no credential", both pay, and race to store,
/// discarding one paid credential while the user is charged twice. Multiple `Client`
/// instances may still run concurrently against each other.
pub struct Client {
    http: reqwest::Client,
    preimage_provider: Box<dyn PreimageProvider>,
    credentials_service: SharedCredentialsStore,
    request_lock: Mutex<()>,
}

impl Client {
    pub fn new(
        preimage_provider: Box<dyn PreimageProvider>,
        credentials_service: SharedCredentialsStore,
    ) -> Self {
        Self::with_timeout(preimage_provider, credentials_service, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        preimage_provider: Box<dyn PreimageProvider>,
        credentials_service: SharedCredentialsStore,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builds with a plain timeout");

        Self {
            http,
            preimage_provider,
            credentials_service,
            request_lock: Mutex::new(()),
        }
    }

    /// §4.7.1, the canonical request algorithm.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        build: impl Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let _guard = self.request_lock.lock().await;

        let creds = self.credentials_service.get(url).await?;

        let response = self.send(method.clone(), url, &build, creds.as_ref()).await?;

        if response.status() != StatusCode::PAYMENT_REQUIRED {
            return Ok(response);
        }

        let challenge_header = response
            .headers()
            .get(header::CHALLENGE_HEADER_NAME)
            .ok_or(L402Error::MissingChallenge)?
            .to_str()
            .map_err(|e| L402Error::MalformedChallenge(e.to_string()))?;

        let challenge = header::parse_challenge(challenge_header)?;
        let mut credential = Credential::from_challenge(challenge, url);

        debug!(url, "received 402, paying invoice");
        let preimage = self
            .preimage_provider
            .get_preimage(&credential.invoice)
            .await
            .map_err(|e| L402Error::PaymentFailed(e.to_string()))?;
        if preimage.is_empty() {
            return Err(L402Error::PaymentFailed("empty preimage".into()));
        }

        credential = credential.with_preimage(preimage);

        // Persist immediately after obtaining the preimage, before resending: the
        // paid credential is valuable even if the resend below fails or is cancelled.
        self.credentials_service.store(credential.clone()).await?;

        let response = self
            .send(method, url, &build, Some(&credential))
            .await?;

        // No second payment attempt: a 402 on the retry returns straight to the
        // caller rather than looping.
        if response.status() == StatusCode::PAYMENT_REQUIRED {
            warn!(url, "server re-challenged after payment; not retrying again");
        }

        Ok(response)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        build: &impl Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
        credential: Option<&Credential>,
    ) -> Result<reqwest::Response> {
        let mut builder = self.http.request(method, url);
        builder = build(builder);
        if let Some(credential) = credential {
            builder = builder.header(header::CREDENTIAL_HEADER_NAME, credential.to_auth_header());
        }
        Ok(builder.send().await?)
    }

    /// Blocking façade over [`Client::request`], for call sites that aren't async.
    /// Per the design notes, this wraps the async engine rather than duplicating it.
    pub fn request_blocking(
        &self,
        method: Method,
        url: &str,
        build: impl Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        tokio::runtime::Handle::try_current().map_or_else(
            |_| {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(self.request(method.clone(), url, &build))
            },
            |handle| tokio::task::block_in_place(|| handle.block_on(self.request(method, url, &build))),
        )
    }
}

/// A process-wide default client, configured once by [`configure`]. This is an
/// optional convenience façade over [`Client`]; nothing in the core engine requires
/// it (§9 Design Notes).
static DEFAULT_CLIENT: OnceLock<Arc<Client>> = OnceLock::new();

/// Configure the process-wide default client. Calling this more than once has no
/// effect after the first call wins; prefer constructing a [`Client`] directly when
/// that ambiguity matters.
pub fn configure(preimage_provider: Box<dyn PreimageProvider>, credentials_service: SharedCredentialsStore) {
    let _ = DEFAULT_CLIENT.set(Arc::new(Client::new(preimage_provider, credentials_service)));
}

/// Fetch the process-wide default client configured via [`configure`].
pub fn default_client() -> Option<Arc<Client>> {
    DEFAULT_CLIENT.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialsStore, InMemoryCredentialsStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct CountingPreimageProvider {
        calls: Arc<AtomicUsize>,
        preimage: String,
    }

    #[async_trait]
    impl PreimageProvider for CountingPreimageProvider {
        async fn get_preimage(&self, _invoice: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.preimage.clone())
        }
    }

    #[test]
    fn default_client_is_none_until_configured() {
        // Each test process gets its own OnceLock state; this only asserts the shape
        // of the API, not cross-test isolation.
        let _ = default_client();
    }

    #[tokio::test]
    async fn store_and_get_round_trip_credential() {
        let store = InMemoryCredentialsStore::new();
        let provider = CountingPreimageProvider {
            calls: Arc::new(AtomicUsize::new(0)),
            preimage: "abc123".to_string(),
        };
        let preimage = provider.get_preimage("lnbc1u...").await.unwrap();
        assert_eq!(preimage, "abc123");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let credential = Credential {
            macaroon: "AGIAJE==".to_string(),
            invoice: "lnbc1u...".to_string(),
            preimage: Some(preimage),
            location: "https://example.com/res".to_string(),
        };
        store.store(credential.clone()).await.unwrap();
        let fetched = store.get("https://example.com/res").await.unwrap().unwrap();
        assert_eq!(fetched, credential);
    }

    /// Accepts one connection per entry in `responses`, writes the raw HTTP/1.1 bytes
    /// given, then closes the connection (`Connection: close` is the caller's
    /// responsibility to include, forcing reqwest to open a fresh connection for the
    /// next response rather than pooling this one).
    async fn serve_responses(listener: TcpListener, responses: Vec<String>) {
        for response in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.flush().await.unwrap();
        }
    }

    fn http_402(challenge_header: &str) -> String {
        format!(
            "HTTP/1.1 402 Payment Required\r\nWWW-Authenticate: {challenge_header}\r\nConnection: close\r\nContent-Length: 0\r\n\r\n"
        )
    }

    fn http_200() -> String {
        "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 2\r\n\r\nok".to_string()
    }

    /// The full §4.7.1 loop end to end: an unauthenticated request gets a 402, the
    /// client pays it, stores the credential and resends; a second `request()` call
    /// against the same URL reuses the stored credential and never touches the
    /// preimage provider again (§8 idempotence).
    #[tokio::test]
    async fn pays_402_once_then_reuses_stored_credential() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}/resource");

        let challenge_header =
            header::format_challenge("AGIAJEbase64MACAROON", "lnbc1u1p...");

        tokio::spawn(serve_responses(
            listener,
            vec![http_402(&challenge_header), http_200(), http_200()],
        ));

        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CountingPreimageProvider {
            calls: calls.clone(),
            preimage: "2f84e225deadbeef".to_string(),
        };
        let credentials_service: SharedCredentialsStore =
            Arc::new(InMemoryCredentialsStore::new());
        let client = Client::new(Box::new(provider), credentials_service.clone());

        let first = client.request(Method::GET, &url, |b| b).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stored = credentials_service.get(&url).await.unwrap().unwrap();
        assert_eq!(stored.preimage.as_deref(), Some("2f84e225deadbeef"));

        let second = client.request(Method::GET, &url, |b| b).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);

        // The stored credential was reused; no second payment was attempted.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
