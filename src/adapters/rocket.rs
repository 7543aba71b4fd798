//! A Rocket `Fairing` gating routes behind L402 (§4.8), generalizing the teacher's
//! `LsatMiddleware`: read `Authorization`, forward on success, and on any validation
//! failure ask the [`Authenticator`] for a fresh challenge (priced by a caller-supplied
//! function) and turn the response into a 402 carrying `WWW-Authenticate`.

use std::sync::Arc;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Data, Request, Response};
use tracing::{debug, warn};

use crate::authenticator::Authenticator;
use crate::header;

/// Per-request pricing: given the incoming request, return `(amount, currency,
/// description)` to mint a challenge with. Kept as a trait object rather than a bare
/// closure type so callers can capture route-specific state.
pub type PriceFn = Arc<dyn Fn(&Request<'_>) -> (i64, String, String) + Send + Sync>;

/// Cached per-request outcome, read back in `on_response` since `on_request` cannot
/// itself write the outgoing response.
#[derive(Clone)]
enum Outcome {
    Authorized,
    Challenge { amount: i64, currency: String, description: String },
}

/// Gates every route it's attached to behind a paid L402 credential. Attach with
/// `rocket::build().attach(L402Fairing::new(authenticator, price_fn))`.
pub struct L402Fairing {
    authenticator: Arc<Authenticator>,
    price_fn: PriceFn,
}

impl L402Fairing {
    pub fn new(authenticator: Arc<Authenticator>, price_fn: PriceFn) -> Self {
        Self {
            authenticator,
            price_fn,
        }
    }
}

#[rocket::async_trait]
impl Fairing for L402Fairing {
    fn info(&self) -> Info {
        Info {
            name: "L402",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let outcome = match request.headers().get_one(header::CREDENTIAL_HEADER_NAME) {
            Some(value) => match self.authenticator.validate_l402_header(value).await {
                Ok(()) => Outcome::Authorized,
                Err(error) => {
                    debug!(%error, "L402 credential rejected, issuing fresh challenge");
                    let (amount, currency, description) = (self.price_fn)(request);
                    Outcome::Challenge { amount, currency, description }
                }
            },
            None => {
                let (amount, currency, description) = (self.price_fn)(request);
                Outcome::Challenge { amount, currency, description }
            }
        };

        request.local_cache(|| outcome);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let outcome = request.local_cache(|| Outcome::Authorized);
        let (amount, currency, description) = match outcome {
            Outcome::Authorized => return,
            Outcome::Challenge { amount, currency, description } => {
                (*amount, currency.clone(), description.clone())
            }
        };

        match self
            .authenticator
            .new_challenge(amount, &currency, &description)
            .await
        {
            Ok((macaroon, invoice)) => {
                response.set_status(rocket::http::Status::PaymentRequired);
                response.set_header(Header::new(
                    header::CHALLENGE_HEADER_NAME,
                    header::format_challenge(&macaroon, &invoice),
                ));
            }
            Err(error) => {
                // Any exception from `new_challenge` becomes a 500 (§4.8).
                warn!(%error, "failed to mint L402 challenge");
                response.set_status(rocket::http::Status::InternalServerError);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice_provider::{Invoice, InvoiceProvider};
    use crate::macaroon_store::InMemoryMacaroonStore;
    use async_trait::async_trait;
    use rocket::http::Status;
    use sha2::{Digest, Sha256};

    struct FixedInvoiceProvider {
        payment_hash: String,
    }

    #[async_trait]
    impl InvoiceProvider for FixedInvoiceProvider {
        async fn create_invoice(
            &self,
            _amount: i64,
            _currency: &str,
            _description: &str,
        ) -> crate::error::Result<Invoice> {
            Ok(Invoice {
                payment_request: "lnbc1u1p...".to_string(),
                payment_hash: self.payment_hash.clone(),
            })
        }
    }

    #[rocket::get("/protected")]
    fn protected() -> &'static str {
        "paid content"
    }

    fn rocket_with_authenticator(payment_hash: [u8; 32]) -> rocket::Rocket<rocket::Build> {
        let authenticator = Arc::new(Authenticator::new(
            "example.com",
            Box::new(FixedInvoiceProvider {
                payment_hash: hex::encode(payment_hash),
            }),
            Arc::new(InMemoryMacaroonStore::new()),
        ));
        let price_fn: PriceFn = Arc::new(|_req| (100, "USD".to_string(), "demo".to_string()));

        rocket::build()
            .attach(L402Fairing::new(authenticator, price_fn))
            .mount("/", rocket::routes![protected])
    }

    #[tokio::test]
    async fn unauthenticated_request_gets_402_with_challenge() {
        let rocket = rocket_with_authenticator([0x11; 32]);
        let client = rocket::local::asynchronous::Client::tracked(rocket)
            .await
            .unwrap();

        let response = client.get("/protected").dispatch().await;
        assert_eq!(response.status(), Status::PaymentRequired);
        let challenge = response
            .headers()
            .get_one(header::CHALLENGE_HEADER_NAME)
            .unwrap();
        assert!(header::parse_challenge(challenge).is_ok());
    }

    #[tokio::test]
    async fn valid_credential_reaches_the_route() {
        let preimage = [0x42u8; 32];
        let payment_hash: [u8; 32] = Sha256::digest(preimage).into();
        let rocket = rocket_with_authenticator(payment_hash);
        let client = rocket::local::asynchronous::Client::tracked(rocket)
            .await
            .unwrap();

        let challenge_response = client.get("/protected").dispatch().await;
        let challenge_header = challenge_response
            .headers()
            .get_one(header::CHALLENGE_HEADER_NAME)
            .unwrap();
        let challenge = header::parse_challenge(challenge_header).unwrap();

        let auth_header =
            header::format_credential(&challenge.macaroon, &hex::encode(preimage));
        let response = client
            .get("/protected")
            .header(rocket::http::Header::new(
                header::CREDENTIAL_HEADER_NAME,
                auth_header,
            ))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.unwrap(), "paid content");
    }
}
