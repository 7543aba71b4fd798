//! Demo Rocket server gating `/protected` behind an L402 challenge, replacing the
//! teacher's hand-wired `LsatMiddleware` demo in `main.rs` with the generalized
//! [`l402::adapters::rocket::L402Fairing`] over the real [`l402::Authenticator`].
//!
//! `L402Fairing` gates every route mounted on the rocket it's attached to, so this
//! demo mounts only `/protected` — there is no free route to accidentally gate.

#[macro_use]
extern crate rocket;

use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::serde::Serialize;

use l402::adapters::rocket::L402Fairing;
use l402::config::Config;
use l402::macaroon_store::{InMemoryMacaroonStore, MacaroonStore};
use l402::providers::alby::AlbyClient;
use l402::providers::lnd::{LndInvoiceProvider, LndOptions};
use l402::Authenticator;

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
struct ProtectedResponse {
    message: String,
}

#[get("/protected")]
fn protected() -> Json<ProtectedResponse> {
    // If this handler runs at all, the L402Fairing already validated the credential
    // on the way in; there's nothing left for the route itself to check.
    Json(ProtectedResponse {
        message: "Protected content".to_string(),
    })
}

#[launch]
async fn rocket() -> rocket::Rocket<rocket::Build> {
    tracing_subscriber::fmt::init();

    let config = Config::load().expect("invalid configuration");

    let macaroon_store: Arc<dyn MacaroonStore> = Arc::new(InMemoryMacaroonStore::new());

    let invoice_provider: Box<dyn l402::invoice_provider::InvoiceProvider> =
        match (&config.lnd_address, &config.lnd_macaroon_file, &config.lnd_cert_file) {
            (Some(address), Some(macaroon_file), Some(cert_file)) => {
                let provider = LndInvoiceProvider::connect(LndOptions {
                    address: address.clone(),
                    macaroon_file: macaroon_file.clone(),
                    cert_file: cert_file.clone(),
                })
                .await
                .expect("failed to connect to LND");
                Box::new(provider)
            }
            _ => {
                let api_key = config
                    .alby_api_key
                    .clone()
                    .expect("either LND_* or ALBY_API_KEY must be configured");
                Box::new(AlbyClient::new(api_key))
            }
        };

    let authenticator = Arc::new(Authenticator::new(
        config.location.clone(),
        invoice_provider,
        macaroon_store,
    ));

    // Flat 100-sat price for every protected route; a real deployment would key this
    // off the request path or method.
    let price_fn = Arc::new(|_request: &rocket::Request<'_>| {
        (100_i64, "USD".to_string(), "Protected content".to_string())
    });

    rocket::build()
        .attach(L402Fairing::new(authenticator, price_fn))
        .mount("/", routes![protected])
}
