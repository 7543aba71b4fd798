//! Demo CLI client: fetches a URL, transparently paying any L402 challenge along the
//! way, and prints the response body. Replaces the teacher's absent client harness
//! with the `clap`-driven CLI the rest of the pack (e.g. `r402`) ships.

use std::sync::Arc;

use clap::Parser;
use l402::config::Config;
use l402::credentials::{InMemoryCredentialsStore, SharedCredentialsStore};
use l402::providers::alby::AlbyClient;
use l402::Client;
use reqwest::Method;

#[derive(Parser)]
#[command(name = "l402-client", about = "Fetch a URL, paying any L402 challenge")]
struct Args {
    /// URL to GET.
    url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::load()?;

    let api_key = config
        .alby_api_key
        .clone()
        .expect("ALBY_API_KEY must be configured for the demo client");
    let preimage_provider = Box::new(AlbyClient::new(api_key));
    let credentials_service: SharedCredentialsStore = Arc::new(InMemoryCredentialsStore::new());

    let client = Client::new(preimage_provider, credentials_service);

    let response = client
        .request(Method::GET, &args.url, |builder| builder)
        .await?;

    let status = response.status();
    let body = response.text().await?;
    println!("{status}\n{body}");

    Ok(())
}
