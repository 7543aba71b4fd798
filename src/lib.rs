//! `l402`: server and client implementation of the L402 HTTP payment-authentication
//! protocol — macaroon challenges settled over the Lightning Network.
//!
//! The protocol in one line: a server gates a resource behind a 402 challenge binding
//! a Lightning invoice's payment hash into a macaroon; a client pays the invoice,
//! reveals the preimage, and replays the request with `Authorization: L402
//! <macaroon>:<preimage>`.
//!
//! - [`header`] — the wire codec for both header forms and the binary identifier.
//! - [`authenticator`] — mints challenges and validates submitted credentials.
//! - [`client`] — the request engine that pays 402s and retries once.
//! - [`macaroon_store`] / [`credentials`] — the two persistent stores.
//! - [`invoice_provider`] / [`preimage_provider`] — the Lightning provider seams.
//! - [`providers`] — concrete provider implementations (LND, Alby).
//! - [`adapters`] — framework glue (Rocket).

pub mod adapters;
pub mod authenticator;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod header;
pub mod identifier;
pub mod invoice_provider;
pub mod macaroon_store;
pub mod preimage_provider;
pub mod providers;

pub use authenticator::Authenticator;
pub use client::Client;
pub use credentials::{Credential, CredentialsStore};
pub use error::{L402Error, Result};
pub use macaroon_store::MacaroonStore;
