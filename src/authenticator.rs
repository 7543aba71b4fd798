//! The Authenticator (§4.6): mints L402 challenges binding a fresh invoice's payment
//! hash into a fresh macaroon, and validates submitted credentials by reversing that
//! binding. The Authenticator never retries; it is a pure minter and validator.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use macaroon::{ByteString, Format, Macaroon, MacaroonKey, Verifier};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{L402Error, Result};
use crate::header;
use crate::identifier::MacaroonIdentifier;
use crate::invoice_provider::InvoiceProvider;
use crate::macaroon_store::SharedMacaroonStore;

/// Core minting/validation logic. `location` is embedded in every macaroon this
/// instance mints (e.g. the service's own hostname).
pub struct Authenticator {
    location: String,
    invoice_provider: Box<dyn InvoiceProvider>,
    macaroon_store: SharedMacaroonStore,
}

impl Authenticator {
    pub fn new(
        location: impl Into<String>,
        invoice_provider: Box<dyn InvoiceProvider>,
        macaroon_store: SharedMacaroonStore,
    ) -> Self {
        Self {
            location: location.into(),
            invoice_provider,
            macaroon_store,
        }
    }

    /// §4.6.1: mint a fresh challenge, returning `(macaroon_base64, payment_request)`.
    pub async fn new_challenge(
        &self,
        amount: i64,
        currency: &str,
        description: &str,
    ) -> Result<(String, String)> {
        let invoice = self
            .invoice_provider
            .create_invoice(amount, currency, &format!("L402 Challenge: {description}"))
            .await
            .map_err(|e| L402Error::InvoiceProviderError(e.to_string()))?;

        let payment_hash: [u8; 32] = hex::decode(&invoice.payment_hash)?
            .try_into()
            .map_err(|_| {
                L402Error::InvoiceProviderError("payment hash is not 32 bytes".into())
            })?;

        let mut token_id = [0u8; 32];
        let mut root_key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut token_id);
        rand::thread_rng().fill_bytes(&mut root_key);

        let identifier = MacaroonIdentifier::new(payment_hash, token_id);

        let key = MacaroonKey::generate(&root_key);
        let mac = Macaroon::create(
            Some(self.location.clone()),
            &key,
            ByteString::from(identifier.encode().to_vec()),
        )
        .map_err(|e| L402Error::StorageError(format!("macaroon creation failed: {e:?}")))?;

        let serialized = mac
            .serialize(Format::V2)
            .map_err(|e| L402Error::StorageError(format!("macaroon serialization failed: {e:?}")))?;
        let macaroon_b64 = STANDARD.encode(serialized);

        // Must persist before returning: a macaroon handed to a client whose root key
        // is not yet durable cannot later be verified.
        self.macaroon_store
            .insert_root_key(token_id, root_key, &macaroon_b64)
            .await?;

        Ok((macaroon_b64, invoice.payment_request))
    }

    /// §4.6.2: validate a full `Authorization: L402 ...` header value.
    pub async fn validate_l402_header(&self, header_value: &str) -> Result<()> {
        let parsed = header::parse_credential(header_value)?;

        let macaroon_bytes = STANDARD.decode(&parsed.macaroon)?;
        let mac = Macaroon::deserialize(&macaroon_bytes)
            .map_err(|e| L402Error::InvalidMacaroon(format!("deserialize failed: {e:?}")))?;

        let identifier = MacaroonIdentifier::decode(mac.identifier().0.as_slice())?;

        let preimage_bytes = hex::decode(&parsed.preimage)?;
        let computed_hash = Sha256::digest(&preimage_bytes);
        if computed_hash.as_slice() != identifier.payment_hash {
            return Err(L402Error::InvalidPreimage);
        }

        // Missing token and invalid root key must map to the same error, so the
        // presenter can't distinguish "unknown token" from "tampered signature."
        let root_key = self
            .macaroon_store
            .get_root_key(identifier.token_id)
            .await?
            .ok_or_else(|| L402Error::InvalidMacaroon("unknown token_id".into()))?;

        let key = MacaroonKey::generate(&root_key);
        let mut verifier = Verifier::default();
        verifier
            .verify(&mac, &key, Default::default())
            .map_err(|e| L402Error::InvalidMacaroon(format!("signature check failed: {e:?}")))?;

        self.validate_caveats(&mac)?;

        Ok(())
    }

    /// v0 accepts only an empty caveat set. This is the hook future caveat
    /// predicates (§9 Open Questions) would plug into.
    fn validate_caveats(&self, mac: &Macaroon) -> Result<()> {
        if !mac.first_party_caveats().is_empty() {
            return Err(L402Error::InvalidMacaroon(
                "v0 does not support caveats".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice_provider::Invoice;
    use crate::macaroon_store::InMemoryMacaroonStore;
    use async_trait::async_trait;
    use sha2::{Digest, Sha256};
    use std::sync::Arc;

    struct FixedInvoiceProvider {
        payment_hash: String,
        payment_request: String,
    }

    #[async_trait]
    impl InvoiceProvider for FixedInvoiceProvider {
        async fn create_invoice(
            &self,
            _amount: i64,
            _currency: &str,
            _description: &str,
        ) -> Result<Invoice> {
            Ok(Invoice {
                payment_request: self.payment_request.clone(),
                payment_hash: self.payment_hash.clone(),
            })
        }
    }

    fn authenticator_with(payment_hash: [u8; 32]) -> Authenticator {
        let provider = FixedInvoiceProvider {
            payment_hash: hex::encode(payment_hash),
            payment_request: "lnbc1u1p...".to_string(),
        };
        Authenticator::new(
            "example.com",
            Box::new(provider),
            Arc::new(InMemoryMacaroonStore::new()),
        )
    }

    #[tokio::test]
    async fn happy_path_mint_and_validate() {
        let preimage = [0x42u8; 32];
        let payment_hash: [u8; 32] = Sha256::digest(preimage).into();

        let auth = authenticator_with(payment_hash);
        let (macaroon_b64, _invoice) = auth
            .new_challenge(100, "USD", "Download")
            .await
            .unwrap();

        let header = header::format_credential(&macaroon_b64, &hex::encode(preimage));
        auth.validate_l402_header(&header).await.unwrap();
    }

    #[tokio::test]
    async fn tampered_preimage_is_rejected() {
        let preimage = [0x42u8; 32];
        let payment_hash: [u8; 32] = Sha256::digest(preimage).into();

        let auth = authenticator_with(payment_hash);
        let (macaroon_b64, _invoice) = auth
            .new_challenge(100, "USD", "Download")
            .await
            .unwrap();

        let wrong_preimage = [0x11u8; 32];
        let header = header::format_credential(&macaroon_b64, &hex::encode(wrong_preimage));
        let err = auth.validate_l402_header(&header).await.unwrap_err();
        assert!(matches!(err, L402Error::InvalidPreimage));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let preimage = [0x42u8; 32];
        let payment_hash: [u8; 32] = Sha256::digest(preimage).into();

        // Two independent authenticators, each with their own root-key store: a
        // macaroon minted by one is unknown to the other.
        let minter = authenticator_with(payment_hash);
        let verifier = authenticator_with(payment_hash);

        let (macaroon_b64, _invoice) = minter
            .new_challenge(100, "USD", "Download")
            .await
            .unwrap();

        let header = header::format_credential(&macaroon_b64, &hex::encode(preimage));
        let err = verifier.validate_l402_header(&header).await.unwrap_err();
        assert!(matches!(err, L402Error::InvalidMacaroon(_)));
    }
}
