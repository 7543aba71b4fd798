//! An HTTP-based [`InvoiceProvider`]/[`PreimageProvider`] pair backed by the Alby
//! Lightning wallet API, ported from the reference Python implementation's
//! `invoice_provider/alby_api.py` and `preimage_provider/alby_api.py`.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{L402Error, Result};
use crate::invoice_provider::{Invoice, InvoiceProvider};
use crate::preimage_provider::PreimageProvider;

const ALBY_BASE_URL: &str = "https://api.getalby.com";

pub struct AlbyClient {
    http: reqwest::Client,
    api_key: String,
}

impl AlbyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Deserialize)]
struct AlbyInvoiceResponse {
    payment_request: Option<String>,
    payment_hash: Option<String>,
}

#[async_trait]
impl InvoiceProvider for AlbyClient {
    async fn create_invoice(
        &self,
        amount: i64,
        currency: &str,
        description: &str,
    ) -> Result<Invoice> {
        let response = self
            .http
            .post(format!("{ALBY_BASE_URL}/invoices"))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "amount": amount,
                "currency": currency,
                "description": description,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(L402Error::InvoiceProviderError(format!(
                "unexpected response ({status}): {body}"
            )));
        }

        let parsed: AlbyInvoiceResponse = response.json().await?;
        let payment_request = parsed
            .payment_request
            .ok_or_else(|| L402Error::InvoiceProviderError("missing payment_request".into()))?;
        let payment_hash = parsed
            .payment_hash
            .ok_or_else(|| L402Error::InvoiceProviderError("missing payment_hash".into()))?;

        Ok(Invoice {
            payment_request,
            payment_hash,
        })
    }
}

#[derive(Deserialize)]
struct AlbyPaymentResponse {
    payment_preimage: Option<String>,
}

#[async_trait]
impl PreimageProvider for AlbyClient {
    async fn get_preimage(&self, invoice: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{ALBY_BASE_URL}/payments/bolt11"))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "invoice": invoice }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(L402Error::PaymentFailed(format!(
                "unexpected response ({status}): {body}"
            )));
        }

        let parsed: AlbyPaymentResponse = response.json().await?;
        parsed
            .payment_preimage
            .ok_or_else(|| L402Error::ProviderProtocolError("missing payment_preimage".into()))
    }
}
