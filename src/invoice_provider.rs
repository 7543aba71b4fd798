//! The invoice provider seam: anything that can mint a Lightning invoice and hand back
//! its payment hash. Concrete backends live in [`crate::providers`].

use async_trait::async_trait;

use crate::error::Result;

/// A freshly created Lightning invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub payment_request: String,
    /// Hex-encoded 32-byte payment hash committed to by `payment_request`.
    pub payment_hash: String,
}

/// Mints Lightning invoices on behalf of the Authenticator. Implementations must be
/// safe to call concurrently; the Authenticator does not serialize calls to this trait.
#[async_trait]
pub trait InvoiceProvider: Send + Sync {
    async fn create_invoice(
        &self,
        amount: i64,
        currency: &str,
        description: &str,
    ) -> Result<Invoice>;
}
