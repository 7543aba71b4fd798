//! The preimage provider seam: anything that can settle (or prove settlement of) a
//! Lightning invoice and hand back the resulting preimage.

use async_trait::async_trait;

use crate::error::Result;

/// Pays (or confirms payment of) Lightning invoices on behalf of the client engine.
/// No retry is performed inside implementations of this trait; the client engine
/// decides whether and when to retry.
#[async_trait]
pub trait PreimageProvider: Send + Sync {
    /// Pay `invoice` and return the hex-encoded 32-byte preimage.
    async fn get_preimage(&self, invoice: &str) -> Result<String>;
}
