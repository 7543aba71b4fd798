//! Concrete [`InvoiceProvider`](crate::invoice_provider::InvoiceProvider) and
//! [`PreimageProvider`](crate::preimage_provider::PreimageProvider) implementations.
//! Both are external collaborators per the design (§1): any backend satisfying the
//! trait works, these two are simply the ones this crate ships.

pub mod alby;
pub mod lnd;
