//! The 66-byte binary macaroon identifier: `{version: u16}{payment_hash: [u8;32]}{token_id: [u8;32]}`,
//! big-endian, currently fixed at version 0.

use crate::error::{L402Error, Result};

pub const IDENTIFIER_LEN: usize = 66;
pub const SUPPORTED_VERSION: u16 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacaroonIdentifier {
    pub version: u16,
    pub payment_hash: [u8; 32],
    pub token_id: [u8; 32],
}

impl MacaroonIdentifier {
    pub fn new(payment_hash: [u8; 32], token_id: [u8; 32]) -> Self {
        Self {
            version: SUPPORTED_VERSION,
            payment_hash,
            token_id,
        }
    }

    pub fn encode(&self) -> [u8; IDENTIFIER_LEN] {
        let mut out = [0u8; IDENTIFIER_LEN];
        out[0..2].copy_from_slice(&self.version.to_be_bytes());
        out[2..34].copy_from_slice(&self.payment_hash);
        out[34..66].copy_from_slice(&self.token_id);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != IDENTIFIER_LEN {
            return Err(L402Error::MalformedChallenge(format!(
                "macaroon identifier must be {IDENTIFIER_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let version = u16::from_be_bytes([bytes[0], bytes[1]]);
        if version != SUPPORTED_VERSION {
            return Err(L402Error::UnsupportedVersion(version));
        }

        let mut payment_hash = [0u8; 32];
        payment_hash.copy_from_slice(&bytes[2..34]);

        let mut token_id = [0u8; 32];
        token_id.copy_from_slice(&bytes[34..66]);

        Ok(Self {
            version,
            payment_hash,
            token_id,
        })
    }
}
