// Path: crates/client/src/signer.rs
//! Ed25519 signing identity loaded from a local key file.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use observer_api::publish::ReportSigner;
use observer_types::error::ObserverError;
use observer_types::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Signs with an in-memory Ed25519 key.
///
/// The address is the unpadded base64url SHA-256 of the public key.
pub struct Ed25519ReportSigner {
    key: SigningKey,
    address: String,
}

impl Ed25519ReportSigner {
    /// Builds a signer from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let key = SigningKey::from_bytes(&seed);
        let address = URL_SAFE_NO_PAD.encode(Sha256::digest(key.verifying_key().as_bytes()));
        Self { key, address }
    }

    /// Reads a hex-encoded seed from `path`. Surrounding whitespace is
    /// ignored.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ObserverError::Config(format!("reading key file {}: {e}", path.display()))
        })?;
        let bytes = hex::decode(contents.trim())
            .map_err(|e| ObserverError::Config(format!("key file {} is not hex: {e}", path.display())))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            ObserverError::Config(format!(
                "key file {} holds {} bytes, expected 32",
                path.display(),
                b.len()
            ))
        })?;
        Ok(Self::from_seed(seed))
    }
}

#[async_trait]
impl ReportSigner for Ed25519ReportSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn public_key(&self) -> Vec<u8> {
        self.key.verifying_key().to_bytes().to_vec()
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}
