//! Content identifier derivation.
//!
//! [`ContentHasher`] is the seam the pipeline depends on; [`Sha256Hasher`] is
//! the only production implementation. Hashing is pure: no salt, no process
//! state, so identifiers are stable across restarts and machines.

use crate::model::ContentIdentifier;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Derives a [`ContentIdentifier`] from raw bytes.
pub trait ContentHasher: Send + Sync {
    fn digest(&self, bytes: &[u8]) -> ContentIdentifier;
}

/// Textual encoding of the 32-byte digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdentifierEncoding {
    /// Standard Base64 with padding (44 characters). The historical wire
    /// format of this service. (default)
    #[default]
    Base64,
    /// Lower-case hexadecimal (64 characters).
    Hex,
}

impl IdentifierEncoding {
    pub fn encode(self, digest: &[u8]) -> String {
        match self {
            IdentifierEncoding::Base64 => STANDARD.encode(digest),
            IdentifierEncoding::Hex => hex::encode(digest),
        }
    }
}

/// SHA-256 over the whole payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher {
    encoding: IdentifierEncoding,
}

impl Sha256Hasher {
    pub fn new(encoding: IdentifierEncoding) -> Self {
        Self { encoding }
    }
}

impl ContentHasher for Sha256Hasher {
    fn digest(&self, bytes: &[u8]) -> ContentIdentifier {
        let digest = Sha256::digest(bytes);
        ContentIdentifier::new(self.encoding.encode(&digest))
    }
}
