//! Content hashes recorded in sync metadata.
//!
//! The metadata keeps a hash of the encoded text next to each entity's
//! `updatedAt`, so a record can be checked against what is on the remote
//! without trusting timestamps alone.

use sha2::{Digest, Sha256};

/// SHA-256 of encoded entity text, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash(String);

impl ContentHash {
    /// Compute hash from content.
    pub fn from_content(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
