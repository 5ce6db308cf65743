//! Content digests
//!
//! Operator-facing checksums for resolved content, computed over the full
//! byte stream and rendered as lowercase hex.

use sha2::{Digest, Sha256, Sha512};
use std::fmt::{self, Display, Formatter};

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Compute the hex-encoded digest of `data`
    #[must_use]
    pub fn hex_digest(&self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }

    /// Conventional checksum-file extension for this algorithm
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("SHA-256"),
            Self::Sha512 => f.write_str("SHA-512"),
        }
    }
}
