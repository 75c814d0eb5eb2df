//! Key and IV handling for the 3DES payload cipher.
//!
//! The activation server derives its cipher key from the shared password by
//! taking the lowercase hex MD5 digest *as text* and handing those bytes to
//! triple-DES, which consumes the first 24 of them. Both ends must agree on
//! this byte-for-byte, so derivation lives here and callers never truncate.

use crate::error::{CryptoError, CryptoResult};
use crate::signature::md5_hex;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a 3DES-EDE3 key in bytes.
pub const KEY_SIZE: usize = 24;

/// Size of the CBC initialization vector in bytes (one DES block).
pub const IV_SIZE: usize = 8;

/// IV used by stock BSPHP deployments.
pub const DEFAULT_IV: &str = "bsphp666";

/// A triple-DES key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey {
    bytes: [u8; KEY_SIZE],
}

impl CipherKey {
    /// Derives the cipher key from the shared encryption password.
    #[must_use]
    pub fn derive(password: &str) -> Self {
        let digest = md5_hex(password.as_bytes());
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&digest.as_bytes()[..KEY_SIZE]);
        Self { bytes }
    }

    /// Creates a key from a slice, which must be exactly [`KEY_SIZE`] long.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self { bytes })
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The fixed CBC initialization vector shared with the server.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CipherIv {
    bytes: [u8; IV_SIZE],
}

impl CipherIv {
    /// Creates an IV from its text form, which must be exactly 8 bytes of UTF-8.
    pub fn from_text(iv: &str) -> CryptoResult<Self> {
        let bytes: [u8; IV_SIZE] =
            iv.as_bytes()
                .try_into()
                .map_err(|_| CryptoError::InvalidIvLength {
                    expected: IV_SIZE,
                    actual: iv.len(),
                })?;
        Ok(Self { bytes })
    }

    /// Returns the IV bytes.
    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.bytes
    }
}

impl Default for CipherIv {
    fn default() -> Self {
        let mut bytes = [0u8; IV_SIZE];
        bytes.copy_from_slice(DEFAULT_IV.as_bytes());
        Self { bytes }
    }
}

impl std::fmt::Debug for CipherIv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherIv")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
