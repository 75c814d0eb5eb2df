//! Payload encryption using 3DES-EDE3 in CBC mode with PKCS#7 padding.
//!
//! Ciphertext travels as standard-alphabet base64 with no line breaks. The
//! outbound signature is computed over that exact text, so any encoder that
//! wraps lines must be normalized with [`strip_line_breaks`] first.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{CipherIv, CipherKey};
use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD},
        DecodePaddingMode,
    },
    Engine,
};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

/// Size of a DES block in bytes.
pub const BLOCK_SIZE: usize = 8;

type TdesCbcEnc = cbc::Encryptor<des::TdesEde3>;
type TdesCbcDec = cbc::Decryptor<des::TdesEde3>;

/// Decoder that accepts missing padding and stray trailing bits.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Encrypts raw bytes, returning raw ciphertext.
pub fn encrypt(key: &CipherKey, iv: &CipherIv, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = TdesCbcEnc::new_from_slices(key.as_bytes(), iv.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypts raw ciphertext.
///
/// Fails when the length is not a whole number of blocks or the padding is
/// invalid, which is what a wrong key or IV almost always produces.
pub fn decrypt(key: &CipherKey, iv: &CipherIv, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::Decryption(format!(
            "ciphertext length {} is not a positive multiple of {BLOCK_SIZE}",
            ciphertext.len()
        )));
    }
    let cipher = TdesCbcDec::new_from_slices(key.as_bytes(), iv.as_bytes())
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Decryption("invalid padding (wrong key or IV?)".to_string()))
}

/// Removes every `\r` and `\n` and trims surrounding whitespace.
#[must_use]
pub fn strip_line_breaks(encoded: &str) -> String {
    encoded
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Decodes base64, ignoring any character outside the standard alphabet.
pub fn decode_base64_lenient(encoded: &str) -> CryptoResult<Vec<u8>> {
    let filtered: String = encoded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/'))
        .collect();
    LENIENT_BASE64
        .decode(filtered)
        .map_err(|e| CryptoError::Decryption(format!("invalid base64: {e}")))
}

/// Password-keyed payload cipher shared by request encryption and response
/// decryption.
#[derive(Clone, Debug)]
pub struct PayloadCipher {
    key: CipherKey,
    iv: CipherIv,
}

impl PayloadCipher {
    /// Builds a cipher from the shared password and the IV text.
    pub fn new(password: &str, iv: &str) -> CryptoResult<Self> {
        Ok(Self {
            key: CipherKey::derive(password),
            iv: CipherIv::from_text(iv)?,
        })
    }

    /// Encrypts text and returns single-line base64.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        let ciphertext = encrypt(&self.key, &self.iv, plaintext.as_bytes())?;
        Ok(strip_line_breaks(&STANDARD.encode(ciphertext)))
    }

    /// Decrypts base64 text into raw plaintext bytes.
    pub fn decrypt(&self, encoded: &str) -> CryptoResult<Vec<u8>> {
        let ciphertext = decode_base64_lenient(encoded)?;
        decrypt(&self.key, &self.iv, &ciphertext)
    }

    /// Decrypts base64 text that must hold UTF-8 plaintext.
    pub fn decrypt_string(&self, encoded: &str) -> CryptoResult<String> {
        let plaintext = self.decrypt(encoded)?;
        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Decryption(format!("invalid UTF-8: {e}")))
    }
}
