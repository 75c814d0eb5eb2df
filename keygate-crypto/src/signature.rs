//! Template signatures ("sgin") binding payloads to a shared secret.
//!
//! A template is a secret string containing the marker `[KEY]`, for example
//! `578[KEY]349`. Signing substitutes the material for every marker and
//! returns the lowercase hex MD5 of the result.

use crate::error::{CryptoError, CryptoResult};
use md5::{Digest, Md5};
use subtle::ConstantTimeEq;

/// Marker replaced by the signed material.
pub const PLACEHOLDER: &str = "[KEY]";

/// Length of a hex-encoded signature.
pub const SIGNATURE_LEN: usize = 32;

/// Returns the lowercase hex MD5 digest of `input`.
#[must_use]
pub fn md5_hex(input: &[u8]) -> String {
    hex::encode(Md5::digest(input))
}

/// A secret signing template.
#[derive(Clone)]
pub struct SignTemplate {
    template: String,
}

impl SignTemplate {
    /// Creates a template, rejecting one without a `[KEY]` marker.
    pub fn new(template: impl Into<String>) -> CryptoResult<Self> {
        let template = template.into();
        if !template.contains(PLACEHOLDER) {
            return Err(CryptoError::MissingPlaceholder {
                marker: PLACEHOLDER,
            });
        }
        Ok(Self { template })
    }

    /// Signs `material`.
    #[must_use]
    pub fn sign(&self, material: &str) -> String {
        md5_hex(self.template.replace(PLACEHOLDER, material).as_bytes())
    }

    /// Signs the concatenation of `parts`, in order.
    #[must_use]
    pub fn sign_parts(&self, parts: &[&str]) -> String {
        self.sign(&parts.concat())
    }

    /// Checks `received` against the signature of `material` in constant time.
    #[must_use]
    pub fn verify(&self, material: &str, received: &str) -> bool {
        let expected = self.sign(material);
        expected.len() == received.len()
            && bool::from(expected.as_bytes().ct_eq(received.as_bytes()))
    }
}

impl std::fmt::Debug for SignTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignTemplate")
            .field("template", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_known_answers() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn sign_is_md5_of_substituted_template() {
        let t = SignTemplate::new("pre[KEY]post").unwrap();
        assert_eq!(t.sign("abc"), md5_hex(b"preabcpost"));
        assert_eq!(t.sign("abc").len(), SIGNATURE_LEN);
    }

    #[test]
    fn every_marker_is_substituted() {
        let t = SignTemplate::new("[KEY]-[KEY]").unwrap();
        assert_eq!(t.sign("x"), md5_hex(b"x-x"));
    }

    #[test]
    fn template_without_marker_rejected() {
        assert!(matches!(
            SignTemplate::new("no marker"),
            Err(CryptoError::MissingPlaceholder { .. })
        ));
    }
}
