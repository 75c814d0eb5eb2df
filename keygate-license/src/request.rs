//! Outbound request construction.
//!
//! canonical parameters → 3DES → base64 (single line) → signature over that
//! exact text → percent-encoding for the form body.

use crate::error::{LicenseError, LicenseResult};
use crate::params::RequestParams;
use keygate_crypto::{PayloadCipher, SignTemplate};
use tracing::debug;

/// Value of the `json` marker field.
pub const ENVELOPE_MARKER: &str = "ok";

/// The transport-ready request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// Always `ok`.
    pub marker: String,
    /// Signature over the unencoded ciphertext.
    pub signature: String,
    /// Percent-encoded ciphertext.
    pub payload: String,
}

impl EncryptedEnvelope {
    /// Renders the `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn to_form_body(&self) -> String {
        format!(
            "json={}&sgin={}&parameter={}",
            self.marker, self.signature, self.payload
        )
    }
}

/// Percent-encodes base64 ciphertext for a form body.
///
/// A literal `+` would be decoded as a space by the server's form parser,
/// so every `+` becomes `%2B`; `/` and `=` are escaped as well.
#[must_use]
pub fn encode_payload(ciphertext: &str) -> String {
    urlencoding::encode(ciphertext).into_owned()
}

/// Encrypts and signs request parameters.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    cipher: PayloadCipher,
    signer: SignTemplate,
}

impl RequestBuilder {
    /// Creates a builder from the payload cipher and the input template.
    pub fn new(cipher: PayloadCipher, signer: SignTemplate) -> Self {
        Self { cipher, signer }
    }

    /// Builds the envelope for `params`. Performs no I/O.
    pub fn build(&self, params: &RequestParams) -> LicenseResult<EncryptedEnvelope> {
        let canonical = params.canonical();
        let ciphertext = self
            .cipher
            .encrypt(&canonical)
            .map_err(LicenseError::encryption)?;
        let signature = self.signer.sign(&ciphertext);
        let payload = encode_payload(&ciphertext);

        debug!(
            api = params.api().unwrap_or_default(),
            ciphertext_len = ciphertext.len(),
            encoded_len = payload.len(),
            "Built encrypted request"
        );

        Ok(EncryptedEnvelope {
            marker: ENVELOPE_MARKER.to_string(),
            signature,
            payload,
        })
    }
}
