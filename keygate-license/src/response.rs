//! Inbound response verification.
//!
//! A response is trusted only if it decrypts, parses, carries a signature
//! matching `data + date + unix + microtime + appsafecode` under the output
//! template, and (when one was sent) echoes the request's anti-hijack code.

use crate::error::{LicenseError, LicenseResult};
use keygate_crypto::{PayloadCipher, SignTemplate};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

/// The `response` object of a decrypted server reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    #[serde(default, deserialize_with = "lenient_string")]
    pub data: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unix: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub microtime: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub appsafecode: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sgin: String,
}

impl ServerEnvelope {
    /// The signed material, in the server's fixed field order.
    #[must_use]
    pub fn signature_material(&self) -> String {
        [
            self.data.as_str(),
            &self.date,
            &self.unix,
            &self.microtime,
            &self.appsafecode,
        ]
        .concat()
    }
}

#[derive(Deserialize)]
struct ResponseDocument {
    response: ServerEnvelope,
}

/// Accepts strings and numbers; null or anything else becomes empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// The trusted fields of a verified response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedResponse {
    /// API-specific payload.
    pub data: String,
    /// Server date string.
    pub date: String,
    /// Server Unix time.
    pub unix: String,
    /// Server microtime.
    pub microtime: String,
    /// Echoed anti-hijack code.
    pub appsafecode: String,
}

impl From<ServerEnvelope> for VerifiedResponse {
    fn from(env: ServerEnvelope) -> Self {
        Self {
            data: env.data,
            date: env.date,
            unix: env.unix,
            microtime: env.microtime,
            appsafecode: env.appsafecode,
        }
    }
}

/// Decrypts and authenticates server replies.
#[derive(Debug, Clone)]
pub struct ResponseVerifier {
    cipher: PayloadCipher,
    signer: SignTemplate,
}

impl ResponseVerifier {
    /// Creates a verifier from the payload cipher and the output template.
    pub fn new(cipher: PayloadCipher, signer: SignTemplate) -> Self {
        Self { cipher, signer }
    }

    /// Verifies raw response bytes.
    ///
    /// `sent_code` is the anti-hijack code of the request, if it carried one.
    pub fn verify(&self, raw: &[u8], sent_code: Option<&str>) -> LicenseResult<VerifiedResponse> {
        let envelope = self.open(raw)?;

        if !self
            .signer
            .verify(&envelope.signature_material(), &envelope.sgin)
        {
            warn!("Response signature mismatch, discarding response");
            return Err(LicenseError::SignatureInvalid);
        }

        if let Some(sent) = sent_code {
            if envelope.appsafecode != sent {
                warn!("Anti-hijack code mismatch, discarding response");
                return Err(LicenseError::HijackSuspected {
                    sent: sent.to_string(),
                    received: envelope.appsafecode,
                });
            }
        }

        debug!(data_len = envelope.data.len(), "Response verified");
        Ok(envelope.into())
    }

    /// Decrypts and parses without authenticating.
    fn open(&self, raw: &[u8]) -> LicenseResult<ServerEnvelope> {
        let encoded = std::str::from_utf8(raw).map_err(|e| {
            LicenseError::MalformedResponse(format!("response is not UTF-8: {e}"))
        })?;

        let plaintext = self
            .cipher
            .decrypt(encoded)
            .map_err(LicenseError::decryption)?;

        let json = String::from_utf8(plaintext).map_err(|e| {
            LicenseError::MalformedResponse(format!("decrypted payload is not UTF-8: {e}"))
        })?;

        let document: ResponseDocument = serde_json::from_str(&json).map_err(|e| {
            LicenseError::MalformedResponse(format!("unexpected payload structure: {e}"))
        })?;

        Ok(document.response)
    }
}
